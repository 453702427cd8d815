//! Doctor directory: registration, login and PIN-based password reset.

use std::sync::Arc;

use chrono::Utc;
use zeroize::Zeroizing;

use crate::adapters::StorageError;
use crate::domain::{
    authorize_doctor, credentials, validate_username, Account, DoctorAccess, RecoveryPin, Role,
};
use crate::ports::DoctorRepository;
use crate::ApneaError;

/// Service over the stored login identities.
pub struct DoctorDirectory<S>
where
    S: DoctorRepository,
{
    storage: Arc<S>,
}

impl<S> DoctorDirectory<S>
where
    S: DoctorRepository,
    S::Error: Into<StorageError>,
{
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Register a doctor account.
    ///
    /// # Errors
    /// `Validation` for a bad username, empty password, malformed PIN or
    /// taken username.
    pub fn register(&self, username: &str, password: &str, pin: &str) -> Result<Account, ApneaError> {
        self.register_with_role(username, password, pin, Role::Doctor)
    }

    /// Register an account with an explicit role.
    ///
    /// # Errors
    /// Same as [`Self::register`].
    pub fn register_with_role(
        &self,
        username: &str,
        password: &str,
        pin: &str,
        role: Role,
    ) -> Result<Account, ApneaError> {
        let username = username.trim();
        validate_username(username).map_err(ApneaError::Validation)?;
        if password.is_empty() {
            return Err(ApneaError::Validation("Password must not be empty".to_string()));
        }
        let pin = RecoveryPin::parse(pin).map_err(ApneaError::Validation)?;

        let account = Account {
            username: username.to_string(),
            password_hash: credentials::hash_secret(password)?,
            pin_hash: credentials::hash_secret(pin.expose())?,
            role,
            created_at: Utc::now(),
        };

        match self.storage.insert_account(&account).map_err(Into::<StorageError>::into) {
            Ok(()) => {
                tracing::info!(role = %role, "Registered account");
                Ok(account)
            }
            Err(StorageError::Duplicate(_)) => Err(ApneaError::Validation(format!(
                "Username '{username}' is already taken"
            ))),
            Err(e) => Err(ApneaError::Storage(e)),
        }
    }

    /// Check credentials without looking at the role.
    ///
    /// # Errors
    /// Storage and hashing failures only; wrong credentials give `Ok(None)`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<Account>, ApneaError> {
        let Some(account) = self.load(username.trim())? else {
            return Ok(None);
        };
        if credentials::verify_secret(password, &account.password_hash)? {
            Ok(Some(account))
        } else {
            Ok(None)
        }
    }

    /// Log in as a doctor.
    ///
    /// # Errors
    /// `Authentication` for wrong credentials, `Authorization` for a valid
    /// account without the doctor role.
    pub fn login(&self, username: &str, password: &str) -> Result<DoctorAccess, ApneaError> {
        let Some(account) = self.authenticate(username, password)? else {
            tracing::warn!("Login rejected: invalid credentials");
            return Err(ApneaError::Authentication);
        };

        let access = authorize_doctor(&account).inspect_err(|_| {
            tracing::warn!("Login rejected: account lacks doctor role");
        })?;
        tracing::info!(doctor = access.username(), "Doctor logged in");
        Ok(access)
    }

    /// Replace a password after checking the recovery PIN.
    ///
    /// # Errors
    /// `Validation` for a malformed PIN or empty password, `NotFound` for an
    /// unknown username, `PinMismatch` for a wrong PIN.
    pub fn reset_password(&self, username: &str, pin: &str, new_password: &str) -> Result<(), ApneaError> {
        let pin = RecoveryPin::parse(pin).map_err(ApneaError::Validation)?;
        let new_password = Zeroizing::new(new_password.to_string());
        if new_password.is_empty() {
            return Err(ApneaError::Validation("Password must not be empty".to_string()));
        }

        let username = username.trim();
        let account = self
            .load(username)?
            .ok_or_else(|| ApneaError::NotFound(format!("No account named '{username}'")))?;

        if !credentials::verify_secret(pin.expose(), &account.pin_hash)? {
            tracing::warn!("Password reset rejected: recovery PIN mismatch");
            return Err(ApneaError::PinMismatch);
        }

        let hash = credentials::hash_secret(&new_password)?;
        self.storage
            .update_password_hash(&account.username, &hash)
            .map_err(|e| ApneaError::Storage(e.into()))?;

        tracing::info!("Password reset completed");
        Ok(())
    }

    /// Delete an account. Its patients stay, unassigned.
    ///
    /// # Errors
    /// `NotFound` for an unknown username.
    pub fn remove(&self, username: &str) -> Result<(), ApneaError> {
        let removed = self
            .storage
            .delete_account(username)
            .map_err(|e| ApneaError::Storage(e.into()))?;
        if removed {
            Ok(())
        } else {
            Err(ApneaError::NotFound(format!("No account named '{username}'")))
        }
    }

    /// Usernames that can be assigned patients.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn list_doctors(&self) -> Result<Vec<String>, ApneaError> {
        self.storage
            .list_accounts(Role::Doctor)
            .map_err(|e| ApneaError::Storage(e.into()))
    }

    fn load(&self, username: &str) -> Result<Option<Account>, ApneaError> {
        self.storage
            .load_account(username)
            .map_err(|e| ApneaError::Storage(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteStorage;

    fn directory() -> DoctorDirectory<SqliteStorage> {
        DoctorDirectory::new(Arc::new(SqliteStorage::in_memory().expect("Should create db")))
    }

    #[test]
    fn test_register_and_login() {
        let dir = directory();
        let account = dir.register("dr.garcia", "pw-1", "54321").expect("Should register");
        assert_eq!(account.role, Role::Doctor);
        assert_ne!(account.password_hash, "pw-1");
        assert!(!account.pin_hash.contains("54321"));

        let access = dir.login("dr.garcia", "pw-1").expect("Should log in");
        assert_eq!(access.username(), "dr.garcia");
        assert_eq!(dir.list_doctors().expect("Should list"), vec!["dr.garcia".to_string()]);
    }

    #[test]
    fn test_register_validation() {
        let dir = directory();
        let non_numeric = dir.register("dr.a", "pw", "12a45").expect_err("Should reject");
        let short = dir.register("dr.a", "pw", "1234").expect_err("Should reject");
        assert_ne!(non_numeric.to_string(), short.to_string());
        assert!(matches!(dir.register("dr a", "pw", "12345"), Err(ApneaError::Validation(_))));
        assert!(matches!(dir.register("dr.a", "", "12345"), Err(ApneaError::Validation(_))));

        dir.register("dr.a", "pw", "12345").expect("Should register");
        assert!(matches!(dir.register("dr.a", "pw2", "12345"), Err(ApneaError::Validation(_))));
    }

    #[test]
    fn test_login_failures_are_distinguished() {
        let dir = directory();
        dir.register("dr.a", "right", "12345").expect("Should register");
        dir.register_with_role("desk", "right", "12345", Role::Patient)
            .expect("Should register");

        assert!(matches!(dir.login("dr.a", "wrong"), Err(ApneaError::Authentication)));
        assert!(matches!(dir.login("nobody", "right"), Err(ApneaError::Authentication)));
        assert!(matches!(dir.login("desk", "right"), Err(ApneaError::Authorization(_))));
        assert!(dir.authenticate("desk", "right").expect("Should check").is_some());
    }

    #[test]
    fn test_reset_password() {
        let dir = directory();
        dir.register("dr.a", "old-pw", "24680").expect("Should register");

        assert!(matches!(
            dir.reset_password("dr.a", "11111", "new-pw"),
            Err(ApneaError::PinMismatch)
        ));
        assert!(matches!(
            dir.reset_password("ghost", "24680", "new-pw"),
            Err(ApneaError::NotFound(_))
        ));
        assert!(matches!(
            dir.reset_password("dr.a", "2468", "new-pw"),
            Err(ApneaError::Validation(_))
        ));
        assert!(dir.login("dr.a", "old-pw").is_ok());

        dir.reset_password("dr.a", "24680", "new-pw").expect("Should reset");
        assert!(matches!(dir.login("dr.a", "old-pw"), Err(ApneaError::Authentication)));
        assert!(dir.login("dr.a", "new-pw").is_ok());
    }

    #[test]
    fn test_remove() {
        let dir = directory();
        dir.register("dr.a", "pw", "12345").expect("Should register");
        dir.remove("dr.a").expect("Should remove");
        assert!(matches!(dir.remove("dr.a"), Err(ApneaError::NotFound(_))));
        assert!(dir.list_doctors().expect("Should list").is_empty());
    }
}
