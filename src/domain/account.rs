//! Clinician accounts and the doctor capability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use super::patient::PatientRecord;

/// Number of digits in a recovery PIN.
pub const PIN_LENGTH: usize = 5;

/// Maximum username length.
pub const MAX_USERNAME_LEN: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(Self::Patient),
            "doctor" => Some(Self::Doctor),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored login identity. Secrets are only ever held as Argon2id hashes.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub pin_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("pin_hash", &"[REDACTED]")
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Usernames: 1-150 characters of letters, digits and `@.+-_`.
///
/// # Errors
/// Returns a message describing the first problem found.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!("Username must be at most {MAX_USERNAME_LEN} characters"));
    }
    if let Some(bad) = username
        .chars()
        .find(|c| !(c.is_alphanumeric() || "@.+-_".contains(*c)))
    {
        return Err(format!(
            "Username may only contain letters, digits and @.+-_ (found '{bad}')"
        ));
    }
    Ok(())
}

/// Five-digit recovery PIN, wiped from memory on drop.
pub struct RecoveryPin(Zeroizing<String>);

impl RecoveryPin {
    /// Parse user input. Non-digits and wrong length get distinct messages.
    ///
    /// # Errors
    /// Returns a user-facing message.
    pub fn parse(input: &str) -> Result<Self, String> {
        if !input.chars().all(|c| c.is_ascii_digit()) {
            return Err("Recovery PIN must contain digits only".to_string());
        }
        if input.len() != PIN_LENGTH {
            return Err(format!("Recovery PIN must be exactly {PIN_LENGTH} digits"));
        }
        Ok(Self(Zeroizing::new(input.to_string())))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for RecoveryPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RecoveryPin(*****)")
    }
}

/// Refusal of a doctor-only operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AccessDenied(String);

impl AccessDenied {
    fn not_a_doctor(username: &str) -> Self {
        Self(format!("'{username}' is not registered as a doctor"))
    }

    fn not_assigned(username: &str) -> Self {
        Self(format!(
            "This patient is assigned to another doctor than '{username}'"
        ))
    }
}

/// Proof that the caller authenticated as a doctor.
///
/// Only `authorize_doctor` creates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorAccess {
    username: String,
}

impl DoctorAccess {
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Edit and delete are open on own patients and unassigned ones.
    ///
    /// # Errors
    /// Returns `AccessDenied` for a patient assigned to someone else.
    pub fn may_modify(&self, record: &PatientRecord) -> Result<(), AccessDenied> {
        match record.assigned_doctor() {
            Some(doctor) if doctor != self.username => {
                Err(AccessDenied::not_assigned(&self.username))
            }
            _ => Ok(()),
        }
    }
}

/// Grant the doctor capability to an account holding the doctor role.
///
/// # Errors
/// Returns `AccessDenied` for any other role.
pub fn authorize_doctor(account: &Account) -> Result<DoctorAccess, AccessDenied> {
    if account.is_doctor() {
        Ok(DoctorAccess {
            username: account.username.clone(),
        })
    } else {
        Err(AccessDenied::not_a_doctor(&account.username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::patient::{PatientIntake, Questionnaire};

    fn account(username: &str, role: Role) -> Account {
        Account {
            username: username.to_string(),
            password_hash: "$argon2id$hash".to_string(),
            pin_hash: "$argon2id$pin".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    fn record(assigned: Option<&str>) -> PatientRecord {
        let intake = PatientIntake {
            id: "P-1".to_string(),
            assigned_doctor: assigned.map(str::to_string),
            questionnaire: Questionnaire::answered(false, false, false, false),
            ..Default::default()
        };
        PatientRecord::assess(intake).expect("Should assess")
    }

    #[test]
    fn test_pin_parse() {
        assert_eq!(RecoveryPin::parse("01234").expect("Should parse").expose(), "01234");
        assert_eq!(
            RecoveryPin::parse("12a45").expect_err("Should reject"),
            "Recovery PIN must contain digits only"
        );
        assert_eq!(
            RecoveryPin::parse("1234").expect_err("Should reject"),
            "Recovery PIN must be exactly 5 digits"
        );
        assert!(RecoveryPin::parse("123456").is_err());
    }

    #[test]
    fn test_pin_debug_is_masked() {
        let pin = RecoveryPin::parse("98765").expect("Should parse");
        assert!(!format!("{pin:?}").contains("98765"));
    }

    #[test]
    fn test_account_debug_hides_hashes() {
        let rendered = format!("{:?}", account("dr.house", Role::Doctor));
        assert!(rendered.contains("dr.house"));
        assert!(!rendered.contains("argon2id"));
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("dr.garcia+osa@clinic_1").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_only_doctors_are_authorized() {
        let access = authorize_doctor(&account("dr.a", Role::Doctor)).expect("Should authorize");
        assert_eq!(access.username(), "dr.a");
        assert!(authorize_doctor(&account("someone", Role::Patient)).is_err());
    }

    #[test]
    fn test_may_modify() {
        let access = authorize_doctor(&account("dr.a", Role::Doctor)).expect("Should authorize");
        assert!(access.may_modify(&record(Some("dr.a"))).is_ok());
        assert!(access.may_modify(&record(None)).is_ok());
        assert!(access.may_modify(&record(Some("dr.b"))).is_err());
    }

    #[test]
    fn test_refusal_message_omits_file_number() {
        let access = authorize_doctor(&account("dr.b", Role::Doctor)).expect("Should authorize");
        let intake = PatientIntake {
            id: "HOSP-778812".to_string(),
            assigned_doctor: Some("dr.a".to_string()),
            questionnaire: Questionnaire::answered(true, false, false, false),
            ..Default::default()
        };
        let record = PatientRecord::assess(intake).expect("Should assess");

        let denied = access.may_modify(&record).expect_err("Should refuse");
        let message = denied.to_string();
        assert!(message.contains("dr.b"));
        assert!(!message.contains("HOSP-778812"));
    }
}
