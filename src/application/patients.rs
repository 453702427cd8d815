//! Patient service: intake, doctor-side record management and lookup.
//!
//! Every write validates the intake, runs the screening engine and persists
//! the assessed record in the same call, so a stored record never carries a
//! stale score.

use std::sync::Arc;

use crate::adapters::StorageError;
use crate::domain::{DoctorAccess, PatientIntake, PatientRecord};
use crate::ports::{DoctorRepository, PatientFilter, PatientPage, PatientRepository};
use crate::ApneaError;

/// Service for creating, editing and finding patient records.
pub struct PatientService<S>
where
    S: PatientRepository + DoctorRepository,
{
    storage: Arc<S>,
}

impl<S> PatientService<S>
where
    S: PatientRepository + DoctorRepository,
    S::Error: Into<StorageError>,
{
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Self-service intake. No identity required.
    ///
    /// # Errors
    /// Validation errors, duplicate file numbers and storage failures.
    pub fn intake(&self, intake: PatientIntake) -> Result<PatientRecord, ApneaError> {
        let record = self.prepare(intake)?;
        self.insert(record)
    }

    /// Manual entry by a doctor.
    ///
    /// # Errors
    /// Same as [`Self::intake`].
    pub fn create(
        &self,
        access: &DoctorAccess,
        intake: PatientIntake,
    ) -> Result<PatientRecord, ApneaError> {
        tracing::debug!(doctor = access.username(), "Manual patient entry");
        let record = self.prepare(intake)?;
        self.insert(record)
    }

    /// Replace every input of an existing record and re-assess it.
    ///
    /// # Errors
    /// `NotFound` for an unknown id, `Authorization` for another doctor's
    /// patient, `Validation` if the intake changes the file number.
    pub fn edit(
        &self,
        access: &DoctorAccess,
        id: &str,
        intake: PatientIntake,
    ) -> Result<PatientRecord, ApneaError> {
        let existing = self.lookup(id)?;
        if let Err(denied) = access.may_modify(&existing) {
            tracing::debug!(patient_id = existing.id(), "Edit refused for patient");
            tracing::warn!(doctor = access.username(), "Edit refused: {denied}");
            return Err(denied.into());
        }

        let intake = intake.normalized();
        if intake.id != existing.id() {
            return Err(ApneaError::Validation(
                "File number cannot be changed once stored".to_string(),
            ));
        }

        let record = self.prepare(intake)?;
        self.storage
            .update_patient(&record)
            .map_err(|e| not_found_or_storage(e.into(), id))?;

        tracing::info!(
            score = record.stop_bang_score(),
            tier = %record.risk_tier(),
            "Patient record updated"
        );
        Ok(record)
    }

    /// # Errors
    /// `NotFound` for an unknown id, `Authorization` for another doctor's patient.
    pub fn delete(&self, access: &DoctorAccess, id: &str) -> Result<(), ApneaError> {
        let existing = self.lookup(id)?;
        if let Err(denied) = access.may_modify(&existing) {
            tracing::debug!(patient_id = existing.id(), "Delete refused for patient");
            tracing::warn!(doctor = access.username(), "Delete refused: {denied}");
            return Err(denied.into());
        }

        let deleted = self
            .storage
            .delete_patient(existing.id())
            .map_err(|e| ApneaError::Storage(e.into()))?;
        if !deleted {
            return Err(ApneaError::NotFound(format!("No patient with file number {id}")));
        }

        tracing::info!(doctor = access.username(), "Patient record deleted");
        Ok(())
    }

    /// Load one record by exact file number.
    ///
    /// # Errors
    /// `NotFound` when absent.
    pub fn lookup(&self, id: &str) -> Result<PatientRecord, ApneaError> {
        self.storage
            .load_patient(id.trim())
            .map_err(|e| ApneaError::Storage(e.into()))?
            .ok_or_else(|| ApneaError::NotFound(format!("No patient with file number {}", id.trim())))
    }

    /// Public search: exact file number only, blank query finds nothing.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn find_by_exact_id(&self, query: &str) -> Result<Vec<PatientRecord>, ApneaError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let record = self
            .storage
            .load_patient(query)
            .map_err(|e| ApneaError::Storage(e.into()))?;
        Ok(record.into_iter().collect())
    }

    /// A doctor's own patients, optionally narrowed by partial text.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn search_assigned(
        &self,
        access: &DoctorAccess,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<PatientPage, ApneaError> {
        let filter = PatientFilter::assigned_to(access.username()).with_text(query);
        self.storage
            .search_patients(&filter, offset, limit)
            .map_err(|e| ApneaError::Storage(e.into()))
    }

    /// Total number of stored records.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn count(&self) -> Result<usize, ApneaError> {
        self.storage
            .count_patients()
            .map_err(|e| ApneaError::Storage(e.into()))
    }

    fn prepare(&self, intake: PatientIntake) -> Result<PatientRecord, ApneaError> {
        let intake = intake.normalized();
        intake.validate().map_err(ApneaError::validation)?;
        if let Some(doctor) = &intake.assigned_doctor {
            self.ensure_doctor(doctor)?;
        }
        Ok(PatientRecord::assess(intake)?)
    }

    fn insert(&self, record: PatientRecord) -> Result<PatientRecord, ApneaError> {
        match self.storage.insert_patient(&record).map_err(Into::<StorageError>::into) {
            Ok(()) => {
                tracing::info!(
                    score = record.stop_bang_score(),
                    tier = %record.risk_tier(),
                    "Patient record created"
                );
                Ok(record)
            }
            Err(StorageError::Duplicate(_)) => Err(ApneaError::Validation(format!(
                "File number {} is already registered",
                record.id()
            ))),
            Err(e) => Err(ApneaError::Storage(e)),
        }
    }

    fn ensure_doctor(&self, username: &str) -> Result<(), ApneaError> {
        let account = self
            .storage
            .load_account(username)
            .map_err(|e| ApneaError::Storage(e.into()))?;
        match account {
            Some(account) if account.is_doctor() => Ok(()),
            Some(_) => Err(ApneaError::Validation(format!(
                "'{username}' is not registered as a doctor"
            ))),
            None => Err(ApneaError::Validation(format!("Unknown doctor '{username}'"))),
        }
    }
}

fn not_found_or_storage(err: StorageError, id: &str) -> ApneaError {
    match err {
        StorageError::NotFound(_) => {
            ApneaError::NotFound(format!("No patient with file number {id}"))
        }
        other => ApneaError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteStorage;
    use crate::application::DoctorDirectory;
    use crate::domain::{Questionnaire, RiskTier, Role, Sex};

    struct Fixture {
        patients: PatientService<SqliteStorage>,
        directory: DoctorDirectory<SqliteStorage>,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(SqliteStorage::in_memory().expect("Should create db"));
        Fixture {
            patients: PatientService::new(Arc::clone(&storage)),
            directory: DoctorDirectory::new(storage),
        }
    }

    fn login(fx: &Fixture, username: &str) -> DoctorAccess {
        fx.directory
            .register(username, "s3cret-pass", "12345")
            .expect("Should register");
        fx.directory
            .login(username, "s3cret-pass")
            .expect("Should log in")
    }

    fn intake(id: &str, doctor: Option<&str>) -> PatientIntake {
        PatientIntake {
            id: id.to_string(),
            name: Some("Ana".to_string()),
            surname: Some("Lopez".to_string()),
            assigned_doctor: doctor.map(str::to_string),
            age: Some(55),
            height_m: Some(1.70),
            weight_kg: Some(110.0),
            neck_circumference_cm: Some(42.0),
            sex: Some(Sex::Female),
            questionnaire: Questionnaire::answered(true, false, true, false),
        }
    }

    #[test]
    fn test_intake_assesses_and_persists() {
        let fx = fixture();
        let record = fx.patients.intake(intake("EXP-1", None)).expect("Should save");
        assert_eq!(record.bmi(), Some(38.06));
        assert_eq!(record.stop_bang_score(), 5);
        assert_eq!(record.risk_tier(), RiskTier::High);

        let stored = fx.patients.lookup("EXP-1").expect("Should load");
        assert_eq!(stored.assessment(), record.assessment());
    }

    #[test]
    fn test_intake_without_age_is_intermediate() {
        let fx = fixture();
        let mut input = PatientIntake::new("EXP-2");
        input.questionnaire = Questionnaire::answered(true, true, false, false);
        let record = fx.patients.intake(input).expect("Should save");
        assert_eq!(record.bmi(), None);
        assert_eq!(record.stop_bang_score(), 2);
        assert_eq!(record.risk_tier(), RiskTier::Intermediate);
    }

    #[test]
    fn test_intake_rejects_missing_answers() {
        let fx = fixture();
        let err = fx
            .patients
            .intake(PatientIntake::new("EXP-3"))
            .expect_err("Should reject");
        assert!(matches!(err, ApneaError::Validation(msg) if msg.contains("Snores loudly")));
        assert_eq!(fx.patients.count().expect("Should count"), 0);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let fx = fixture();
        fx.patients.intake(intake("EXP-1", None)).expect("Should save");
        let err = fx
            .patients
            .intake(intake("EXP-1", None))
            .expect_err("Should reject duplicate");
        assert!(matches!(err, ApneaError::Validation(_)));
    }

    #[test]
    fn test_assigned_doctor_must_exist() {
        let fx = fixture();
        let err = fx
            .patients
            .intake(intake("EXP-1", Some("ghost")))
            .expect_err("Should reject");
        assert!(matches!(err, ApneaError::Validation(msg) if msg.contains("ghost")));

        fx.directory
            .register_with_role("front.desk", "pw", "11111", Role::Patient)
            .expect("Should register");
        assert!(fx.patients.intake(intake("EXP-1", Some("front.desk"))).is_err());
    }

    #[test]
    fn test_edit_reassesses() {
        let fx = fixture();
        let access = login(&fx, "dr.a");
        fx.patients
            .create(&access, intake("EXP-1", Some("dr.a")))
            .expect("Should save");

        let mut changed = intake("EXP-1", Some("dr.a"));
        changed.age = Some(30);
        changed.weight_kg = Some(60.0);
        changed.neck_circumference_cm = Some(35.0);
        changed.questionnaire = Questionnaire::answered(false, false, false, false);

        let edited = fx.patients.edit(&access, "EXP-1", changed).expect("Should edit");
        assert_eq!(edited.stop_bang_score(), 0);
        assert_eq!(edited.risk_tier(), RiskTier::Low);
        assert_eq!(
            fx.patients.lookup("EXP-1").expect("Should load").risk_tier(),
            RiskTier::Low
        );
    }

    #[test]
    fn test_edit_cannot_change_id() {
        let fx = fixture();
        let access = login(&fx, "dr.a");
        fx.patients
            .create(&access, intake("EXP-1", Some("dr.a")))
            .expect("Should save");
        let err = fx
            .patients
            .edit(&access, "EXP-1", intake("EXP-9", Some("dr.a")))
            .expect_err("Should reject");
        assert!(matches!(err, ApneaError::Validation(_)));
    }

    #[test]
    fn test_other_doctors_patients_are_protected() {
        let fx = fixture();
        let owner = login(&fx, "dr.a");
        let intruder = login(&fx, "dr.b");
        fx.patients
            .create(&owner, intake("EXP-1", Some("dr.a")))
            .expect("Should save");

        assert!(matches!(
            fx.patients.edit(&intruder, "EXP-1", intake("EXP-1", Some("dr.b"))),
            Err(ApneaError::Authorization(_))
        ));
        assert!(matches!(
            fx.patients.delete(&intruder, "EXP-1"),
            Err(ApneaError::Authorization(_))
        ));
        assert!(fx.patients.lookup("EXP-1").is_ok());

        fx.patients.delete(&owner, "EXP-1").expect("Owner may delete");
        assert!(matches!(
            fx.patients.delete(&owner, "EXP-1"),
            Err(ApneaError::NotFound(_))
        ));
    }

    #[test]
    fn test_refusal_log_line_hides_file_number() {
        let fx = fixture();
        let owner = login(&fx, "dr.a");
        let intruder = login(&fx, "dr.b");
        fx.patients
            .create(&owner, intake("HOSP-778812", Some("dr.a")))
            .expect("Should save");

        let err = fx
            .patients
            .edit(&intruder, "HOSP-778812", intake("HOSP-778812", Some("dr.b")))
            .expect_err("Should refuse");
        let ApneaError::Authorization(denied) = err else {
            panic!("Should be an authorization error");
        };
        let line = format!("WARN Edit refused: {denied} doctor=\"dr.b\"");
        assert!(!line.contains("HOSP-778812"));
        assert!(!crate::adapters::sanitize::sanitize(&line).contains("HOSP-778812"));
    }

    #[test]
    fn test_unassigned_patient_can_be_claimed() {
        let fx = fixture();
        let access = login(&fx, "dr.a");
        fx.patients.intake(intake("EXP-1", None)).expect("Should save");
        let claimed = fx
            .patients
            .edit(&access, "EXP-1", intake("EXP-1", Some("dr.a")))
            .expect("Should edit");
        assert_eq!(claimed.assigned_doctor(), Some("dr.a"));
    }

    #[test]
    fn test_public_lookup_is_exact() {
        let fx = fixture();
        fx.patients.intake(intake("EXP-100", None)).expect("Should save");

        assert_eq!(fx.patients.find_by_exact_id("EXP-100").expect("Should search").len(), 1);
        assert!(fx.patients.find_by_exact_id("EXP-10").expect("Should search").is_empty());
        assert!(fx.patients.find_by_exact_id("   ").expect("Should search").is_empty());
        assert!(matches!(fx.patients.lookup("EXP-10"), Err(ApneaError::NotFound(_))));
    }

    #[test]
    fn test_search_assigned_sees_only_own_patients() {
        let fx = fixture();
        let dr_a = login(&fx, "dr.a");
        let dr_b = login(&fx, "dr.b");
        fx.patients.create(&dr_a, intake("A-1", Some("dr.a"))).expect("Should save");
        fx.patients.create(&dr_a, intake("A-2", Some("dr.a"))).expect("Should save");
        fx.patients.create(&dr_b, intake("B-1", Some("dr.b"))).expect("Should save");
        fx.patients.intake(intake("U-1", None)).expect("Should save");

        let page = fx.patients.search_assigned(&dr_a, "", 0, 10).expect("Should search");
        assert_eq!(page.total_count, 2);
        assert!(page.items.iter().all(|r| r.assigned_doctor() == Some("dr.a")));

        let narrowed = fx.patients.search_assigned(&dr_a, "a-2", 0, 10).expect("Should search");
        assert_eq!(narrowed.total_count, 1);

        let by_name = fx.patients.search_assigned(&dr_a, "lop", 0, 10).expect("Should search");
        assert_eq!(by_name.total_count, 2);
    }

    #[test]
    fn test_removed_doctor_leaves_patients_unassigned() {
        let fx = fixture();
        let access = login(&fx, "dr.a");
        fx.patients.create(&access, intake("A-1", Some("dr.a"))).expect("Should save");

        fx.directory.remove("dr.a").expect("Should remove");
        let record = fx.patients.lookup("A-1").expect("Patient must survive");
        assert_eq!(record.assigned_doctor(), None);
    }
}
