//! Analytics service: per-doctor cohort statistics.
//!
//! Counts a doctor's patients per risk tier and per sex, the two breakdowns
//! shown in the statistics view.

use std::sync::Arc;

use crate::adapters::StorageError;
use crate::domain::{DoctorAccess, RiskTier, Sex};
use crate::ports::{CohortCounts, PatientRepository};
use crate::ApneaError;

/// Cohort breakdown of one doctor's patients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortStatistics {
    pub doctor: String,
    pub counts: CohortCounts,
}

impl CohortStatistics {
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.total()
    }

    /// Share of patients in `tier`, in `[0, 1]`. Zero for an empty cohort.
    #[must_use]
    pub fn tier_share(&self, tier: RiskTier) -> f64 {
        self.share(self.counts.tier(tier))
    }

    /// Share of patients of `sex`; `None` selects unrecorded sex.
    #[must_use]
    pub fn sex_share(&self, sex: Option<Sex>) -> f64 {
        let count = match sex {
            Some(Sex::Male) => self.counts.male,
            Some(Sex::Female) => self.counts.female,
            None => self.counts.unspecified_sex,
        };
        self.share(count)
    }

    fn share(&self, count: usize) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    }
}

/// Service for cohort statistics.
pub struct AnalyticsService<S>
where
    S: PatientRepository,
{
    storage: Arc<S>,
}

impl<S> AnalyticsService<S>
where
    S: PatientRepository,
    S::Error: Into<StorageError>,
{
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Statistics over the patients assigned to the calling doctor.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn cohort_statistics(&self, access: &DoctorAccess) -> Result<CohortStatistics, ApneaError> {
        let counts = self
            .storage
            .cohort_counts(access.username())
            .map_err(|e| ApneaError::Storage(e.into()))?;

        tracing::info!(
            doctor = access.username(),
            total = counts.total(),
            high = counts.high,
            "Generated cohort statistics"
        );

        Ok(CohortStatistics {
            doctor: access.username().to_string(),
            counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteStorage;
    use crate::application::{DoctorDirectory, PatientService};
    use crate::domain::{PatientIntake, Questionnaire};

    fn intake(id: &str, doctor: &str, sex: Option<Sex>, yes: usize) -> PatientIntake {
        let answers: Vec<bool> = (0..4).map(|i| i < yes).collect();
        PatientIntake {
            id: id.to_string(),
            assigned_doctor: Some(doctor.to_string()),
            sex,
            questionnaire: Questionnaire::answered(answers[0], answers[1], answers[2], answers[3]),
            ..Default::default()
        }
    }

    #[test]
    fn test_statistics_cover_own_patients_only() {
        let storage = Arc::new(SqliteStorage::in_memory().expect("Should create db"));
        let directory = DoctorDirectory::new(Arc::clone(&storage));
        let patients = PatientService::new(Arc::clone(&storage));
        let analytics = AnalyticsService::new(storage);

        directory.register("dr.a", "pw", "12345").expect("Should register");
        directory.register("dr.b", "pw", "12345").expect("Should register");
        let dr_a = directory.login("dr.a", "pw").expect("Should log in");
        let dr_b = directory.login("dr.b", "pw").expect("Should log in");

        patients.create(&dr_a, intake("A-1", "dr.a", Some(Sex::Male), 0)).expect("Should save");
        patients.create(&dr_a, intake("A-2", "dr.a", Some(Sex::Female), 2)).expect("Should save");
        patients.create(&dr_a, intake("A-3", "dr.a", None, 4)).expect("Should save");
        patients.create(&dr_a, intake("A-4", "dr.a", Some(Sex::Male), 4)).expect("Should save");
        patients.create(&dr_b, intake("B-1", "dr.b", Some(Sex::Female), 4)).expect("Should save");

        let stats = analytics.cohort_statistics(&dr_a).expect("Should compute");
        assert_eq!(stats.doctor, "dr.a");
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.counts.low, 1);
        assert_eq!(stats.counts.intermediate, 1);
        assert_eq!(stats.counts.high, 2);
        assert_eq!(stats.counts.male, 2);
        assert_eq!(stats.counts.female, 1);
        assert_eq!(stats.counts.unspecified_sex, 1);
        assert!((stats.tier_share(RiskTier::High) - 0.5).abs() < f64::EPSILON);
        assert!((stats.sex_share(None) - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_cohort_shares_are_zero() {
        let stats = CohortStatistics {
            doctor: "dr.a".to_string(),
            counts: CohortCounts::default(),
        };
        assert_eq!(stats.total(), 0);
        assert!(stats.tier_share(RiskTier::Low).abs() < f64::EPSILON);
    }
}
