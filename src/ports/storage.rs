//! Storage ports: patient and account repositories.
//!
//! These traits keep the storage backend (SQLite) out of the application
//! services. Both repositories share one error type so a single backend can
//! implement them together.

use crate::domain::{Account, PatientRecord, RiskTier, Role, Sex};

/// Criteria for listing patients. Empty fields do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFilter {
    /// Exact file number
    pub exact_id: Option<String>,
    /// Case-insensitive partial match over file number, name and surname
    pub text: Option<String>,
    /// Exact username of the assigned doctor
    pub assigned_doctor: Option<String>,
    pub risk_tier: Option<RiskTier>,
    pub sex: Option<Sex>,
}

impl PatientFilter {
    /// Patients assigned to one doctor.
    #[must_use]
    pub fn assigned_to(doctor: impl Into<String>) -> Self {
        Self {
            assigned_doctor: Some(doctor.into()),
            ..Default::default()
        }
    }

    /// Add a partial text match. Blank text leaves the filter unchanged.
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        let text = text.trim();
        self.text = (!text.is_empty()).then(|| text.to_string());
        self
    }

    #[must_use]
    pub fn with_risk_tier(mut self, tier: Option<RiskTier>) -> Self {
        self.risk_tier = tier;
        self
    }
}

/// A page of patients with pagination metadata.
#[derive(Debug, Clone)]
pub struct PatientPage {
    /// Patients in this page, ordered by file number
    pub items: Vec<PatientRecord>,
    /// Total number of matches across all pages
    pub total_count: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

impl PatientPage {
    #[must_use]
    pub fn new(items: Vec<PatientRecord>, total_count: usize, offset: usize, limit: usize) -> Self {
        let has_more = offset + items.len() < total_count;
        Self {
            items,
            total_count,
            offset,
            limit,
            has_more,
        }
    }

    #[must_use]
    pub fn empty(limit: usize) -> Self {
        Self::new(Vec::new(), 0, 0, limit)
    }

    #[must_use]
    pub fn next_offset(&self) -> Option<usize> {
        self.has_more.then(|| self.offset + self.limit)
    }

    #[must_use]
    pub fn prev_offset(&self) -> Option<usize> {
        (self.offset > 0).then(|| self.offset.saturating_sub(self.limit))
    }

    /// 1-based page number for display.
    #[must_use]
    pub fn page_number(&self) -> usize {
        if self.limit == 0 {
            1
        } else {
            self.offset / self.limit + 1
        }
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        if self.limit == 0 {
            1
        } else {
            self.total_count.div_ceil(self.limit).max(1)
        }
    }
}

/// Raw counts of a doctor's patients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CohortCounts {
    pub low: usize,
    pub intermediate: usize,
    pub high: usize,
    pub male: usize,
    pub female: usize,
    pub unspecified_sex: usize,
}

impl CohortCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.low + self.intermediate + self.high
    }

    #[must_use]
    pub fn tier(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Intermediate => self.intermediate,
            RiskTier::High => self.high,
        }
    }
}

/// Error type shared by the repositories of one backend.
pub trait Repository: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;
}

/// Persistent patient records.
pub trait PatientRepository: Repository {
    /// Store a new record.
    ///
    /// # Errors
    /// Returns a duplicate error if the file number is already stored.
    fn insert_patient(&self, record: &PatientRecord) -> Result<(), Self::Error>;

    /// Replace every field of a stored record.
    ///
    /// # Errors
    /// Returns a not-found error if the file number is not stored.
    fn update_patient(&self, record: &PatientRecord) -> Result<(), Self::Error>;

    /// Load one record by exact file number.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_patient(&self, id: &str) -> Result<Option<PatientRecord>, Self::Error>;

    /// Delete one record. Returns `false` if it was not stored.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn delete_patient(&self, id: &str) -> Result<bool, Self::Error>;

    /// List matching records ordered by file number.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn search_patients(
        &self,
        filter: &PatientFilter,
        offset: usize,
        limit: usize,
    ) -> Result<PatientPage, Self::Error>;

    /// Tier and sex counts over the patients assigned to `doctor`.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn cohort_counts(&self, doctor: &str) -> Result<CohortCounts, Self::Error>;

    fn count_patients(&self) -> Result<usize, Self::Error>;
}

/// Persistent login identities.
pub trait DoctorRepository: Repository {
    /// # Errors
    /// Returns a duplicate error if the username is taken.
    fn insert_account(&self, account: &Account) -> Result<(), Self::Error>;

    fn load_account(&self, username: &str) -> Result<Option<Account>, Self::Error>;

    /// # Errors
    /// Returns a not-found error if the username is unknown.
    fn update_password_hash(&self, username: &str, password_hash: &str) -> Result<(), Self::Error>;

    /// Delete an account; its patients become unassigned. Returns `false` if unknown.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn delete_account(&self, username: &str) -> Result<bool, Self::Error>;

    /// Usernames holding `role`, sorted.
    fn list_accounts(&self, role: Role) -> Result<Vec<String>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offsets() {
        let page = PatientPage::new(Vec::new(), 40, 15, 15);
        // items is empty here, so has_more reflects offset only
        assert!(page.has_more);
        assert_eq!(page.next_offset(), Some(30));
        assert_eq!(page.prev_offset(), Some(0));
        assert_eq!(page.page_number(), 2);
        assert_eq!(page.page_count(), 3);

        let first = PatientPage::new(Vec::new(), 0, 0, 15);
        assert!(!first.has_more);
        assert_eq!(first.next_offset(), None);
        assert_eq!(first.prev_offset(), None);
        assert_eq!(first.page_count(), 1);
    }

    #[test]
    fn test_filter_blank_text() {
        let filter = PatientFilter::assigned_to("dr.a").with_text("   ");
        assert_eq!(filter.text, None);
        assert_eq!(filter.assigned_doctor.as_deref(), Some("dr.a"));

        let filter = filter.with_text(" lop ");
        assert_eq!(filter.text.as_deref(), Some("lop"));
    }

    #[test]
    fn test_cohort_totals() {
        let counts = CohortCounts {
            low: 2,
            intermediate: 3,
            high: 1,
            male: 4,
            female: 1,
            unspecified_sex: 1,
        };
        assert_eq!(counts.total(), 6);
        assert_eq!(counts.tier(RiskTier::Intermediate), 3);
    }
}
