//! Pass port: printable documents for a patient's next visit.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::domain::PatientRecord;

#[derive(Debug, Error)]
pub enum PassError {
    #[error("Pass rendering failed: {0}")]
    Rendering(String),
}

/// Everything a renderer needs for one pass.
#[derive(Debug, Clone)]
pub struct PassDocument {
    pub clinic_name: String,
    pub issued_on: NaiveDate,
    pub record: PatientRecord,
}

impl PassDocument {
    /// Issue date as `dd/mm/YYYY`.
    #[must_use]
    pub fn issue_date_label(&self) -> String {
        self.issued_on.format("%d/%m/%Y").to_string()
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.issued_on.year()
    }
}

/// Turns a pass document into file bytes.
pub trait PassRenderer: Send + Sync {
    /// # Errors
    /// Returns `PassError` if the document cannot be produced.
    fn render(&self, document: &PassDocument) -> Result<Vec<u8>, PassError>;
}
