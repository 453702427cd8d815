//! Pass service: printable documents for a patient's visit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::adapters::StorageError;
use crate::ports::{PassDocument, PassRenderer, PatientRepository};
use crate::ApneaError;

/// A rendered pass ready to be written out.
#[derive(Debug, Clone)]
pub struct PatientPass {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl PatientPass {
    /// Write the pass into `dir`, creating the directory if needed.
    ///
    /// # Errors
    /// Returns IO errors.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ApneaError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        tracing::info!(bytes = self.bytes.len(), "Pass written");
        Ok(path)
    }
}

/// `patient_pass_<id>.pdf`, with anything outside `[A-Za-z0-9._-]` replaced by `_`.
#[must_use]
pub fn pass_file_name(id: &str) -> String {
    let safe: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("patient_pass_{safe}.pdf")
}

/// Issues passes for stored patients.
pub struct PassService<S, R>
where
    S: PatientRepository,
    R: PassRenderer,
{
    storage: Arc<S>,
    renderer: R,
    clinic_name: String,
}

impl<S, R> PassService<S, R>
where
    S: PatientRepository,
    S::Error: Into<StorageError>,
    R: PassRenderer,
{
    pub fn new(storage: Arc<S>, renderer: R, clinic_name: impl Into<String>) -> Self {
        Self {
            storage,
            renderer,
            clinic_name: clinic_name.into(),
        }
    }

    /// Render the pass of one patient, looked up by exact file number.
    ///
    /// # Errors
    /// `NotFound` for an unknown id, `Pass` if rendering fails.
    pub fn issue(&self, id: &str, issued_on: NaiveDate) -> Result<PatientPass, ApneaError> {
        let id = id.trim();
        let record = self
            .storage
            .load_patient(id)
            .map_err(|e| ApneaError::Storage(e.into()))?
            .ok_or_else(|| ApneaError::NotFound(format!("No patient with file number {id}")))?;

        let document = PassDocument {
            clinic_name: self.clinic_name.clone(),
            issued_on,
            record,
        };
        let bytes = self.renderer.render(&document)?;

        tracing::debug!(patient_id = id, "Issued pass");
        Ok(PatientPass {
            file_name: pass_file_name(id),
            bytes,
        })
    }
}
