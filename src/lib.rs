//! # apneascreen
//!
//! Obstructive sleep apnea intake and STOP-BANG triage.
//!
//! This crate provides:
//! - A deterministic STOP-BANG risk engine (BMI, point tally, risk tier)
//! - Patient records that are re-assessed on every save
//! - Doctor accounts with Argon2id credentials and PIN-based password reset
//! - Printable PDF passes and per-doctor cohort statistics
//! - Terminal UI for clinic desks
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (screening engine, patients, accounts)
//! - `ports`: Trait definitions for external operations
//! - `adapters`: Concrete implementations (SQLite, PDF, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use config::AppConfig;
pub use domain::{PatientIntake, PatientRecord, RiskTier};

/// Result type for apneascreen operations
pub type Result<T> = std::result::Result<T, ApneaError>;

/// Main error type for apneascreen
#[derive(Debug, thiserror::Error)]
pub enum ApneaError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid username or password")]
    Authentication,

    #[error("Access denied: {0}")]
    Authorization(#[from] domain::AccessDenied),

    #[error("Recovery PIN does not match")]
    PinMismatch,

    #[error("Risk computation failed: {0}")]
    Computation(#[from] domain::ComputationError),

    #[error("Credential operation failed: {0}")]
    Credential(#[from] domain::CredentialError),

    #[error("Pass generation failed: {0}")]
    Pass(#[from] ports::PassError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApneaError {
    /// Join several validation messages into one error.
    #[must_use]
    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation(errors.join("; "))
    }

    /// Errors the user cannot fix by changing their input.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Io(_) | Self::Serialization(_) | Self::Credential(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_joins_messages() {
        let err = ApneaError::validation(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Invalid input: a; b");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_fatal_classification() {
        let io = ApneaError::from(std::io::Error::other("disk"));
        assert!(io.is_fatal());
        assert!(!ApneaError::PinMismatch.is_fatal());
        assert!(!ApneaError::Authentication.is_fatal());
    }
}
