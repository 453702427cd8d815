//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod analytics;
mod directory;
mod passes;
mod patients;

pub use analytics::{AnalyticsService, CohortStatistics};
pub use directory::DoctorDirectory;
pub use passes::{pass_file_name, PassService, PatientPass};
pub use patients::PatientService;
