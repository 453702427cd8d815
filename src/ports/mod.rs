//! Ports layer: trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (database, document output).

mod pass;
mod storage;

pub use pass::{PassDocument, PassError, PassRenderer};
pub use storage::{
    CohortCounts, DoctorRepository, PatientFilter, PatientPage, PatientRepository, Repository,
};
