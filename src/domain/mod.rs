//! Domain layer: screening rules, patient records and clinician identity.
//!
//! Pure types with no storage or terminal dependencies. All inputs go
//! through explicit validation before they reach the screening engine.

mod account;
pub mod credentials;
mod patient;
pub mod screening;

pub use account::{
    authorize_doctor, validate_username, AccessDenied, Account, DoctorAccess, RecoveryPin, Role,
    MAX_USERNAME_LEN, PIN_LENGTH,
};
pub use credentials::CredentialError;
pub use patient::{PatientIntake, PatientRecord, Questionnaire, Sex, MAX_ID_LEN, MAX_NAME_LEN};
pub use screening::{assess, Assessment, ComputationError, Criterion, RiskTier, ScreeningInput};
