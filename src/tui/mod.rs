//! TUI module: terminal front end using Ratatui.
//!
//! Screens:
//! - Home menu with public actions and record counts
//! - Forms for patient intake, lookup and doctor accounts
//! - Assessment result view
//! - Doctor console with search, paging and pass export
//! - Cohort statistics

mod app;
mod styles;
mod ui;

pub use app::App;
pub use styles::ClinicTheme;
