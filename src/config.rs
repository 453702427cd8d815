//! Runtime configuration from `APNEASCREEN_*` environment variables.

use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "APNEASCREEN_DB_PATH";
pub const PASS_DIR_ENV: &str = "APNEASCREEN_PASS_DIR";
pub const CLINIC_NAME_ENV: &str = "APNEASCREEN_CLINIC_NAME";
pub const PAGE_SIZE_ENV: &str = "APNEASCREEN_PAGE_SIZE";

const DEFAULT_DB_PATH: &str = "apneascreen.db";
const DEFAULT_PASS_DIR: &str = "passes";
const DEFAULT_CLINIC_NAME: &str = "Sleep Apnea Screening Clinic";
const DEFAULT_PAGE_SIZE: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Directory exported passes are written to
    pub pass_dir: PathBuf,
    /// Printed on every pass
    pub clinic_name: String,
    /// Rows per page in the doctor console
    pub page_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            pass_dir: PathBuf::from(DEFAULT_PASS_DIR),
            clinic_name: DEFAULT_CLINIC_NAME.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    /// Read the process environment. Unset or invalid values keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_blank = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(path) = non_blank(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = non_blank(PASS_DIR_ENV) {
            config.pass_dir = PathBuf::from(dir);
        }
        if let Some(name) = non_blank(CLINIC_NAME_ENV) {
            config.clinic_name = name;
        }
        if let Some(raw) = non_blank(PAGE_SIZE_ENV) {
            match raw.parse::<usize>() {
                Ok(size) if size > 0 => config.page_size = size,
                _ => tracing::warn!(
                    value = %raw,
                    "Ignoring invalid {PAGE_SIZE_ENV}, using {DEFAULT_PAGE_SIZE}"
                ),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.page_size, 15);
        assert_eq!(config.clinic_name, "Sleep Apnea Screening Clinic");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (DB_PATH_ENV, "/var/lib/osa/clinic.db"),
            (PASS_DIR_ENV, "/tmp/passes"),
            (CLINIC_NAME_ENV, "  Hospital Central  "),
            (PAGE_SIZE_ENV, "25"),
        ]);
        assert_eq!(config.db_path, PathBuf::from("/var/lib/osa/clinic.db"));
        assert_eq!(config.pass_dir, PathBuf::from("/tmp/passes"));
        assert_eq!(config.clinic_name, "Hospital Central");
        assert_eq!(config.page_size, 25);
    }

    #[test]
    fn test_invalid_page_size_falls_back() {
        assert_eq!(config_from(&[(PAGE_SIZE_ENV, "0")]).page_size, 15);
        assert_eq!(config_from(&[(PAGE_SIZE_ENV, "lots")]).page_size, 15);
        assert_eq!(config_from(&[(CLINIC_NAME_ENV, "   ")]).clinic_name, DEFAULT_CLINIC_NAME);
    }
}
