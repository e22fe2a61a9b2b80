//! # Kiosk Configuration
//!
//! Loaded from a TOML file next to the binary. Every field has a default so
//! a missing file yields a working kiosk. Credentials for outbound
//! collaborators (mail, admin access) are deliberately not read here.

use chrono::NaiveTime;
use presencia_core::{PresenciaError, policy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "presencia.toml";

/// Kiosk settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KioskConfig {
    /// Path of the redb attendance database.
    pub database: PathBuf,
    /// Late threshold applied to new enrollments without an override.
    pub late_threshold: NaiveTime,
    /// Warning threshold applied to new enrollments without an override.
    pub warning_threshold: u32,
    /// Cohort label preselected on the enrollment form.
    pub default_cohort: String,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("presencia.redb"),
            late_threshold: policy::default_late_threshold(),
            warning_threshold: policy::DEFAULT_WARNING_THRESHOLD,
            default_cohort: "1ro Medio".to_string(),
        }
    }
}

impl KioskConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, PresenciaError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(PresenciaError::Storage(format!(
                    "cannot read config '{}': {}",
                    path.display(),
                    e
                )));
            }
        };
        toml::from_str(&raw).map_err(|e| {
            PresenciaError::Serialization(format!("config '{}': {}", path.display(), e))
        })
    }
}

/// Parse an `HH:MM` or `HH:MM:SS` time-of-day, as entered on the forms.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, PresenciaError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| {
            PresenciaError::InvalidProfile(format!("'{}' is not a valid HH:MM time", raw))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = KioskConfig::load(Path::new("/nonexistent/presencia.toml")).expect("load");
        assert_eq!(config.database, PathBuf::from("presencia.redb"));
        assert_eq!(config.warning_threshold, 10);
        assert_eq!(config.default_cohort, "1ro Medio");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("presencia.toml");
        std::fs::write(&path, "database = \"school.redb\"\nwarning_threshold = 5\n")
            .expect("write");

        let config = KioskConfig::load(&path).expect("load");
        assert_eq!(config.database, PathBuf::from("school.redb"));
        assert_eq!(config.warning_threshold, 5);
        assert_eq!(
            config.late_threshold,
            NaiveTime::from_hms_opt(8, 15, 0).expect("time")
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("presencia.toml");
        std::fs::write(&path, "admin_password = \"hunter2\"\n").expect("write");
        assert!(KioskConfig::load(&path).is_err());
    }

    #[test]
    fn time_parsing_accepts_both_forms() {
        assert_eq!(
            parse_time_of_day("08:15").expect("parse"),
            NaiveTime::from_hms_opt(8, 15, 0).expect("time")
        );
        assert_eq!(
            parse_time_of_day("08:15:30").expect("parse"),
            NaiveTime::from_hms_opt(8, 15, 30).expect("time")
        );
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("junk").is_err());
    }
}
