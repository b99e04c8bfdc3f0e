//! Run configuration.
//!
//! Every tunable of the pipeline lives in `Config`. Values are layered:
//! built-in defaults, then an optional TOML file, then `SATMON_*`
//! environment variables and command-line flags (both handled by the CLI
//! layer in `main`).

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::analysis::isolation_forest::{DEFAULT_MAX_SAMPLES, IsolationForestParams};
use crate::model::SatmonError;

/// Default input file.
pub const DEFAULT_DATA_PATH: &str = "lab.parquet";

/// Substring identifying supply-air-temperature tags.
pub const DEFAULT_TAG_MARKER: &str = ".SAT";

/// The CRAC unit monitored when nothing else is configured.
pub const DEFAULT_TAG_NAME: &str = "QTS_LAB_CRAC_MG1102_07.SAT";

pub const DEFAULT_CONTAMINATION: f64 = 0.01;
pub const DEFAULT_N_ESTIMATORS: usize = 100;
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// More than this many anomalies in one hour raises an alert.
pub const DEFAULT_ALERT_THRESHOLD: usize = 5;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_path: PathBuf,
    pub tag_marker: String,
    /// Exact tag to analyse.
    pub tag_name: String,
    /// Ignore `tag_name` and analyse the first SAT tag found in the file.
    pub first_sat_tag: bool,
    pub contamination: f64,
    pub n_estimators: usize,
    pub random_seed: u64,
    pub alert_threshold: usize,
    pub plot: bool,
    /// Where to write the alert table as JSON, if anywhere.
    pub alerts_json: Option<PathBuf>,
    pub log_level: String,
    pub log_file: Option<String>,
    pub log_timestamps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            tag_marker: DEFAULT_TAG_MARKER.to_string(),
            tag_name: DEFAULT_TAG_NAME.to_string(),
            first_sat_tag: false,
            contamination: DEFAULT_CONTAMINATION,
            n_estimators: DEFAULT_N_ESTIMATORS,
            random_seed: DEFAULT_RANDOM_SEED,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            plot: true,
            alerts_json: None,
            log_level: "info".to_string(),
            log_file: None,
            log_timestamps: false,
        }
    }
}

impl Config {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Config, SatmonError> {
        toml::from_str(text).map_err(|e| SatmonError::Config(e.to_string()))
    }

    /// Load a TOML config file.
    pub fn load(path: &Path) -> Result<Config, SatmonError> {
        let text = std::fs::read_to_string(path).map_err(|source| SatmonError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// The tag to select, or `None` to take the first SAT tag in the file.
    pub fn requested_tag(&self) -> Option<&str> {
        if self.first_sat_tag {
            None
        } else {
            Some(self.tag_name.as_str())
        }
    }

    pub fn forest_params(&self) -> IsolationForestParams {
        IsolationForestParams {
            n_estimators: self.n_estimators,
            contamination: self.contamination,
            random_seed: self.random_seed,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }

    /// Check parameter ranges before anything is read.
    pub fn validate(&self) -> Result<(), SatmonError> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(SatmonError::invalid_parameter(
                "contamination",
                format!("must be in (0, 0.5], got {}", self.contamination),
            ));
        }
        if self.n_estimators == 0 {
            return Err(SatmonError::invalid_parameter(
                "n_estimators",
                "must be at least 1",
            ));
        }
        if self.tag_marker.is_empty() {
            return Err(SatmonError::invalid_parameter(
                "tag_marker",
                "must not be empty",
            ));
        }
        if !self.first_sat_tag && self.tag_name.is_empty() {
            return Err(SatmonError::invalid_parameter(
                "tag_name",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_lab_setup() {
        let config = Config::default();
        assert_eq!(config.data_path, PathBuf::from("lab.parquet"));
        assert_eq!(config.tag_marker, ".SAT");
        assert_eq!(config.requested_tag(), Some("QTS_LAB_CRAC_MG1102_07.SAT"));
        assert_eq!(config.contamination, 0.01);
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.alert_threshold, 5);
        assert!(config.plot);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            data_path = "/data/hall_b.parquet"
            contamination = 0.05
            alert_threshold = 3
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.data_path, PathBuf::from("/data/hall_b.parquet"));
        assert_eq!(config.contamination, 0.05);
        assert_eq!(config.alert_threshold, 3);
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.tag_marker, ".SAT");
    }

    #[test]
    fn test_first_sat_tag_overrides_tag_name() {
        let config = Config::from_toml_str("first_sat_tag = true").expect("should parse");
        assert_eq!(config.requested_tag(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = Config::from_toml_str("contamintion = 0.05");
        assert!(matches!(result, Err(SatmonError::Config(_))));
    }

    #[test]
    fn test_contamination_out_of_range_is_rejected() {
        for bad in [0.0, -0.1, 0.51, f64::NAN] {
            let config = Config {
                contamination: bad,
                ..Config::default()
            };
            assert!(
                matches!(config.validate(), Err(SatmonError::InvalidParameter { .. })),
                "contamination {} should be rejected",
                bad
            );
        }

        let edge = Config {
            contamination: 0.5,
            ..Config::default()
        };
        assert!(edge.validate().is_ok(), "0.5 is the inclusive upper bound");
    }

    #[test]
    fn test_zero_estimators_is_rejected() {
        let config = Config {
            n_estimators: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Config::load(Path::new("/nonexistent/satmon.toml"));
        assert!(matches!(result, Err(SatmonError::Io { .. })));
    }
}
