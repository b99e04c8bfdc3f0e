/// Core data types for the SAT anomaly monitor.
///
/// This module defines the shared domain model imported by all other modules:
/// the raw `Reading`, the scored `ScoredReading`, the hourly `HourlyAlert`,
/// and the `SatmonError` type every stage returns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

/// Sensor identifier column.
pub const COL_TAG_NAME: &str = "TagName";

/// Measurement timestamp column.
pub const COL_TIME: &str = "time";

/// Observed value column.
pub const COL_MAX: &str = "max";

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single measurement row from the input file.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub tag_name: String,
    pub time: DateTime<Utc>,
    pub max: f64,
}

/// Outcome of the outlier model for one reading.
///
/// Integer encoding: `1` normal, `-1` anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AnomalyLabel {
    Normal,
    Anomaly,
}

impl AnomalyLabel {
    pub fn as_i8(self) -> i8 {
        match self {
            AnomalyLabel::Normal => 1,
            AnomalyLabel::Anomaly => -1,
        }
    }

    pub fn is_anomaly(self) -> bool {
        self == AnomalyLabel::Anomaly
    }
}

/// A reading of the selected tag after differencing and scoring.
///
/// `temp_diff` is the change from the previous reading in time order
/// (zero for the first). `score` is the raw isolation-forest score;
/// lower means more isolated.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredReading {
    pub time: DateTime<Utc>,
    pub max: f64,
    pub temp_diff: f64,
    pub score: f64,
    pub label: AnomalyLabel,
}

// ---------------------------------------------------------------------------
// Alert types
// ---------------------------------------------------------------------------

/// Number of anomalies observed within one clock hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyAlert {
    pub hour: DateTime<Utc>,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise anywhere in the load → filter → score → report run.
#[derive(Debug, Error)]
pub enum SatmonError {
    /// The input file could not be opened or read.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The columnar reader rejected the file.
    #[error("Columnar read error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// A required column is absent from the input.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A column exists but its type cannot be interpreted.
    #[error("Unsupported type for column {column}: {dtype}")]
    UnsupportedColumnType { column: String, dtype: String },

    /// A `time` value could not be parsed as a timestamp.
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// No tag in the file contains the SAT marker.
    #[error("No SAT measurements found (marker {0:?})")]
    NoSatTags(String),

    /// The selected tag produced no readings to score.
    #[error("No readings to score for tag {0}")]
    EmptySeries(String),

    /// A model or alert parameter is out of range.
    #[error("Invalid parameter: {name} - {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The configuration file could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// The alert table could not be written.
    #[error("Export error: {0}")]
    Export(String),
}

impl SatmonError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        SatmonError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_integer_encoding() {
        assert_eq!(AnomalyLabel::Normal.as_i8(), 1);
        assert_eq!(AnomalyLabel::Anomaly.as_i8(), -1);
        assert!(AnomalyLabel::Anomaly.is_anomaly());
        assert!(!AnomalyLabel::Normal.is_anomaly());
    }

    #[test]
    fn test_error_display() {
        let err = SatmonError::EmptySeries("QTS_LAB_CRAC_MG1102_07.SAT".to_string());
        assert_eq!(
            err.to_string(),
            "No readings to score for tag QTS_LAB_CRAC_MG1102_07.SAT"
        );

        let err = SatmonError::invalid_parameter("contamination", "must be in (0, 0.5]");
        assert_eq!(
            err.to_string(),
            "Invalid parameter: contamination - must be in (0, 0.5]"
        );

        let err = SatmonError::MissingColumn("max".to_string());
        assert_eq!(err.to_string(), "Missing column: max");
    }
}
