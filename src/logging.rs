/// Structured logging for the SAT anomaly monitor
///
/// Provides context-rich logging with pipeline stage and tag identifiers.
/// Records go through the `log` facade and are formatted by `env_logger`,
/// either to the console or appended to a log file.

use chrono::Utc;
use env_logger::{Builder, Target};
use log::LevelFilter;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;

use crate::model::SatmonError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parse a level name as written in config files (`debug`, `info`,
    /// `warn`/`warning`, `error`). Unknown names fall back to `Info`.
    pub fn parse(name: &str) -> LogLevel {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warning,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug | log::Level::Trace => LogLevel::Debug,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loader,
    Filter,
    Scorer,
    Plot,
    Alert,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Loader => write!(f, "LOAD"),
            Stage::Filter => write!(f, "FILTER"),
            Stage::Scorer => write!(f, "SCORE"),
            Stage::Plot => write!(f, "PLOT"),
            Stage::Alert => write!(f, "ALERT"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the data simply has nothing to analyse
    Expected,
    /// Unexpected failure - bad input file, bad configuration, or a bug
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Initialize the global logger.
///
/// With `log_file` set, records are appended to that file (always with
/// timestamps); otherwise they go to stderr. Calling this more than once is
/// harmless: later calls are ignored by the `log` facade.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let mut builder = Builder::new();
    builder.filter_level(min_level.filter());

    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path, e);
                None
            }
        }
    });
    let timestamps = console_timestamps || file.is_some();

    builder.format(move |buf, record| {
        if timestamps {
            writeln!(
                buf,
                "{} {} {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                LogLevel::from(record.level()),
                record.args()
            )
        } else {
            writeln!(buf, "   {}", record.args())
        }
    });

    match file {
        Some(file) => builder.target(Target::Pipe(Box::new(file))),
        None => builder.target(Target::Stderr),
    };

    let _ = builder.try_init();
}

fn format_entry(stage: Stage, tag: Option<&str>, message: &str) -> String {
    let tag_part = tag.map(|t| format!(" [{}]", t)).unwrap_or_default();
    format!("{}{}: {}", stage, tag_part, message)
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(stage: Stage, tag: Option<&str>, message: &str) {
    log::info!("{}", format_entry(stage, tag, message));
}

/// Log a warning message
pub fn warn(stage: Stage, tag: Option<&str>, message: &str) {
    log::warn!("{}", format_entry(stage, tag, message));
}

/// Log an error message
pub fn error(stage: Stage, tag: Option<&str>, message: &str) {
    log::error!("{}", format_entry(stage, tag, message));
}

/// Log a debug message
pub fn debug(stage: Stage, tag: Option<&str>, message: &str) {
    log::debug!("{}", format_entry(stage, tag, message));
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a pipeline failure by what went wrong.
pub fn classify_failure(err: &SatmonError) -> FailureType {
    match err {
        // The file was fine, the selected sensor just has nothing in it
        SatmonError::EmptySeries(_) | SatmonError::NoSatTags(_) => FailureType::Expected,
        SatmonError::Io { .. }
        | SatmonError::MissingColumn(_)
        | SatmonError::UnsupportedColumnType { .. }
        | SatmonError::InvalidTimestamp(_)
        | SatmonError::InvalidParameter { .. }
        | SatmonError::Config(_) => FailureType::Unexpected,
        SatmonError::Polars(_) | SatmonError::Export(_) => FailureType::Unknown,
    }
}

/// The stage a failure originated in.
pub fn failure_stage(err: &SatmonError) -> Stage {
    match err {
        SatmonError::Io { .. }
        | SatmonError::Polars(_)
        | SatmonError::MissingColumn(_)
        | SatmonError::UnsupportedColumnType { .. }
        | SatmonError::InvalidTimestamp(_) => Stage::Loader,
        SatmonError::NoSatTags(_) => Stage::Filter,
        SatmonError::EmptySeries(_) => Stage::Scorer,
        SatmonError::Export(_) => Stage::Alert,
        SatmonError::InvalidParameter { .. } | SatmonError::Config(_) => Stage::System,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a pipeline failure with automatic classification
pub fn log_failure(tag: Option<&str>, operation: &str, err: &SatmonError) {
    let failure_type = classify_failure(err);
    let stage = failure_stage(err);

    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => warn(stage, tag, &message),
        FailureType::Unexpected => error(stage, tag, &message),
        FailureType::Unknown => warn(stage, tag, &message),
    }
}

// ---------------------------------------------------------------------------
// Load Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of the load step
pub fn log_load_summary(total: usize, kept: usize, dropped: usize) {
    let message = format!(
        "Load complete: {}/{} rows kept, {} dropped",
        kept,
        total,
        dropped
    );

    if kept == 0 {
        error(Stage::Loader, None, &message);
    } else if dropped == 0 {
        info(Stage::Loader, None, &message);
    } else {
        warn(Stage::Loader, None, &message);
    }
}
