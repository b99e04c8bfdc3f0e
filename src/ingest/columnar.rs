/// Columnar file loader
///
/// Reads the sensor historian export (Parquet, or CSV when the file ends in
/// `.csv`) into a flat list of `Reading`s. Only three columns matter:
/// `TagName`, `time` and `max`. Everything else in the export is ignored.
///
/// Rows without a `max` value are dropped, as are rows missing a tag or a
/// timestamp. A timestamp that is present but unparseable is a hard error:
/// it means the export format changed and every downstream number would be
/// suspect.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

use crate::logging::{self, Stage};
use crate::model::{COL_MAX, COL_TAG_NAME, COL_TIME, Reading, SatmonError};

/// Naive timestamp layouts seen in historian exports. Interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Offset-carrying layouts that are not strict RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

// ============================================================================
// Load results
// ============================================================================

/// Row accounting for one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    pub total_rows: usize,
    pub kept: usize,
    pub dropped_null_max: usize,
    /// Rows with a `max` but no tag or no timestamp.
    pub dropped_incomplete: usize,
}

impl LoadSummary {
    pub fn dropped(&self) -> usize {
        self.dropped_null_max + self.dropped_incomplete
    }
}

#[derive(Debug, Clone)]
pub struct LoadedReadings {
    pub readings: Vec<Reading>,
    pub summary: LoadSummary,
}

// ============================================================================
// Loader
// ============================================================================

/// Load every usable reading from `path`.
///
/// # Errors
/// - `Io` if the file cannot be opened
/// - `Polars` if the file is not valid Parquet / CSV
/// - `MissingColumn` if `TagName`, `time` or `max` is absent
/// - `UnsupportedColumnType` / `InvalidTimestamp` for uninterpretable values
pub fn load_readings(path: &Path) -> Result<LoadedReadings, SatmonError> {
    logging::debug(Stage::Loader, None, &format!("Reading {}", path.display()));

    let df = read_frame(path)?;
    let loaded = readings_from_frame(&df)?;

    logging::log_load_summary(
        loaded.summary.total_rows,
        loaded.summary.kept,
        loaded.summary.dropped(),
    );

    Ok(loaded)
}

fn read_frame(path: &Path) -> Result<DataFrame, SatmonError> {
    let file = File::open(path).map_err(|source| SatmonError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let df = if is_csv {
        CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(file)
            .finish()?
    } else {
        ParquetReader::new(file).finish()?
    };

    Ok(df)
}

/// Convert an already-read frame into readings.
pub fn readings_from_frame(df: &DataFrame) -> Result<LoadedReadings, SatmonError> {
    let tags = string_values(required_column(df, COL_TAG_NAME)?)?;
    let times = time_values(required_column(df, COL_TIME)?)?;
    let maxes = float_values(required_column(df, COL_MAX)?)?;

    let mut summary = LoadSummary {
        total_rows: df.height(),
        ..LoadSummary::default()
    };
    let mut readings = Vec::with_capacity(df.height());

    for ((tag, raw_time), max) in tags.into_iter().zip(times).zip(maxes) {
        let Some(max) = max else {
            summary.dropped_null_max += 1;
            continue;
        };
        let time = raw_time.map(RawTime::resolve).transpose()?;
        match (tag, time) {
            (Some(tag_name), Some(time)) => readings.push(Reading {
                tag_name,
                time,
                max,
            }),
            _ => summary.dropped_incomplete += 1,
        }
    }

    summary.kept = readings.len();
    Ok(LoadedReadings { readings, summary })
}

// ============================================================================
// Column extraction
// ============================================================================

fn required_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series, SatmonError> {
    df.column(name)
        .map_err(|_| SatmonError::MissingColumn(name.to_string()))
}

fn unsupported(series: &Series) -> SatmonError {
    SatmonError::UnsupportedColumnType {
        column: series.name().to_string(),
        dtype: series.dtype().to_string(),
    }
}

fn string_values(series: &Series) -> Result<Vec<Option<String>>, SatmonError> {
    let cast = series
        .cast(&DataType::String)
        .map_err(|_| unsupported(series))?;
    let values = cast.str().map_err(|_| unsupported(series))?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

fn float_values(series: &Series) -> Result<Vec<Option<f64>>, SatmonError> {
    if !(series.dtype().is_numeric() || series.dtype() == &DataType::Null) {
        return Err(unsupported(series));
    }
    let cast = series
        .cast(&DataType::Float64)
        .map_err(|_| unsupported(series))?;
    let values = cast.f64().map_err(|_| unsupported(series))?;
    // NaN is how some exporters spell "no reading"
    Ok(values
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// A `time` cell as stored, parsed only once its row is known to be kept.
enum RawTime<'a> {
    Epoch(i64, TimeUnit),
    Days(i32),
    Text(&'a str),
}

impl RawTime<'_> {
    fn resolve(self) -> Result<DateTime<Utc>, SatmonError> {
        match self {
            RawTime::Epoch(raw, unit) => from_epoch(raw, unit),
            RawTime::Days(d) => DateTime::from_timestamp(i64::from(d) * 86_400, 0)
                .ok_or_else(|| SatmonError::InvalidTimestamp(format!("{} days", d))),
            RawTime::Text(s) => parse_timestamp(s),
        }
    }
}

fn time_values(series: &Series) -> Result<Vec<Option<RawTime<'_>>>, SatmonError> {
    match series.dtype() {
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            let ints = series.cast(&DataType::Int64)?;
            Ok(ints
                .i64()?
                .into_iter()
                .map(|v| v.map(|raw| RawTime::Epoch(raw, unit)))
                .collect())
        }
        DataType::Date => {
            let days = series.cast(&DataType::Int32)?;
            Ok(days.i32()?.into_iter().map(|v| v.map(RawTime::Days)).collect())
        }
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map(RawTime::Text))
            .collect()),
        _ => Err(unsupported(series)),
    }
}

fn from_epoch(raw: i64, unit: TimeUnit) -> Result<DateTime<Utc>, SatmonError> {
    let parsed = match unit {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(raw)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(raw),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(raw),
    };
    parsed.ok_or_else(|| SatmonError::InvalidTimestamp(format!("{} ({:?})", raw, unit)))
}

/// Parse a textual timestamp.
///
/// Accepts RFC 3339, the same with a space separator, and naive
/// `YYYY-MM-DD HH:MM[:SS[.f]]` / `YYYY-MM-DD` forms (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, SatmonError> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(SatmonError::InvalidTimestamp(raw.to_string()))
}

// ============================================================================
// Tests
// ============================================================================
