//! Rapid-change detection for one SAT tag.
//!
//! The model never sees raw temperatures, only the step from one reading to
//! the next. A supply-air temperature that sits at 55°F or 65°F is normal;
//! one that jumps 20°F between samples is not.

use crate::analysis::isolation_forest::{IsolationForest, IsolationForestParams};
use crate::logging::{self, Stage};
use crate::model::{Reading, SatmonError, ScoredReading};

/// First difference of `values`, with the first element defined as zero.
pub fn temp_diff(values: &[f64]) -> Vec<f64> {
    let mut diffs = Vec::with_capacity(values.len());
    let mut previous: Option<f64> = None;
    for &v in values {
        diffs.push(previous.map_or(0.0, |p| v - p));
        previous = Some(v);
    }
    diffs
}

/// Sort one tag's readings by time, difference them, and label each one.
///
/// `tag` only feeds error messages and log context.
///
/// # Errors
/// - `EmptySeries` if `readings` is empty (for example the requested tag is
///   not in the file)
/// - `InvalidParameter` for out-of-range model parameters
pub fn detect_rapid_changes(
    tag: &str,
    mut readings: Vec<Reading>,
    params: IsolationForestParams,
) -> Result<Vec<ScoredReading>, SatmonError> {
    if readings.is_empty() {
        return Err(SatmonError::EmptySeries(tag.to_string()));
    }

    readings.sort_by_key(|r| r.time);

    let values: Vec<f64> = readings.iter().map(|r| r.max).collect();
    let diffs = temp_diff(&values);

    let mut forest = IsolationForest::new(params);
    let (scores, labels) = forest.fit_predict(&diffs)?;

    let scored: Vec<ScoredReading> = readings
        .into_iter()
        .zip(diffs)
        .zip(scores.into_iter().zip(labels))
        .map(|((r, temp_diff), (score, label))| ScoredReading {
            time: r.time,
            max: r.max,
            temp_diff,
            score,
            label,
        })
        .collect();

    let anomalies = scored.iter().filter(|s| s.label.is_anomaly()).count();
    logging::info(
        Stage::Scorer,
        Some(tag),
        &format!(
            "{} of {} readings flagged (contamination {}, offset {:.4})",
            anomalies,
            scored.len(),
            params.contamination,
            forest.offset()
        ),
    );

    Ok(scored)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
