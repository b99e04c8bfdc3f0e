//! Load → filter → score → alert, wired together.
//!
//! `run` performs the whole computation with no side effects beyond
//! logging. Plotting and printing are left to the caller so the pipeline can
//! be driven headlessly from tests.

use crate::alert::thresholds::generate_alerts;
use crate::analysis::filter::{filter_by_marker, sat_tags, select_tag};
use crate::analysis::scoring::detect_rapid_changes;
use crate::config::Config;
use crate::ingest::columnar::{LoadSummary, load_readings};
use crate::logging::{self, Stage};
use crate::model::{HourlyAlert, Reading, SatmonError, ScoredReading};
use crate::plot::AnomalyPlot;

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub tag: String,
    pub summary: LoadSummary,
    pub scored: Vec<ScoredReading>,
    pub alerts: Vec<HourlyAlert>,
}

impl RunOutcome {
    pub fn anomaly_count(&self) -> usize {
        self.scored.iter().filter(|s| s.label.is_anomaly()).count()
    }

    pub fn plot(&self) -> AnomalyPlot {
        AnomalyPlot::from_scored(&self.scored, format!("{} - Anomaly Detection", self.tag))
    }
}

/// Run the full pipeline against `config.data_path`.
pub fn run(config: &Config) -> Result<RunOutcome, SatmonError> {
    config.validate()?;
    let loaded = load_readings(&config.data_path)?;
    let (tag, scored, alerts) = analyze(loaded.readings, config)?;
    Ok(RunOutcome {
        tag,
        summary: loaded.summary,
        scored,
        alerts,
    })
}

/// Filter, score and aggregate already-loaded readings.
///
/// Returns the tag that was analysed alongside its scored series and alerts.
pub fn analyze(
    readings: Vec<Reading>,
    config: &Config,
) -> Result<(String, Vec<ScoredReading>, Vec<HourlyAlert>), SatmonError> {
    let marker = config.tag_marker.as_str();
    let candidates = sat_tags(&readings, marker);
    logging::debug(
        Stage::Filter,
        None,
        &format!("{} SAT tags found with marker {:?}", candidates.len(), marker),
    );

    let tag = match config.requested_tag() {
        Some(tag) => {
            if !candidates.iter().any(|c| c == tag) {
                logging::warn(Stage::Filter, Some(tag), "tag not present among SAT tags");
            }
            tag.to_string()
        }
        None => {
            let first = candidates
                .into_iter()
                .next()
                .ok_or_else(|| SatmonError::NoSatTags(marker.to_string()))?;
            logging::info(Stage::Filter, Some(first.as_str()), "Using first SAT tag found");
            first
        }
    };

    let series = select_tag(filter_by_marker(readings, marker), &tag);
    logging::info(
        Stage::Filter,
        Some(tag.as_str()),
        &format!("{} readings selected", series.len()),
    );

    let scored = detect_rapid_changes(&tag, series, config.forest_params())?;

    let alerts = generate_alerts(&scored, config.alert_threshold);
    logging::info(
        Stage::Alert,
        Some(tag.as_str()),
        &format!(
            "{} hour(s) with more than {} anomalies",
            alerts.len(),
            config.alert_threshold
        ),
    );

    Ok((tag, scored, alerts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn readings(tag: &str, values: &[f64]) -> Vec<Reading> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &max)| Reading {
                tag_name: tag.to_string(),
                time: start + Duration::minutes(5 * i as i64),
                max,
            })
            .collect()
    }

    #[test]
    fn test_missing_tag_is_empty_series() {
        let config = Config::default();
        let result = analyze(readings("OTHER_UNIT.SAT", &[70.0, 71.0]), &config);
        match result {
            Err(SatmonError::EmptySeries(tag)) => assert_eq!(tag, "QTS_LAB_CRAC_MG1102_07.SAT"),
            other => panic!("expected EmptySeries, got {:?}", other),
        }
    }

    #[test]
    fn test_first_sat_tag_fallback() {
        let config = Config {
            first_sat_tag: true,
            ..Config::default()
        };
        let mut all = readings("AHU_9.RAT", &[60.0, 61.0]);
        all.extend(readings("AHU_9.SAT", &[55.0, 55.5, 56.0]));
        all.extend(readings("AHU_10.SAT", &[54.0]));

        let (tag, scored, _) = analyze(all, &config).unwrap();
        assert_eq!(tag, "AHU_9.SAT");
        assert_eq!(scored.len(), 3);
    }

    #[test]
    fn test_no_sat_tags_with_fallback() {
        let config = Config {
            first_sat_tag: true,
            ..Config::default()
        };
        assert!(matches!(
            analyze(readings("AHU_9.RAT", &[60.0]), &config),
            Err(SatmonError::NoSatTags(_))
        ));
    }

    #[test]
    fn test_plot_title_names_tag() {
        let config = Config {
            tag_name: "AHU_9.SAT".to_string(),
            ..Config::default()
        };
        let (tag, scored, alerts) = analyze(readings("AHU_9.SAT", &[55.0, 56.0]), &config).unwrap();
        let outcome = RunOutcome {
            tag,
            summary: LoadSummary::default(),
            scored,
            alerts,
        };
        assert_eq!(outcome.plot().title, "AHU_9.SAT - Anomaly Detection");
    }
}
