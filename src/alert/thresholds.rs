//! Hourly anomaly alert thresholds.
//!
//! A single flagged reading is noise. A burst of them inside one clock hour
//! means the unit is hunting or a sensor is failing, and that is what gets
//! reported.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use std::collections::BTreeMap;

use crate::model::{HourlyAlert, ScoredReading};

/// Truncate a timestamp to the start of its hour.
pub fn hour_floor(time: DateTime<Utc>) -> DateTime<Utc> {
    // Only fails for timestamps near the representable limits
    time.duration_trunc(TimeDelta::hours(1)).unwrap_or(time)
}

/// Count anomalies per hour and keep the hours above `threshold`.
///
/// The comparison is strictly greater than:
///   count >  threshold  →  alert
///   count == threshold  →  no alert
///
/// Results are ordered by hour. An empty vector means nothing to report.
pub fn generate_alerts(scored: &[ScoredReading], threshold: usize) -> Vec<HourlyAlert> {
    let mut counts: BTreeMap<DateTime<Utc>, usize> = BTreeMap::new();
    for reading in scored.iter().filter(|r| r.label.is_anomaly()) {
        *counts.entry(hour_floor(reading.time)).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter(|&(_, count)| count > threshold)
        .map(|(hour, count)| HourlyAlert { hour, count })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnomalyLabel;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    fn scored_at(time: DateTime<Utc>, label: AnomalyLabel) -> ScoredReading {
        ScoredReading {
            time,
            max: 70.0,
            temp_diff: 0.0,
            score: -0.5,
            label,
        }
    }

    fn anomalies_in_hour(h: u32, n: u32) -> Vec<ScoredReading> {
        (0..n)
            .map(|i| scored_at(at(h, i * 5), AnomalyLabel::Anomaly))
            .collect()
    }

    // --- Hour flooring --------------------------------------------------------

    #[test]
    fn test_hour_floor() {
        assert_eq!(hour_floor(at(12, 59)), at(12, 0));
        assert_eq!(hour_floor(at(12, 0)), at(12, 0));
        let with_seconds = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 59).unwrap();
        assert_eq!(hour_floor(with_seconds), at(23, 0));
    }

    // --- Threshold ------------------------------------------------------------

    #[test]
    fn test_six_anomalies_over_threshold_five_alerts() {
        let alerts = generate_alerts(&anomalies_in_hour(14, 6), 5);
        assert_eq!(alerts, vec![HourlyAlert { hour: at(14, 0), count: 6 }]);
    }

    #[test]
    fn test_exactly_threshold_does_not_alert() {
        // Strictly greater than, not >=
        assert!(generate_alerts(&anomalies_in_hour(14, 5), 5).is_empty());
        assert!(generate_alerts(&anomalies_in_hour(14, 1), 5).is_empty());
    }

    #[test]
    fn test_normal_readings_are_not_counted() {
        let mut scored = anomalies_in_hour(9, 5);
        scored.extend((0..10).map(|i| scored_at(at(9, 30 + i), AnomalyLabel::Normal)));
        assert!(generate_alerts(&scored, 5).is_empty());
    }

    #[test]
    fn test_alerts_are_ordered_by_hour() {
        let mut scored = anomalies_in_hour(16, 7);
        scored.extend(anomalies_in_hour(3, 2));
        scored.extend(anomalies_in_hour(8, 9));

        let alerts = generate_alerts(&scored, 5);
        assert_eq!(
            alerts,
            vec![
                HourlyAlert { hour: at(8, 0), count: 9 },
                HourlyAlert { hour: at(16, 0), count: 7 },
            ]
        );
    }

    #[test]
    fn test_empty_input_gives_no_alerts() {
        assert!(generate_alerts(&[], 0).is_empty());
    }

    #[test]
    fn test_aggregation_is_repeatable() {
        let mut scored = anomalies_in_hour(10, 6);
        scored.extend(anomalies_in_hour(11, 8));
        assert_eq!(generate_alerts(&scored, 5), generate_alerts(&scored, 5));
    }
}
