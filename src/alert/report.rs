//! Alert reporting: the console table and the optional JSON export.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::model::{HourlyAlert, SatmonError};

pub const NO_ALERTS_MESSAGE: &str =
    "No alerts generated. Anomalies per hour did not exceed the threshold.";

pub const ALERTS_HEADER: &str = "Alerts generated! Hours exceeding the threshold:";

/// Render the alert table, or the no-alerts line.
pub fn format_report(alerts: &[HourlyAlert]) -> String {
    if alerts.is_empty() {
        return NO_ALERTS_MESSAGE.to_string();
    }

    let mut out = String::new();
    out.push_str(ALERTS_HEADER);
    out.push('\n');
    out.push_str(&format!("{:<22} {:>5}\n", "hour", "count"));
    for alert in alerts {
        out.push_str(&format!(
            "{:<22} {:>5}\n",
            alert.hour.format("%Y-%m-%d %H:%M:%S"),
            alert.count
        ));
    }
    out
}

/// JSON document written by `--alerts-json`.
#[derive(Debug, Serialize)]
pub struct AlertExport<'a> {
    pub tag: &'a str,
    pub threshold: usize,
    pub anomalies: usize,
    pub alerts: &'a [HourlyAlert],
}

pub fn write_alerts_json(path: &Path, export: &AlertExport<'_>) -> Result<(), SatmonError> {
    let export_error = |e: &dyn std::fmt::Display| {
        SatmonError::Export(format!("{}: {}", path.display(), e))
    };

    let file = File::create(path).map_err(|e| export_error(&e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, export).map_err(|e| export_error(&e))?;
    writer.flush().map_err(|e| export_error(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn alert(h: u32, count: usize) -> HourlyAlert {
        HourlyAlert {
            hour: Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap(),
            count,
        }
    }

    #[test]
    fn test_empty_report() {
        assert_eq!(format_report(&[]), NO_ALERTS_MESSAGE);
    }

    #[test]
    fn test_report_lists_each_hour() {
        let report = format_report(&[alert(8, 9), alert(16, 7)]);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], ALERTS_HEADER);
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("2024-05-01 08:00:00"));
        assert!(lines[2].ends_with(" 9"));
        assert!(lines[3].starts_with("2024-05-01 16:00:00"));
    }

    #[test]
    fn test_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        let alerts = [alert(8, 9)];

        write_alerts_json(
            &path,
            &AlertExport {
                tag: "AHU_1.SAT",
                threshold: 5,
                anomalies: 12,
                alerts: &alerts,
            },
        )
        .expect("export should succeed");

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tag"], "AHU_1.SAT");
        assert_eq!(value["threshold"], 5);
        assert_eq!(value["alerts"][0]["count"], 9);
        assert_eq!(value["alerts"][0]["hour"], "2024-05-01T08:00:00Z");
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let result = write_alerts_json(
            Path::new("/nonexistent/dir/alerts.json"),
            &AlertExport {
                tag: "AHU_1.SAT",
                threshold: 5,
                anomalies: 0,
                alerts: &[],
            },
        );
        assert!(matches!(result, Err(SatmonError::Export(_))));
    }
}
