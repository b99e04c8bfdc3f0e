//! Alerting for the SAT anomaly monitor.
//!
//! - `thresholds` — hourly anomaly counts and the alert threshold.
//! - `report` — console table and JSON export of the alerts.

pub mod report;
pub mod thresholds;
