//! Supply-air-temperature anomaly monitor.
//!
//! Reads a sensor historian export, isolates one SAT tag, flags abrupt
//! changes with an isolation forest, and reports hours with too many
//! flagged readings.

pub mod alert;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod plot;
