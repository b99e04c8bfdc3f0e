/// Input readers for the SAT anomaly monitor.
///
/// Submodules:
/// - `columnar` — Parquet / CSV historian exports into `Reading`s.

pub mod columnar;
