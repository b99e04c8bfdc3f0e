/// Analysis stages for the SAT anomaly monitor.
///
/// Submodules:
/// - `filter` — narrows the full export down to one SAT tag.
/// - `isolation_forest` — the outlier model.
/// - `scoring` — differencing plus model labelling for one tag.

pub mod filter;
pub mod isolation_forest;
pub mod scoring;
