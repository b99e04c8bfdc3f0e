//! Command-line flags.
//!
//! Every flag also reads a `SATMON_*` environment variable (a `.env` file is
//! loaded first by `main`). Flags override the TOML file, which overrides
//! the built-in defaults.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::model::SatmonError;

#[derive(Debug, Parser)]
#[command(
    name = "satmon",
    version,
    about = "Flag rapid supply-air-temperature changes and report hourly alert counts"
)]
pub struct Cli {
    /// TOML config file
    #[arg(short, long, env = "SATMON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Parquet or CSV export with TagName, time and max columns
    #[arg(long, env = "SATMON_DATA_PATH")]
    pub data_path: Option<PathBuf>,

    /// Exact tag to analyse
    #[arg(long, env = "SATMON_TAG")]
    pub tag: Option<String>,

    /// Analyse the first SAT tag in the file instead of --tag
    #[arg(long, env = "SATMON_FIRST_SAT_TAG")]
    pub first_sat_tag: bool,

    /// Substring that marks SAT tags
    #[arg(long, env = "SATMON_TAG_MARKER")]
    pub tag_marker: Option<String>,

    /// Expected outlier fraction, in (0, 0.5]
    #[arg(long, env = "SATMON_CONTAMINATION")]
    pub contamination: Option<f64>,

    #[arg(long, env = "SATMON_N_ESTIMATORS")]
    pub n_estimators: Option<usize>,

    #[arg(long, env = "SATMON_SEED")]
    pub seed: Option<u64>,

    /// Alert when an hour has more than this many anomalies
    #[arg(long, env = "SATMON_ALERT_THRESHOLD")]
    pub threshold: Option<usize>,

    /// Skip the terminal chart
    #[arg(long, env = "SATMON_NO_PLOT")]
    pub no_plot: bool,

    /// Also write the alert table to this JSON file
    #[arg(long, env = "SATMON_ALERTS_JSON")]
    pub alerts_json: Option<PathBuf>,

    #[arg(long, env = "SATMON_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, env = "SATMON_LOG_FILE")]
    pub log_file: Option<String>,

    /// Prefix console log lines with a UTC timestamp
    #[arg(long, env = "SATMON_LOG_TIMESTAMPS")]
    pub log_timestamps: bool,
}

impl Cli {
    /// Defaults, then the config file if given, then these flags.
    pub fn resolve_config(&self) -> Result<Config, SatmonError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.data_path {
            config.data_path = path.clone();
        }
        if let Some(tag) = &self.tag {
            config.tag_name = tag.clone();
            config.first_sat_tag = false;
        }
        if self.first_sat_tag {
            config.first_sat_tag = true;
        }
        if let Some(marker) = &self.tag_marker {
            config.tag_marker = marker.clone();
        }
        if let Some(contamination) = self.contamination {
            config.contamination = contamination;
        }
        if let Some(n) = self.n_estimators {
            config.n_estimators = n;
        }
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
        if let Some(threshold) = self.threshold {
            config.alert_threshold = threshold;
        }
        if self.no_plot {
            config.plot = false;
        }
        if let Some(path) = &self.alerts_json {
            config.alerts_json = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(file) = &self.log_file {
            config.log_file = Some(file.clone());
        }
        if self.log_timestamps {
            config.log_timestamps = true;
        }
    }
}
