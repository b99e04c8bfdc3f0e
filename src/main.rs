use anyhow::Context;
use clap::Parser;

use satmon_service::alert::report::{AlertExport, format_report, write_alerts_json};
use satmon_service::cli::Cli;
use satmon_service::logging::{self, LogLevel, Stage};
use satmon_service::{pipeline, plot};

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = cli.resolve_config().context("loading configuration")?;

    logging::init_logger(
        LogLevel::parse(&config.log_level),
        config.log_file.as_deref(),
        config.log_timestamps,
    );
    logging::info(
        Stage::System,
        None,
        &format!("Analysing {}", config.data_path.display()),
    );

    let outcome = pipeline::run(&config)
        .inspect_err(|e| logging::log_failure(config.requested_tag(), "Anomaly run", e))?;

    if config.plot {
        if let Err(e) = plot::show(&outcome.plot()) {
            logging::warn(
                Stage::Plot,
                Some(outcome.tag.as_str()),
                &format!("chart not shown: {}", e),
            );
        }
    }

    println!("{}", format_report(&outcome.alerts));

    if let Some(path) = &config.alerts_json {
        write_alerts_json(
            path,
            &AlertExport {
                tag: &outcome.tag,
                threshold: config.alert_threshold,
                anomalies: outcome.anomaly_count(),
                alerts: &outcome.alerts,
            },
        )?;
        logging::info(
            Stage::Alert,
            Some(outcome.tag.as_str()),
            &format!("Alerts written to {}", path.display()),
        );
    }

    Ok(())
}
