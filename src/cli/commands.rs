//! Command implementations for the gymscore CLI
//!
//! Sets up logging, builds the run configuration from the arguments and
//! hands the PDF to a [`ScoreProcessor`].

use crate::cli::args::{Args, CommonArgs};
use crate::models::ProcessingStats;
use crate::processor::ScoreProcessor;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Run the selected subcommand
pub fn run(args: Args) -> Result<ProcessingStats> {
    let common = args.common();
    setup_logging(common)?;
    debug!("Command line arguments: {:?}", args);

    let format = args.format();
    let output = common.get_output_path();
    info!("Extracting {} results from {}", format.description(), common.pdf.display());

    let processor =
        ScoreProcessor::new(format, common.pdf.clone(), output).with_config(common.to_config());
    let stats = processor.process().with_context(|| {
        format!(
            "Failed to parse {} PDF {}",
            format.description(),
            common.pdf.display()
        )
    })?;

    info!(
        "Wrote {} rows to {} in {}ms",
        stats.records_written,
        stats.output_path.display(),
        stats.processing_time_ms
    );
    Ok(stats)
}

/// Set up structured logging based on CLI arguments
pub fn setup_logging(args: &CommonArgs) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gymscore={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    }

    Ok(())
}
