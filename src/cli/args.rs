//! Command-line argument definitions for gymscore
//!
//! One subcommand per results layout. Each takes a single PDF and writes a
//! single CSV; the options shared by all three live in [`CommonArgs`].

use crate::config::{ApparatusStyle, CoercionPolicy, ParserConfig};
use crate::constants::{DEFAULT_LINE_TOLERANCE, DEFAULT_SCORE_TOLERANCE};
use crate::models::ResultFormat;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Extract gymnastics score tables from results PDFs into CSV
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gymscore",
    version,
    about = "Extract Olympic gymnastics score tables from results PDFs into CSV",
    long_about = "Reads an official results book PDF, reconstructs its score table from \
                  positioned text, and writes one CSV row per gymnast and apparatus with \
                  D score, E score, penalty and total exactly as printed."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available results layouts
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Apparatus finals: one table row per finalist (and per vault attempt)
    Events(CommonArgs),
    /// Team final: gymnasts grouped under team header lines
    TeamAllAround(CommonArgs),
    /// Individual all-around final: one four-apparatus block per gymnast
    IndividualAllAround(CommonArgs),
}

/// Arguments shared by every subcommand
#[derive(Debug, Clone, Parser)]
pub struct CommonArgs {
    /// Results PDF to read
    #[arg(value_name = "PDF")]
    pub pdf: PathBuf,

    /// Output CSV path
    ///
    /// Defaults to the PDF's file name with a .csv extension, next to the PDF.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "CSV",
        env = "GYMSCORE_OUTPUT",
        help = "Output CSV path"
    )]
    pub output: Option<PathBuf>,

    /// What to do when a score cell cannot be read as a number
    #[arg(
        long = "on-bad-number",
        value_enum,
        default_value = "blank",
        help = "Handling of unreadable numbers: leave blank, skip the row, or abort"
    )]
    pub on_bad_number: CoercionPolicy,

    /// Apparatus labels in the output
    #[arg(
        long = "apparatus-style",
        value_enum,
        default_value = "code",
        help = "Write apparatus as two-letter codes or full names"
    )]
    pub apparatus_style: ApparatusStyle,

    /// Vertical distance in points within which text shares a line
    #[arg(
        long = "line-tolerance",
        value_name = "PT",
        default_value_t = DEFAULT_LINE_TOLERANCE,
        help = "Line grouping tolerance in points"
    )]
    pub line_tolerance: f64,

    /// Allowed difference between D + E (less penalty) and the printed total
    #[arg(
        long = "score-tolerance",
        value_name = "PTS",
        default_value_t = DEFAULT_SCORE_TOLERANCE,
        help = "Score check tolerance in points"
    )]
    pub score_tolerance: f64,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors; no progress bar or summary
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Args {
    /// Results layout selected by the subcommand
    pub fn format(&self) -> ResultFormat {
        match self.command {
            Commands::Events(_) => ResultFormat::EventFinals,
            Commands::TeamAllAround(_) => ResultFormat::TeamAllAround,
            Commands::IndividualAllAround(_) => ResultFormat::IndividualAllAround,
        }
    }

    pub fn common(&self) -> &CommonArgs {
        match &self.command {
            Commands::Events(common)
            | Commands::TeamAllAround(common)
            | Commands::IndividualAllAround(common) => common,
        }
    }
}

impl CommonArgs {
    /// Get the output path, defaulting to `<stem>.csv` beside the PDF
    pub fn get_output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => default_output_path(&self.pdf),
        }
    }

    /// Get the logging level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }

        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Show the progress bar and summary
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    /// Build the run configuration
    pub fn to_config(&self) -> ParserConfig {
        let config = ParserConfig::default()
            .with_coercion_policy(self.on_bad_number)
            .with_apparatus_style(self.apparatus_style)
            .with_line_tolerance(self.line_tolerance)
            .with_score_tolerance(self.score_tolerance);

        if self.show_progress() {
            config.with_progress()
        } else {
            config
        }
    }
}

fn default_output_path(pdf: &Path) -> PathBuf {
    pdf.with_extension("csv")
}
