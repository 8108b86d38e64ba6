//! Extraction pipeline.
//!
//! Runs one results PDF through every stage: positioned text extraction,
//! line reconstruction, layout parsing, score checks, and CSV output.
//! Nothing is written unless every stage before the write succeeds.

use crate::config::ParserConfig;
use crate::error::Result;
use crate::extract::{CellSource, PdfCellSource};
use crate::layout::{PageLines, group_lines};
use crate::models::{ProcessingStats, ResultFormat};
use crate::parsers::parser_for;
use crate::validate::apply_checks;
use crate::writer::write_records;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Converts one results PDF into one CSV
#[derive(Debug, Clone)]
pub struct ScoreProcessor {
    format: ResultFormat,
    input: PathBuf,
    output: PathBuf,
    config: ParserConfig,
}

impl ScoreProcessor {
    /// Create a processor with the default configuration
    pub fn new(format: ResultFormat, input: PathBuf, output: PathBuf) -> Self {
        Self {
            format,
            input,
            output,
            config: ParserConfig::default(),
        }
    }

    /// Configure the processor
    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Read the input PDF and write the CSV
    pub fn process(&self) -> Result<ProcessingStats> {
        self.config.validate()?;
        let start_time = Instant::now();

        if self.config.show_progress {
            println!(
                "{}",
                format!("Extracting {} results", self.format.description())
                    .bright_green()
                    .bold()
            );
            println!("  {} {}", "Input:".bright_cyan(), self.input.display());
            println!("  {} {}", "Output:".bright_cyan(), self.output.display());
        }

        let source = PdfCellSource::open(&self.input)?;
        self.run(&source, start_time)
    }

    /// Run the pipeline over cells from any source; `input` still names the
    /// document in errors
    pub fn process_source<S: CellSource>(&self, source: &S) -> Result<ProcessingStats> {
        self.config.validate()?;
        self.run(source, Instant::now())
    }

    fn run<S: CellSource>(&self, source: &S, start_time: Instant) -> Result<ProcessingStats> {
        let pages = self.read_pages(source)?;
        let lines_read = pages.iter().map(|page| page.lines.len()).sum();

        let parser = parser_for(self.format, &self.config);
        let outcome = parser.parse(&pages, &self.input)?;
        info!(
            "Parsed {} records ({} skipped, {} aggregate rows excluded)",
            outcome.records.len(),
            outcome.skipped,
            outcome.aggregates_excluded
        );
        if outcome.rotation_order > 0 {
            warn!(
                "{} gymnasts matched to apparatus by rotation order; check their apparatus labels",
                outcome.rotation_order
            );
        }

        let mut records = outcome.records;
        let checks = apply_checks(&mut records, self.config.score_tolerance_thousandths());
        if records.is_empty() {
            warn!("No score rows found in {}", self.input.display());
        }

        let records_written =
            write_records(&self.output, self.format, &records, self.config.apparatus_style)?;

        let stats = ProcessingStats {
            pages_read: pages.len(),
            lines_read,
            records_written,
            records_skipped: outcome.skipped,
            records_incomplete: checks.incomplete,
            records_mismatched: checks.mismatched,
            records_penalised: checks.penalised,
            aggregates_excluded: outcome.aggregates_excluded,
            output_path: self.output.clone(),
            processing_time_ms: start_time.elapsed().as_millis(),
        };

        if self.config.show_progress {
            print_summary(&stats);
        }
        Ok(stats)
    }

    /// Extract and group the lines of every page
    fn read_pages<S: CellSource>(&self, source: &S) -> Result<Vec<PageLines>> {
        let page_count = source.page_count();
        let pb = if self.config.show_progress {
            let pb = ProgressBar::new(page_count as u64);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb.set_message("Reading pages");
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut pages = Vec::with_capacity(page_count);
        for index in 0..page_count {
            let cells = source.page_cells(index)?;
            let lines = group_lines(&cells, self.config.line_tolerance);
            debug!("Page {}: {} lines", lines.number, lines.lines.len());
            pages.push(lines);
            pb.inc(1);
        }

        pb.finish_with_message("Pages read");
        Ok(pages)
    }
}

/// Convenience wrapper: run one PDF through the pipeline
pub fn process_pdf(
    format: ResultFormat,
    input: &Path,
    output: &Path,
    config: ParserConfig,
) -> Result<ProcessingStats> {
    ScoreProcessor::new(format, input.to_path_buf(), output.to_path_buf())
        .with_config(config)
        .process()
}

fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Extraction Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Pages read:".bright_cyan(),
        stats.pages_read.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Rows written:".bright_cyan(),
        stats.records_written.to_string().bright_white().bold()
    );
    if stats.records_penalised > 0 {
        println!(
            "  {} {}",
            "Rows with penalties:".bright_cyan(),
            stats.records_penalised.to_string().bright_white()
        );
    }
    if stats.records_mismatched + stats.records_incomplete > 0 {
        println!(
            "  {} {} mismatched, {} incomplete",
            "Rows flagged:".bright_yellow(),
            stats.records_mismatched.to_string().bright_yellow().bold(),
            stats.records_incomplete.to_string().bright_yellow().bold()
        );
    }
    if stats.records_skipped > 0 {
        println!(
            "  {} {}",
            "Rows skipped:".bright_red(),
            stats.records_skipped.to_string().bright_red().bold()
        );
    }
    println!(
        "  {} {}",
        "Output:".bright_cyan(),
        stats.output_path.display()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoercionPolicy;
    use crate::error::GymScoreError;
    use crate::extract::{MemoryCellSource, PageCells, TextCell};
    use tempfile::TempDir;

    fn cell(x: f64, y: f64, text: &str) -> TextCell {
        TextCell::new(1, x, y, 8.0, text)
    }

    fn beam_final() -> MemoryCellSource {
        let mut cells = vec![cell(40.0, 780.0, "Women's Balance Beam Final")];
        let labels = [
            ("Rank", 40.0),
            ("Name", 110.0),
            ("NOC", 260.0),
            ("D", 320.0),
            ("E", 370.0),
            ("Total", 470.0),
        ];
        for (label, x) in labels {
            cells.push(cell(x, 700.0, label));
        }
        let rows = [
            ["1", "ZHOU Yaqin", "CHN", "6.400", "8.300", "14.700"],
            ["2", "D'AMATO Alice", "ITA", "6.000", "8.200", "14.000"],
            ["3", "KISHI Rina", "JPN", "5.500", "8.3S6", "13.866"],
        ];
        for (index, row) in rows.iter().enumerate() {
            let y = 680.0 - 20.0 * index as f64;
            for (value, x) in row.iter().zip([40.0, 110.0, 260.0, 320.0, 370.0, 470.0]) {
                cells.push(cell(x, y, value));
            }
        }
        MemoryCellSource::new(vec![PageCells { number: 1, cells }])
    }

    #[test]
    fn test_pipeline_writes_checked_rows() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("beam.csv");
        let processor =
            ScoreProcessor::new(ResultFormat::EventFinals, "beam.pdf".into(), output.clone());

        let stats = processor.process_source(&beam_final()).unwrap();
        assert_eq!(stats.pages_read, 1);
        assert_eq!(stats.records_written, 3);
        assert_eq!(stats.records_mismatched, 1);
        assert_eq!(stats.records_incomplete, 1);

        let content = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "ZHOU Yaqin,CHN,BB,6.400,8.300,14.700,1,,,,ok");
        assert_eq!(lines[2], "D'AMATO Alice,ITA,BB,6.000,8.200,14.000,2,,,,mismatch");
        assert_eq!(lines[3], "KISHI Rina,JPN,BB,5.500,,13.866,3,,,,incomplete");
    }

    #[test]
    fn test_abort_leaves_no_output() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("beam.csv");
        let config = ParserConfig::default().with_coercion_policy(CoercionPolicy::Abort);
        let processor =
            ScoreProcessor::new(ResultFormat::EventFinals, "beam.pdf".into(), output.clone())
                .with_config(config);

        let result = processor.process_source(&beam_final());
        assert!(matches!(result, Err(GymScoreError::FieldCoercion { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config = ParserConfig::default().with_line_tolerance(-1.0);
        let processor = ScoreProcessor::new(
            ResultFormat::EventFinals,
            "beam.pdf".into(),
            temp_dir.path().join("beam.csv"),
        )
        .with_config(config);

        assert!(matches!(
            processor.process_source(&beam_final()),
            Err(GymScoreError::Configuration { .. })
        ));
    }
}
