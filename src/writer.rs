//! CSV output for score records.
//!
//! Every layout writes the six base columns followed by its own extra
//! columns. Missing values are written as empty fields, scores exactly as
//! printed. Files are written to a temporary file beside the destination
//! and renamed into place once complete.

use crate::config::ApparatusStyle;
use crate::constants::{ALL_AROUND_COLUMNS, BASE_COLUMNS, EVENT_COLUMNS, TEAM_COLUMNS};
use crate::error::{GymScoreError, Result};
use crate::models::{ResultFormat, Score, ScoreCheck, ScoreRecord};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Serialize)]
struct EventRow<'a> {
    gymnast_name: &'a str,
    country: &'a str,
    apparatus: &'static str,
    d_score: Option<Score>,
    e_score: Option<Score>,
    total_score: Option<Score>,
    rank: Option<u32>,
    bib: Option<u32>,
    penalty: Option<Score>,
    attempt: Option<u32>,
    score_check: ScoreCheck,
}

#[derive(Serialize)]
struct TeamRow<'a> {
    gymnast_name: &'a str,
    country: &'a str,
    apparatus: &'static str,
    d_score: Option<Score>,
    e_score: Option<Score>,
    total_score: Option<Score>,
    team: Option<&'a str>,
    team_rank: Option<u32>,
    bib: Option<u32>,
    penalty: Option<Score>,
    score_check: ScoreCheck,
}

#[derive(Serialize)]
struct AllAroundRow<'a> {
    gymnast_name: &'a str,
    country: &'a str,
    apparatus: &'static str,
    d_score: Option<Score>,
    e_score: Option<Score>,
    total_score: Option<Score>,
    all_around_rank: Option<u32>,
    bib: Option<u32>,
    apparatus_rank: Option<u32>,
    penalty: Option<Score>,
    all_around_total: Option<Score>,
    score_check: ScoreCheck,
}

/// Header row for a layout
pub fn columns(format: ResultFormat) -> Vec<&'static str> {
    let extra = match format {
        ResultFormat::EventFinals => EVENT_COLUMNS,
        ResultFormat::TeamAllAround => TEAM_COLUMNS,
        ResultFormat::IndividualAllAround => ALL_AROUND_COLUMNS,
    };
    BASE_COLUMNS.iter().chain(extra).copied().collect()
}

/// Write the header and one row per record to `writer`
pub fn write_csv<W: Write>(
    writer: W,
    format: ResultFormat,
    records: &[ScoreRecord],
    style: ApparatusStyle,
) -> Result<usize> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(columns(format))?;

    for r in records {
        let apparatus = style.label(r.apparatus);
        match format {
            ResultFormat::EventFinals => csv.serialize(EventRow {
                gymnast_name: &r.gymnast_name,
                country: &r.country,
                apparatus,
                d_score: r.d_score,
                e_score: r.e_score,
                total_score: r.total_score,
                rank: r.rank,
                bib: r.bib,
                penalty: r.penalty,
                attempt: r.attempt,
                score_check: r.score_check,
            })?,
            ResultFormat::TeamAllAround => csv.serialize(TeamRow {
                gymnast_name: &r.gymnast_name,
                country: &r.country,
                apparatus,
                d_score: r.d_score,
                e_score: r.e_score,
                total_score: r.total_score,
                team: r.team.as_deref(),
                team_rank: r.team_rank,
                bib: r.bib,
                penalty: r.penalty,
                score_check: r.score_check,
            })?,
            ResultFormat::IndividualAllAround => csv.serialize(AllAroundRow {
                gymnast_name: &r.gymnast_name,
                country: &r.country,
                apparatus,
                d_score: r.d_score,
                e_score: r.e_score,
                total_score: r.total_score,
                all_around_rank: r.rank,
                bib: r.bib,
                apparatus_rank: r.apparatus_rank,
                penalty: r.penalty,
                all_around_total: r.all_around_total,
                score_check: r.score_check,
            })?,
        }
    }

    csv.flush()
        .map_err(|e| GymScoreError::io("Failed to flush CSV output", e))?;
    Ok(records.len())
}

/// Write records to `path`, replacing it only once the whole file is written
pub fn write_records(
    path: &Path,
    format: ResultFormat,
    records: &[ScoreRecord],
    style: ApparatusStyle,
) -> Result<usize> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory).map_err(|e| {
        GymScoreError::io(format!("Cannot create directory {}", directory.display()), e)
    })?;

    let temp = NamedTempFile::new_in(directory).map_err(|e| {
        GymScoreError::io(format!("Cannot create temporary file in {}", directory.display()), e)
    })?;
    let written = write_csv(temp.as_file(), format, records, style)?;

    temp.persist(path)
        .map_err(|e| GymScoreError::io(format!("Cannot write {}", path.display()), e.error))?;
    debug!("Wrote {} rows to {}", written, path.display());
    Ok(written)
}
