//! Individual apparatus final results.
//!
//! Each page carries one apparatus final: a title naming the apparatus, a
//! header line (Rank, Bib, Name, NOC, D, E, Pen, Total) and one line per
//! finalist. Cells are mapped to columns by the header positions. Vault
//! finals print a second line of scores per gymnast for the second vault.

use super::{ParseOutcome, ScoreParser, line_context};
use crate::coerce::{RowCoercer, parse_rank};
use crate::config::CoercionPolicy;
use crate::constants::{HEADER_SEARCH_LINES, WRAPPED_LINE_GAP_RATIO, header_tokens};
use crate::error::{GymScoreError, Result};
use crate::layout::{BandMode, ColumnBands, PageLines, TextLine, split_words};
use crate::models::{Apparatus, ResultFormat, Score, ScoreRecord};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:wo)?men['\u{2019}]?s\s+(vault|uneven\s+bars|balance\s+beam|floor(?:\s+exercise)?)\b",
    )
    .expect("valid regex")
});

/// Columns of an event final table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventColumn {
    Rank,
    Bib,
    Name,
    Country,
    DScore,
    EScore,
    Penalty,
    Total,
}

impl EventColumn {
    /// Column for a header label such as `Rank`, `NOC`, `Pen.` or `D Score`
    pub fn from_header(label: &str) -> Option<Self> {
        let normalized = label
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_end_matches('.')
            .to_lowercase();
        let label = normalized.as_str();

        [
            (EventColumn::Rank, header_tokens::RANK),
            (EventColumn::Bib, header_tokens::BIB),
            (EventColumn::Name, header_tokens::NAME),
            (EventColumn::Country, header_tokens::COUNTRY),
            (EventColumn::DScore, header_tokens::D_SCORE),
            (EventColumn::EScore, header_tokens::E_SCORE),
            (EventColumn::Penalty, header_tokens::PENALTY),
            (EventColumn::Total, header_tokens::TOTAL),
        ]
        .into_iter()
        .find(|(_, tokens)| tokens.contains(&label))
        .map(|(column, _)| column)
    }

    fn is_score(&self) -> bool {
        matches!(
            self,
            EventColumn::DScore | EventColumn::EScore | EventColumn::Penalty | EventColumn::Total
        )
    }
}

/// Column layout read from a table header line
#[derive(Debug, Clone)]
pub struct EventTable {
    bands: ColumnBands,
    /// Column per band; `None` for unrecognised or repeated labels
    columns: Vec<Option<EventColumn>>,
}

impl EventTable {
    /// Build the layout from a header line, if it has both Rank and Name
    pub fn from_header(line: &TextLine) -> Option<Self> {
        let mut anchors = Vec::new();
        let mut columns = Vec::new();

        for cell in &line.cells {
            match EventColumn::from_header(&cell.text) {
                Some(column) => {
                    anchors.push(cell.center());
                    columns.push(Some(column));
                }
                None => {
                    for word in split_words(cell) {
                        anchors.push(word.center());
                        columns.push(EventColumn::from_header(&word.text));
                    }
                }
            }
        }

        // Repeated labels keep only their first position
        let mut seen = Vec::new();
        for slot in columns.iter_mut() {
            if let Some(column) = *slot {
                if seen.contains(&column) {
                    *slot = None;
                } else {
                    seen.push(column);
                }
            }
        }

        let table = Self {
            bands: ColumnBands::new(anchors, BandMode::Nearest),
            columns,
        };
        (table.has(EventColumn::Rank) && table.has(EventColumn::Name)).then_some(table)
    }

    pub fn has(&self, column: EventColumn) -> bool {
        self.columns.contains(&Some(column))
    }

    /// Cell texts of a line grouped by column
    pub fn split(&self, line: &TextLine) -> RowCells {
        let mut values: HashMap<EventColumn, String> = HashMap::new();
        for cell in &line.cells {
            let Some(column) = self.bands.assign(cell).and_then(|band| self.columns[band]) else {
                continue;
            };
            let value = values.entry(column).or_default();
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(cell.text.trim());
        }
        values.retain(|_, value| !value.is_empty());
        RowCells { values }
    }

    fn require_scores(&self, source: &Path, page: u32) -> Result<()> {
        let missing: Vec<&str> = [
            (EventColumn::DScore, "D"),
            (EventColumn::EScore, "E"),
            (EventColumn::Total, "Total"),
        ]
        .into_iter()
        .filter(|(column, _)| !self.has(*column))
        .map(|(_, label)| label)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GymScoreError::malformed(
                source,
                format!("table header on page {} has no {} column", page, missing.join("/")),
            ))
        }
    }
}

/// One line's cells keyed by column
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RowCells {
    values: HashMap<EventColumn, String>,
}

impl RowCells {
    pub fn get(&self, column: EventColumn) -> Option<&str> {
        self.values.get(&column).map(String::as_str)
    }

    fn has_scores(&self) -> bool {
        self.values
            .iter()
            .any(|(column, value)| column.is_score() && value.chars().any(|c| c.is_ascii_digit()))
    }

    /// A numbered finalist: the rank or bib reads as a number
    fn is_entry(&self) -> bool {
        self.get(EventColumn::Rank).and_then(parse_rank).is_some()
            || self
                .get(EventColumn::Bib)
                .is_some_and(|bib| bib.trim().parse::<u32>().is_ok())
    }

    fn identity_only(&self) -> bool {
        self.values
            .keys()
            .all(|column| matches!(column, EventColumn::Name | EventColumn::Country))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowKind {
    /// A finalist, with scores or without (DNS, DNF)
    Result,
    /// Wrapped name or country of the row above
    Continuation,
    /// Another routine by the gymnast above
    Attempt,
    Other,
}

fn classify(row: &RowCells, follows_result: bool, wrapped: bool) -> RowKind {
    let has_name = row.get(EventColumn::Name).is_some();
    match (has_name, row.has_scores()) {
        (true, true) => RowKind::Result,
        (true, false) if row.is_entry() => RowKind::Result,
        (true, false) if follows_result && wrapped && row.identity_only() => RowKind::Continuation,
        (false, true) if follows_result && row.get(EventColumn::Rank).is_none() => RowKind::Attempt,
        _ => RowKind::Other,
    }
}

struct RoutineScores {
    d: Option<Score>,
    e: Option<Score>,
    penalty: Option<Score>,
    total: Option<Score>,
}

impl RoutineScores {
    fn read(coercer: &mut RowCoercer, row: &RowCells) -> Result<Self> {
        Ok(Self {
            d: coercer.required("d_score", row.get(EventColumn::DScore))?,
            e: coercer.required("e_score", row.get(EventColumn::EScore))?,
            penalty: coercer.optional("penalty", row.get(EventColumn::Penalty))?,
            total: coercer.required("total_score", row.get(EventColumn::Total))?,
        })
    }

    fn apply(self, record: &mut ScoreRecord) {
        record.d_score = self.d;
        record.e_score = self.e;
        record.penalty = self.penalty;
        record.total_score = self.total;
    }
}

/// Apparatus named by a page title among `lines`
pub fn detect_apparatus(lines: &[TextLine]) -> Option<Apparatus> {
    let texts: Vec<String> = lines.iter().map(TextLine::text).collect();

    texts
        .iter()
        .find_map(|text| {
            TITLE
                .captures(text)
                .and_then(|caps| Apparatus::from_label(&caps[1]))
        })
        .or_else(|| texts.iter().find_map(|text| Apparatus::from_label(text)))
}

/// Parser for apparatus final result PDFs
#[derive(Debug, Clone)]
pub struct EventParser {
    policy: CoercionPolicy,
}

impl EventParser {
    pub fn new(policy: CoercionPolicy) -> Self {
        Self { policy }
    }

    fn parse_table(
        &self,
        page: &PageLines,
        header_index: usize,
        table: &EventTable,
        apparatus: Apparatus,
        outcome: &mut ParseOutcome,
    ) -> Result<()> {
        // First record of the gymnast currently being read
        let mut current: Option<usize> = None;
        let mut previous_y = page.lines[header_index].y;

        for (index, line) in page.lines.iter().enumerate().skip(header_index + 1) {
            let row = table.split(line);
            let context = line_context(line, index);
            let font_size = line.cells.first().map_or(0.0, |cell| cell.font_size);
            let wrapped = previous_y - line.y <= font_size * WRAPPED_LINE_GAP_RATIO;
            previous_y = line.y;

            match classify(&row, current.is_some(), wrapped) {
                RowKind::Result => {
                    let mut coercer = RowCoercer::new(self.policy, &context);
                    let scores = RoutineScores::read(&mut coercer, &row)?;
                    if !coercer.keep_row() {
                        outcome.skipped += 1;
                        current = None;
                        continue;
                    }

                    let mut record = ScoreRecord::new(
                        row.get(EventColumn::Name).unwrap_or_default(),
                        row.get(EventColumn::Country).unwrap_or_default(),
                        apparatus,
                    );
                    record.rank = row.get(EventColumn::Rank).and_then(parse_rank);
                    record.bib = row.get(EventColumn::Bib).and_then(|bib| bib.parse().ok());
                    scores.apply(&mut record);

                    outcome.records.push(record);
                    current = Some(outcome.records.len() - 1);
                }
                RowKind::Continuation => {
                    let start = current.unwrap_or(outcome.records.len());
                    for record in &mut outcome.records[start..] {
                        append(&mut record.gymnast_name, row.get(EventColumn::Name));
                        append(&mut record.country, row.get(EventColumn::Country));
                    }
                    debug!("{}: wrapped identity '{}' merged", context, line.text());
                }
                RowKind::Attempt => {
                    let mut coercer = RowCoercer::new(self.policy, &context);
                    let scores = RoutineScores::read(&mut coercer, &row)?;
                    if !coercer.keep_row() {
                        outcome.skipped += 1;
                        continue;
                    }

                    let Some(previous) = outcome.records.last_mut() else {
                        continue;
                    };
                    let attempt = previous.attempt.unwrap_or(1) + 1;
                    if previous.attempt.is_none() {
                        previous.attempt = Some(1);
                    }

                    let mut record = previous.clone();
                    record.attempt = Some(attempt);
                    scores.apply(&mut record);
                    outcome.records.push(record);
                }
                RowKind::Other => {
                    debug!("{}: ignored '{}'", context, line.text());
                    current = None;
                }
            }
        }
        Ok(())
    }
}

fn append(target: &mut String, extra: Option<&str>) {
    if let Some(extra) = extra {
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(extra);
    }
}

/// First line within the search window that forms a table header
fn find_header(page: &PageLines) -> Option<(usize, EventTable)> {
    page.lines
        .iter()
        .take(HEADER_SEARCH_LINES)
        .enumerate()
        .find_map(|(index, line)| EventTable::from_header(line).map(|table| (index, table)))
}

impl ScoreParser for EventParser {
    fn format(&self) -> ResultFormat {
        ResultFormat::EventFinals
    }

    fn parse(&self, pages: &[PageLines], source: &Path) -> Result<ParseOutcome> {
        let mut outcome = ParseOutcome::default();
        let mut apparatus: Option<Apparatus> = None;
        let mut tables = 0;

        for page in pages {
            let header = find_header(page);
            let title_end = header.as_ref().map_or(page.lines.len(), |(index, _)| *index);

            if let Some(found) = detect_apparatus(&page.lines[..title_end]) {
                if apparatus != Some(found) {
                    info!("Page {}: {} final", page.number, found.name());
                }
                apparatus = Some(found);
            }

            let Some((header_index, table)) = header else {
                debug!("Page {}: no results table", page.number);
                continue;
            };

            let apparatus = apparatus.ok_or_else(|| {
                GymScoreError::malformed(
                    source,
                    format!("results table on page {} precedes any apparatus title", page.number),
                )
            })?;
            table.require_scores(source, page.number)?;

            let before = outcome.records.len();
            self.parse_table(page, header_index, &table, apparatus, &mut outcome)?;
            debug!(
                "Page {}: {} {} records",
                page.number,
                outcome.records.len() - before,
                apparatus
            );
            tables += 1;
        }

        if tables == 0 {
            return Err(GymScoreError::malformed(
                source,
                "no results table header with Rank and Name columns",
            ));
        }

        Ok(outcome)
    }
}
