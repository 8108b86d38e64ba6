//! Team final results.
//!
//! Gymnasts are listed under a team header line that carries the team's
//! apparatus totals. Each gymnast takes two lines: the first has the bib,
//! name and a `D Score` pair for every apparatus contested, the second the
//! matching E scores with any penalties. Gymnasts only compete on some
//! apparatus in a team final, so only apparatus with values are emitted.
//!
//! The scan is a fold over all lines carrying a [`TeamScan`] accumulator:
//! the current team, the gymnast waiting for an E line, and the records
//! emitted so far.

use super::{ParseOutcome, ScoreParser, execution_groups, is_negative, line_context, numeric_words};
use crate::coerce::{RowCoercer, clean_numeric, parse_rank};
use crate::config::CoercionPolicy;
use crate::error::{GymScoreError, Result};
use crate::extract::TextCell;
use crate::layout::{BandMode, ColumnBands, PageLines, TextLine};
use crate::models::{Apparatus, ResultFormat, ScoreRecord};
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static TEAM_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<rank>\d+)\s+(?P<noc>[A-Z]{3})\s*-\s*(?P<name>.*?)\s*(?P<vt>\d{1,3}\.\d{3})\s*\(\d+\)\s+(?P<ub>\d{1,3}\.\d{3})\s*\(\d+\)\s+(?P<bb>\d{1,3}\.\d{3})\s*\(\d+\)\s+(?P<fx>\d{1,3}\.\d{3})\s*\(\d+\)\s+(?P<total>\d{2,3}\.\d{3})$",
    )
    .expect("valid regex")
});

static GYMNAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<bib>\d{3,})\s+(?P<name>\p{Lu}[\p{L}'\u{2019}.\-]*(?:\s+\p{L}[\p{L}'\u{2019}.\-]*)*?)\s+D\s+E\b",
    )
    .expect("valid regex")
});

/// Team whose gymnasts are currently being read
#[derive(Debug, Clone)]
struct TeamContext {
    noc: String,
    name: String,
    rank: Option<u32>,
    /// Apparatus columns, ending at the right edge of each team score
    bands: Option<ColumnBands>,
}

impl TeamContext {
    fn from_header(caps: &Captures, line: &TextLine) -> Self {
        let totals = [&caps["vt"], &caps["ub"], &caps["bb"], &caps["fx"]];
        Self {
            noc: caps["noc"].to_string(),
            name: caps["name"].trim().to_string(),
            rank: parse_rank(&caps["rank"]),
            bands: apparatus_bands(line, &totals),
        }
    }

    /// Team label written to the output
    fn label(&self) -> String {
        if self.name.is_empty() {
            self.noc.clone()
        } else {
            self.name.clone()
        }
    }
}

/// Locate each team apparatus total on the header line, left to right
fn apparatus_bands(line: &TextLine, totals: &[&str]) -> Option<ColumnBands> {
    let words = line.words();
    let mut anchors = Vec::with_capacity(totals.len());
    let mut cursor = 0;

    for total in totals {
        let offset = words[cursor..]
            .iter()
            .position(|word| clean_numeric(&word.text) == *total)?;
        let word = &words[cursor + offset];
        anchors.push(word.right());
        cursor += offset + 1;
    }

    let slack = words.first().map_or(0.0, |word| word.font_size * 0.5);
    Some(ColumnBands::new(anchors, BandMode::RightAligned { slack }))
}

/// A gymnast line waiting for its E line
#[derive(Debug, Clone)]
struct PendingGymnast {
    bib: Option<u32>,
    name: String,
    context: String,
    team: TeamContext,
    /// D and apparatus score values, left to right
    scores: Vec<TextCell>,
    /// E and penalty values, once read
    executions: Option<Vec<TextCell>>,
}

/// Group of values for one apparatus: the gymnast line's part and the E line's part
type ApparatusValues = (Apparatus, Vec<TextCell>, Vec<TextCell>);

impl PendingGymnast {
    /// Split the gymnast's values by apparatus.
    ///
    /// Values are placed by the team header's columns; when there are none,
    /// or a value falls right of every column, they are read as `D Score`
    /// pairs in rotation order.
    fn apparatus_values(&self) -> Vec<ApparatusValues> {
        let executions = self.executions.clone().unwrap_or_default();

        match &self.team.bands {
            Some(bands) if !self.in_rotation_order() => {
                Apparatus::ALL
                    .into_iter()
                    .map(|apparatus| {
                        let in_band = |cells: &[TextCell]| -> Vec<TextCell> {
                            cells
                                .iter()
                                .filter(|cell| bands.assign(cell) == Some(apparatus.index()))
                                .cloned()
                                .collect()
                        };
                        (apparatus, in_band(&self.scores), in_band(&executions))
                    })
                    .collect()
            }
            _ => {
                let mut groups = execution_groups(&executions).into_iter();
                self.scores
                    .chunks(2)
                    .zip(Apparatus::ALL)
                    .map(|(pair, apparatus)| {
                        (apparatus, pair.to_vec(), groups.next().unwrap_or_default())
                    })
                    .collect()
            }
        }
    }

    /// True when the header's columns cannot place every value
    fn in_rotation_order(&self) -> bool {
        match &self.team.bands {
            Some(bands) => !self.scores.iter().all(|cell| bands.assign(cell).is_some()),
            None => true,
        }
    }

    fn into_records(self, policy: CoercionPolicy, outcome: &mut ParseOutcome) -> Result<()> {
        if self.executions.is_none() {
            debug!("{}: no E line for {}", self.context, self.name);
        }
        if !self.scores.is_empty() && self.in_rotation_order() {
            warn!(
                "{}: {} values read in rotation order, apparatus labels may be wrong",
                self.context, self.name
            );
            outcome.rotation_order += 1;
        }

        for (apparatus, scores, executions) in self.apparatus_values() {
            if scores.is_empty() {
                continue;
            }

            let mut coercer =
                RowCoercer::new(policy, format!("{}, {} {}", self.context, self.name, apparatus));
            let d = (scores.len() > 1).then(|| scores[0].text.as_str());
            let total = scores.last().map(|cell| cell.text.as_str());
            let e = executions.iter().find(|cell| !is_negative(cell));
            let penalty = executions.iter().find(|cell| is_negative(cell));

            let d_score = coercer.required("d_score", d)?;
            let e_score = coercer.required("e_score", e.map(|cell| cell.text.as_str()))?;
            let penalty = coercer.optional("penalty", penalty.map(|cell| cell.text.as_str()))?;
            let total_score = coercer.required("total_score", total)?;
            if !coercer.keep_row() {
                outcome.skipped += 1;
                continue;
            }

            let mut record = ScoreRecord::new(self.name.clone(), self.team.noc.clone(), apparatus);
            record.bib = self.bib;
            record.team = Some(self.team.label());
            record.team_rank = self.team.rank;
            record.d_score = d_score;
            record.e_score = e_score;
            record.penalty = penalty;
            record.total_score = total_score;
            outcome.records.push(record);
        }
        Ok(())
    }
}

/// Running state of the scan over a team results document
#[derive(Debug, Default)]
struct TeamScan {
    team: Option<TeamContext>,
    pending: Option<PendingGymnast>,
    outcome: ParseOutcome,
}

impl TeamScan {
    fn step(
        mut self,
        policy: CoercionPolicy,
        source: &Path,
        index: usize,
        line: &TextLine,
    ) -> Result<Self> {
        let text = line.text();

        if let Some(caps) = TEAM_HEADER.captures(&text) {
            self.flush(policy)?;
            let team = TeamContext::from_header(&caps, line);
            info!(
                "Team {} ({}), rank {}",
                team.label(),
                team.noc,
                team.rank.map_or("-".to_string(), |rank| rank.to_string())
            );
            if team.bands.is_none() {
                warn!("Team {}: apparatus columns not located, reading values in order", team.noc);
            }
            self.team = Some(team);
            self.outcome.aggregates_excluded += 1;
            return Ok(self);
        }

        if let Some(caps) = GYMNAST.captures(&text) {
            self.flush(policy)?;
            let name = caps["name"].to_string();
            let Some(team) = self.team.clone() else {
                return Err(GymScoreError::malformed(
                    source,
                    format!(
                        "gymnast {} on page {} appears before any team header",
                        name, line.page
                    ),
                ));
            };

            let words = line.words();
            // Values follow the "D E" row labels
            let labels_end = words
                .windows(2)
                .position(|pair| pair[0].text == "D" && pair[1].text == "E")
                .map_or(0, |position| position + 2);

            self.pending = Some(PendingGymnast {
                bib: caps["bib"].parse().ok(),
                name,
                context: line_context(line, index),
                team,
                scores: numeric_words(&words[labels_end..]),
                executions: None,
            });
            return Ok(self);
        }

        let words = line.words();
        let numbers = numeric_words(&words);
        match self.pending.as_mut() {
            Some(pending)
                if pending.executions.is_none()
                    && !numbers.is_empty()
                    && numbers.len() == words.len() =>
            {
                pending.executions = Some(numbers);
            }
            _ if is_aggregate(&text) => {
                debug!("{}: team aggregate '{}' excluded", line_context(line, index), text);
                self.outcome.aggregates_excluded += 1;
            }
            _ => debug!("{}: ignored '{}'", line_context(line, index), text),
        }
        Ok(self)
    }

    fn flush(&mut self, policy: CoercionPolicy) -> Result<()> {
        match self.pending.take() {
            Some(pending) => pending.into_records(policy, &mut self.outcome),
            None => Ok(()),
        }
    }

    fn finish(mut self, policy: CoercionPolicy, source: &Path) -> Result<ParseOutcome> {
        self.flush(policy)?;
        if self.team.is_none() {
            return Err(GymScoreError::malformed(source, "no team header line found"));
        }
        Ok(self.outcome)
    }
}

fn is_aggregate(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.starts_with("total") || lower.starts_with("team total")
}

/// Parser for team final result PDFs
#[derive(Debug, Clone)]
pub struct TeamAllAroundParser {
    policy: CoercionPolicy,
}

impl TeamAllAroundParser {
    pub fn new(policy: CoercionPolicy) -> Self {
        Self { policy }
    }
}

impl ScoreParser for TeamAllAroundParser {
    fn format(&self) -> ResultFormat {
        ResultFormat::TeamAllAround
    }

    fn parse(&self, pages: &[PageLines], source: &Path) -> Result<ParseOutcome> {
        pages
            .iter()
            .flat_map(|page| page.lines.iter().enumerate())
            .try_fold(TeamScan::default(), |scan, (index, line)| {
                scan.step(self.policy, source, index, line)
            })?
            .finish(self.policy, source)
    }
}
