//! Individual all-around final results.
//!
//! Every gymnast occupies a three-line block:
//!
//! ```text
//!  6.400 15.766 (1)  5.800 14.000 (5)  6.600 14.366 (2)  6.000 13.533 (4)  57.665
//!  1  123  BILES Simone  USA  D E
//!  9.366  8.200  7.766  7.633 -0.100
//! ```
//!
//! The line above the identity carries `D Score (rank)` per apparatus and
//! the all-around total, the line below carries E and any penalty. Apparatus
//! names are printed once in the page heading, so values are matched to
//! apparatus by their position under it, or by rotation order when the
//! heading cannot be located.

use super::{ParseOutcome, ScoreParser, execution_groups, line_context, numeric_words};
use crate::coerce::{RowCoercer, parse_rank};
use crate::config::CoercionPolicy;
use crate::error::{GymScoreError, Result};
use crate::extract::TextCell;
use crate::layout::{BandMode, ColumnBands, PageLines, TextLine, split_words};
use crate::models::{Apparatus, ResultFormat, Score, ScoreRecord};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, warn};

static IDENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<rank>\d+)\s+(?P<bib>\d+)\s+(?P<name>\p{Lu}\D*?)\s+(?P<noc>[A-Z]{3})\s+D\s+E$")
        .expect("valid regex")
});

/// A three-decimal number running straight into the next number or rank
static GLUED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d\.\d{3})([\d(])").expect("valid regex"));

static SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}\.\d{3}$").expect("valid regex"));

static APPARATUS_RANK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d+\)$").expect("valid regex"));

/// Rank, bib, name and NOC from an identity line
#[derive(Debug, Clone, PartialEq)]
struct Identity {
    rank: Option<u32>,
    bib: Option<u32>,
    name: String,
    noc: String,
}

impl Identity {
    fn parse(text: &str) -> Option<Self> {
        IDENTITY.captures(text).map(|caps| Self {
            rank: parse_rank(&caps["rank"]),
            bib: caps["bib"].parse().ok(),
            name: caps["name"].trim().to_string(),
            noc: caps["noc"].to_string(),
        })
    }
}

/// Words of a line with glued numbers pulled apart
fn separated_words(line: &TextLine) -> Vec<TextCell> {
    line.cells
        .iter()
        .flat_map(|cell| {
            let mut text = cell.text.clone();
            loop {
                let next = GLUED.replace_all(&text, "${1} ${2}").into_owned();
                if next == text {
                    break;
                }
                text = next;
            }
            split_words(&TextCell { text, ..cell.clone() })
        })
        .collect()
}

/// One apparatus result from the line above the identity
#[derive(Debug, Clone)]
struct Triplet {
    d: TextCell,
    score: TextCell,
    rank: Option<u32>,
}

impl Triplet {
    fn span(&self) -> (f64, f64) {
        (self.d.x, self.score.right())
    }
}

/// `D Score (rank)` triplets and the trailing all-around total
fn read_triplets(words: &[TextCell]) -> (Vec<Triplet>, Option<TextCell>) {
    let is_score = |word: &TextCell| SCORE.is_match(&word.text);
    let mut triplets = Vec::new();
    let mut end = 0;
    let mut index = 0;

    while index + 2 < words.len() {
        let (d, score, rank) = (&words[index], &words[index + 1], &words[index + 2]);
        if is_score(d) && is_score(score) && APPARATUS_RANK.is_match(&rank.text) {
            triplets.push(Triplet {
                d: d.clone(),
                score: score.clone(),
                rank: parse_rank(&rank.text),
            });
            index += 3;
            end = index;
        } else {
            index += 1;
        }
    }

    let total = words[end..].iter().rev().find(|word| is_score(word)).cloned();
    (triplets, total)
}

/// Apparatus column positions from a page heading
#[derive(Debug, Clone)]
struct HeadingAnchors {
    bands: ColumnBands,
    apparatus: Vec<Apparatus>,
}

impl HeadingAnchors {
    /// Anchors from the first line naming all four apparatus
    fn find(lines: &[TextLine]) -> Option<Self> {
        lines.iter().find_map(|line| {
            let mut found: Vec<(Apparatus, f64)> = Vec::new();
            for cell in &line.cells {
                let Some(apparatus) = Apparatus::from_label(&cell.text) else {
                    continue;
                };
                if !found.iter().any(|(seen, _)| *seen == apparatus) {
                    found.push((apparatus, cell.center()));
                }
            }
            (found.len() == Apparatus::ALL.len()).then(|| Self {
                bands: ColumnBands::new(found.iter().map(|(_, x)| *x).collect(), BandMode::Nearest),
                apparatus: found.into_iter().map(|(apparatus, _)| apparatus).collect(),
            })
        })
    }

    fn apparatus_at(&self, left: f64, right: f64) -> Option<Apparatus> {
        self.bands
            .assign_span(left, right)
            .map(|band| self.apparatus[band])
    }
}

/// Values of one gymnast arranged by apparatus in rotation order
#[derive(Debug, Default)]
struct Slots {
    triplets: [Option<Triplet>; 4],
    executions: [Vec<TextCell>; 4],
}

impl Slots {
    fn by_position(
        anchors: &HeadingAnchors,
        triplets: Vec<Triplet>,
        groups: Vec<Vec<TextCell>>,
    ) -> Option<Self> {
        let mut slots = Slots::default();
        for triplet in triplets {
            let (left, right) = triplet.span();
            let slot = &mut slots.triplets[anchors.apparatus_at(left, right)?.index()];
            if slot.is_some() {
                return None;
            }
            *slot = Some(triplet);
        }
        for group in groups {
            let first = group.first()?;
            let slot = &mut slots.executions[anchors.apparatus_at(first.x, first.right())?.index()];
            if !slot.is_empty() {
                return None;
            }
            *slot = group;
        }
        Some(slots)
    }

    /// Rotation order; only a full set of four can be placed this way
    fn by_order(triplets: Vec<Triplet>, groups: Vec<Vec<TextCell>>) -> Self {
        let mut slots = Slots::default();
        if triplets.len() == Apparatus::ALL.len() {
            for (index, triplet) in triplets.into_iter().enumerate() {
                slots.triplets[index] = Some(triplet);
            }
        }
        if groups.len() == Apparatus::ALL.len() {
            for (index, group) in groups.into_iter().enumerate() {
                slots.executions[index] = group;
            }
        }
        slots
    }

    fn complete(&self) -> usize {
        self.triplets
            .iter()
            .zip(&self.executions)
            .filter(|(triplet, executions)| triplet.is_some() && !executions.is_empty())
            .count()
    }
}

/// Parser for individual all-around result PDFs
#[derive(Debug, Clone)]
pub struct IndividualAllAroundParser {
    policy: CoercionPolicy,
}

impl IndividualAllAroundParser {
    pub fn new(policy: CoercionPolicy) -> Self {
        Self { policy }
    }

    fn read_block(
        &self,
        above: Option<&TextLine>,
        identity: &Identity,
        below: Option<&TextLine>,
        anchors: Option<&HeadingAnchors>,
        context: &str,
        outcome: &mut ParseOutcome,
    ) -> Result<()> {
        let name = &identity.name;
        let (triplets, total) = above
            .map(|line| read_triplets(&separated_words(line)))
            .unwrap_or_default();
        let groups = below
            .map(|line| execution_groups(&numeric_words(&separated_words(line))))
            .unwrap_or_default();

        let slots = match anchors {
            Some(anchors) => Slots::by_position(anchors, triplets.clone(), groups.clone())
                .unwrap_or_else(|| {
                    debug!(
                        "{}: values do not line up with the heading, using rotation order",
                        context
                    );
                    Slots::by_order(triplets, groups)
                }),
            None => Slots::by_order(triplets, groups),
        };

        let mut block = RowCoercer::new(self.policy, format!("{}, {}", context, name));
        let complete = slots.complete();
        if complete < Apparatus::ALL.len() {
            block.missing(&format!("apparatus results ({} of 4 found)", complete))?;
            if !block.keep_row() {
                outcome.skipped += Apparatus::ALL.len();
                return Ok(());
            }
        }

        let all_around_total = total.and_then(|cell| cell.text.parse::<Score>().ok());
        for (apparatus, (triplet, executions)) in Apparatus::ALL
            .into_iter()
            .zip(slots.triplets.iter().zip(slots.executions.iter()))
        {
            let mut record = ScoreRecord::new(name.as_str(), identity.noc.as_str(), apparatus);
            record.rank = identity.rank;
            record.bib = identity.bib;
            record.all_around_total = all_around_total;

            if let Some(triplet) = triplet {
                let mut coercer =
                    RowCoercer::new(self.policy, format!("{}, {} {}", context, name, apparatus));
                record.d_score = coercer.required("d_score", Some(triplet.d.text.as_str()))?;
                record.total_score =
                    coercer.required("total_score", Some(triplet.score.text.as_str()))?;
                record.e_score =
                    coercer.required("e_score", executions.first().map(|c| c.text.as_str()))?;
                record.penalty =
                    coercer.optional("penalty", executions.get(1).map(|c| c.text.as_str()))?;
                record.apparatus_rank = triplet.rank;
                if !coercer.keep_row() {
                    outcome.skipped += 1;
                    continue;
                }
            }
            outcome.records.push(record);
        }
        Ok(())
    }
}

impl ScoreParser for IndividualAllAroundParser {
    fn format(&self) -> ResultFormat {
        ResultFormat::IndividualAllAround
    }

    fn parse(&self, pages: &[PageLines], source: &Path) -> Result<ParseOutcome> {
        let mut outcome = ParseOutcome::default();
        let mut anchors: Option<HeadingAnchors> = None;
        let mut gymnasts = 0;

        for page in pages {
            let identities: Vec<(usize, Identity)> = page
                .lines
                .iter()
                .enumerate()
                .filter_map(|(index, line)| Identity::parse(&line.text()).map(|id| (index, id)))
                .collect();
            let Some((first, _)) = identities.first() else {
                debug!("Page {}: no all-around gymnasts", page.number);
                continue;
            };

            if let Some(found) = HeadingAnchors::find(&page.lines[..*first]) {
                anchors = Some(found);
            }

            for (index, identity) in &identities {
                let above = index.checked_sub(1).map(|i| &page.lines[i]);
                let below = page.lines.get(index + 1);
                if above.is_none() || below.is_none() {
                    warn!("Page {}: gymnast block cut at page edge", page.number);
                }
                let context = line_context(&page.lines[*index], *index);
                self.read_block(above, identity, below, anchors.as_ref(), &context, &mut outcome)?;
                gymnasts += 1;
            }
        }

        if gymnasts == 0 {
            return Err(GymScoreError::malformed(
                source,
                "no all-around gymnast lines (rank, bib, name, NOC, D E) found",
            ));
        }
        debug!("{} all-around gymnasts read", gymnasts);
        Ok(outcome)
    }
}
