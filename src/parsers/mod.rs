//! Layout-specific parsers turning text lines into score records
//!
//! Each competition format prints its results in a fixed layout, so each gets
//! its own parser behind the [`ScoreParser`] trait:
//! - [`events`] - individual apparatus finals, one row per gymnast and routine
//! - [`team_all_around`] - team finals, gymnasts grouped under team headers
//! - [`individual_all_around`] - all-around finals, one block per gymnast
//!
//! ## Usage
//!
//! ```rust
//! use gymscore::config::ParserConfig;
//! use gymscore::models::ResultFormat;
//! use gymscore::parsers::parser_for;
//!
//! let parser = parser_for(ResultFormat::EventFinals, &ParserConfig::default());
//! assert_eq!(parser.format(), ResultFormat::EventFinals);
//! ```

pub mod events;
pub mod individual_all_around;
pub mod team_all_around;

#[cfg(test)]
pub mod tests;

use crate::coerce::parse_score;
use crate::config::ParserConfig;
use crate::error::Result;
use crate::extract::TextCell;
use crate::layout::TextLine;
use crate::models::{Apparatus, ResultFormat, ScoreRecord};
use std::path::Path;

pub use crate::layout::PageLines;
pub use events::EventParser;
pub use individual_all_around::IndividualAllAroundParser;
pub use team_all_around::TeamAllAroundParser;

/// Records recovered from one document
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParseOutcome {
    pub records: Vec<ScoreRecord>,
    /// Records dropped under the skip policy
    pub skipped: usize,
    /// Aggregate rows (team totals) recognised and left out of the output
    pub aggregates_excluded: usize,
    /// Gymnasts whose values were matched to apparatus by rotation order
    pub rotation_order: usize,
}

/// A parser for one results layout
pub trait ScoreParser {
    fn format(&self) -> ResultFormat;

    /// Parse the lines of every page; `source` names the document in errors
    fn parse(&self, pages: &[PageLines], source: &Path) -> Result<ParseOutcome>;
}

/// Parser for the given results layout
pub fn parser_for(format: ResultFormat, config: &ParserConfig) -> Box<dyn ScoreParser> {
    match format {
        ResultFormat::EventFinals => Box::new(EventParser::new(config.coercion_policy)),
        ResultFormat::TeamAllAround => Box::new(TeamAllAroundParser::new(config.coercion_policy)),
        ResultFormat::IndividualAllAround => {
            Box::new(IndividualAllAroundParser::new(config.coercion_policy))
        }
    }
}

/// Row location used in warnings and coercion errors
pub(crate) fn line_context(line: &TextLine, index: usize) -> String {
    format!("page {}, line {}", line.page, index + 1)
}

pub(crate) fn is_negative(cell: &TextCell) -> bool {
    cell.text.starts_with(['-', '\u{2212}'])
}

/// Words that read as scores
pub(crate) fn numeric_words(words: &[TextCell]) -> Vec<TextCell> {
    words
        .iter()
        .filter(|word| parse_score(&word.text).is_ok())
        .cloned()
        .collect()
}

/// E line values in order: each E optionally followed by a negative penalty
pub(crate) fn execution_groups(cells: &[TextCell]) -> Vec<Vec<TextCell>> {
    let mut groups: Vec<Vec<TextCell>> = Vec::new();
    for cell in cells {
        match groups.last_mut() {
            Some(group) if is_negative(cell) && group.len() == 1 => group.push(cell.clone()),
            _ => groups.push(vec![cell.clone()]),
        }
    }
    groups.truncate(Apparatus::ALL.len());
    groups
}
