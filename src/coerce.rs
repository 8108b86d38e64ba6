//! Numeric coercion for score and rank cells.
//!
//! Text extraction leaves stray characters around numbers (qualification
//! flags, footnote marks, rank annotations, decimal commas). Cells are
//! cleaned first, then parsed; what happens on failure is decided by the
//! run's [`CoercionPolicy`] through a [`RowCoercer`].

use crate::config::CoercionPolicy;
use crate::constants::NUMERIC_MARKERS;
use crate::error::{GymScoreError, Result};
use crate::models::Score;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static RANK_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\s*\d+\s*\)\s*$").expect("valid regex"));

/// Strip decoration from a numeric cell
pub fn clean_numeric(raw: &str) -> String {
    let without_rank = RANK_ANNOTATION.replace(raw.trim(), "");
    let mut cleaned: String = without_rank
        .trim()
        .trim_end_matches(|c: char| NUMERIC_MARKERS.contains(&c) || c.is_whitespace())
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if !cleaned.contains('.') && cleaned.matches(',').count() == 1 {
        cleaned = cleaned.replace(',', ".");
    }
    cleaned
}

/// Parse a score cell after cleaning
pub fn parse_score(raw: &str) -> std::result::Result<Score, String> {
    clean_numeric(raw).parse()
}

/// Parse a rank cell such as `1`, `1.`, `=3` or `(2)`
pub fn parse_rank(raw: &str) -> Option<u32> {
    raw.trim()
        .trim_matches(|c| c == '(' || c == ')')
        .trim_start_matches(['=', 'T'])
        .trim_end_matches('.')
        .parse()
        .ok()
}

/// Applies the coercion policy to the numeric fields of one source row
#[derive(Debug)]
pub struct RowCoercer {
    policy: CoercionPolicy,
    context: String,
    failed: bool,
}

impl RowCoercer {
    /// `context` identifies the row in warnings and errors
    pub fn new(policy: CoercionPolicy, context: impl Into<String>) -> Self {
        Self {
            policy,
            context: context.into(),
            failed: false,
        }
    }

    /// A field the row must have; absent or unreadable values go through the policy
    pub fn required(&mut self, field: &str, raw: Option<&str>) -> Result<Option<Score>> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => self.parse(field, value),
            None => self.fail(field, ""),
        }
    }

    /// A field that may legitimately be absent (penalties); only unreadable values fail.
    /// A lone dash counts as absent.
    pub fn optional(&mut self, field: &str, raw: Option<&str>) -> Result<Option<Score>> {
        match raw
            .map(str::trim)
            .filter(|s| !s.is_empty() && !matches!(*s, "-" | "\u{2013}" | "\u{2014}"))
        {
            Some(value) => self.parse(field, value),
            None => Ok(None),
        }
    }

    /// Report a field that could not be located at all
    pub fn missing(&mut self, field: &str) -> Result<()> {
        self.fail(field, "").map(|_| ())
    }

    /// False when the row should be dropped under the skip policy
    pub fn keep_row(&self) -> bool {
        !(self.failed && self.policy == CoercionPolicy::Skip)
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    fn parse(&mut self, field: &str, value: &str) -> Result<Option<Score>> {
        match parse_score(value) {
            Ok(score) => Ok(Some(score)),
            Err(_) => self.fail(field, value),
        }
    }

    fn fail(&mut self, field: &str, value: &str) -> Result<Option<Score>> {
        self.failed = true;
        match self.policy {
            CoercionPolicy::Abort => Err(GymScoreError::field_coercion(
                field,
                value,
                self.context.clone(),
            )),
            CoercionPolicy::Blank => {
                warn!("{}: {} '{}' left blank", self.context, field, value);
                Ok(None)
            }
            CoercionPolicy::Skip => {
                warn!("{}: {} '{}' unreadable, row skipped", self.context, field, value);
                Ok(None)
            }
        }
    }
}
