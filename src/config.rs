//! Configuration management and validation.
//!
//! Holds the knobs that shape a run: how unparseable numbers are handled,
//! how apparatus are labelled in the output, and the tolerances used by the
//! layout and score-check stages.

use crate::constants::{DEFAULT_LINE_TOLERANCE, DEFAULT_SCORE_TOLERANCE};
use crate::error::{GymScoreError, Result};
use crate::models::Apparatus;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What to do with a row whose numeric field cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Emit the row with the field blank and flag it incomplete
    #[default]
    Blank,
    /// Drop the row and count it as skipped
    Skip,
    /// Fail the whole run
    Abort,
}

/// How apparatus are written in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApparatusStyle {
    /// Two-letter code (VT, UB, BB, FX)
    #[default]
    Code,
    /// Full name (Vault, Uneven Bars, ...)
    Name,
}

impl ApparatusStyle {
    pub fn label(&self, apparatus: Apparatus) -> &'static str {
        match self {
            ApparatusStyle::Code => apparatus.code(),
            ApparatusStyle::Name => apparatus.name(),
        }
    }
}

/// Configuration for a single extraction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Handling of unparseable numeric fields
    pub coercion_policy: CoercionPolicy,

    /// Apparatus label style in the output
    pub apparatus_style: ApparatusStyle,

    /// Vertical distance in points within which text cells share a line
    pub line_tolerance: f64,

    /// Tolerance in points for the D + E vs total check
    pub score_tolerance: f64,

    /// Show a progress bar while reading pages
    pub show_progress: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            coercion_policy: CoercionPolicy::Blank,
            apparatus_style: ApparatusStyle::Code,
            line_tolerance: DEFAULT_LINE_TOLERANCE,
            score_tolerance: DEFAULT_SCORE_TOLERANCE,
            show_progress: false,
        }
    }
}

impl ParserConfig {
    /// Set the coercion policy
    pub fn with_coercion_policy(mut self, policy: CoercionPolicy) -> Self {
        self.coercion_policy = policy;
        self
    }

    /// Set the apparatus label style
    pub fn with_apparatus_style(mut self, style: ApparatusStyle) -> Self {
        self.apparatus_style = style;
        self
    }

    /// Set the line grouping tolerance
    pub fn with_line_tolerance(mut self, tolerance: f64) -> Self {
        self.line_tolerance = tolerance;
        self
    }

    /// Set the score check tolerance
    pub fn with_score_tolerance(mut self, tolerance: f64) -> Self {
        self.score_tolerance = tolerance;
        self
    }

    /// Enable the page progress bar
    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }

    /// Score tolerance in thousandths of a point
    pub fn score_tolerance_thousandths(&self) -> i64 {
        (self.score_tolerance * 1000.0).round() as i64
    }

    /// Reject tolerances that would make grouping or checking meaningless
    pub fn validate(&self) -> Result<()> {
        if !self.line_tolerance.is_finite() || self.line_tolerance <= 0.0 {
            return Err(GymScoreError::configuration(format!(
                "line tolerance must be a positive number of points, got {}",
                self.line_tolerance
            )));
        }
        if !self.score_tolerance.is_finite() || self.score_tolerance < 0.0 {
            return Err(GymScoreError::configuration(format!(
                "score tolerance must be zero or positive, got {}",
                self.score_tolerance
            )));
        }
        debug!("Configuration validated: {:?}", self);
        Ok(())
    }
}
