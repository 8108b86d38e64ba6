//! Application constants for gymscore
//!
//! Label tables for recognizing apparatus and table headers in results
//! PDFs, plus default tolerances for layout and score checks.

// =============================================================================
// Output Schema
// =============================================================================

/// Columns every output CSV starts with, in order
pub const BASE_COLUMNS: &[&str] = &[
    "gymnast_name",
    "country",
    "apparatus",
    "d_score",
    "e_score",
    "total_score",
];

/// Columns added after the base columns for apparatus finals
pub const EVENT_COLUMNS: &[&str] = &["rank", "bib", "penalty", "attempt", "score_check"];

/// Columns added after the base columns for team finals
pub const TEAM_COLUMNS: &[&str] = &["team", "team_rank", "bib", "penalty", "score_check"];

/// Columns added after the base columns for all-around finals
pub const ALL_AROUND_COLUMNS: &[&str] = &[
    "all_around_rank",
    "bib",
    "apparatus_rank",
    "penalty",
    "all_around_total",
    "score_check",
];

// =============================================================================
// Apparatus Labels
// =============================================================================

/// Source labels recognized for each apparatus, matched case-insensitively
/// after whitespace is collapsed. Order follows the Olympic rotation.
pub mod apparatus_labels {
    pub const VAULT: &[&str] = &["vault", "vt"];
    pub const UNEVEN_BARS: &[&str] = &["uneven bars", "unevenbars", "bars", "ub"];
    pub const BALANCE_BEAM: &[&str] = &["balance beam", "balancebeam", "beam", "bb"];
    pub const FLOOR_EXERCISE: &[&str] = &["floor exercise", "floor", "fx"];
}

// =============================================================================
// Table Header Tokens
// =============================================================================

/// Header labels for event-final tables, lowercased with trailing dots removed
pub mod header_tokens {
    pub const RANK: &[&str] = &["rank", "rk"];
    pub const BIB: &[&str] = &["bib"];
    pub const NAME: &[&str] = &["name"];
    pub const COUNTRY: &[&str] = &["noc", "country", "team", "nation"];
    pub const D_SCORE: &[&str] = &["d", "d score", "difficulty"];
    pub const E_SCORE: &[&str] = &["e", "e score", "execution"];
    pub const PENALTY: &[&str] = &["pen", "nd", "penalty"];
    pub const TOTAL: &[&str] = &["total", "score"];
}

/// Number of lines from the top of a page searched for the table header
pub const HEADER_SEARCH_LINES: usize = 25;

/// Trailing markers stripped from numeric cells before coercion
/// (qualification and reserve flags, footnote symbols)
pub const NUMERIC_MARKERS: &[char] = &['*', '#', 'Q', 'R', 'q', 'r', '\u{2020}', '\u{2021}'];

// =============================================================================
// Layout Defaults
// =============================================================================

/// Default vertical distance in points within which cells share a line
pub const DEFAULT_LINE_TOLERANCE: f64 = 2.0;

/// Horizontal gap, as a fraction of font size, below which adjacent cells merge
pub const CELL_MERGE_GAP_RATIO: f64 = 0.25;

/// Average glyph width as a fraction of font size, used to estimate cell widths
pub const GLYPH_WIDTH_RATIO: f64 = 0.5;

/// TJ kerning offset (thousandths of an em) treated as a word space
pub const TJ_SPACE_THRESHOLD: f64 = -200.0;

// =============================================================================
// Score Checks
// =============================================================================

/// Default tolerance in points when comparing D + E against the total
pub const DEFAULT_SCORE_TOLERANCE: f64 = 0.001;

/// Decimal places used for internal score arithmetic (thousandths)
pub const SCORE_SCALE: u32 = 3;

/// A name-only line this many font sizes below the previous line is a
/// wrapped cell rather than a new row
pub const WRAPPED_LINE_GAP_RATIO: f64 = 1.5;
