//! Test utilities for the results parsers
//!
//! Pages are built from synthetic text cells at fixed positions and run
//! through the real line grouping, so the parsers see what they would see
//! from a PDF.

use crate::constants::{DEFAULT_LINE_TOLERANCE, GLYPH_WIDTH_RATIO};
use crate::extract::{PageCells, TextCell};
use crate::layout::{PageLines, group_lines};
use crate::models::ScoreRecord;
use std::path::Path;


/// Font size of every synthetic cell
pub const FONT: f64 = 8.0;

/// Left-aligned cell
pub fn cell(x: f64, y: f64, text: &str) -> TextCell {
    TextCell::new(1, x, y, FONT, text)
}

/// Cell whose right edge sits at `right`, as right-aligned numbers are printed
pub fn right_cell(right: f64, y: f64, text: &str) -> TextCell {
    let width = text.chars().count() as f64 * FONT * GLYPH_WIDTH_RATIO;
    TextCell::new(1, right - width, y, FONT, text)
}

/// Group cells into the lines of page `number`
pub fn page(number: u32, cells: Vec<TextCell>) -> PageLines {
    let cells = cells
        .into_iter()
        .map(|cell| TextCell { page: number, ..cell })
        .collect();
    group_lines(&PageCells { number, cells }, DEFAULT_LINE_TOLERANCE)
}

pub fn source() -> &'static Path {
    Path::new("results.pdf")
}

/// Printed D, E and total of a record, blank where absent
pub fn printed(record: &ScoreRecord) -> (String, String, String) {
    let show =
        |score: Option<crate::models::Score>| score.map(|s| s.to_string()).unwrap_or_default();
    (show(record.d_score), show(record.e_score), show(record.total_score))
}
