//! Reconstruction of table rows from positioned text.
//!
//! Cells whose baselines lie within a tolerance form one [`TextLine`]; lines
//! are ordered top to bottom and cells left to right. Touching cells are
//! merged so words split across several show operators read as one cell.
//! [`ColumnBands`] assigns cells to columns by horizontal position.

use crate::constants::CELL_MERGE_GAP_RATIO;
use crate::extract::{PageCells, TextCell};
use tracing::trace;

/// Cells sharing a baseline, left to right
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub page: u32,
    pub y: f64,
    pub cells: Vec<TextCell>,
}

impl TextLine {
    /// Cell texts joined by single spaces, with inner whitespace collapsed
    pub fn text(&self) -> String {
        self.cells
            .iter()
            .flat_map(|cell| cell.text.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Every whitespace-separated word as its own cell, left to right
    pub fn words(&self) -> Vec<TextCell> {
        self.cells.iter().flat_map(split_words).collect()
    }
}

/// Split a cell into word cells.
///
/// Word positions are interpolated from character offsets across the
/// cell's width.
pub fn split_words(cell: &TextCell) -> Vec<TextCell> {
    let total = cell.text.chars().count().max(1) as f64;
    let mut words = Vec::new();
    let mut offset = 0usize;
    let mut current = String::new();
    let mut start = 0usize;

    for ch in cell.text.chars().chain(std::iter::once(' ')) {
        if ch.is_whitespace() {
            if !current.is_empty() {
                let len = current.chars().count();
                words.push(TextCell {
                    page: cell.page,
                    x: cell.x + cell.width * start as f64 / total,
                    y: cell.y,
                    width: cell.width * len as f64 / total,
                    font_size: cell.font_size,
                    text: std::mem::take(&mut current),
                });
            }
            start = offset + 1;
        } else {
            current.push(ch);
        }
        offset += 1;
    }
    words
}

/// One page rebuilt as lines, top to bottom
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLines {
    pub number: u32,
    pub lines: Vec<TextLine>,
}

impl PageLines {
    /// Whole page as plain text, one line per row
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Group a page's cells into lines.
///
/// A cell joins the current line while its baseline is within `tolerance`
/// points of the line's first baseline.
pub fn group_lines(page: &PageCells, tolerance: f64) -> PageLines {
    let mut cells = page.cells.clone();
    cells.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    for cell in cells {
        match lines.last_mut() {
            Some(line) if (line.y - cell.y).abs() <= tolerance => line.cells.push(cell),
            _ => lines.push(TextLine {
                page: page.number,
                y: cell.y,
                cells: vec![cell],
            }),
        }
    }

    for line in &mut lines {
        line.cells.sort_by(|a, b| a.x.total_cmp(&b.x));
        line.cells = merge_adjacent(std::mem::take(&mut line.cells));
    }

    trace!("Page {}: {} lines", page.number, lines.len());
    PageLines {
        number: page.number,
        lines,
    }
}

/// Merge cells that touch horizontally into a single cell
fn merge_adjacent(cells: Vec<TextCell>) -> Vec<TextCell> {
    let mut merged: Vec<TextCell> = Vec::with_capacity(cells.len());
    for cell in cells {
        if let Some(previous) = merged.last_mut() {
            let gap = cell.x - previous.right();
            let em = previous.font_size.max(cell.font_size);
            if gap < em * CELL_MERGE_GAP_RATIO {
                if gap > em * 0.1 && !previous.text.ends_with(' ') {
                    previous.text.push(' ');
                }
                previous.text.push_str(&cell.text);
                previous.width = (cell.right() - previous.x).max(previous.width);
                continue;
            }
        }
        merged.push(cell);
    }
    merged
}

/// How a cell's horizontal position selects a column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandMode {
    /// Column whose anchor centre is closest to the cell centre
    Nearest,
    /// Right-aligned numeric columns: the first anchor at or right of the
    /// cell's right edge (within `slack` points)
    RightAligned { slack: f64 },
}

/// Column positions taken from a header line
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBands {
    anchors: Vec<f64>,
    mode: BandMode,
}

impl ColumnBands {
    /// Bands from anchor positions given in column order
    pub fn new(anchors: Vec<f64>, mode: BandMode) -> Self {
        Self { anchors, mode }
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Column index for a cell, if it falls in any column
    pub fn assign(&self, cell: &TextCell) -> Option<usize> {
        self.assign_span(cell.x, cell.right())
    }

    /// Column index for a horizontal extent `left..right`
    pub fn assign_span(&self, left: f64, right: f64) -> Option<usize> {
        match self.mode {
            BandMode::Nearest => {
                let center = (left + right) / 2.0;
                self.anchors
                    .iter()
                    .enumerate()
                    .min_by(|(_, a), (_, b)| (*a - center).abs().total_cmp(&(*b - center).abs()))
                    .map(|(index, _)| index)
            }
            BandMode::RightAligned { slack } => {
                self.anchors.iter().position(|anchor| right <= anchor + slack)
            }
        }
    }
}
