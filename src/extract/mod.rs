//! PDF text extraction behind a narrow interface.
//!
//! Parsers never see the PDF itself. They receive pages of [`TextCell`]s
//! (a string plus where it sits on the page) from a [`CellSource`], so the
//! row-to-schema logic can be exercised with synthetic cells.

mod content;
mod fonts;

use crate::error::{GymScoreError, Result};
use lopdf::content::Content;
use lopdf::{Document, ObjectId};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A run of text placed on a page, in PDF user space (y grows upwards)
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    /// 1-based page number
    pub page: u32,
    /// Left edge of the text
    pub x: f64,
    /// Baseline
    pub y: f64,
    /// Estimated width
    pub width: f64,
    /// Effective font size
    pub font_size: f64,
    pub text: String,
}

impl TextCell {
    pub fn new(page: u32, x: f64, y: f64, font_size: f64, text: impl Into<String>) -> Self {
        let text = text.into();
        let width = text.chars().count() as f64 * font_size * crate::constants::GLYPH_WIDTH_RATIO;
        Self {
            page,
            x,
            y,
            width,
            font_size,
            text,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn center(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

/// All text cells of one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageCells {
    pub number: u32,
    pub cells: Vec<TextCell>,
}

/// Anything that can hand out positioned text, page by page
pub trait CellSource {
    fn page_count(&self) -> usize;

    /// Cells of the page at `index` (0-based)
    fn page_cells(&self, index: usize) -> Result<PageCells>;
}

/// Cell source backed by a PDF file, read with lopdf
pub struct PdfCellSource {
    path: PathBuf,
    document: Document,
    pages: Vec<(u32, ObjectId)>,
}

impl PdfCellSource {
    /// Load a PDF and index its pages
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::metadata(path)
            .map_err(|e| GymScoreError::io(format!("Cannot open {}", path.display()), e))?;

        let document =
            Document::load(path).map_err(|e| GymScoreError::pdf(path, e.to_string()))?;

        if document.is_encrypted() {
            return Err(GymScoreError::pdf(path, "encrypted PDFs are not supported"));
        }

        let pages: Vec<(u32, ObjectId)> = document.get_pages().into_iter().collect();
        debug!("Opened {} ({} pages)", path.display(), pages.len());

        Ok(Self {
            path: path.to_path_buf(),
            document,
            pages,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CellSource for PdfCellSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_cells(&self, index: usize) -> Result<PageCells> {
        let (number, page_id) = *self.pages.get(index).ok_or_else(|| {
            GymScoreError::pdf(&self.path, format!("page index {} out of range", index))
        })?;

        let raw = self.document.get_page_content(page_id).map_err(|e| {
            GymScoreError::pdf(&self.path, format!("page {}: {}", number, e))
        })?;
        let content = Content::decode(&raw).map_err(|e| {
            GymScoreError::pdf(&self.path, format!("page {} content: {}", number, e))
        })?;

        let fonts = fonts::FontMap::for_page(&self.document, page_id);
        let cells = content::TextInterpreter::new(number, &fonts).run(&content.operations);
        Ok(PageCells { number, cells })
    }
}

/// Cell source over cells already in memory, e.g. from another extractor
#[derive(Debug, Clone, Default)]
pub struct MemoryCellSource {
    pages: Vec<PageCells>,
}

impl MemoryCellSource {
    pub fn new(pages: Vec<PageCells>) -> Self {
        Self { pages }
    }
}

impl CellSource for MemoryCellSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_cells(&self, index: usize) -> Result<PageCells> {
        self.pages.get(index).cloned().ok_or_else(|| {
            GymScoreError::pdf("<memory>", format!("page index {} out of range", index))
        })
    }
}
