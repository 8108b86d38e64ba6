//! Content stream interpreter producing positioned text cells.
//!
//! Tracks just enough of the PDF graphics and text state (CTM, text matrix,
//! font, spacing, leading) to place every shown string on the page. Strings
//! are decoded and advanced through the page's font resources.

use super::TextCell;
use super::fonts::{FALLBACK, Font, FontMap};
use crate::constants::TJ_SPACE_THRESHOLD;
use lopdf::Object;
use lopdf::content::Operation;
use tracing::{debug, trace};

/// Affine transform in PDF row-vector convention `[a b c d e f]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn new(values: [f64; 6]) -> Self {
        let [a, b, c, d, e, f] = values;
        Self { a, b, c, d, e, f }
    }

    fn translate(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self × other`
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn origin(&self) -> (f64, f64) {
        (self.e, self.f)
    }

    fn y_scale(&self) -> f64 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Text-showing interpreter for one page's content stream
pub(crate) struct TextInterpreter<'a> {
    page: u32,
    fonts: &'a FontMap,
    font: &'a Font,
    ctm: Matrix,
    saved: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_size: f64,
    leading: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    cells: Vec<TextCell>,
}

/// Text being accumulated for one cell
#[derive(Default)]
struct PendingCell {
    text: String,
    /// Text matrix before the first visible glyph
    start: Option<Matrix>,
    /// Text matrix after the last visible glyph
    end: Option<Matrix>,
}

impl<'a> TextInterpreter<'a> {
    pub(crate) fn new(page: u32, fonts: &'a FontMap) -> Self {
        Self {
            page,
            fonts,
            font: &*FALLBACK,
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 0.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            cells: Vec::new(),
        }
    }

    /// Execute every operation and return the cells in stream order
    pub(crate) fn run(mut self, operations: &[Operation]) -> Vec<TextCell> {
        for operation in operations {
            self.execute(operation);
        }
        debug!("Page {}: {} text cells", self.page, self.cells.len());
        self.cells
    }

    fn execute(&mut self, operation: &Operation) {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(values) = six_numbers(operands) {
                    self.ctm = Matrix::new(values).then(&self.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(name) = operands.first().and_then(|name| name.as_name().ok()) {
                    let fonts: &'a FontMap = self.fonts;
                    self.font = fonts.get(name).unwrap_or_else(|| {
                        debug!(
                            "Page {}: font /{} not in resources",
                            self.page,
                            String::from_utf8_lossy(name)
                        );
                        &*FALLBACK
                    });
                }
                if let Some(size) = operands.get(1).and_then(number) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.leading = leading;
                }
            }
            "Tc" => {
                if let Some(spacing) = operands.first().and_then(number) {
                    self.char_spacing = spacing;
                }
            }
            "Tw" => {
                if let Some(spacing) = operands.first().and_then(number) {
                    self.word_spacing = spacing;
                }
            }
            "Tz" => {
                if let Some(scale) = operands.first().and_then(number) {
                    self.horizontal_scale = scale / 100.0;
                }
            }
            "Td" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    self.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(values) = six_numbers(operands) {
                    self.line_matrix = Matrix::new(values);
                    self.text_matrix = self.line_matrix;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(bytes) = operands.first().and_then(string_bytes) {
                    self.show_string(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(bytes) = operands.first().and_then(string_bytes) {
                    self.show_string(bytes);
                }
            }
            "\"" => {
                if let Some(spacing) = operands.first().and_then(number) {
                    self.word_spacing = spacing;
                }
                if let Some(spacing) = operands.get(1).and_then(number) {
                    self.char_spacing = spacing;
                }
                self.next_line();
                if let Some(bytes) = operands.get(2).and_then(string_bytes) {
                    self.show_string(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(elements)) = operands.first() {
                    self.show_array(elements);
                }
            }
            "Do" => trace!("Page {}: XObject content not interpreted", self.page),
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    fn advance(&mut self, distance: f64) {
        self.text_matrix = Matrix::translate(distance, 0.0).then(&self.text_matrix);
    }

    /// Decode `bytes` with the current font, moving the text matrix glyph by glyph
    fn show_glyphs(&mut self, cell: &mut PendingCell, bytes: &[u8]) {
        for glyph in self.font.decode(bytes) {
            let visible = !glyph.text.trim().is_empty();
            if visible && cell.start.is_none() {
                cell.start = Some(self.text_matrix);
            }

            let spacing = if glyph.word_space {
                self.char_spacing + self.word_spacing
            } else {
                self.char_spacing
            };
            self.advance((glyph.width / 1000.0 * self.font_size + spacing) * self.horizontal_scale);

            if visible {
                cell.end = Some(self.text_matrix);
            }
            cell.text.push_str(&glyph.text);
        }
    }

    fn show_string(&mut self, bytes: &[u8]) {
        let mut cell = PendingCell::default();
        self.show_glyphs(&mut cell, bytes);
        self.finish_cell(cell);
    }

    /// TJ arrays: small negative offsets become spaces, wide ones split cells
    fn show_array(&mut self, elements: &[Object]) {
        let mut cell = PendingCell::default();
        for element in elements {
            if let Some(bytes) = string_bytes(element) {
                self.show_glyphs(&mut cell, bytes);
            } else if let Some(offset) = number(element) {
                let shift = -offset / 1000.0 * self.font_size * self.horizontal_scale;
                if shift >= self.font_size * 1.5 {
                    self.finish_cell(std::mem::take(&mut cell));
                    self.advance(shift);
                    continue;
                }
                self.advance(shift);
                if offset < TJ_SPACE_THRESHOLD && !cell.text.ends_with(' ') {
                    cell.text.push(' ');
                }
            }
        }
        self.finish_cell(cell);
    }

    fn finish_cell(&mut self, cell: PendingCell) {
        let (Some(start), Some(end)) = (cell.start, cell.end) else {
            return;
        };

        let start = start.then(&self.ctm);
        let end = end.then(&self.ctm);
        let (x, y) = start.origin();

        self.cells.push(TextCell {
            page: self.page,
            x,
            y,
            width: (end.origin().0 - x).abs(),
            font_size: self.font_size * start.y_scale(),
            text: cell.text.trim().to_string(),
        });
    }
}

pub(crate) fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(*value as f64),
        _ => None,
    }
}

fn six_numbers(operands: &[Object]) -> Option<[f64; 6]> {
    if operands.len() < 6 {
        return None;
    }
    let mut values = [0.0; 6];
    for (slot, operand) in values.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(values)
}

fn string_bytes(object: &Object) -> Option<&[u8]> {
    match object {
        Object::String(bytes, _) => Some(bytes),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn interpret(operations: &[Operation]) -> Vec<TextCell> {
        TextInterpreter::new(1, &FontMap::default()).run(operations)
    }

    fn text_block(x: i64, y: i64, size: i64, text: &str) -> Vec<Operation> {
        vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(size)]),
            op("Td", vec![Object::Integer(x), Object::Integer(y)]),
            op("Tj", vec![Object::string_literal(text)]),
            op("ET", vec![]),
        ]
    }

    #[test]
    fn test_td_positions_cell() {
        let cells = interpret(&text_block(100, 600, 10, "BILES Simone"));
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].text, "BILES Simone");
        assert_eq!(cells[0].x, 100.0);
        assert_eq!(cells[0].y, 600.0);
        assert_eq!(cells[0].font_size, 10.0);
        assert!(cells[0].width > 0.0);
    }

    #[test]
    fn test_cm_translates_text() {
        let mut operations = vec![op(
            "cm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(50),
                Object::Integer(20),
            ],
        )];
        operations.extend(text_block(10, 10, 8, "USA"));
        let cells = interpret(&operations);
        assert_eq!((cells[0].x, cells[0].y), (60.0, 30.0));
    }

    #[test]
    fn test_tstar_uses_leading() {
        let operations = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            op("TD", vec![Object::Integer(72), Object::Integer(-12)]),
            op("Tj", vec![Object::string_literal("first")]),
            op("T*", vec![]),
            op("Tj", vec![Object::string_literal("second")]),
            op("ET", vec![]),
        ];
        let cells = interpret(&operations);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].y, -12.0);
        assert_eq!(cells[1].y, -24.0);
        assert_eq!(cells[1].x, 72.0);
    }

    #[test]
    fn test_tj_array_spaces_and_splits() {
        let operations = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(10)]),
            op("Td", vec![Object::Integer(0), Object::Integer(0)]),
            op(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("LEE"),
                    Object::Integer(-250),
                    Object::string_literal("Sunisa"),
                    Object::Integer(-5000),
                    Object::string_literal("USA"),
                ])],
            ),
            op("ET", vec![]),
        ];
        let cells = interpret(&operations);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].text, "LEE Sunisa");
        assert_eq!(cells[1].text, "USA");
        assert!(cells[1].x > cells[0].x + cells[0].width);
    }

    #[test]
    fn test_unknown_font_decodes_winansi() {
        let operations = vec![
            op("BT", vec![]),
            op("Tf", vec![Object::Name(b"F9".to_vec()), Object::Integer(10)]),
            op("Td", vec![Object::Integer(0), Object::Integer(0)]),
            op("Tj", vec![Object::string_literal(b"Women\x92s Vault".to_vec())]),
            op("ET", vec![]),
        ];
        let cells = interpret(&operations);
        assert_eq!(cells[0].text, "Women\u{2019}s Vault");
        assert_eq!(cells[0].width, 65.0);
    }

    #[test]
    fn test_leading_spaces_move_cell_origin() {
        let cells = interpret(&text_block(10, 0, 10, "  USA "));
        assert_eq!(cells[0].text, "USA");
        assert_eq!(cells[0].x, 20.0);
        assert_eq!(cells[0].width, 15.0);
    }

    #[test]
    fn test_blank_strings_are_dropped() {
        let cells = interpret(&text_block(0, 0, 10, "   "));
        assert!(cells.is_empty());
    }
}
