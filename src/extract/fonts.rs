//! Page font resources: character-code decoding and glyph widths.
//!
//! Simple fonts map one byte per code through their base encoding, any
//! `/Differences` and the `ToUnicode` CMap. Composite (Type0) fonts read codes
//! as wide as the CMap's code space, usually two bytes for `Identity-H`, and
//! need `ToUnicode` to recover text.

use super::content::number;
use crate::constants::GLYPH_WIDTH_RATIO;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Advance used when a font carries no widths, in glyph space (1/1000 em)
const DEFAULT_WIDTH: f64 = GLYPH_WIDTH_RATIO * 1000.0;

/// Default `/DW` of a CIDFont
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// Upper bound on codes expanded from one CMap or `/W` range
const MAX_RANGE: u32 = 0xFFFF;

/// Font used when `Tf` names a resource the page does not have
pub(crate) static FALLBACK: LazyLock<Font> = LazyLock::new(Font::fallback);

/// One character code after decoding
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Glyph {
    pub text: String,
    /// Horizontal advance in glyph space (1/1000 of the font size)
    pub width: f64,
    /// Single-byte code 32, the only code that also gets word spacing
    pub word_space: bool,
}

#[derive(Debug, Clone)]
enum CodeSpace {
    /// One byte per code, looked up in a 256-entry table
    Simple(Vec<Option<char>>),
    /// Multi-byte codes of a Type0 font
    Composite { code_len: usize },
}

/// A page font, reduced to what text placement needs
#[derive(Debug, Clone)]
pub(crate) struct Font {
    codes: CodeSpace,
    to_unicode: HashMap<u32, String>,
    widths: HashMap<u32, f64>,
    default_width: f64,
}

impl Font {
    /// Latin-1 text with WinAnsi punctuation and estimated widths
    fn fallback() -> Self {
        let table = (0..=255u8).map(|byte| Some(winansi_char(byte))).collect();
        Self {
            codes: CodeSpace::Simple(table),
            to_unicode: HashMap::new(),
            widths: HashMap::new(),
            default_width: DEFAULT_WIDTH,
        }
    }

    /// Read a font dictionary. Missing or broken entries degrade to defaults.
    pub(crate) fn load(document: &Document, font: &Dictionary) -> Self {
        let to_unicode = lookup(document, font, b"ToUnicode")
            .and_then(|object| object.as_stream().ok())
            .and_then(|stream| {
                if stream.dict.has(b"Filter") {
                    stream.decompressed_content().ok()
                } else {
                    Some(stream.content.clone())
                }
            })
            .map(|data| parse_cmap(&data))
            .unwrap_or_default();

        let subtype = lookup(document, font, b"Subtype")
            .and_then(|object| object.as_name().ok())
            .unwrap_or_default();

        if subtype == b"Type0" {
            let descendant = lookup(document, font, b"DescendantFonts")
                .and_then(|object| object.as_array().ok())
                .and_then(|fonts| fonts.first())
                .map(|object| resolve(document, object))
                .and_then(|object| object.as_dict().ok());

            let widths = descendant
                .and_then(|cid_font| lookup(document, cid_font, b"W"))
                .and_then(|object| object.as_array().ok())
                .map(|array| cid_widths(document, array))
                .unwrap_or_default();
            let default_width = descendant
                .and_then(|cid_font| lookup(document, cid_font, b"DW"))
                .and_then(number)
                .unwrap_or(DEFAULT_CID_WIDTH);

            if to_unicode.map.is_empty() {
                debug!("Type0 font without ToUnicode, reading codes as Unicode");
            }

            return Self {
                codes: CodeSpace::Composite {
                    code_len: to_unicode.code_len.unwrap_or(2),
                },
                to_unicode: to_unicode.map,
                widths,
                default_width,
            };
        }

        let missing_width = lookup(document, font, b"FontDescriptor")
            .and_then(|object| object.as_dict().ok())
            .and_then(|descriptor| lookup(document, descriptor, b"MissingWidth"))
            .and_then(number)
            .filter(|width| *width > 0.0)
            .unwrap_or(DEFAULT_WIDTH);

        Self {
            codes: CodeSpace::Simple(simple_table(document, font)),
            to_unicode: to_unicode.map,
            widths: simple_widths(document, font),
            default_width: missing_width,
        }
    }

    /// Split a shown string into glyphs
    pub(crate) fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        match &self.codes {
            CodeSpace::Simple(table) => bytes
                .iter()
                .map(|&byte| {
                    let code = u32::from(byte);
                    let text = self
                        .to_unicode
                        .get(&code)
                        .cloned()
                        .or_else(|| table[usize::from(byte)].map(String::from))
                        .unwrap_or_default();
                    Glyph {
                        text,
                        width: self.width(code),
                        word_space: byte == b' ',
                    }
                })
                .collect(),
            CodeSpace::Composite { code_len } => bytes
                .chunks(*code_len)
                .map(|chunk| {
                    let code = code_value(chunk);
                    let text = self
                        .to_unicode
                        .get(&code)
                        .cloned()
                        .or_else(|| {
                            char::from_u32(code)
                                .filter(|ch| !ch.is_control())
                                .map(String::from)
                        })
                        .unwrap_or_default();
                    Glyph {
                        text,
                        width: self.width(code),
                        word_space: false,
                    }
                })
                .collect(),
        }
    }

    fn width(&self, code: u32) -> f64 {
        self.widths.get(&code).copied().unwrap_or(self.default_width)
    }
}

/// Fonts of one page, keyed by resource name
#[derive(Debug, Default)]
pub(crate) struct FontMap {
    fonts: HashMap<Vec<u8>, Font>,
}

impl FontMap {
    pub(crate) fn for_page(document: &Document, page_id: ObjectId) -> Self {
        let fonts: HashMap<Vec<u8>, Font> = document
            .get_page_fonts(page_id)
            .into_iter()
            .map(|(name, font)| (name, Font::load(document, font)))
            .collect();
        trace!("Loaded {} fonts for page object {:?}", fonts.len(), page_id);
        Self { fonts }
    }

    pub(crate) fn get(&self, name: &[u8]) -> Option<&Font> {
        self.fonts.get(name)
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    document
        .dereference(object)
        .map(|(_, target)| target)
        .unwrap_or(object)
}

fn lookup<'a>(document: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|object| resolve(document, object))
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0, |code, &byte| (code << 8) | u32::from(byte))
}

/// Base encoding plus `/Differences`
fn simple_table(document: &Document, font: &Dictionary) -> Vec<Option<char>> {
    let encoding = lookup(document, font, b"Encoding");
    let base = match encoding {
        Some(Object::Name(name)) => String::from_utf8_lossy(name).into_owned(),
        Some(Object::Dictionary(dict)) => lookup(document, dict, b"BaseEncoding")
            .and_then(|object| object.as_name_str().ok())
            .unwrap_or("StandardEncoding")
            .to_string(),
        _ => "StandardEncoding".to_string(),
    };

    let mut table: Vec<Option<char>> = (0..=255u8)
        .map(|byte| Document::decode_text(Some(&base), &[byte]).chars().next())
        .collect();

    let differences = match encoding {
        Some(Object::Dictionary(dict)) => lookup(document, dict, b"Differences")
            .and_then(|object| object.as_array().ok()),
        _ => None,
    };
    if let Some(differences) = differences {
        let mut code = 0usize;
        for item in differences {
            match resolve(document, item) {
                Object::Integer(start) => code = usize::try_from(*start).unwrap_or(usize::MAX),
                Object::Name(name) => {
                    if let Some(slot) = table.get_mut(code) {
                        *slot = glyph_char(name);
                        if slot.is_none() {
                            trace!("Unknown glyph name /{}", String::from_utf8_lossy(name));
                        }
                    }
                    code = code.saturating_add(1);
                }
                _ => {}
            }
        }
    }

    table
}

/// `/FirstChar` + `/Widths`
fn simple_widths(document: &Document, font: &Dictionary) -> HashMap<u32, f64> {
    let first = lookup(document, font, b"FirstChar")
        .and_then(number)
        .unwrap_or(0.0) as u32;
    lookup(document, font, b"Widths")
        .and_then(|object| object.as_array().ok())
        .map(|widths| {
            widths
                .iter()
                .enumerate()
                .filter_map(|(offset, width)| {
                    number(resolve(document, width))
                        .map(|width| (first.saturating_add(offset as u32), width))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// CIDFont `/W`: `c [w1 w2 ...]` and `c_first c_last w` entries
fn cid_widths(document: &Document, array: &[Object]) -> HashMap<u32, f64> {
    let items: Vec<&Object> = array.iter().map(|item| resolve(document, item)).collect();
    let mut widths = HashMap::new();
    let mut index = 0;

    while index < items.len() {
        let Some(first) = number(items[index]) else {
            index += 1;
            continue;
        };
        let first = first as u32;

        match items.get(index + 1) {
            Some(Object::Array(list)) => {
                for (offset, width) in list.iter().enumerate() {
                    if let Some(width) = number(resolve(document, width)) {
                        widths.insert(first.saturating_add(offset as u32), width);
                    }
                }
                index += 2;
            }
            Some(last) => {
                let width = items.get(index + 2).and_then(|item| number(item));
                if let (Some(last), Some(width)) = (number(last), width) {
                    let last = (last as u32).min(first.saturating_add(MAX_RANGE));
                    for cid in first..=last {
                        widths.insert(cid, width);
                    }
                }
                index += 3;
            }
            None => break,
        }
    }

    widths
}

// =============================================================================
// ToUnicode CMaps
// =============================================================================

#[derive(Debug, Default)]
struct CMap {
    map: HashMap<u32, String>,
    /// Bytes per code, from the first code space range
    code_len: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Open,
    Close,
    Word(String),
}

fn is_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace() || b"<>[]()%/".contains(&byte)
}

fn hex_bytes(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|&digit| (digit as char).to_digit(16).map(|value| value as u8))
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut index = 0;

    while index < data.len() {
        match data[index] {
            b'%' => {
                while index < data.len() && data[index] != b'\n' && data[index] != b'\r' {
                    index += 1;
                }
            }
            b'<' if data.get(index + 1) == Some(&b'<') => {
                tokens.push(Token::Word("<<".to_string()));
                index += 2;
            }
            b'>' if data.get(index + 1) == Some(&b'>') => {
                tokens.push(Token::Word(">>".to_string()));
                index += 2;
            }
            b'<' => {
                let end = data[index + 1..]
                    .iter()
                    .position(|&byte| byte == b'>')
                    .map_or(data.len(), |offset| index + 1 + offset);
                tokens.push(Token::Hex(hex_bytes(&data[index + 1..end])));
                index = end + 1;
            }
            b'[' => {
                tokens.push(Token::Open);
                index += 1;
            }
            b']' => {
                tokens.push(Token::Close);
                index += 1;
            }
            b'(' => {
                index += 1;
                while index < data.len() && data[index] != b')' {
                    index += if data[index] == b'\\' { 2 } else { 1 };
                }
                index += 1;
            }
            byte if byte.is_ascii_whitespace() => index += 1,
            _ => {
                let start = index;
                index += 1;
                while index < data.len() && !is_delimiter(data[index]) {
                    index += 1;
                }
                tokens.push(Token::Word(
                    String::from_utf8_lossy(&data[start..index]).into_owned(),
                ));
            }
        }
    }

    tokens
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect()
}

fn parse_cmap(data: &[u8]) -> CMap {
    let tokens = tokenize(data);
    let mut cmap = CMap::default();
    let mut index = 0;

    while index < tokens.len() {
        match &tokens[index] {
            Token::Word(word) if word == "begincodespacerange" => {
                if let Some(Token::Hex(low)) = tokens.get(index + 1) {
                    cmap.code_len.get_or_insert(low.len().max(1));
                }
                index += 1;
            }
            Token::Word(word) if word == "beginbfchar" => {
                index += 1;
                while let (Some(Token::Hex(source)), Some(Token::Hex(target))) =
                    (tokens.get(index), tokens.get(index + 1))
                {
                    let text = String::from_utf16_lossy(&utf16_units(target));
                    cmap.map.insert(code_value(source), text);
                    index += 2;
                }
            }
            Token::Word(word) if word == "beginbfrange" => {
                index += 1;
                while let (Some(Token::Hex(low)), Some(Token::Hex(high))) =
                    (tokens.get(index), tokens.get(index + 1))
                {
                    let low = code_value(low);
                    let high = code_value(high).min(low.saturating_add(MAX_RANGE));
                    match tokens.get(index + 2) {
                        Some(Token::Hex(target)) => {
                            let mut units = utf16_units(target);
                            for code in low..=high {
                                cmap.map.insert(code, String::from_utf16_lossy(&units));
                                if let Some(last) = units.last_mut() {
                                    *last = last.wrapping_add(1);
                                }
                            }
                            index += 3;
                        }
                        Some(Token::Open) => {
                            index += 3;
                            let mut code = low;
                            while let Some(Token::Hex(target)) = tokens.get(index) {
                                if code <= high {
                                    let text = String::from_utf16_lossy(&utf16_units(target));
                                    cmap.map.insert(code, text);
                                }
                                code = code.saturating_add(1);
                                index += 1;
                            }
                            if tokens.get(index) == Some(&Token::Close) {
                                index += 1;
                            }
                        }
                        _ => break,
                    }
                }
            }
            _ => index += 1,
        }
    }

    cmap
}

// =============================================================================
// Glyph names and single-byte fallback
// =============================================================================

/// Characters for the glyph names results books actually use
const GLYPH_NAMES: &[(&str, char)] = &[
    ("space", ' '),
    ("exclam", '!'),
    ("quotedbl", '"'),
    ("numbersign", '#'),
    ("dollar", '$'),
    ("percent", '%'),
    ("ampersand", '&'),
    ("quotesingle", '\''),
    ("quoteright", '\u{2019}'),
    ("quoteleft", '\u{2018}'),
    ("quotedblleft", '\u{201C}'),
    ("quotedblright", '\u{201D}'),
    ("parenleft", '('),
    ("parenright", ')'),
    ("asterisk", '*'),
    ("plus", '+'),
    ("comma", ','),
    ("hyphen", '-'),
    ("minus", '\u{2212}'),
    ("endash", '\u{2013}'),
    ("emdash", '\u{2014}'),
    ("period", '.'),
    ("slash", '/'),
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("colon", ':'),
    ("semicolon", ';'),
    ("less", '<'),
    ("equal", '='),
    ("greater", '>'),
    ("question", '?'),
    ("at", '@'),
    ("bracketleft", '['),
    ("backslash", '\\'),
    ("bracketright", ']'),
    ("underscore", '_'),
    ("bullet", '\u{2022}'),
    ("degree", '\u{00B0}'),
    ("nbspace", ' '),
    ("Aacute", 'Á'),
    ("aacute", 'á'),
    ("Agrave", 'À'),
    ("agrave", 'à'),
    ("Acircumflex", 'Â'),
    ("acircumflex", 'â'),
    ("Adieresis", 'Ä'),
    ("adieresis", 'ä'),
    ("Atilde", 'Ã'),
    ("atilde", 'ã'),
    ("Aring", 'Å'),
    ("aring", 'å'),
    ("Ccedilla", 'Ç'),
    ("ccedilla", 'ç'),
    ("Eacute", 'É'),
    ("eacute", 'é'),
    ("Egrave", 'È'),
    ("egrave", 'è'),
    ("Ecircumflex", 'Ê'),
    ("ecircumflex", 'ê'),
    ("Edieresis", 'Ë'),
    ("edieresis", 'ë'),
    ("Iacute", 'Í'),
    ("iacute", 'í'),
    ("Idieresis", 'Ï'),
    ("idieresis", 'ï'),
    ("Ntilde", 'Ñ'),
    ("ntilde", 'ñ'),
    ("Oacute", 'Ó'),
    ("oacute", 'ó'),
    ("Ocircumflex", 'Ô'),
    ("ocircumflex", 'ô'),
    ("Odieresis", 'Ö'),
    ("odieresis", 'ö'),
    ("Otilde", 'Õ'),
    ("otilde", 'õ'),
    ("Oslash", 'Ø'),
    ("oslash", 'ø'),
    ("Uacute", 'Ú'),
    ("uacute", 'ú'),
    ("Udieresis", 'Ü'),
    ("udieresis", 'ü'),
    ("Yacute", 'Ý'),
    ("yacute", 'ý'),
    ("germandbls", 'ß'),
    ("Scaron", 'Š'),
    ("scaron", 'š'),
    ("Zcaron", 'Ž'),
    ("zcaron", 'ž'),
    ("Ccaron", 'Č'),
    ("ccaron", 'č'),
    ("Lslash", 'Ł'),
    ("lslash", 'ł'),
];

/// Unicode character for a glyph name: single letters, `uniXXXX`, `uXXXX` or
/// a known name
fn glyph_char(name: &[u8]) -> Option<char> {
    let name = std::str::from_utf8(name).ok()?;
    let mut chars = name.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return ch.is_ascii_alphabetic().then_some(ch);
    }

    let hex = name
        .strip_prefix("uni")
        .filter(|digits| digits.len() == 4)
        .or_else(|| {
            name.strip_prefix('u')
                .filter(|digits| (4..=6).contains(&digits.len()))
        });
    if let Some(code) = hex.and_then(|digits| u32::from_str_radix(digits, 16).ok()) {
        return char::from_u32(code);
    }

    GLYPH_NAMES
        .iter()
        .find(|(glyph, _)| *glyph == name)
        .map(|(_, ch)| *ch)
}

/// WinAnsi punctuation over Latin-1
pub(crate) fn winansi_char(byte: u8) -> char {
    match byte {
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0xA0 => ' ',
        other => other as char,
    }
}
