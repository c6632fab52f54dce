//! ToUnicode CMap codec table.
//!
//! Parses CMap streams embedded in PDF `/ToUnicode` entries into a
//! bidirectional table between fixed-width character codes and Unicode
//! strings. The stream is read with the content stream tokenizer and the
//! `begincodespacerange`, `beginbfchar`, `beginbfrange`, `begincidchar` and
//! `begincidrange` sections are replayed in order.

use std::collections::HashMap;

use crate::encoding::Encoded;
use crate::error::BackendError;
use crate::tokenizer::{Token, TokenKind, tokenize};

/// Character emitted for bytes that have no mapping.
pub const PLACEHOLDER: char = '\u{FFFD}';

/// A parsed ToUnicode CMap mapping character codes to Unicode strings and back.
///
/// Character codes are 1 or 2 bytes wide, as declared by the codespace
/// ranges. Unicode values may be multi-character strings (e.g. ligatures).
#[derive(Debug, Clone, Default)]
pub struct CMap {
    code_width: usize,
    forward: HashMap<Vec<u8>, String>,
    inverse: HashMap<String, Vec<u8>>,
    /// Longest target string, in chars.
    longest_target: usize,
}

impl CMap {
    /// Parse a CMap from its decompressed stream content.
    ///
    /// Later definitions of an already mapped code overwrite earlier ones,
    /// and the inverse table keeps the last code written for a string.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::CMap`] if codespace ranges disagree on code
    /// width or declare a width other than 1 or 2, and
    /// [`BackendError::Parse`] if the stream cannot be tokenized.
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let mut cmap = CMap::default();
        let mut operands: Vec<Token> = Vec::new();

        for token in tokenize(data)? {
            let Some(op) = token.operator() else {
                operands.push(token);
                continue;
            };
            match op {
                "begincodespacerange" | "beginbfchar" | "begincidchar" | "beginbfrange"
                | "begincidrange" | "beginnotdefrange" | "beginnotdefchar" => operands.clear(),
                "endcodespacerange" => {
                    for pair in operands.chunks_exact(2) {
                        cmap.declare_codespace(&pair[0], &pair[1])?;
                    }
                    operands.clear();
                }
                "endbfchar" | "endcidchar" => {
                    for pair in operands.chunks_exact(2) {
                        if let Some(code) = code_value(&pair[0]) {
                            cmap.add_mapping(code, &pair[1], 0)?;
                        }
                    }
                    operands.clear();
                }
                "endbfrange" | "endcidrange" => {
                    for triple in operands.chunks_exact(3) {
                        let (Some(low), Some(high)) = (code_value(&triple[0]), code_value(&triple[1]))
                        else {
                            continue;
                        };
                        for code in low..=high {
                            cmap.add_mapping(code, &triple[2], code - low)?;
                        }
                    }
                    operands.clear();
                }
                _ => operands.clear(),
            }
        }

        Ok(cmap)
    }

    /// Width in bytes of every code in this table (1 or 2), or 0 when the
    /// table declared no codespace and holds no mappings.
    pub fn code_width(&self) -> usize {
        self.code_width
    }

    /// Look up the Unicode string for a character code.
    ///
    /// Returns `None` if the code has no mapping in this CMap.
    pub fn lookup(&self, code: &[u8]) -> Option<&str> {
        self.forward.get(code).map(String::as_str)
    }

    /// Look up the code that encodes `text`.
    pub fn code_for(&self, text: &str) -> Option<&[u8]> {
        self.inverse.get(text).map(Vec::as_slice)
    }

    /// Returns the number of mappings in this CMap.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns true if this CMap has no mappings.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Decode a byte string to Unicode.
    ///
    /// At each position a one-byte code is tried first, then a two-byte code.
    /// A byte matching neither becomes [`PLACEHOLDER`]. Never fails.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut text = String::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if let Some(s) = self.lookup(&bytes[i..i + 1]) {
                text.push_str(s);
                i += 1;
            } else if let Some(s) = bytes.get(i..i + 2).and_then(|code| self.lookup(code)) {
                text.push_str(s);
                i += 2;
            } else {
                text.push(PLACEHOLDER);
                i += 1;
            }
        }
        text
    }

    /// Encode Unicode text to codes.
    ///
    /// This is not a character-by-character lookup: at each position the
    /// longest mapped string wins, so multi-character targets (ligatures)
    /// encode back to their single code. A lone character is only looked up
    /// when no longer target matches there. Characters with no mapping are
    /// dropped and reported in [`Encoded::unmapped`].
    pub fn encode(&self, text: &str) -> Encoded {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut encoded = Encoded::default();
        let mut i = 0;
        while i < chars.len() {
            let start = chars[i].0;
            let longest = self.longest_target.min(chars.len() - i);
            let hit = (1..=longest).rev().find_map(|n| {
                let end = chars.get(i + n).map_or(text.len(), |&(index, _)| index);
                self.code_for(&text[start..end]).map(|code| (n, code))
            });
            match hit {
                Some((n, code)) => {
                    encoded.bytes.extend_from_slice(code);
                    i += n;
                }
                None => {
                    encoded.unmapped.push(chars[i].1);
                    i += 1;
                }
            }
        }
        encoded
    }

    fn declare_codespace(&mut self, low: &Token, high: &Token) -> Result<(), BackendError> {
        let (Some(low), Some(high)) = (low.string_bytes(), high.string_bytes()) else {
            return Err(BackendError::CMap(
                "codespace range bounds must be strings".to_string(),
            ));
        };
        let width = low.len();
        if high.len() != width {
            return Err(BackendError::CMap(format!(
                "codespace range bounds differ in width ({width} and {})",
                high.len()
            )));
        }
        if !(1..=2).contains(&width) {
            return Err(BackendError::CMap(format!(
                "unsupported code width {width}"
            )));
        }
        if self.code_width != 0 && self.code_width != width {
            return Err(BackendError::CMap(format!(
                "mixed code widths {} and {width}",
                self.code_width
            )));
        }
        self.code_width = width;
        Ok(())
    }

    /// Register `code` → target. `offset` is the position of `code` in its range.
    fn add_mapping(&mut self, code: u32, target: &Token, offset: u32) -> Result<(), BackendError> {
        if self.code_width == 0 {
            return Err(BackendError::CMap(
                "mapping defined before any codespace range".to_string(),
            ));
        }
        let Some(key) = code_bytes(code, self.code_width) else {
            return Err(BackendError::CMap(format!(
                "code {code:#X} does not fit in {} byte(s)",
                self.code_width
            )));
        };

        let text = match &target.kind {
            TokenKind::LiteralString(bytes) | TokenKind::HexString(bytes) => {
                match shift_last(&decode_utf16be(bytes), offset) {
                    Some(text) => text,
                    None => return Ok(()),
                }
            }
            TokenKind::Array(items) => {
                match items.get(offset as usize).and_then(Token::string_bytes) {
                    Some(bytes) => decode_utf16be(bytes),
                    None => return Ok(()),
                }
            }
            // CID targets are glyph numbers, not text.
            _ => return Ok(()),
        };
        if text.is_empty() {
            return Ok(());
        }

        self.longest_target = self.longest_target.max(text.chars().count());
        self.inverse.insert(text.clone(), key.clone());
        self.forward.insert(key, text);
        Ok(())
    }
}

/// Numeric value of a code given as a string token.
fn code_value(token: &Token) -> Option<u32> {
    let bytes = token.string_bytes()?;
    if bytes.is_empty() || bytes.len() > 4 {
        return None;
    }
    Some(bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
}

fn code_bytes(code: u32, width: usize) -> Option<Vec<u8>> {
    match width {
        1 => u8::try_from(code).ok().map(|b| vec![b]),
        2 => u16::try_from(code).ok().map(|v| v.to_be_bytes().to_vec()),
        _ => None,
    }
}

/// Decode UTF-16BE bytes. A trailing odd byte is taken as its own code unit.
fn decode_utf16be(bytes: &[u8]) -> String {
    let units = bytes.chunks(2).map(|pair| match pair {
        [hi, lo] => u16::from_be_bytes([*hi, *lo]),
        [single] => u16::from(*single),
        _ => 0,
    });
    char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(PLACEHOLDER))
        .collect()
}

/// Add `offset` to the last code point of `text`.
fn shift_last(text: &str, offset: u32) -> Option<String> {
    if offset == 0 {
        return Some(text.to_string());
    }
    let mut chars: Vec<char> = text.chars().collect();
    let last = chars.last_mut()?;
    *last = char::from_u32(u32::from(*last) + offset)?;
    Some(chars.into_iter().collect())
}
