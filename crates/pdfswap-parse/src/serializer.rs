//! Content stream serialization.
//!
//! Untouched tokens are copied from the source stream byte for byte,
//! together with the whitespace and comments between them. Only string
//! tokens whose text unit was edited are re-encoded and written in the same
//! form (literal or hex) they were read in. Tokens without a source span
//! are written in canonical form.

use std::collections::HashMap;
use std::fmt::Write as _;

use pdfswap_core::{ExtractResult, ExtractWarning, ExtractWarningCode};

use crate::error::BackendError;
use crate::text_layer::{TextLayer, TokenPath};
use crate::tokenizer::{InlineImage, Token, TokenKind};

/// Serialize a text layer back to content stream bytes.
///
/// Characters of edited text that the unit's font cannot encode are dropped
/// and reported as [`ExtractWarningCode::UnmappedCharacter`] warnings.
///
/// # Errors
///
/// Returns [`BackendError::Encode`] if an edited unit's font has an
/// unsupported encoding.
pub fn serialize(layer: &TextLayer) -> Result<ExtractResult<Vec<u8>>, BackendError> {
    let mut warnings = Vec::new();
    let mut edits: HashMap<TokenPath, Vec<u8>> = HashMap::new();

    for (position, unit) in layer.units().iter().enumerate() {
        if !unit.is_edited() {
            continue;
        }
        let encoded = unit.encode()?;
        if !encoded.is_complete() {
            let dropped: String = encoded.unmapped.iter().collect();
            let mut warning = ExtractWarning::with_code(
                ExtractWarningCode::UnmappedCharacter,
                format!("dropped {dropped:?}: no code in the active font"),
            )
            .set_element(format!("text unit {position}"));
            warning.operator_index = Some(unit.path().token);
            warning.font_name = unit.font().map(|font| font.name().to_string());
            warnings.push(warning);
        }
        edits.insert(unit.path(), encoded.bytes);
    }

    let bytes = Writer {
        source: layer.source(),
        edits: &edits,
        out: Vec::with_capacity(layer.source().len()),
    }
    .run(layer.tokens());
    Ok(ExtractResult::with_warnings(bytes, warnings))
}

struct Writer<'a> {
    source: &'a [u8],
    edits: &'a HashMap<TokenPath, Vec<u8>>,
    out: Vec<u8>,
}

impl Writer<'_> {
    fn run(mut self, tokens: &[Token]) -> Vec<u8> {
        let mut cursor = 0;
        for (index, token) in tokens.iter().enumerate() {
            match self.source_span(token, cursor) {
                Some(span) => {
                    self.copy(cursor..span.start);
                    self.write_spanned(index, token);
                    cursor = span.end;
                }
                None => {
                    self.separate();
                    self.write_top(index, token);
                }
            }
        }
        self.copy(cursor..self.source.len());
        self.out
    }

    /// The token's span if it can be copied from the source at `cursor`.
    fn source_span(&self, token: &Token, cursor: usize) -> Option<std::ops::Range<usize>> {
        token
            .span
            .clone()
            .filter(|span| cursor <= span.start && span.end <= self.source.len())
    }

    fn copy(&mut self, range: std::ops::Range<usize>) {
        if let Some(bytes) = self.source.get(range) {
            self.out.extend_from_slice(bytes);
        }
    }

    fn separate(&mut self) {
        if self
            .out
            .last()
            .is_some_and(|&b| !matches!(b, b' ' | b'\n' | b'\r' | b'\t'))
        {
            self.out.push(b' ');
        }
    }

    fn write_spanned(&mut self, index: usize, token: &Token) {
        let Some(span) = token.span.clone() else {
            return;
        };
        if let Some(bytes) = self.edits.get(&TokenPath::top(index)) {
            write_string_like(&token.kind, bytes, &mut self.out);
            return;
        }
        let TokenKind::Array(items) = &token.kind else {
            self.copy(span);
            return;
        };
        let edited = (0..items.len()).any(|e| self.edits.contains_key(&TokenPath::element(index, e)));
        if !edited {
            self.copy(span);
            return;
        }
        if items.iter().any(|item| item.span.is_none()) {
            self.write_top(index, token);
            return;
        }

        let mut cursor = span.start;
        for (element, item) in items.iter().enumerate() {
            let (Some(bytes), Some(item_span)) = (
                self.edits.get(&TokenPath::element(index, element)),
                item.span.clone(),
            ) else {
                continue;
            };
            self.copy(cursor..item_span.start);
            write_string_like(&item.kind, bytes, &mut self.out);
            cursor = item_span.end;
        }
        self.copy(cursor..span.end);
    }

    /// Canonical form of a top-level token, with edits applied.
    fn write_top(&mut self, index: usize, token: &Token) {
        if let Some(bytes) = self.edits.get(&TokenPath::top(index)) {
            write_string_like(&token.kind, bytes, &mut self.out);
            return;
        }
        if let TokenKind::Array(items) = &token.kind {
            self.out.push(b'[');
            for (element, item) in items.iter().enumerate() {
                if element > 0 {
                    self.out.push(b' ');
                }
                match self.edits.get(&TokenPath::element(index, element)) {
                    Some(bytes) => write_string_like(&item.kind, bytes, &mut self.out),
                    None => write_token(item, &mut self.out),
                }
            }
            self.out.push(b']');
            return;
        }
        write_token(token, &mut self.out);
    }
}

/// Write `bytes` as a string in the same form as `kind`.
fn write_string_like(kind: &TokenKind, bytes: &[u8], out: &mut Vec<u8>) {
    match kind {
        TokenKind::HexString(_) => write_hex_string(bytes, out),
        _ => write_literal_string(bytes, out),
    }
}

/// Write a token in canonical form.
pub fn write_token(token: &Token, out: &mut Vec<u8>) {
    match &token.kind {
        TokenKind::Operator(op) => out.extend_from_slice(op.as_bytes()),
        TokenKind::Name(name) => write_name(name, out),
        TokenKind::LiteralString(bytes) => write_literal_string(bytes, out),
        TokenKind::HexString(bytes) => write_hex_string(bytes, out),
        TokenKind::Integer(n) => out.extend_from_slice(n.to_string().as_bytes()),
        TokenKind::Real(r) => out.extend_from_slice(format_real(*r).as_bytes()),
        TokenKind::Boolean(true) => out.extend_from_slice(b"true"),
        TokenKind::Boolean(false) => out.extend_from_slice(b"false"),
        TokenKind::Null => out.extend_from_slice(b"null"),
        TokenKind::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_token(item, out);
            }
            out.push(b']');
        }
        TokenKind::Dictionary(pairs) => {
            out.extend_from_slice(b"<<");
            write_pairs(pairs, out);
            out.extend_from_slice(b" >>");
        }
        TokenKind::InlineImage(InlineImage { dict, data }) => {
            out.extend_from_slice(b"BI");
            write_pairs(dict, out);
            out.extend_from_slice(b" ID ");
            out.extend_from_slice(data);
            out.extend_from_slice(b" EI");
        }
    }
}

fn write_pairs(pairs: &[(String, Token)], out: &mut Vec<u8>) {
    for (key, value) in pairs {
        out.push(b' ');
        write_name(key, out);
        out.push(b' ');
        write_token(value, out);
    }
}

fn write_name(name: &str, out: &mut Vec<u8>) {
    out.push(b'/');
    for &b in name.as_bytes() {
        let plain = (0x21..=0x7E).contains(&b)
            && !matches!(
                b,
                b'#' | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
            );
        if plain {
            out.push(b);
        } else {
            let mut escaped = String::with_capacity(3);
            let _ = write!(escaped, "#{b:02X}");
            out.extend_from_slice(escaped.as_bytes());
        }
    }
}

fn write_literal_string(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => out.extend_from_slice(&[b'\\', b]),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

fn write_hex_string(bytes: &[u8], out: &mut Vec<u8>) {
    let mut hex = String::with_capacity(bytes.len() * 2 + 2);
    hex.push('<');
    for b in bytes {
        let _ = write!(hex, "{b:02X}");
    }
    hex.push('>');
    out.extend_from_slice(hex.as_bytes());
}

fn format_real(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{value:.1}");
    }
    let text = format!("{value:.6}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
