//! Text layer construction.
//!
//! Walks a tokenized page, tracks the font selected with `Tf`, and turns
//! every string shown with `Tj`, `'`, `"` or `TJ` into a [`TextUnit`]. A unit
//! is a view onto one string token: it records where the token lives in the
//! page's token list, its raw bytes, the font it was shown with, and its
//! current decoded text.

use std::collections::HashSet;
use std::sync::Arc;

use pdfswap_core::{ExtractResult, ExtractWarning, ExtractWarningCode, TextCell};

use crate::encoding::Encoded;
use crate::error::BackendError;
use crate::font::{Font, FontResolver, decode_without_font, encode_without_font};
use crate::tokenizer::{Token, TokenKind, tokenize};

/// Location of a string token within a page's token list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenPath {
    /// Index of the top-level token.
    pub token: usize,
    /// Index inside the token's array, for strings shown with `TJ`.
    pub element: Option<usize>,
}

impl TokenPath {
    /// Path of a top-level string token.
    pub fn top(token: usize) -> Self {
        Self {
            token,
            element: None,
        }
    }

    /// Path of a string inside an array token.
    pub fn element(token: usize, element: usize) -> Self {
        Self {
            token,
            element: Some(element),
        }
    }
}

/// One shown string, decoded.
#[derive(Debug, Clone)]
pub struct TextUnit {
    path: TokenPath,
    raw: Vec<u8>,
    font: Option<Arc<Font>>,
    original: String,
    decoded: String,
}

impl TextUnit {
    /// Decode `raw` with `font` (Latin-1 when there is none).
    pub fn new(path: TokenPath, raw: Vec<u8>, font: Option<Arc<Font>>) -> Self {
        let original = match &font {
            Some(font) => font.decode(&raw),
            None => decode_without_font(&raw),
        };
        Self {
            path,
            raw,
            decoded: original.clone(),
            original,
            font,
        }
    }

    /// Where the backing string token lives.
    pub fn path(&self) -> TokenPath {
        self.path
    }

    /// The string's bytes as read.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The font active when the string was shown.
    pub fn font(&self) -> Option<&Arc<Font>> {
        self.font.as_ref()
    }

    /// The text as first decoded.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The current text.
    pub fn decoded(&self) -> &str {
        &self.decoded
    }

    /// Returns true if the current text differs from the original decoding.
    pub fn is_edited(&self) -> bool {
        self.decoded != self.original
    }

    /// Encode the current text through the unit's font.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Encode`] if the font's encoding is unsupported.
    pub fn encode(&self) -> Result<Encoded, BackendError> {
        match &self.font {
            Some(font) => font.encode(&self.decoded),
            None => Ok(encode_without_font(&self.decoded)),
        }
    }
}

impl TextCell for TextUnit {
    fn text(&self) -> &str {
        &self.decoded
    }

    fn set_text(&mut self, text: String) {
        self.decoded = text;
    }
}

/// A page's content stream with its tokens and text units.
#[derive(Debug, Clone)]
pub struct TextLayer {
    source: Vec<u8>,
    tokens: Vec<Token>,
    units: Vec<TextUnit>,
}

impl TextLayer {
    /// The content stream bytes the layer was built from.
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Top-level tokens of the content stream.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Text units in content stream order.
    pub fn units(&self) -> &[TextUnit] {
        &self.units
    }

    /// Mutable access to the units, for the replacement engine.
    pub fn units_mut(&mut self) -> &mut [TextUnit] {
        &mut self.units
    }

    /// The page's current text: every unit's decoded value, concatenated.
    pub fn text(&self) -> String {
        self.units.iter().map(TextUnit::decoded).collect()
    }

    /// Returns true if any unit's text differs from its original decoding.
    pub fn is_edited(&self) -> bool {
        self.units.iter().any(TextUnit::is_edited)
    }
}

/// Operand lookback over the tokens since the last operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookback {
    Idle,
    One(usize),
    Two(usize, usize),
}

impl Lookback {
    fn push(self, index: usize) -> Self {
        match self {
            Lookback::Idle => Lookback::One(index),
            Lookback::One(first) | Lookback::Two(_, first) => Lookback::Two(first, index),
        }
    }

    fn last(self) -> Option<usize> {
        match self {
            Lookback::Idle => None,
            Lookback::One(last) | Lookback::Two(_, last) => Some(last),
        }
    }

    fn last_two(self) -> Option<(usize, usize)> {
        match self {
            Lookback::Two(first, second) => Some((first, second)),
            _ => None,
        }
    }
}

/// Operand shapes the builder acts on.
enum Show {
    /// `/Name size Tf`
    SelectFont,
    /// `string Tj`, `string '`, `aw ac string "`
    String,
    /// `array TJ`
    Array,
}

fn classify(operator: &str) -> Option<Show> {
    match operator {
        "Tf" => Some(Show::SelectFont),
        "Tj" | "'" | "\"" => Some(Show::String),
        "TJ" => Some(Show::Array),
        _ => None,
    }
}

fn is_number(token: &Token) -> bool {
    matches!(token.kind, TokenKind::Integer(_) | TokenKind::Real(_))
}

/// Tokenize `content` and build its text layer.
///
/// # Errors
///
/// Returns [`BackendError::Parse`] if the content stream is malformed and
/// [`BackendError::CMap`] if a referenced ToUnicode CMap is.
pub fn build_text_layer(
    content: Vec<u8>,
    fonts: &mut FontResolver<'_>,
) -> Result<ExtractResult<TextLayer>, BackendError> {
    let tokens = tokenize(&content)?;
    build_from_tokens(content, tokens, fonts)
}

/// Build a text layer over already tokenized content.
///
/// # Errors
///
/// Returns [`BackendError::CMap`] if a referenced ToUnicode CMap is malformed.
pub fn build_from_tokens(
    source: Vec<u8>,
    tokens: Vec<Token>,
    fonts: &mut FontResolver<'_>,
) -> Result<ExtractResult<TextLayer>, BackendError> {
    let mut units = Vec::new();
    let mut warnings = Vec::new();
    let mut font: Option<Arc<Font>> = None;
    let mut font_name: Option<String> = None;
    let mut flagged: HashSet<String> = HashSet::new();
    let mut lookback = Lookback::Idle;
    let mut fallback_noted = false;

    for (index, token) in tokens.iter().enumerate() {
        let Some(operator) = token.operator() else {
            lookback = lookback.push(index);
            continue;
        };
        let operands = std::mem::replace(&mut lookback, Lookback::Idle);

        match classify(operator) {
            Some(Show::SelectFont) => {
                let Some((name_at, size_at)) = operands.last_two() else {
                    continue;
                };
                let (Some(name), true) = (tokens[name_at].name(), is_number(&tokens[size_at]))
                else {
                    continue;
                };
                font = fonts.resolve(name)?;
                font_name = Some(name.to_string());
                match &font {
                    None => warnings.push(
                        ExtractWarning::with_operator_context(
                            format!("font /{name} not found in page resources"),
                            index,
                            name,
                        )
                        .set_code(ExtractWarningCode::MissingFont),
                    ),
                    Some(resolved) => {
                        if let Font::Unsupported { encoding, .. } = resolved.as_ref() {
                            if flagged.insert(name.to_string()) {
                                warnings.push(
                                    ExtractWarning::with_operator_context(
                                        format!(
                                            "font /{name} uses unsupported encoding {}",
                                            encoding.as_deref().unwrap_or("(none)")
                                        ),
                                        index,
                                        name,
                                    )
                                    .set_code(ExtractWarningCode::UnsupportedEncoding),
                                );
                            }
                        }
                    }
                }
            }
            Some(Show::String) => {
                let Some(at) = operands.last() else {
                    continue;
                };
                let Some(bytes) = tokens[at].string_bytes() else {
                    continue;
                };
                push_unit(&mut units, TokenPath::top(at), bytes, &font);
                note_fallback(&mut warnings, &mut fallback_noted, font_name.as_deref(), index);
            }
            Some(Show::Array) => {
                let Some(at) = operands.last() else {
                    continue;
                };
                let Some(items) = tokens[at].array() else {
                    continue;
                };
                for (element, item) in items.iter().enumerate() {
                    if let Some(bytes) = item.string_bytes() {
                        push_unit(&mut units, TokenPath::element(at, element), bytes, &font);
                    }
                }
                note_fallback(&mut warnings, &mut fallback_noted, font_name.as_deref(), index);
            }
            None => {}
        }
    }

    Ok(ExtractResult::with_warnings(
        TextLayer {
            source,
            tokens,
            units,
        },
        warnings,
    ))
}

fn push_unit(units: &mut Vec<TextUnit>, path: TokenPath, bytes: &[u8], font: &Option<Arc<Font>>) {
    let unit = TextUnit::new(path, bytes.to_vec(), font.clone());
    if !unit.original.is_empty() {
        units.push(unit);
    }
}

/// Text shown before any `Tf` is decoded as Latin-1; note it once per page.
fn note_fallback(
    warnings: &mut Vec<ExtractWarning>,
    noted: &mut bool,
    font_name: Option<&str>,
    index: usize,
) {
    if *noted || font_name.is_some() {
        return;
    }
    *noted = true;
    let mut warning = ExtractWarning::with_code(
        ExtractWarningCode::EncodingFallback,
        "text shown without a font decoded as Latin-1",
    );
    warning.operator_index = Some(index);
    warnings.push(warning);
}
