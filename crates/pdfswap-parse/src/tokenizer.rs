//! Content stream tokenizer.
//!
//! Turns raw content stream bytes into a flat list of top-level [`Token`]s.
//! Arrays, dictionaries and inline images are collapsed into single
//! structured tokens while they are read, so downstream passes never see
//! bracket nesting. Every token remembers the byte span it was read from,
//! which lets the serializer reproduce untouched input byte for byte.

use std::ops::Range;

use crate::error::BackendError;

/// A content stream value together with its location in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What was read.
    pub kind: TokenKind,
    /// Byte range in the source stream. `None` for synthesized tokens,
    /// which the serializer writes in canonical form.
    pub span: Option<Range<usize>>,
}

/// The closed set of token shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Operator keyword (e.g., `"BT"`, `"Tf"`, `"Tj"`, `"'"`), also `{` / `}`.
    Operator(String),
    /// Name object (e.g., `/F1`). Stored without the leading `/`.
    Name(String),
    /// Literal string delimited by parentheses, stored as unescaped bytes.
    LiteralString(Vec<u8>),
    /// Hexadecimal string delimited by angle brackets, stored as decoded bytes.
    HexString(Vec<u8>),
    /// Integer number (e.g., `42`, `-7`).
    Integer(i64),
    /// Real (floating-point) number (e.g., `3.14`, `.5`).
    Real(f64),
    /// Boolean value (`true` or `false`).
    Boolean(bool),
    /// The null object.
    Null,
    /// Array of tokens (e.g., the operand of `TJ`).
    Array(Vec<Token>),
    /// Dictionary (`<< /Key value ... >>`), keys unique, in source order.
    Dictionary(Vec<(String, Token)>),
    /// A `BI ... ID ... EI` block.
    InlineImage(InlineImage),
}

/// Inline image captured from a `BI ... ID ... EI` sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    /// Dictionary entries between `BI` and `ID`.
    pub dict: Vec<(String, Token)>,
    /// Raw image bytes between the whitespace after `ID` and the
    /// whitespace before `EI`, copied verbatim.
    pub data: Vec<u8>,
}

impl Token {
    /// A token without source location.
    pub fn new(kind: TokenKind) -> Self {
        Self { kind, span: None }
    }

    fn spanned(kind: TokenKind, span: Range<usize>) -> Self {
        Self {
            kind,
            span: Some(span),
        }
    }

    /// Returns the operator name if this token is an operator.
    pub fn operator(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Operator(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the name if this token is a name object.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the string bytes if this token is a literal or hex string.
    pub fn string_bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            TokenKind::LiteralString(bytes) | TokenKind::HexString(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns the elements if this token is an array.
    pub fn array(&self) -> Option<&[Token]> {
        match &self.kind {
            TokenKind::Array(items) => Some(items),
            _ => None,
        }
    }
}

/// Parse content stream bytes into top-level tokens.
///
/// Comments (`%` to end of line) are skipped.
///
/// # Errors
///
/// Returns [`BackendError::Parse`], with the byte offset of the failure, for
/// unbalanced brackets, odd dictionary content, non-name dictionary keys,
/// an inline image without a valid `EI`, and malformed strings or numbers.
pub fn tokenize(input: &[u8]) -> Result<Vec<Token>, BackendError> {
    let mut out = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut pos = 0;

    loop {
        skip_whitespace_and_comments(input, &mut pos);
        if pos >= input.len() {
            break;
        }
        let start = pos;

        if let Some(Frame::InlineData { .. }) = stack.last() {
            let keyword = parse_keyword(input, &mut pos);
            if keyword != "EI" {
                return Err(BackendError::at(start, "expected EI after inline image data"));
            }
            if let Some(Frame::InlineData { start: bi, dict, data }) = stack.pop() {
                let token = Token::spanned(
                    TokenKind::InlineImage(InlineImage { dict, data }),
                    bi..pos,
                );
                emit(&mut stack, &mut out, token);
            }
            continue;
        }

        let b = input[pos];
        let kind = match b {
            b'(' => TokenKind::LiteralString(parse_literal_string(input, &mut pos)?),
            b'<' if input.get(pos + 1) == Some(&b'<') => {
                pos += 2;
                stack.push(Frame::Dictionary {
                    start,
                    items: Vec::new(),
                });
                continue;
            }
            b'<' => TokenKind::HexString(parse_hex_string(input, &mut pos)?),
            b'>' if input.get(pos + 1) == Some(&b'>') => {
                pos += 2;
                let Some(Frame::Dictionary { start: open, items }) = stack.pop() else {
                    return Err(BackendError::at(start, "unbalanced '>>'"));
                };
                let dict = TokenKind::Dictionary(chunk_pairs(items, open)?);
                emit(&mut stack, &mut out, Token::spanned(dict, open..pos));
                continue;
            }
            b'[' => {
                pos += 1;
                stack.push(Frame::Array {
                    start,
                    items: Vec::new(),
                });
                continue;
            }
            b']' => {
                pos += 1;
                let Some(Frame::Array { start: open, items }) = stack.pop() else {
                    return Err(BackendError::at(start, "unbalanced ']'"));
                };
                emit(
                    &mut stack,
                    &mut out,
                    Token::spanned(TokenKind::Array(items), open..pos),
                );
                continue;
            }
            b'{' | b'}' => {
                pos += 1;
                TokenKind::Operator((b as char).to_string())
            }
            b')' | b'>' => {
                return Err(BackendError::at(
                    start,
                    format!("unexpected '{}'", b as char),
                ));
            }
            b'/' => TokenKind::Name(parse_name(input, &mut pos)),
            b'0'..=b'9' | b'+' | b'-' | b'.' => parse_number(input, &mut pos)?,
            _ => {
                let keyword = parse_keyword(input, &mut pos);
                match keyword.as_str() {
                    "true" => TokenKind::Boolean(true),
                    "false" => TokenKind::Boolean(false),
                    "null" => TokenKind::Null,
                    "BI" => {
                        stack.push(Frame::InlineImage {
                            start,
                            items: Vec::new(),
                        });
                        continue;
                    }
                    "ID" => {
                        let Some(Frame::InlineImage { start: bi, items }) = stack.pop() else {
                            return Err(BackendError::at(start, "ID outside inline image"));
                        };
                        let dict = chunk_pairs(items, bi)?;
                        // A single whitespace byte separates ID from the data.
                        if input.get(pos).is_some_and(|&b| is_whitespace(b)) {
                            pos += 1;
                        }
                        let Some(end) = scan_inline_data(input, pos) else {
                            return Err(BackendError::at(
                                bi,
                                "inline image without a valid EI terminator",
                            ));
                        };
                        let data = input[pos..end.max(pos)].to_vec();
                        pos = end;
                        stack.push(Frame::InlineData {
                            start: bi,
                            dict,
                            data,
                        });
                        continue;
                    }
                    "EI" => return Err(BackendError::at(start, "EI without inline image")),
                    _ => TokenKind::Operator(keyword),
                }
            }
        };
        emit(&mut stack, &mut out, Token::spanned(kind, start..pos));
    }

    if let Some(frame) = stack.last() {
        return Err(BackendError::at(frame.start(), frame.unterminated()));
    }
    Ok(out)
}

/// An open composite literal.
enum Frame {
    Array {
        start: usize,
        items: Vec<Token>,
    },
    Dictionary {
        start: usize,
        items: Vec<Token>,
    },
    /// Between `BI` and `ID`.
    InlineImage {
        start: usize,
        items: Vec<Token>,
    },
    /// Data read, waiting for `EI`.
    InlineData {
        start: usize,
        dict: Vec<(String, Token)>,
        data: Vec<u8>,
    },
}

impl Frame {
    fn start(&self) -> usize {
        match self {
            Frame::Array { start, .. }
            | Frame::Dictionary { start, .. }
            | Frame::InlineImage { start, .. }
            | Frame::InlineData { start, .. } => *start,
        }
    }

    fn unterminated(&self) -> &'static str {
        match self {
            Frame::Array { .. } => "unterminated array",
            Frame::Dictionary { .. } => "unterminated dictionary",
            Frame::InlineImage { .. } => "inline image without ID",
            Frame::InlineData { .. } => "inline image without EI",
        }
    }
}

/// Append a finished token to the innermost open frame, or yield it.
fn emit(stack: &mut [Frame], out: &mut Vec<Token>, token: Token) {
    match stack.last_mut() {
        Some(
            Frame::Array { items, .. }
            | Frame::Dictionary { items, .. }
            | Frame::InlineImage { items, .. },
        ) => items.push(token),
        // EI is handled before any other token is read in this state.
        Some(Frame::InlineData { .. }) => {}
        None => out.push(token),
    }
}

/// Turn flat dictionary content into key/value pairs.
///
/// A repeated key keeps its first position and takes the later value.
fn chunk_pairs(items: Vec<Token>, open: usize) -> Result<Vec<(String, Token)>, BackendError> {
    if items.len() % 2 != 0 {
        return Err(BackendError::at(open, "odd number of dictionary items"));
    }
    let mut pairs: Vec<(String, Token)> = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        let TokenKind::Name(key) = key.kind else {
            let at = key.span.map_or(open, |span| span.start);
            return Err(BackendError::at(at, "dictionary key is not a name"));
        };
        match pairs.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = value,
            None => pairs.push((key, value)),
        }
    }
    Ok(pairs)
}

#[derive(Clone, Copy, PartialEq)]
enum Scan {
    Data,
    SawE,
    SawEI,
}

/// Find the end of inline image data starting at `start`.
///
/// Returns the index of the whitespace byte preceding the terminating `EI`.
/// A candidate `EI` counts only when it is preceded by whitespace, followed
/// by whitespace (or the end of the stream), and the five bytes after that
/// are printable ASCII or line breaks.
fn scan_inline_data(input: &[u8], start: usize) -> Option<usize> {
    let mut state = Scan::Data;
    for (i, &b) in input.iter().enumerate().skip(start) {
        state = match state {
            Scan::SawEI if is_data_whitespace(b) && ei_terminates(input, start, i) => {
                return Some(i - 3);
            }
            _ if b == b'E' => Scan::SawE,
            Scan::SawE if b == b'I' => Scan::SawEI,
            _ => Scan::Data,
        };
    }
    (state == Scan::SawEI && ei_terminates(input, start, input.len())).then(|| input.len() - 3)
}

/// `after` is the index just past the candidate `EI`.
fn ei_terminates(input: &[u8], start: usize, after: usize) -> bool {
    if after < 3 || after - 3 + 1 < start {
        return false;
    }
    if !is_data_whitespace(input[after - 3]) {
        return false;
    }
    let tail = after + 1;
    input
        .get(tail.min(input.len())..(tail + 5).min(input.len()))
        .is_some_and(|next| {
            next.iter()
                .all(|&b| b == b'\n' || b == b'\r' || (0x20..=0x7E).contains(&b))
        })
}

fn is_data_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Returns `true` if `b` is a PDF whitespace character.
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

/// Returns `true` if `b` is a PDF delimiter character.
fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Skip whitespace and comments.
fn skip_whitespace_and_comments(input: &[u8], pos: &mut usize) {
    while *pos < input.len() {
        if is_whitespace(input[*pos]) {
            *pos += 1;
        } else if input[*pos] == b'%' {
            while *pos < input.len() && input[*pos] != b'\n' && input[*pos] != b'\r' {
                *pos += 1;
            }
        } else {
            break;
        }
    }
}

/// Parse a literal string `(...)` with balanced parentheses and escape sequences.
fn parse_literal_string(input: &[u8], pos: &mut usize) -> Result<Vec<u8>, BackendError> {
    let open = *pos;
    *pos += 1; // skip opening '('

    let mut result = Vec::new();
    let mut depth = 1u32;

    while *pos < input.len() {
        let b = input[*pos];
        match b {
            b'(' => {
                depth += 1;
                result.push(b'(');
                *pos += 1;
            }
            b')' => {
                depth -= 1;
                *pos += 1;
                if depth == 0 {
                    return Ok(result);
                }
                result.push(b')');
            }
            b'\\' => {
                *pos += 1;
                let Some(&escaped) = input.get(*pos) else {
                    break;
                };
                match escaped {
                    b'n' => result.push(b'\n'),
                    b'r' => result.push(b'\r'),
                    b't' => result.push(b'\t'),
                    b'b' => result.push(0x08),
                    b'f' => result.push(0x0C),
                    b'\r' => {
                        // Backslash + CR (or CR+LF) = line continuation
                        *pos += 1;
                        if input.get(*pos) == Some(&b'\n') {
                            *pos += 1;
                        }
                        continue;
                    }
                    b'\n' => {
                        *pos += 1;
                        continue;
                    }
                    b'0'..=b'7' => {
                        // Octal escape (1-3 digits)
                        let mut val = escaped - b'0';
                        for _ in 0..2 {
                            match input.get(*pos + 1) {
                                Some(&d @ b'0'..=b'7') => {
                                    *pos += 1;
                                    val = val.wrapping_mul(8).wrapping_add(d - b'0');
                                }
                                _ => break,
                            }
                        }
                        result.push(val);
                    }
                    // `\(`, `\)`, `\\` and unknown escapes keep the character.
                    _ => result.push(escaped),
                }
                *pos += 1;
            }
            _ => {
                result.push(b);
                *pos += 1;
            }
        }
    }

    Err(BackendError::at(open, "unterminated literal string"))
}

/// Parse a hex string `<...>`.
fn parse_hex_string(input: &[u8], pos: &mut usize) -> Result<Vec<u8>, BackendError> {
    let open = *pos;
    *pos += 1; // skip '<'

    let mut digits = Vec::new();
    loop {
        let Some(&b) = input.get(*pos) else {
            return Err(BackendError::at(open, "unterminated hex string"));
        };
        *pos += 1;
        if b == b'>' {
            break;
        }
        if is_whitespace(b) {
            continue;
        }
        digits.push(hex_digit(b).ok_or_else(|| {
            BackendError::at(*pos - 1, format!("invalid hex digit {:?}", b as char))
        })?);
    }

    // An odd final digit is padded with 0.
    if digits.len() % 2 != 0 {
        digits.push(0);
    }
    Ok(digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair[1])
        .collect())
}

/// Convert a hex digit character to its value (0-15).
pub(crate) fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Parse a `/Name` token. Assumes current byte is `/`.
fn parse_name(input: &[u8], pos: &mut usize) -> String {
    *pos += 1; // skip '/'

    let start = *pos;
    while *pos < input.len() && !is_whitespace(input[*pos]) && !is_delimiter(input[*pos]) {
        *pos += 1;
    }

    // Handle #XX hex escapes in names
    let raw = &input[start..*pos];
    let mut name = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' && i + 2 < raw.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(raw[i + 1]), hex_digit(raw[i + 2])) {
                name.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        name.push(raw[i]);
        i += 1;
    }

    String::from_utf8_lossy(&name).into_owned()
}

/// Parse a number (integer or real).
fn parse_number(input: &[u8], pos: &mut usize) -> Result<TokenKind, BackendError> {
    let start = *pos;
    let mut has_dot = false;

    if matches!(input.get(*pos), Some(b'+' | b'-')) {
        *pos += 1;
    }

    while let Some(&b) = input.get(*pos) {
        if b == b'.' && !has_dot {
            has_dot = true;
        } else if !b.is_ascii_digit() {
            break;
        }
        *pos += 1;
    }

    // Sign and dot are ASCII, so the slice is valid UTF-8.
    let text = String::from_utf8_lossy(&input[start..*pos]);
    let invalid = || BackendError::at(start, format!("invalid number {text:?}"));
    if has_dot {
        let text = match text.as_ref() {
            "." | "+." | "-." => return Err(invalid()),
            t => t.trim_start_matches('+'),
        };
        text.parse().map(TokenKind::Real).map_err(|_| invalid())
    } else {
        text.parse().map(TokenKind::Integer).map_err(|_| invalid())
    }
}

/// Parse a keyword: a run of regular (non-whitespace, non-delimiter) bytes.
fn parse_keyword(input: &[u8], pos: &mut usize) -> String {
    let start = *pos;
    while *pos < input.len() && !is_whitespace(input[*pos]) && !is_delimiter(input[*pos]) {
        *pos += 1;
    }
    String::from_utf8_lossy(&input[start..*pos]).into_owned()
}
