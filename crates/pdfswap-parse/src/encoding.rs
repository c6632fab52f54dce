//! Single-byte text encodings used by simple fonts.
//!
//! Decoding goes through `encoding_rs`. Encoding uses an inverse table built
//! once per encoding by decoding every byte value, so a decoded character
//! always encodes back to the byte it came from.

use std::collections::HashMap;
use std::sync::LazyLock;

use encoding_rs::Encoding;

/// Result of encoding Unicode text into font bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoded {
    /// The encoded bytes.
    pub bytes: Vec<u8>,
    /// Characters that had no code and were dropped, in input order.
    pub unmapped: Vec<char>,
}

impl Encoded {
    /// Returns true if every character was encoded.
    pub fn is_complete(&self) -> bool {
        self.unmapped.is_empty()
    }
}

/// The closed set of 8-bit encodings understood for simple fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimpleEncoding {
    /// `/WinAnsiEncoding` (Windows code page 1252).
    WinAnsi,
    /// `/MacRomanEncoding`.
    MacRoman,
    /// ISO 8859-1, used when no font is active.
    Latin1,
}

/// Bytes code page 1252 leaves undefined. `encoding_rs` passes them through
/// as C1 controls; they decode to U+FFFD here and have no inverse.
const WIN_ANSI_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

static WIN_ANSI_INVERSE: LazyLock<HashMap<char, u8>> =
    LazyLock::new(|| inverse_table(encoding_rs::WINDOWS_1252, &WIN_ANSI_UNDEFINED));
static MAC_ROMAN_INVERSE: LazyLock<HashMap<char, u8>> =
    LazyLock::new(|| inverse_table(encoding_rs::MACINTOSH, &[]));

fn inverse_table(encoding: &'static Encoding, undefined: &[u8]) -> HashMap<char, u8> {
    let mut table = HashMap::with_capacity(256);
    for byte in 0..=u8::MAX {
        if undefined.contains(&byte) {
            continue;
        }
        let bytes = [byte];
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes);
        if had_errors {
            continue;
        }
        if let Some(ch) = text.chars().next() {
            table.entry(ch).or_insert(byte);
        }
    }
    table
}

impl SimpleEncoding {
    /// Map a PDF encoding name (without the leading `/`) to an encoding.
    pub fn from_pdf_name(name: &str) -> Option<Self> {
        match name {
            "WinAnsiEncoding" => Some(SimpleEncoding::WinAnsi),
            "MacRomanEncoding" => Some(SimpleEncoding::MacRoman),
            _ => None,
        }
    }

    /// The PDF name of this encoding, or `"Latin-1"` for the fallback.
    pub fn name(&self) -> &'static str {
        match self {
            SimpleEncoding::WinAnsi => "WinAnsiEncoding",
            SimpleEncoding::MacRoman => "MacRomanEncoding",
            SimpleEncoding::Latin1 => "Latin-1",
        }
    }

    /// Decode bytes, one character per byte. Invalid bytes become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            SimpleEncoding::WinAnsi => decode_with(encoding_rs::WINDOWS_1252, bytes)
                .chars()
                .zip(bytes)
                .map(|(ch, byte)| {
                    if WIN_ANSI_UNDEFINED.contains(byte) {
                        char::REPLACEMENT_CHARACTER
                    } else {
                        ch
                    }
                })
                .collect(),
            SimpleEncoding::MacRoman => decode_with(encoding_rs::MACINTOSH, bytes),
            SimpleEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }

    /// Encode text, dropping characters the encoding cannot represent.
    pub fn encode(&self, text: &str) -> Encoded {
        let mut encoded = Encoded {
            bytes: Vec::with_capacity(text.len()),
            unmapped: Vec::new(),
        };
        for ch in text.chars() {
            match self.encode_char(ch) {
                Some(byte) => encoded.bytes.push(byte),
                None => encoded.unmapped.push(ch),
            }
        }
        encoded
    }

    fn encode_char(&self, ch: char) -> Option<u8> {
        match self {
            SimpleEncoding::WinAnsi => WIN_ANSI_INVERSE.get(&ch).copied(),
            SimpleEncoding::MacRoman => MAC_ROMAN_INVERSE.get(&ch).copied(),
            SimpleEncoding::Latin1 => u8::try_from(u32::from(ch)).ok(),
        }
    }
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> String {
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}
