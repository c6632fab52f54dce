//! Error types for the parsing and rewriting layers.
//!
//! Uses [`thiserror`] for ergonomic error derivation. Provides [`BackendError`]
//! that wraps backend-specific errors and converts them to [`PdfError`].

use pdfswap_core::PdfError;
use thiserror::Error;

/// Error type for content stream, CMap and document backend operations.
///
/// Wraps backend-specific errors and provides conversion to [`PdfError`]
/// for unified error handling across the library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Structural error in a content stream or the document.
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Malformed or inconsistent CMap stream.
    #[error("CMap error: {0}")]
    CMap(String),

    /// Error resolving font or encoding information.
    #[error("font error: {0}")]
    Font(String),

    /// Replacement text cannot be encoded for the font in effect.
    #[error("encode error: {0}")]
    Encode(String),

    /// Error reading or writing PDF data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A core library error.
    #[error(transparent)]
    Core(#[from] PdfError),
}

impl BackendError {
    /// Structural error at a byte offset of the stream being tokenized.
    pub(crate) fn at(offset: usize, msg: impl std::fmt::Display) -> Self {
        BackendError::Parse(format!("{msg} at byte {offset}"))
    }
}

impl From<lopdf::Error> for BackendError {
    fn from(err: lopdf::Error) -> Self {
        BackendError::Parse(err.to_string())
    }
}

impl From<BackendError> for PdfError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Parse(msg) => PdfError::ParseError(msg),
            BackendError::CMap(msg) => PdfError::FontError(format!("CMap: {msg}")),
            BackendError::Font(msg) => PdfError::FontError(msg),
            BackendError::Encode(msg) => PdfError::EncodeError(msg),
            BackendError::Io(e) => PdfError::IoError(e.to_string()),
            BackendError::Core(e) => e,
        }
    }
}
