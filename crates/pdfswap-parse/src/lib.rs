//! pdfswap-parse: content stream, font and document layer.
//!
//! This crate tokenizes page content streams, decodes shown strings through
//! simple encodings and ToUnicode CMaps, builds the per-page text layer the
//! replacement engine edits, and serializes edited pages back to bytes. The
//! [`LopdfBackend`] supplies pages and resource scopes from a PDF document
//! and writes rewritten content streams back. It depends on pdfswap-core for
//! shared types.

pub mod backend;
pub mod cmap;
pub mod encoding;
pub mod error;
pub mod font;
pub mod lopdf_backend;
pub mod serializer;
pub mod text_layer;
pub mod tokenizer;

pub use backend::PdfBackend;
pub use cmap::CMap;
pub use encoding::{Encoded, SimpleEncoding};
pub use error::BackendError;
pub use font::{
    CMapCache, CMapSource, Font, FontDescriptor, FontResolver, ResourceScope, StreamKey,
};
pub use lopdf_backend::{LopdfBackend, LopdfDocument, LopdfPage};
pub use pdfswap_core;
pub use serializer::{serialize, write_token};
pub use text_layer::{TextLayer, TextUnit, TokenPath, build_from_tokens, build_text_layer};
pub use tokenizer::{InlineImage, Token, TokenKind, tokenize};
