//! pdfswap: find and replace text in PDF documents without disturbing layout.
//!
//! This is the public API facade crate for pdfswap. It re-exports types from
//! pdfswap-core and uses pdfswap-parse for content stream processing.
//!
//! # Architecture
//!
//! - **pdfswap-core**: Backend-independent types, rules and the replacement engine
//! - **pdfswap-parse**: Tokenizer, CMaps, font resolution, text layer and serializer
//! - **pdfswap** (this crate): Public API that ties everything together
//!
//! # Example
//!
//! ```ignore
//! use pdfswap::{NameSwap, Pdf};
//!
//! let mut pdf = Pdf::open_file("letter.pdf", None)?;
//! let rule = NameSwap::parse("John Smith", "Maria Garcia")?.to_rule()?;
//! let result = pdf.rewrite(&[rule])?;
//! for warning in &result.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! pdf.save("letter-renamed.pdf")?;
//! ```

mod pdf;
mod rewrite;

pub use pdf::{Pdf, RewriteSummary};
pub use rewrite::apply_to_layers;

pub use pdfswap_core;
pub use pdfswap_core::{
    ExtractResult, ExtractWarning, ExtractWarningCode, MatchScope, NameSwap, PdfError,
    PersonName, ReplaceReport, RewriteOptions, Rule, SearchOptions, TextCell, apply_rule,
    apply_rules,
};
pub use pdfswap_parse;
pub use pdfswap_parse::{
    CMapCache, Font, TextLayer, TextUnit, Token, TokenKind, TokenPath, serialize, tokenize,
};
