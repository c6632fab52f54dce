//! pdfswap-core: Backend-independent types and the text replacement engine.
//!
//! This crate provides the error and warning taxonomy shared by the pdfswap
//! crates, the [`RewriteOptions`] configuration, replacement [`Rule`]s
//! (including [`NameSwap`] for person names), and the replacement engine that
//! splices matches back onto the text cells that produced them. It does no
//! PDF parsing.

#![deny(missing_docs)]

/// Error, warning and option types.
pub mod error;
/// Matching rules over decoded text.
pub mod rules;
/// The replacement engine.
pub mod replace;

pub use error::{
    ExtractResult, ExtractWarning, ExtractWarningCode, MatchScope, PdfError, RewriteOptions,
};
pub use replace::{ReplaceReport, TextCell, apply_rule, apply_rules};
pub use rules::{NameSwap, PersonName, Rule, SearchOptions, compile_pattern};
