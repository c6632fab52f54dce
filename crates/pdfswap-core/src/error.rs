//! Error and warning types for pdfswap.
//!
//! Provides [`PdfError`] for fatal errors that stop processing,
//! [`ExtractWarning`] for non-fatal issues that allow best-effort continuation,
//! [`ExtractResult`] for pairing a value with collected warnings, and
//! [`RewriteOptions`] for configuring limits, warning behavior and the
//! match space used by the replacement engine.

use std::fmt;

/// Fatal error types for PDF text rewriting.
///
/// These errors indicate conditions that prevent further processing
/// of the document or of the current page.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfError {
    /// Structural error in a content stream or CMap (unbalanced brackets,
    /// odd dictionary content, missing inline image terminator, ...).
    ParseError(String),
    /// I/O error reading or writing PDF data.
    IoError(String),
    /// Error resolving font or CMap information.
    FontError(String),
    /// Replacement text could not be encoded for the font in effect.
    EncodeError(String),
    /// A replacement rule could not be built (e.g. invalid pattern).
    RuleError(String),
    /// A configured resource limit was exceeded.
    ResourceLimitExceeded {
        /// Name of the limit that was exceeded (e.g., "max_stream_bytes").
        limit_name: String,
        /// The configured limit value.
        limit_value: usize,
        /// The actual value that exceeded the limit.
        actual_value: usize,
    },
    /// The PDF is encrypted; it must be unlocked before rewriting.
    PasswordRequired,
    /// A failure tied to one page (0-indexed).
    PageError {
        /// Index of the page at fault.
        page: usize,
        /// The underlying error.
        source: Box<PdfError>,
    },
    /// Any other error not covered by specific variants.
    Other(String),
}

impl PdfError {
    /// Attach page context to this error.
    ///
    /// Errors that already carry a page are returned unchanged.
    pub fn on_page(self, page: usize) -> Self {
        match self {
            PdfError::PageError { .. } => self,
            other => PdfError::PageError {
                page,
                source: Box::new(other),
            },
        }
    }

    /// The page this error is attributed to, if any.
    pub fn page(&self) -> Option<usize> {
        match self {
            PdfError::PageError { page, .. } => Some(*page),
            _ => None,
        }
    }
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::ParseError(msg) => write!(f, "parse error: {msg}"),
            PdfError::IoError(msg) => write!(f, "I/O error: {msg}"),
            PdfError::FontError(msg) => write!(f, "font error: {msg}"),
            PdfError::EncodeError(msg) => write!(f, "encode error: {msg}"),
            PdfError::RuleError(msg) => write!(f, "rule error: {msg}"),
            PdfError::ResourceLimitExceeded {
                limit_name,
                limit_value,
                actual_value,
            } => write!(
                f,
                "resource limit exceeded: {limit_name} (limit: {limit_value}, actual: {actual_value})"
            ),
            PdfError::PasswordRequired => {
                write!(f, "PDF is encrypted; unlock it before rewriting")
            }
            PdfError::PageError { page, source } => write!(f, "page {}: {source}", page + 1),
            PdfError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for PdfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PdfError::PageError { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PdfError {
    fn from(err: std::io::Error) -> Self {
        PdfError::IoError(err.to_string())
    }
}

impl From<regex::Error> for PdfError {
    fn from(err: regex::Error) -> Self {
        PdfError::RuleError(err.to_string())
    }
}

/// Machine-readable warning code for categorizing rewrite issues.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", content = "detail")
)]
pub enum ExtractWarningCode {
    /// A font selected with `Tf` was not found in the page's resource scopes.
    MissingFont,
    /// Text was shown with no active font and decoded as Latin-1.
    EncodingFallback,
    /// The font uses an encoding outside the supported set; its text was
    /// decoded as placeholders and cannot be re-encoded.
    UnsupportedEncoding,
    /// A character of replacement text has no code in the active font and
    /// was dropped from the output.
    UnmappedCharacter,
    /// Any other warning not covered by specific variants.
    Other(String),
}

impl ExtractWarningCode {
    /// Returns the string tag for this warning code.
    pub fn as_str(&self) -> &str {
        match self {
            ExtractWarningCode::MissingFont => "MISSING_FONT",
            ExtractWarningCode::EncodingFallback => "ENCODING_FALLBACK",
            ExtractWarningCode::UnsupportedEncoding => "UNSUPPORTED_ENCODING",
            ExtractWarningCode::UnmappedCharacter => "UNMAPPED_CHARACTER",
            ExtractWarningCode::Other(_) => "OTHER",
        }
    }
}

impl fmt::Display for ExtractWarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal warning encountered while reading or rewriting text.
///
/// Warnings allow best-effort continuation (e.g. an unresolvable font, a
/// character with no glyph code). They include a structured
/// [`code`](ExtractWarning::code), a human-readable description, and
/// optional source location context.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractWarning {
    /// Machine-readable warning code.
    pub code: ExtractWarningCode,
    /// Human-readable description of the warning.
    pub description: String,
    /// Page number where the warning occurred (0-indexed), if applicable.
    pub page: Option<usize>,
    /// Element context (e.g. "text unit 12").
    pub element: Option<String>,
    /// Index of the token in the content stream where the warning occurred.
    pub operator_index: Option<usize>,
    /// Font resource name associated with the warning, if applicable.
    pub font_name: Option<String>,
}

impl ExtractWarning {
    /// Create a warning with just a description.
    ///
    /// Uses [`ExtractWarningCode::Other`] as the default code.
    pub fn new(description: impl Into<String>) -> Self {
        let desc = description.into();
        Self {
            code: ExtractWarningCode::Other(desc.clone()),
            description: desc,
            page: None,
            element: None,
            operator_index: None,
            font_name: None,
        }
    }

    /// Create a warning with a specific code and description.
    pub fn with_code(code: ExtractWarningCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            page: None,
            element: None,
            operator_index: None,
            font_name: None,
        }
    }

    /// Create a warning with operator and font context.
    pub fn with_operator_context(
        description: impl Into<String>,
        operator_index: usize,
        font_name: impl Into<String>,
    ) -> Self {
        let desc = description.into();
        Self {
            code: ExtractWarningCode::Other(desc.clone()),
            description: desc,
            page: None,
            element: None,
            operator_index: Some(operator_index),
            font_name: Some(font_name.into()),
        }
    }

    /// Set the warning code, returning the modified warning (builder pattern).
    pub fn set_code(mut self, code: ExtractWarningCode) -> Self {
        self.code = code;
        self
    }

    /// Set the page, returning the modified warning (builder pattern).
    pub fn set_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the element context, returning the modified warning.
    pub fn set_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Convert this warning into a [`PdfError`].
    ///
    /// Used by strict mode to escalate warnings to errors.
    pub fn to_error(&self) -> PdfError {
        let err = PdfError::Other(self.to_string());
        match self.page {
            Some(page) => err.on_page(page),
            None => err,
        }
    }
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.description)?;
        if let Some(page) = self.page {
            write!(f, " (page {})", page + 1)?;
        }
        if let Some(ref font_name) = self.font_name {
            write!(f, " [font {font_name}]")?;
        }
        if let Some(index) = self.operator_index {
            write!(f, " [token #{index}]")?;
        }
        if let Some(ref element) = self.element {
            write!(f, " [{element}]")?;
        }
        Ok(())
    }
}

/// Result wrapper that pairs a value with collected warnings.
#[derive(Debug, Clone)]
pub struct ExtractResult<T> {
    /// The produced value.
    pub value: T,
    /// Warnings collected while producing it.
    pub warnings: Vec<ExtractWarning>,
}

impl<T> ExtractResult<T> {
    /// Create a result with no warnings.
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Create a result with warnings.
    pub fn with_warnings(value: T, warnings: Vec<ExtractWarning>) -> Self {
        Self { value, warnings }
    }

    /// Returns true if there are no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Transform the value while preserving warnings.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractResult<U> {
        ExtractResult {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// The text space a rule's pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchScope {
    /// All pages are concatenated into one buffer; matches may cross pages.
    #[default]
    Document,
    /// Each page is matched on its own.
    Page,
}

/// Options controlling rewrite behavior and resource limits.
#[derive(Debug, Clone)]
pub struct RewriteOptions {
    /// Maximum content stream bytes per page (default: 100 MB).
    pub max_stream_bytes: usize,
    /// Whether to collect warnings (default: true).
    pub collect_warnings: bool,
    /// When true, any warning is escalated to an error (default: false).
    pub strict_mode: bool,
    /// Match space for replacement rules (default: [`MatchScope::Document`]).
    pub match_scope: MatchScope,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            max_stream_bytes: 100 * 1024 * 1024,
            collect_warnings: true,
            strict_mode: false,
            match_scope: MatchScope::Document,
        }
    }
}

impl RewriteOptions {
    /// Apply the warning policy to a batch of warnings.
    ///
    /// Returns the first warning as an error in strict mode, drops all of
    /// them when collection is disabled, and passes them through otherwise.
    pub fn screen(&self, warnings: Vec<ExtractWarning>) -> Result<Vec<ExtractWarning>, PdfError> {
        if self.strict_mode {
            if let Some(first) = warnings.first() {
                return Err(first.to_error());
            }
        }
        if self.collect_warnings {
            Ok(warnings)
        } else {
            Ok(Vec::new())
        }
    }
}
