//! Replacement rules: a search pattern paired with a transform.
//!
//! Patterns run over decoded Unicode text, never over raw content stream
//! bytes. Rules are opaque to the replacement engine: it only asks for the
//! pattern and for the replacement of each match.

use std::fmt;
use std::sync::Arc;

use regex::{Captures, NoExpand, Regex};

use crate::error::PdfError;

/// Options controlling how a rule pattern is compiled.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchOptions {
    /// Whether to interpret the pattern as a regex (default: `false`).
    /// When `false`, the pattern is treated as a literal string.
    pub regex: bool,
    /// Whether the search is case-sensitive (default: `false`).
    pub case_sensitive: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            regex: false,
            case_sensitive: false,
        }
    }
}

/// Compile a search pattern according to `options`.
///
/// # Errors
///
/// Returns [`PdfError::RuleError`] if the pattern is empty or is not a
/// valid regex.
pub fn compile_pattern(pattern: &str, options: &SearchOptions) -> Result<Regex, PdfError> {
    if pattern.is_empty() {
        return Err(PdfError::RuleError("empty search pattern".to_string()));
    }
    let body = if options.regex {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };
    let source = if options.case_sensitive {
        body
    } else {
        format!("(?i){body}")
    };
    Ok(Regex::new(&source)?)
}

type Transform = Arc<dyn Fn(&Captures<'_>) -> String + Send + Sync>;

/// A search pattern and the function producing the replacement for each match.
#[derive(Clone)]
pub struct Rule {
    pattern: Regex,
    transform: Transform,
    label: String,
}

impl Rule {
    /// Case-insensitive literal search replaced by fixed text.
    pub fn literal(find: &str, replacement: &str) -> Result<Self, PdfError> {
        let pattern = compile_pattern(find, &SearchOptions::default())?;
        let replacement = replacement.to_string();
        Ok(Self {
            pattern,
            label: format!("{find} -> {replacement}"),
            transform: Arc::new(move |_| replacement.clone()),
        })
    }

    /// Regex search; `replacement` may reference groups as `$1` / `${name}`.
    pub fn regex(
        pattern: &str,
        replacement: &str,
        options: &SearchOptions,
    ) -> Result<Self, PdfError> {
        let options = SearchOptions {
            regex: true,
            ..options.clone()
        };
        let pattern = compile_pattern(pattern, &options)?;
        let template = replacement.to_string();
        Ok(Self {
            label: format!("/{}/ -> {template}", pattern.as_str()),
            pattern,
            transform: Arc::new(move |caps| {
                let mut out = String::new();
                caps.expand(&template, &mut out);
                out
            }),
        })
    }

    /// Arbitrary transform over the captures of each match.
    pub fn with_transform<F>(pattern: Regex, transform: F) -> Self
    where
        F: Fn(&Captures<'_>) -> String + Send + Sync + 'static,
    {
        Self {
            label: format!("/{}/", pattern.as_str()),
            pattern,
            transform: Arc::new(transform),
        }
    }

    /// Replace the human-readable label used in reports.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The compiled search pattern.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Human-readable description of the rule.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Compute the replacement text for one match.
    pub fn replacement(&self, caps: &Captures<'_>) -> String {
        (self.transform)(caps)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("pattern", &self.pattern.as_str())
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A person's name split into first name and surname.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PersonName {
    /// Given name (first whitespace-separated word).
    pub first: String,
    /// Surname (everything after the first word).
    pub last: String,
}

impl PersonName {
    /// Create a name from its parts.
    pub fn new(first: impl Into<String>, last: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            last: last.into(),
        }
    }

    /// Parse `"First Last"`. Returns `None` unless there are at least two words.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let first = words.next()?;
        let rest: Vec<&str> = words.collect();
        if rest.is_empty() {
            return None;
        }
        Some(Self::new(first, rest.join(" ")))
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.last)
    }
}

/// Substitute one person's name with another.
///
/// Matches, case-insensitively and surrounded by whitespace, the full name,
/// the first name alone, or the surname alone. Inside each match the old first
/// name becomes the new first name and the old surname the new surname.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NameSwap {
    /// The name found in the document.
    pub old: PersonName,
    /// The name written in its place.
    pub new: PersonName,
}

impl NameSwap {
    /// Create a swap from `old` to `new`.
    pub fn new(old: PersonName, new: PersonName) -> Self {
        Self { old, new }
    }

    /// Parse both sides from `"Old Name"` / `"New Name"` strings.
    pub fn parse(old: &str, new: &str) -> Result<Self, PdfError> {
        let parse_side = |text: &str| {
            PersonName::parse(text).ok_or_else(|| {
                PdfError::RuleError(format!("expected \"First Last\", got {text:?}"))
            })
        };
        Ok(Self::new(parse_side(old)?, parse_side(new)?))
    }

    /// Build name swaps from `old -> new` string pairs (e.g. a JSON name map).
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Vec<Self>, PdfError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        pairs
            .into_iter()
            .map(|(old, new)| Self::parse(old.as_ref(), new.as_ref()))
            .collect()
    }

    /// Compile this swap into a [`Rule`].
    pub fn to_rule(&self) -> Result<Rule, PdfError> {
        let first = regex::escape(&self.old.first);
        let last = regex::escape(&self.old.last);
        let pattern = Regex::new(&format!(r"(?i)\s({first}\s{last}|{first}|{last})\s"))?;
        let first_re = Regex::new(&format!("(?i){first}"))?;
        let last_re = Regex::new(&format!("(?i){last}"))?;
        let new_first = self.new.first.clone();
        let new_last = self.new.last.clone();

        let rule = Rule::with_transform(pattern, move |caps| {
            let matched = caps.get(0).map_or("", |m| m.as_str());
            let step = first_re.replace_all(matched, NoExpand(&new_first));
            last_re.replace_all(&step, NoExpand(&new_last)).into_owned()
        });
        Ok(rule.labeled(format!("{} -> {}", self.old, self.new)))
    }
}
