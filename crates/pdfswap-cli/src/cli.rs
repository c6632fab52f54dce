use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Find and replace text in PDF documents.
#[derive(Debug, Parser)]
#[command(name = "pdfswap", about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the decoded text of PDF pages
    Text {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Replace names and patterns, then save the result
    Replace(ReplaceArgs),
}

/// Arguments of the `replace` subcommand.
///
/// Rules run in this order: config names, `--name`, `--literal`, `--regex`.
#[derive(Debug, clap::Args)]
pub struct ReplaceArgs {
    /// Path to the input PDF file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Path of the PDF file to write
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Swap a person's name, as 'Old Name=New Name' (repeatable)
    #[arg(long = "name", value_name = "OLD=NEW", value_parser = parse_pair)]
    pub names: Vec<(String, String)>,

    /// Replace literal text, case-insensitively, as 'find=replace' (repeatable)
    #[arg(long = "literal", value_name = "FIND=REPLACE", value_parser = parse_pair)]
    pub literals: Vec<(String, String)>,

    /// Replace a regex, as 'pattern=replacement' with $1 for groups (repeatable)
    #[arg(long = "regex", value_name = "PATTERN=REPLACEMENT", value_parser = parse_pair)]
    pub regexes: Vec<(String, String)>,

    /// Make --regex patterns case-sensitive
    #[arg(long)]
    pub case_sensitive: bool,

    /// Read a JSON name map ({"Old Name": "New Name", ...})
    #[arg(long, value_name = "FILE")]
    pub read_config: Option<PathBuf>,

    /// Write the combined name map (config plus --name) as JSON
    #[arg(long, value_name = "FILE")]
    pub write_config: Option<PathBuf>,

    /// Whether a match may span pages
    #[arg(long, value_enum, default_value_t = ScopeArg::Document)]
    pub scope: ScopeArg,

    /// Fail instead of warning when text is lost or undecodable
    #[arg(long)]
    pub strict: bool,

    /// Output format for the match report
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Output format for commands.
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON output (one object per line)
    Json,
}

/// Match space for replacement rules.
#[derive(Debug, Clone, ValueEnum)]
pub enum ScopeArg {
    /// The whole document is one buffer
    Document,
    /// Every page is matched on its own
    Page,
}

impl ScopeArg {
    /// Convert to the library's `MatchScope` enum.
    pub fn to_match_scope(&self) -> pdfswap::MatchScope {
        match self {
            ScopeArg::Document => pdfswap::MatchScope::Document,
            ScopeArg::Page => pdfswap::MatchScope::Page,
        }
    }
}

/// Split `key=value` at the first `=`.
fn parse_pair(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{input}'"))?;
    if key.is_empty() {
        return Err(format!("empty search text in '{input}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
