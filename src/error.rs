//! Structured error types for the measure-press engine.
//!
//! Every variant is fatal for the document build that produced it: nothing is
//! retried, and a failed build never writes output.

use thiserror::Error;

/// The unified error type returned by all public API functions.
#[derive(Debug, Error)]
pub enum PressError {
    /// Markup contained an unsupported tag or was not well-formed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A table was missing its header or body structure, or was ragged.
    #[error("Table structure error: {0}")]
    Structure(String),

    /// A referenced value table or one of its columns does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The width primitive could not measure text (e.g. unregistered font).
    #[error("Measurement error: {0}")]
    Measurement(String),

    /// A font could not be loaded, parsed, or is missing a variant.
    #[error("Font error: {0}")]
    Font(String),

    /// JSON input or configuration failed to parse.
    #[error("Failed to parse {what}: {source}{}", hint_suffix(.hint))]
    Config {
        what: &'static str,
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The builder already failed once; its earlier content is gone.
    #[error("Build aborted: {0}")]
    Aborted(String),
}

/// Stable classification of a [`PressError`] for callers that build their
/// own user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Structure,
    NotFound,
    Measurement,
    Font,
    Config,
    Io,
    Aborted,
}

impl PressError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PressError::Parse(_) => ErrorKind::Parse,
            PressError::Structure(_) => ErrorKind::Structure,
            PressError::NotFound(_) => ErrorKind::NotFound,
            PressError::Measurement(_) => ErrorKind::Measurement,
            PressError::Font(_) => ErrorKind::Font,
            PressError::Config { .. } => ErrorKind::Config,
            PressError::Io(_) => ErrorKind::Io,
            PressError::Aborted(_) => ErrorKind::Aborted,
        }
    }

    /// Wrap a serde_json error with a hint about what is likely wrong.
    pub fn config(what: &'static str, e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types."
                    .to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input; is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        PressError::Config {
            what,
            source: e,
            hint,
        }
    }
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}
