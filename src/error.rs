//! Error types for smelter
//!
//! Type conflicts between samples are not errors: they degrade the field to
//! a dynamic type. Only unreadable input, empty input and rejected output
//! surface here.

use thiserror::Error;

/// The main error type for smelter
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {message}")]
    Input { message: String },

    #[error("Input contains no JSON objects")]
    EmptyInput,

    #[error("No valid JSON objects found ({skipped} lines skipped)")]
    NoSamples { skipped: usize },

    /// Rendered text failed the structural check; `text` holds it verbatim
    #[error("Render error at line {line}, column {column}: {message}")]
    Render {
        message: String,
        line: usize,
        column: usize,
        text: String,
    },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create a render error carrying the unformatted text
    pub fn render(message: impl Into<String>, line: usize, column: usize, text: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
            line,
            column,
            text: text.into(),
        }
    }

    /// Raw text attached to a render error
    pub fn unformatted_source(&self) -> Option<&str> {
        match self {
            Error::Render { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Result type alias for smelter
pub type Result<T> = std::result::Result<T, Error>;
