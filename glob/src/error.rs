//! Error types for glob compilation.

use thiserror::Error;

/// Result type alias for glob operations.
pub type Result<T> = std::result::Result<T, GlobError>;

/// Errors raised while compiling a glob pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlobError {
    /// A `[` without its closing `]`, or a stray `]`.
    #[error("unbalanced bracket at position {position} in pattern: {pattern}")]
    UnbalancedBracket { pattern: String, position: usize },

    /// `[]` or `[!]`.
    #[error("empty character class at position {position} in pattern: {pattern}")]
    EmptyClass { pattern: String, position: usize },

    /// A range whose start sorts after its end, such as `[z-a]`.
    #[error("invalid range {start}-{end} in pattern: {pattern}")]
    InvalidRange {
        pattern: String,
        start: char,
        end: char,
    },

    /// A `\` with nothing left to escape.
    #[error("trailing escape in pattern: {0}")]
    TrailingEscape(String),

    /// The translated expression was rejected by the regex engine.
    #[error("failed to build matcher for {pattern}: {message}")]
    Regex { pattern: String, message: String },
}
