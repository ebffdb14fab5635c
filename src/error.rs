//! Error types for the batch-replace crate.

use std::path::PathBuf;

use crate::host::HostError;

/// Why a flag character was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagProblem {
    /// Not one of the recognized letters.
    Unknown,
    /// Already given earlier in the same flag string.
    Repeated,
}

impl std::fmt::Display for FlagProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown flag"),
            Self::Repeated => f.write_str("repeated flag"),
        }
    }
}

/// Errors raised while compiling or executing a replacement.
#[derive(Debug, thiserror::Error)]
pub enum ReplaceError {
    /// Bad or duplicate flag character.
    #[error(
        "{problem} '{flag}'; accepted flags: c (case-sensitive), w (whole word), r (regex), p (preserve case)"
    )]
    InvalidFlag { flag: char, problem: FlagProblem },

    /// The find string is empty once line breaks are stripped.
    #[error("find pattern is empty")]
    EmptyPattern,

    /// Regex mode was requested but the pattern does not compile.
    #[error("invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// Pattern and replacement together occupy every candidate delimiter.
    #[error(
        "no safe delimiter: pattern and replacement use every candidate ({candidates}); simplify the input"
    )]
    NoSafeDelimiter { candidates: String },

    /// The host rejected a substitution on a buffer (or one of its lines).
    #[error(
        "substitution failed in {buffer}{}: {source}",
        .line.map(|l| format!(" at line {l}")).unwrap_or_default()
    )]
    SubstitutionFailed {
        buffer: String,
        line: Option<usize>,
        #[source]
        source: HostError,
    },

    /// Any other buffer-access failure (load, activate, persist).
    #[error(transparent)]
    Host(#[from] HostError),

    /// Options file could not be read.
    #[error("config error in {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type for batch-replace operations.
pub type ReplaceResult<T> = Result<T, ReplaceError>;
