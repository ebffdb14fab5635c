//! Buffer-access contract.
//!
//! The replacement engine never owns text. It drives a [`BufferHost`]: an
//! editor, a set of files on disk, or an in-memory fixture. The host also
//! supplies the substitution primitive that executes a compiled
//! [`Substitution`] against a buffer.

pub mod engine;
pub mod text;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::compile::Substitution;

pub use text::{FileStorage, MemoryStorage, Storage, TextHost};

/// Identifier of a buffer known to the host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferId(String);

impl BufferId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BufferId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BufferId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Cursor position, 1-based line and 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
}

impl CursorPosition {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for CursorPosition {
    fn default() -> Self {
        Self { line: 1, column: 0 }
    }
}

/// Lines a substitution applies to. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRange {
    All,
    Line(usize),
    /// One instruction over several lines; applied atomically.
    Lines(Vec<usize>),
}

/// Structured result of one substitution instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionCount {
    pub replacements: usize,
    pub lines_changed: usize,
}

/// Failures reported by a host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("unknown buffer: {0}")]
    UnknownBuffer(BufferId),

    #[error("buffer not loaded: {0}")]
    NotLoaded(BufferId),

    #[error("line {line} out of range (buffer has {len} lines)")]
    LineOutOfRange { line: usize, len: usize },

    /// The compiled pattern was rejected by the host's matcher.
    #[error("pattern rejected: {0}")]
    Pattern(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to persist {path}: {reason}")]
    Persist { path: PathBuf, reason: String },

    /// Catch-all for host-specific refusals.
    #[error("host rejected instruction: {0}")]
    Rejected(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Read/write access to named text buffers.
///
/// Active buffer and cursor are single-writer host state. The batch
/// executor snapshots and restores them around every run.
pub trait BufferHost {
    fn is_loaded(&self, id: &BufferId) -> bool;

    fn load(&mut self, id: &BufferId) -> HostResult<()>;

    /// Make `id` the active buffer. It must be loaded.
    fn activate(&mut self, id: &BufferId) -> HostResult<()>;

    /// Currently active buffer, if any.
    fn active_buffer(&self) -> Option<BufferId>;

    /// Leave no buffer active. Hosts that always have one keep the no-op.
    fn deactivate(&mut self) {}

    /// Cursor of the active buffer.
    fn cursor(&self) -> CursorPosition;

    fn set_cursor(&mut self, position: CursorPosition);

    /// Write the buffer back to its backing storage.
    fn persist(&mut self, id: &BufferId) -> HostResult<()>;

    /// Human-readable name used in reports.
    fn display_name(&self, id: &BufferId) -> String {
        id.to_string()
    }

    /// Execute `substitution` over `range` of buffer `id`.
    fn apply_substitution(
        &mut self,
        id: &BufferId,
        range: &LineRange,
        substitution: &Substitution,
    ) -> HostResult<SubstitutionCount>;
}
