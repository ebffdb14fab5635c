//! `batch-replace`: batch find-and-replace engine.
//!
//! Rewrites matches of a search query (literal or regex, case
//! sensitivity, whole word, case-preserving replacement) in one buffer or
//! across a location list spanning many buffers. Text storage and the
//! substitution primitive belong to a [`host::BufferHost`]; this crate
//! compiles the instruction and drives it.
//!
//! # Pipeline
//!
//! ```text
//! flags ─→ FlagSet ─┐
//! find  ─→ compile_pattern ─────┐
//! replace ─→ compile_replacement ┴→ select_delimiter ─→ Substitution
//!                                                            │
//!        Scope::Buffer ─→ replace_in_buffer ←────────────────┤
//!        Scope::Batch  ─→ dispatch (Bulk → Precise) ←────────┘
//!                            └→ execute_batch ─→ BufferHost::apply_substitution
//!                                                   └→ preserve_case (per match)
//! ```
//!
//! # Hosts
//!
//! - [`host::TextHost`] over [`host::MemoryStorage`]: in-memory documents
//! - [`host::TextHost`] over [`host::FileStorage`]: files on disk

pub mod case;
pub mod compile;
pub mod config;
pub mod error;
pub mod exec;
pub mod flags;
pub mod host;
pub mod request;
pub mod util;

pub use case::preserve_case;
pub use compile::{
    CompiledPattern, CompiledReplacement, Substitution, compile_pattern, compile_replacement,
};
pub use config::BatchOptions;
pub use error::{ReplaceError, ReplaceResult};
pub use exec::{BatchPlan, CancelFlag, MatchLocation, Strategy};
pub use flags::FlagSet;
pub use host::{BufferHost, BufferId, CursorPosition};
pub use request::{ReplaceRequest, RunReport, Scope, execute};
