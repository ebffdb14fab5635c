//! Pattern compiler.
//!
//! Turns raw user input into operands the host substitution primitive
//! understands. The host dialect is `regex` crate syntax behind Vim-style
//! mode markers:
//!
//! - `\v` (very magic): the rest is regex syntax, passed through verbatim
//! - `\V` (very nomagic): the rest is literal text; only `\\`, `\<`, `\>`
//!   and `\<delimiter>` are escapes
//! - `\<` / `\>`: start/end-of-word anchors (both modes)
//!
//! Replacement operands escape `\` and the delimiter. A case-preserving
//! replacement carries the [`preserve_case`](crate::case::preserve_case)
//! function reference; the host calls it for every match.

pub mod delimiter;

use tracing::debug;

use crate::case::{self, CaseTransform};
use crate::error::{ReplaceError, ReplaceResult};
use crate::flags::FlagSet;

pub use delimiter::{DEFAULT_DELIMITER, DELIMITER_CANDIDATES, Substitution, select_delimiter};

/// Escape-introducing character of the host dialect.
pub const ESCAPE: char = '\\';

pub(crate) const VERY_MAGIC: &str = "\\v";
pub(crate) const VERY_NOMAGIC: &str = "\\V";
const WORD_START: &str = "\\<";
const WORD_END: &str = "\\>";

/// A search pattern in host dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern(String);

impl CompiledPattern {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_escaped(text: String) -> Self {
        Self(text)
    }
}

impl std::fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A replacement operand in host dialect.
#[derive(Debug, Clone)]
pub enum CompiledReplacement {
    /// Escaped literal text, inserted as-is for every match.
    Literal(String),
    /// Escaped literal text reshaped per match by `transform`.
    Transform {
        text: String,
        transform: CaseTransform,
    },
}

impl CompiledReplacement {
    /// The escaped operand text.
    pub fn text(&self) -> &str {
        match self {
            Self::Literal(text) | Self::Transform { text, .. } => text,
        }
    }

    /// Same kind of replacement carrying different operand text.
    pub(crate) fn with_text(&self, text: String) -> Self {
        match self {
            Self::Literal(_) => Self::Literal(text),
            Self::Transform { transform, .. } => Self::Transform {
                text,
                transform: *transform,
            },
        }
    }
}

/// Compile a find string into a host-dialect search pattern.
pub fn compile_pattern(raw_find: &str, flags: FlagSet) -> ReplaceResult<CompiledPattern> {
    let find = strip_line_breaks(raw_find);
    if find.is_empty() {
        return Err(ReplaceError::EmptyPattern);
    }

    let mut body = if flags.use_regex {
        regex::Regex::new(&find).map_err(|e| ReplaceError::InvalidRegex {
            pattern: find.clone(),
            reason: e.to_string(),
        })?;
        find
    } else {
        escape_operand(&find, DEFAULT_DELIMITER)
    };

    if flags.whole_word {
        body = format!("{WORD_START}{body}{WORD_END}");
    }

    let marker = if flags.use_regex { VERY_MAGIC } else { VERY_NOMAGIC };
    let pattern = CompiledPattern(format!("{marker}{body}"));
    debug!(pattern = %pattern, "compiled pattern");
    Ok(pattern)
}

/// Compile a replace string into a host-dialect replacement operand.
pub fn compile_replacement(raw_replace: &str, preserve_case: bool) -> CompiledReplacement {
    let text = escape_operand(&strip_line_breaks(raw_replace), DEFAULT_DELIMITER);
    if preserve_case {
        CompiledReplacement::Transform {
            text,
            transform: case::preserve_case,
        }
    } else {
        CompiledReplacement::Literal(text)
    }
}

/// Compile find/replace input and pick a delimiter in one step.
pub fn compile(raw_find: &str, raw_replace: &str, flags: FlagSet) -> ReplaceResult<Substitution> {
    let pattern = compile_pattern(raw_find, flags)?;
    let replacement = compile_replacement(raw_replace, flags.preserve_case);
    let delimited = select_delimiter(&pattern, &replacement)?;
    Ok(Substitution::new(delimited, flags))
}

/// Find and replace strings are always single-line.
fn strip_line_breaks(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '\n' | '\r')).collect()
}

/// Escape the escape character and `delimiter`.
fn escape_operand(text: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == ESCAPE || c == delimiter {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}
