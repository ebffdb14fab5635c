//! Reference substitution primitive.
//!
//! Executes a [`Substitution`] with the `regex` crate: the host-dialect
//! pattern is translated to plain regex syntax, operands are unescaped, and
//! a transforming replacement is invoked once per match with the matched
//! text.

use regex::{Captures, Regex, RegexBuilder};

use super::{HostError, HostResult};
use crate::case::CaseTransform;
use crate::compile::{CompiledReplacement, ESCAPE, Substitution, VERY_MAGIC, VERY_NOMAGIC};

/// A substitution ready to run against individual lines.
#[derive(Debug)]
pub struct PreparedSubstitution {
    regex: Regex,
    replacement: String,
    transform: Option<CaseTransform>,
    global: bool,
}

impl PreparedSubstitution {
    pub fn prepare(substitution: &Substitution) -> HostResult<Self> {
        let source = translate_pattern(substitution.pattern.as_str(), substitution.delimiter);
        let regex = RegexBuilder::new(&source)
            .case_insensitive(!substitution.case_sensitive)
            .build()
            .map_err(|e| HostError::Pattern(e.to_string()))?;

        let transform = match substitution.replacement {
            CompiledReplacement::Literal(_) => None,
            CompiledReplacement::Transform { transform, .. } => Some(transform),
        };

        Ok(Self {
            regex,
            replacement: unescape_operand(substitution.replacement.text()),
            transform,
            global: substitution.global,
        })
    }

    /// Substitute within one line. `None` when nothing matched.
    pub fn apply_line(&self, line: &str) -> Option<(String, usize)> {
        let mut count = 0;
        let render = |caps: &Captures<'_>| {
            count += 1;
            match self.transform {
                Some(transform) => transform(&caps[0], &self.replacement),
                None => self.replacement.clone(),
            }
        };

        let replaced = if self.global {
            self.regex.replace_all(line, render)
        } else {
            self.regex.replacen(line, 1, render)
        };

        if count == 0 {
            None
        } else {
            Some((replaced.into_owned(), count))
        }
    }
}

/// Translate a host-dialect pattern to `regex` syntax.
pub fn translate_pattern(pattern: &str, delimiter: char) -> String {
    if let Some(body) = pattern.strip_prefix(VERY_NOMAGIC) {
        translate_literal(body)
    } else {
        let body = pattern.strip_prefix(VERY_MAGIC).unwrap_or(pattern);
        translate_regex(body, delimiter)
    }
}

fn translate_literal(body: &str) -> String {
    let mut out = String::with_capacity(body.len() * 2);
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            push_escaped(&mut out, c);
            continue;
        }
        match chars.next() {
            Some('<') => out.push_str(r"\b{start}"),
            Some('>') => out.push_str(r"\b{end}"),
            Some(next) => push_escaped(&mut out, next),
            None => push_escaped(&mut out, ESCAPE),
        }
    }
    out
}

fn translate_regex(body: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) if next == delimiter => push_escaped(&mut out, next),
            Some(next) => {
                out.push(ESCAPE);
                out.push(next);
            }
            None => out.push(ESCAPE),
        }
    }
    out
}

fn push_escaped(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// Resolve `\x` pairs in a replacement operand to `x`.
fn unescape_operand(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            out.push(chars.next().unwrap_or(ESCAPE));
        } else {
            out.push(c);
        }
    }
    out
}
