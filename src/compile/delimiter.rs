//! Delimiter selection and the substitution instruction.
//!
//! The compiler escapes operands for the default delimiter `/`. When either
//! operand still contains `/`, the selector walks [`DELIMITER_CANDIDATES`]
//! for the first character present in neither operand, strips the `/`
//! escapes and re-escapes for the chosen character.

use std::fmt;

use tracing::debug;

use super::{CompiledPattern, CompiledReplacement, ESCAPE};
use crate::error::{ReplaceError, ReplaceResult};
use crate::flags::FlagSet;

/// The common case; kept whenever neither operand uses it.
pub const DEFAULT_DELIMITER: char = '/';

/// Delimiters in priority order.
pub const DELIMITER_CANDIDATES: [char; 9] = ['/', '#', '@', '|', '!', '%', '~', ';', ':'];

/// Operands escaped for a chosen delimiter.
#[derive(Debug, Clone)]
pub struct Delimited {
    pub delimiter: char,
    pub pattern: CompiledPattern,
    pub replacement: CompiledReplacement,
}

/// Pick a delimiter that appears in neither operand.
pub fn select_delimiter(
    pattern: &CompiledPattern,
    replacement: &CompiledReplacement,
) -> ReplaceResult<Delimited> {
    let uses_default = |text: &str| text.contains(DEFAULT_DELIMITER);
    if !uses_default(pattern.as_str()) && !uses_default(replacement.text()) {
        return Ok(Delimited {
            delimiter: DEFAULT_DELIMITER,
            pattern: pattern.clone(),
            replacement: replacement.clone(),
        });
    }

    let raw_pattern = unescape_delimiter(pattern.as_str(), DEFAULT_DELIMITER);
    let raw_replacement = unescape_delimiter(replacement.text(), DEFAULT_DELIMITER);

    let chosen = DELIMITER_CANDIDATES
        .iter()
        .skip(1)
        .copied()
        .find(|&d| !raw_pattern.contains(d) && !raw_replacement.contains(d));

    let Some(delimiter) = chosen else {
        return Err(ReplaceError::NoSafeDelimiter {
            candidates: DELIMITER_CANDIDATES.iter().collect(),
        });
    };

    debug!(%delimiter, "default delimiter in use, switching");
    Ok(Delimited {
        delimiter,
        pattern: CompiledPattern::from_escaped(escape_delimiter(&raw_pattern, delimiter)),
        replacement: replacement.with_text(escape_delimiter(&raw_replacement, delimiter)),
    })
}

/// Drop the escape in front of `delimiter`, leaving every other escape pair.
pub(crate) fn unescape_delimiter(text: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next) if next == delimiter => out.push(next),
            Some(next) => {
                out.push(c);
                out.push(next);
            }
            None => out.push(c),
        }
    }
    out
}

/// Escape bare occurrences of `delimiter`, leaving escape pairs intact.
pub(crate) fn escape_delimiter(text: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            out.push(c);
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            if c == delimiter {
                out.push(ESCAPE);
            }
            out.push(c);
        }
    }
    out
}

/// One executable substitution instruction.
#[derive(Debug, Clone)]
pub struct Substitution {
    pub delimiter: char,
    pub pattern: CompiledPattern,
    pub replacement: CompiledReplacement,
    pub case_sensitive: bool,
    /// Replace every occurrence on a line, not just the first.
    pub global: bool,
}

impl Substitution {
    pub fn new(delimited: Delimited, flags: FlagSet) -> Self {
        Self {
            delimiter: delimited.delimiter,
            pattern: delimited.pattern,
            replacement: delimited.replacement,
            case_sensitive: flags.case_sensitive,
            global: true,
        }
    }
}

/// Renders as an `s` command, e.g. `s/\Vfoo/bar/gi`. A transforming
/// replacement renders as `\=` followed by its text.
impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.delimiter;
        let expression = match self.replacement {
            CompiledReplacement::Literal(_) => "",
            CompiledReplacement::Transform { .. } => "\\=",
        };
        write!(
            f,
            "s{d}{}{d}{expression}{}{d}",
            self.pattern,
            self.replacement.text()
        )?;
        if self.global {
            f.write_str("g")?;
        }
        f.write_str(if self.case_sensitive { "I" } else { "i" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{compile, compile_pattern, compile_replacement};

    /// Every occurrence of `d` in `text` is preceded by an escape.
    fn no_bare(text: &str, d: char) -> bool {
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == ESCAPE {
                chars.next();
            } else if c == d {
                return false;
            }
        }
        true
    }

    #[test]
    fn test_default_kept_when_unused() {
        let pattern = compile_pattern("foo", FlagSet::default()).expect("compiles");
        let replacement = compile_replacement("bar", false);
        let delimited = select_delimiter(&pattern, &replacement).expect("selects");
        assert_eq!(delimited.delimiter, '/');
        assert_eq!(delimited.pattern, pattern);
    }

    #[test]
    fn test_slash_operands_switch_delimiter() {
        let pattern = compile_pattern("a/b", FlagSet::default()).expect("compiles");
        let replacement = compile_replacement("c/d", false);
        let delimited = select_delimiter(&pattern, &replacement).expect("selects");

        assert_ne!(delimited.delimiter, '/');
        assert_eq!(delimited.delimiter, '#');
        assert_eq!(delimited.pattern.as_str(), "\\Va/b");
        assert_eq!(delimited.replacement.text(), "c/d");
        assert!(no_bare(delimited.pattern.as_str(), delimited.delimiter));
        assert!(no_bare(delimited.replacement.text(), delimited.delimiter));
    }

    #[test]
    fn test_skips_candidates_in_use() {
        let pattern = compile_pattern("a/b#c", FlagSet::default()).expect("compiles");
        let replacement = compile_replacement("@", false);
        let delimited = select_delimiter(&pattern, &replacement).expect("selects");
        assert_eq!(delimited.delimiter, '|');
    }

    #[test]
    fn test_regex_slash_switches() {
        let flags = FlagSet::parse("r").expect("flags");
        let pattern = compile_pattern("a/b", flags).expect("compiles");
        let replacement = compile_replacement("x", false);
        let delimited = select_delimiter(&pattern, &replacement).expect("selects");
        assert_eq!(delimited.delimiter, '#');
        assert_eq!(delimited.pattern.as_str(), "\\va/b");
    }

    #[test]
    fn test_every_candidate_taken() {
        let pattern = compile_pattern("/#@|!%~;:", FlagSet::default()).expect("compiles");
        let replacement = compile_replacement("x", false);
        assert!(matches!(
            select_delimiter(&pattern, &replacement),
            Err(ReplaceError::NoSafeDelimiter { .. })
        ));
    }

    #[test]
    fn test_escaped_backslash_before_slash() {
        // Literal `\/` compiles to `\\\/`; only the slash escape is dropped.
        assert_eq!(unescape_delimiter("\\\\\\/", '/'), "\\\\/");
    }

    #[test]
    fn test_escape_delimiter_leaves_pairs() {
        assert_eq!(escape_delimiter("a#b\\#", '#'), "a\\#b\\#");
    }

    #[test]
    fn test_command_rendering() {
        let sub = compile("a/b", "c", FlagSet::default()).expect("compiles");
        assert_eq!(sub.to_string(), "s#\\Va/b#c#gi");

        let flags = FlagSet::parse("cp").expect("flags");
        let sub = compile("foo", "bar", flags).expect("compiles");
        assert_eq!(sub.to_string(), "s/\\Vfoo/\\=bar/gI");
    }
}
