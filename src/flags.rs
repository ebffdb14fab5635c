//! Flag model.
//!
//! A flag string is zero to four single letters, case-insensitive, each
//! given at most once:
//!
//! | letter | meaning                 |
//! |--------|-------------------------|
//! | `c`    | case-sensitive matching |
//! | `w`    | whole-word matching     |
//! | `r`    | regex pattern           |
//! | `p`    | preserve case           |
//!
//! The empty string leaves every flag off. Flags are never silently
//! corrected: any unknown or repeated letter rejects the whole string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FlagProblem, ReplaceError, ReplaceResult};

/// Canonical serialization order.
const FLAG_LETTERS: [char; 4] = ['c', 'w', 'r', 'p'];

/// Parsed search/replace flags. Immutable once parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSet {
    pub case_sensitive: bool,
    pub whole_word: bool,
    pub use_regex: bool,
    pub preserve_case: bool,
}

impl FlagSet {
    /// Parse a flag string such as `"cw"` or `"RP"`.
    pub fn parse(input: &str) -> ReplaceResult<Self> {
        let mut flags = Self::default();
        let mut seen = [false; 4];

        for raw in input.chars() {
            let letter = raw.to_ascii_lowercase();
            let Some(slot) = FLAG_LETTERS.iter().position(|&c| c == letter) else {
                return Err(ReplaceError::InvalidFlag {
                    flag: raw,
                    problem: FlagProblem::Unknown,
                });
            };
            if seen[slot] {
                return Err(ReplaceError::InvalidFlag {
                    flag: raw,
                    problem: FlagProblem::Repeated,
                });
            }
            seen[slot] = true;
            *flags.slot_mut(slot) = true;
        }

        Ok(flags)
    }

    fn slot_mut(&mut self, slot: usize) -> &mut bool {
        match slot {
            0 => &mut self.case_sensitive,
            1 => &mut self.whole_word,
            2 => &mut self.use_regex,
            _ => &mut self.preserve_case,
        }
    }

    const fn slots(self) -> [bool; 4] {
        [
            self.case_sensitive,
            self.whole_word,
            self.use_regex,
            self.preserve_case,
        ]
    }
}

/// Canonical form: set letters in `cwrp` order, lowercase.
impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, on) in FLAG_LETTERS.iter().zip(self.slots()) {
            if on {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for FlagSet {
    type Err = ReplaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
