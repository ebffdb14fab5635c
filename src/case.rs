//! Case-preserving replacement.
//!
//! [`preserve_case`] reshapes a literal replacement to follow the case of
//! the text it replaces. It runs once per match, at substitution time: the
//! host engine hands it each matched substring together with the literal
//! replacement text.

/// Signature of a per-match replacement transform: `(matched, replacement)`.
pub type CaseTransform = fn(&str, &str) -> String;

/// Ratio of uppercase letters above which mixed-case originals uppercase.
const UPPER_RATIO_THRESHOLD: f64 = 0.5;

/// Rewrite `replacement` to mimic the capitalization of `original`.
///
/// Precedence, first match wins:
/// 1. either side empty: `replacement` unchanged
/// 2. all-uppercase original: uppercase replacement
/// 3. all-lowercase original: lowercase replacement
/// 4. title-case original: capitalize the first character only
/// 5. mixed case: uppercase if more than half the characters are
///    uppercase letters, else lowercase
pub fn preserve_case(original: &str, replacement: &str) -> String {
    if original.is_empty() || replacement.is_empty() {
        return replacement.to_owned();
    }

    let upper = original.to_uppercase();
    let lower = original.to_lowercase();
    let has_alpha = original.chars().any(char::is_alphabetic);

    if has_alpha && original == upper && original != lower {
        return replacement.to_uppercase();
    }
    if has_alpha && original == lower && original != upper {
        return replacement.to_lowercase();
    }
    if is_title_case(original) {
        return capitalize(replacement);
    }

    let total = original.chars().count();
    let uppercase = original
        .chars()
        .filter(|c| c.is_alphabetic() && c.is_uppercase())
        .count();

    #[allow(clippy::cast_precision_loss)]
    let ratio = uppercase as f64 / total as f64;
    if ratio > UPPER_RATIO_THRESHOLD {
        replacement.to_uppercase()
    } else {
        replacement.to_lowercase()
    }
}

/// First character equals its uppercase form and the rest equals its
/// lowercase form.
fn is_title_case(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let rest = chars.as_str();
    first.to_uppercase().eq(std::iter::once(first)) && rest == rest.to_lowercase()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut out: String = first.to_uppercase().collect();
    out.push_str(&chars.as_str().to_lowercase());
    out
}
