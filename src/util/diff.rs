//! Unified diffs of buffer changes, using the `similar` crate.

use similar::{Algorithm, TextDiff};

/// Unified diff of `old` → `new`, or `None` when they are identical.
///
/// Uses the Patience algorithm, which keeps source structure readable.
pub fn unified_diff(name: &str, old: &str, new: &str) -> Option<String> {
    if old == new {
        return None;
    }

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(old, new);

    Some(
        diff.unified_diff()
            .context_radius(2)
            .header(&format!("a/{name}"), &format!("b/{name}"))
            .to_string(),
    )
}
