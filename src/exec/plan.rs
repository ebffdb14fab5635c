//! Batch plan: match locations grouped per buffer.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::host::BufferId;

/// One match reported by the location source. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLocation {
    pub buffer_id: BufferId,
    pub line_number: usize,
}

impl MatchLocation {
    pub fn new(buffer_id: impl Into<BufferId>, line_number: usize) -> Self {
        Self {
            buffer_id: buffer_id.into(),
            line_number,
        }
    }
}

/// Lines to visit in one buffer: deduplicated, ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPlan {
    pub buffer_id: BufferId,
    pub lines: Vec<usize>,
}

/// Per-buffer line sets for one batch run.
///
/// Buffers keep the order in which they first appear in the location
/// list. Within a buffer lines are visited top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    buffers: Vec<BufferPlan>,
}

impl BatchPlan {
    pub fn build(locations: &[MatchLocation]) -> Self {
        let mut order: Vec<BufferId> = Vec::new();
        let mut lines: HashMap<&BufferId, BTreeSet<usize>> = HashMap::new();

        for location in locations {
            if location.line_number == 0 {
                warn!(buffer = %location.buffer_id, "dropping location with line number 0");
                continue;
            }
            let entry = lines.entry(&location.buffer_id).or_insert_with(|| {
                order.push(location.buffer_id.clone());
                BTreeSet::new()
            });
            entry.insert(location.line_number);
        }

        let buffers = order
            .into_iter()
            .map(|buffer_id| {
                let set = lines.remove(&buffer_id).unwrap_or_default();
                BufferPlan {
                    buffer_id,
                    lines: set.into_iter().collect(),
                }
            })
            .collect();

        Self { buffers }
    }

    pub fn buffers(&self) -> &[BufferPlan] {
        &self.buffers
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Total planned lines across all buffers.
    pub fn line_count(&self) -> usize {
        self.buffers.iter().map(|b| b.lines.len()).sum()
    }

    /// Sub-plan holding only the buffers `keep` accepts.
    #[must_use]
    pub fn filtered(&self, mut keep: impl FnMut(&BufferId) -> bool) -> Self {
        Self {
            buffers: self
                .buffers
                .iter()
                .filter(|b| keep(&b.buffer_id))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines_for<'p>(plan: &'p BatchPlan, id: &str) -> Option<&'p [usize]> {
        plan.buffers()
            .iter()
            .find(|b| b.buffer_id.as_str() == id)
            .map(|b| b.lines.as_slice())
    }

    #[test]
    fn test_dedup_and_order() {
        let plan = BatchPlan::build(&[
            MatchLocation::new("B", 5),
            MatchLocation::new("B", 3),
            MatchLocation::new("B", 5),
            MatchLocation::new("A", 1),
        ]);

        assert_eq!(lines_for(&plan, "B"), Some(&[3, 5][..]));
        assert_eq!(lines_for(&plan, "A"), Some(&[1][..]));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.line_count(), 3);
    }

    #[test]
    fn test_first_appearance_order() {
        let plan = BatchPlan::build(&[
            MatchLocation::new("z", 1),
            MatchLocation::new("a", 1),
            MatchLocation::new("z", 2),
        ]);
        let ids: Vec<&str> = plan.buffers().iter().map(|b| b.buffer_id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[test]
    fn test_line_zero_dropped() {
        let plan = BatchPlan::build(&[MatchLocation::new("a", 0)]);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_filtered() {
        let plan = BatchPlan::build(&[MatchLocation::new("a", 1), MatchLocation::new("b", 2)]);
        let only_b = plan.filtered(|id| id.as_str() == "b");
        assert_eq!(only_b.len(), 1);
        assert_eq!(lines_for(&only_b, "b"), Some(&[2][..]));
    }
}
