//! Execution strategies and the fallback dispatcher.
//!
//! - `Bulk` issues one instruction per buffer covering every planned line.
//!   Fast, but one failure voids the whole instruction.
//! - `Precise` issues one instruction per line; a failing line does not
//!   stop the lines after it.
//!
//! [`dispatch`] runs the requested strategy and, when Bulk fails or
//! replaces nothing, re-runs the affected buffers with Precise.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::batch::{BatchRun, BufferTally, ExecutionOutcome, execute_batch};
use super::plan::BatchPlan;
use super::CancelFlag;
use crate::compile::Substitution;
use crate::config::BatchOptions;
use crate::error::ReplaceError;
use crate::host::{BufferHost, BufferId, LineRange};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Bulk,
    Precise,
}

impl Strategy {
    pub(crate) fn apply<H: BufferHost + ?Sized>(
        self,
        host: &mut H,
        id: &BufferId,
        lines: &[usize],
        substitution: &Substitution,
        cancel: &CancelFlag,
    ) -> BufferTally {
        match self {
            Self::Bulk => apply_bulk(host, id, lines, substitution, cancel),
            Self::Precise => apply_precise(host, id, lines, substitution, cancel),
        }
    }
}

fn apply_bulk<H: BufferHost + ?Sized>(
    host: &mut H,
    id: &BufferId,
    lines: &[usize],
    substitution: &Substitution,
    cancel: &CancelFlag,
) -> BufferTally {
    let mut tally = BufferTally::default();
    if cancel.is_cancelled() {
        tally.cancelled = true;
        return tally;
    }

    tally.attempted = lines.len();
    match host.apply_substitution(id, &LineRange::Lines(lines.to_vec()), substitution) {
        Ok(count) => {
            tally.succeeded = count.lines_changed;
            tally.replacements = count.replacements;
        }
        Err(source) => tally.errors.push(ReplaceError::SubstitutionFailed {
            buffer: host.display_name(id),
            line: None,
            source,
        }),
    }
    tally
}

fn apply_precise<H: BufferHost + ?Sized>(
    host: &mut H,
    id: &BufferId,
    lines: &[usize],
    substitution: &Substitution,
    cancel: &CancelFlag,
) -> BufferTally {
    let mut tally = BufferTally::default();
    for &line in lines {
        if cancel.is_cancelled() {
            tally.cancelled = true;
            break;
        }
        tally.attempted += 1;
        match host.apply_substitution(id, &LineRange::Line(line), substitution) {
            Ok(count) => {
                if count.replacements > 0 {
                    tally.succeeded += 1;
                }
                tally.replacements += count.replacements;
            }
            Err(source) => tally.errors.push(ReplaceError::SubstitutionFailed {
                buffer: host.display_name(id),
                line: Some(line),
                source,
            }),
        }
    }
    tally
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bulk => "bulk",
            Self::Precise => "precise",
        })
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bulk" => Ok(Self::Bulk),
            "precise" => Ok(Self::Precise),
            other => Err(format!("unknown strategy '{other}' (expected bulk or precise)")),
        }
    }
}

/// Outcome of a dispatched batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<ExecutionOutcome>,
    /// Strategy that produced the final result.
    pub strategy_used: Strategy,
    pub fell_back: bool,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn total_replacements(&self) -> usize {
        self.outcomes.iter().map(|o| o.replacements).sum()
    }

    fn from_run(run: BatchRun, strategy_used: Strategy) -> Self {
        Self {
            outcomes: run.outcomes,
            strategy_used,
            fell_back: false,
            cancelled: run.cancelled,
        }
    }
}

/// Run `plan` with `options.strategy`, falling back from Bulk to Precise.
///
/// Fallback triggers when Bulk replaced nothing or a buffer's substitution
/// failed. Only those buffers are re-run; when Bulk replaced nothing at all,
/// the whole plan is. A buffer that was substituted but not persisted keeps
/// its failed Bulk outcome and is never substituted twice.
pub fn dispatch<H: BufferHost + ?Sized>(
    host: &mut H,
    plan: &BatchPlan,
    substitution: &Substitution,
    options: &BatchOptions,
    cancel: &CancelFlag,
) -> BatchReport {
    let first = execute_batch(host, plan, substitution, options.strategy, options.persist, cancel);

    let needs_fallback = options.strategy == Strategy::Bulk
        && options.fallback
        && !first.cancelled
        && (first.total_replacements() == 0 || first.any_substitution_failed());
    if !needs_fallback {
        return BatchReport::from_run(first, options.strategy);
    }

    let rerun_all = first.total_replacements() == 0;
    let retry_plan = if rerun_all {
        plan.clone()
    } else {
        plan.filtered(|id| {
            first
                .outcomes
                .iter()
                .any(|o| &o.buffer_id == id && o.substitution_failed())
        })
    };

    info!(
        buffers = retry_plan.len(),
        rerun_all, "bulk strategy fell short, retrying with precise"
    );
    let retry = execute_batch(
        host,
        &retry_plan,
        substitution,
        Strategy::Precise,
        options.persist,
        cancel,
    );

    // Keep plan order: retried buffers take their precise outcome.
    let outcomes = first
        .outcomes
        .into_iter()
        .map(|bulk| {
            retry
                .outcomes
                .iter()
                .find(|o| o.buffer_id == bulk.buffer_id)
                .cloned()
                .unwrap_or(bulk)
        })
        .collect();

    BatchReport {
        outcomes,
        strategy_used: Strategy::Precise,
        fell_back: true,
        cancelled: retry.cancelled,
    }
}
