//! Batch executor.
//!
//! Runs one [`Strategy`] over every buffer of a [`BatchPlan`]:
//!
//! 1. capture the run context (active buffer, cursor)
//! 2. per buffer: load if needed, activate, apply, persist, record
//! 3. restore the run context, whatever happened
//!
//! A failing buffer is recorded and the run moves on. Cancellation is
//! polled before each buffer and, inside the strategy, before each line.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::plan::{BatchPlan, BufferPlan};
use super::strategy::Strategy;
use super::{CancelFlag, HostSession};
use crate::compile::Substitution;
use crate::error::ReplaceError;
use crate::host::{BufferHost, BufferId};

/// What happened in one buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub buffer_id: BufferId,
    pub display_name: String,
    /// Planned lines an instruction was issued for.
    pub attempted: usize,
    /// Lines that received at least one replacement.
    pub succeeded: usize,
    pub replacements: usize,
    pub failed: bool,
    /// The substitution went through but writing the buffer back failed.
    pub persist_failed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ExecutionOutcome {
    /// Failed for a reason other than writing the buffer back.
    pub const fn substitution_failed(&self) -> bool {
        self.failed && !self.persist_failed
    }
}

/// Counts gathered by a strategy inside one buffer.
#[derive(Debug, Default)]
pub(crate) struct BufferTally {
    pub attempted: usize,
    pub succeeded: usize,
    pub replacements: usize,
    pub errors: Vec<ReplaceError>,
    pub persist_error: Option<ReplaceError>,
    pub cancelled: bool,
}

impl BufferTally {
    fn failed(error: ReplaceError) -> Self {
        Self {
            errors: vec![error],
            ..Self::default()
        }
    }
}

/// Result of executing a plan with one strategy.
#[derive(Debug, Clone, Default)]
pub struct BatchRun {
    pub outcomes: Vec<ExecutionOutcome>,
    pub cancelled: bool,
}

impl BatchRun {
    pub fn total_replacements(&self) -> usize {
        self.outcomes.iter().map(|o| o.replacements).sum()
    }

    pub fn any_substitution_failed(&self) -> bool {
        self.outcomes.iter().any(ExecutionOutcome::substitution_failed)
    }
}

/// Execute `plan` with `strategy`. The host's active buffer and cursor are
/// restored before this returns.
pub fn execute_batch<H: BufferHost + ?Sized>(
    host: &mut H,
    plan: &BatchPlan,
    substitution: &Substitution,
    strategy: Strategy,
    persist: bool,
    cancel: &CancelFlag,
) -> BatchRun {
    let mut session = HostSession::begin(host);
    let mut run = BatchRun::default();

    debug!(
        %strategy,
        buffers = plan.len(),
        lines = plan.line_count(),
        command = %substitution,
        "batch started"
    );

    for buffer in plan.buffers() {
        if cancel.is_cancelled() {
            run.cancelled = true;
            break;
        }

        let display_name = session.display_name(&buffer.buffer_id);
        let tally = run_buffer(&mut *session, buffer, substitution, strategy, persist, cancel);

        for error in &tally.errors {
            warn!(buffer = %display_name, error = %error, "buffer substitution failed");
        }
        if let Some(error) = &tally.persist_error {
            warn!(buffer = %display_name, error = %error, "persist failed");
        }
        run.cancelled |= tally.cancelled;
        let persist_failed = tally.persist_error.is_some();
        run.outcomes.push(ExecutionOutcome {
            buffer_id: buffer.buffer_id.clone(),
            display_name,
            attempted: tally.attempted,
            succeeded: tally.succeeded,
            replacements: tally.replacements,
            failed: persist_failed || !tally.errors.is_empty(),
            persist_failed,
            errors: tally
                .errors
                .iter()
                .chain(&tally.persist_error)
                .map(ToString::to_string)
                .collect(),
        });

        if tally.cancelled {
            break;
        }
    }

    info!(
        %strategy,
        replacements = run.total_replacements(),
        buffers = run.outcomes.len(),
        cancelled = run.cancelled,
        "batch finished"
    );
    run
}

fn run_buffer<H: BufferHost + ?Sized>(
    host: &mut H,
    buffer: &BufferPlan,
    substitution: &Substitution,
    strategy: Strategy,
    persist: bool,
    cancel: &CancelFlag,
) -> BufferTally {
    let id = &buffer.buffer_id;

    let loaded = if host.is_loaded(id) {
        Ok(())
    } else {
        host.load(id)
    };
    if let Err(e) = loaded.and_then(|()| host.activate(id)) {
        return BufferTally::failed(e.into());
    }

    let mut tally = strategy.apply(host, id, &buffer.lines, substitution, cancel);

    if persist && tally.replacements > 0 {
        tally.persist_error = host.persist(id).err().map(ReplaceError::from);
    }
    tally
}
