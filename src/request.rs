//! Request surface: raw input in, run report out.
//!
//! [`execute`] parses flags, compiles the substitution and runs it over the
//! requested scope. Compilation errors abort the whole request; execution
//! errors are recorded per buffer in the [`RunReport`].

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::compile;
use crate::config::BatchOptions;
use crate::error::ReplaceResult;
use crate::exec::{self, BatchPlan, CancelFlag, ExecutionOutcome, MatchLocation, Strategy};
use crate::flags::FlagSet;
use crate::host::{BufferHost, BufferId};

/// Where a replacement applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Scope {
    /// Every line of one buffer.
    Buffer { buffer_id: BufferId },
    /// A caller-supplied location list, possibly spanning many buffers.
    Batch {
        locations: Vec<MatchLocation>,
        /// Overrides [`BatchOptions::strategy`] when set.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        strategy: Option<Strategy>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceRequest {
    #[serde(default)]
    pub flags: String,
    pub find: String,
    #[serde(default)]
    pub replace: String,
    pub scope: Scope,
}

/// Aggregate result of one request.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub total_replacements: usize,
    pub per_buffer: Vec<ExecutionOutcome>,
    /// Absent for buffer scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_used: Option<Strategy>,
    pub cancelled: bool,
}

impl RunReport {
    /// A run succeeds only if something was replaced.
    pub const fn success(&self) -> bool {
        self.total_replacements > 0
    }
}

/// Compile and run `request` against `host`.
pub fn execute<H: BufferHost + ?Sized>(
    host: &mut H,
    request: &ReplaceRequest,
    options: &BatchOptions,
    cancel: &CancelFlag,
) -> ReplaceResult<RunReport> {
    let flags = FlagSet::parse(&request.flags)?;
    let substitution = compile::compile(&request.find, &request.replace, flags)?;

    let report = match &request.scope {
        Scope::Buffer { buffer_id } => run_buffer_scope(host, buffer_id, &substitution, options),
        Scope::Batch {
            locations,
            strategy,
        } => {
            let plan = BatchPlan::build(locations);
            let options = BatchOptions {
                strategy: strategy.unwrap_or(options.strategy),
                ..options.clone()
            };
            let batch = exec::dispatch(host, &plan, &substitution, &options, cancel);
            RunReport {
                total_replacements: batch.total_replacements(),
                per_buffer: batch.outcomes,
                strategy_used: Some(batch.strategy_used),
                cancelled: batch.cancelled,
            }
        }
    };

    info!(
        flags = %flags,
        replacements = report.total_replacements,
        success = report.success(),
        "replace request finished"
    );
    Ok(report)
}

fn run_buffer_scope<H: BufferHost + ?Sized>(
    host: &mut H,
    id: &BufferId,
    substitution: &compile::Substitution,
    options: &BatchOptions,
) -> RunReport {
    let display_name = host.display_name(id);
    let mut errors = Vec::new();

    let replacements = match exec::replace_in_buffer(host, id, substitution) {
        Ok(n) => n,
        Err(e) => {
            warn!(buffer = %display_name, error = %e, "buffer substitution failed");
            errors.push(e.to_string());
            0
        }
    };

    let mut persist_failed = false;
    if options.persist && replacements > 0 {
        if let Err(e) = host.persist(id) {
            warn!(buffer = %display_name, error = %e, "persist failed");
            errors.push(e.to_string());
            persist_failed = true;
        }
    }

    RunReport {
        total_replacements: replacements,
        per_buffer: vec![ExecutionOutcome {
            buffer_id: id.clone(),
            display_name,
            attempted: 1,
            succeeded: usize::from(replacements > 0),
            replacements,
            failed: !errors.is_empty(),
            persist_failed,
            errors,
        }],
        strategy_used: None,
        cancelled: false,
    }
}
