//! Execution: single-buffer and batch substitution.
//!
//! - [`replace_in_buffer`]: one instruction over a whole buffer
//! - [`batch::execute_batch`]: a [`plan::BatchPlan`] with one [`Strategy`]
//! - [`strategy::dispatch`]: Bulk first, Precise on failure
//!
//! Batch runs capture a [`RunContext`] up front and restore it on every
//! exit path, including cancellation and panics.

pub mod batch;
pub mod plan;
pub mod strategy;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::compile::Substitution;
use crate::error::{ReplaceError, ReplaceResult};
use crate::host::{BufferHost, BufferId, CursorPosition, LineRange};

pub use batch::{BatchRun, ExecutionOutcome, execute_batch};
pub use plan::{BatchPlan, BufferPlan, MatchLocation};
pub use strategy::{BatchReport, Strategy, dispatch};

/// Cooperative cancellation, polled between units of work.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Host state a batch run must hand back untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub active_buffer: Option<BufferId>,
    pub cursor: CursorPosition,
}

impl RunContext {
    pub fn capture<H: BufferHost + ?Sized>(host: &H) -> Self {
        Self {
            active_buffer: host.active_buffer(),
            cursor: host.cursor(),
        }
    }

    pub fn restore<H: BufferHost + ?Sized>(&self, host: &mut H) {
        match &self.active_buffer {
            Some(id) => {
                if let Err(e) = host.activate(id) {
                    warn!(buffer = %id, error = %e, "could not reactivate buffer");
                }
            }
            None => host.deactivate(),
        }
        host.set_cursor(self.cursor);
        debug!(buffer = ?self.active_buffer, cursor = ?self.cursor, "run context restored");
    }
}

/// Exclusive use of a host for one run; restores the captured
/// [`RunContext`] when dropped.
pub(crate) struct HostSession<'h, H: BufferHost + ?Sized> {
    host: &'h mut H,
    context: RunContext,
}

impl<'h, H: BufferHost + ?Sized> HostSession<'h, H> {
    pub(crate) fn begin(host: &'h mut H) -> Self {
        let context = RunContext::capture(host);
        Self { host, context }
    }
}

impl<H: BufferHost + ?Sized> Deref for HostSession<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        &*self.host
    }
}

impl<H: BufferHost + ?Sized> DerefMut for HostSession<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut *self.host
    }
}

impl<H: BufferHost + ?Sized> Drop for HostSession<'_, H> {
    fn drop(&mut self) {
        self.context.restore(&mut *self.host);
    }
}

/// Apply `substitution` to every line of one buffer.
///
/// Loads the buffer if needed. A rejected instruction is reported as
/// [`ReplaceError::SubstitutionFailed`] and not retried.
pub fn replace_in_buffer<H: BufferHost + ?Sized>(
    host: &mut H,
    id: &BufferId,
    substitution: &Substitution,
) -> ReplaceResult<usize> {
    if !host.is_loaded(id) {
        host.load(id)?;
    }
    let count = host
        .apply_substitution(id, &LineRange::All, substitution)
        .map_err(|source| ReplaceError::SubstitutionFailed {
            buffer: host.display_name(id),
            line: None,
            source,
        })?;
    debug!(buffer = %id, replacements = count.replacements, "buffer substitution done");
    Ok(count.replacements)
}
