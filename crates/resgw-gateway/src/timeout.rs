//! Per-request deadline scheduling.
//!
//! The controller arms one single-shot deadline per public request at
//! registration time. Deadlines are never canceled: finalization is
//! idempotent, so a timer firing after early completion is a harmless
//! no-op.

use std::time::Duration;

use resgw_core::CorrelationId;

/// Named finalize callback armed together with a deadline
pub type FinalizeFn = Box<dyn FnOnce() + Send + 'static>;

/// One-shot deadline scheduler
pub trait TimeoutScheduler: Send + Sync {
    /// Invoke `finalize` once `deadline` has elapsed
    fn arm(&self, correlation_id: CorrelationId, deadline: Duration, finalize: FinalizeFn);
}

/// Scheduler backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TimeoutScheduler for TokioScheduler {
    fn arm(&self, correlation_id: CorrelationId, deadline: Duration, finalize: FinalizeFn) {
        tracing::trace!(correlation_id, ?deadline, "arming response deadline");
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            finalize();
        });
    }
}
