//! Progress reporting for the transformation search
//!
//! Loggers receive structured progress calls and never influence control
//! flow; swapping in [`NoopLogger`] changes nothing but the output.

/// Structured progress sink used by calculators and the orchestrator.
/// Send + Sync so loggers can be referenced from fold-parallel code.
pub trait SearchLogger: Send + Sync {
    /// A search stage begins.
    fn task_start(&self, message: &str);
    /// Progress within a stage (e.g. moving to the next column).
    fn task_update(&self, message: &str);
    /// A single candidate evaluation.
    fn progress(&self, message: &str);
    /// A stage-level outcome.
    fn task_result(&self, message: &str);
    /// The no-op reference score a stage gates against.
    fn baseline(&self, message: &str);
    /// A stage was skipped or found nothing.
    fn warn(&self, message: &str);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl SearchLogger for NoopLogger {
    fn task_start(&self, _message: &str) {}
    fn task_update(&self, _message: &str) {}
    fn progress(&self, _message: &str) {}
    fn task_result(&self, _message: &str) {}
    fn baseline(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
}

/// Emits through the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl SearchLogger for TracingLogger {
    fn task_start(&self, message: &str) {
        tracing::info!(target: "featforge::search", "{message}");
    }

    fn task_update(&self, message: &str) {
        tracing::info!(target: "featforge::search", "{message}");
    }

    fn progress(&self, message: &str) {
        tracing::debug!(target: "featforge::search", "{message}");
    }

    fn task_result(&self, message: &str) {
        tracing::info!(target: "featforge::search", "{message}");
    }

    fn baseline(&self, message: &str) {
        tracing::info!(target: "featforge::search", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "featforge::search", "{message}");
    }
}
