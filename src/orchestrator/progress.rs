// src/orchestrator/progress.rs
// Milestone notifications

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

/// Milestones surfaced to the optional progress callback.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    AnalysisCompleted,
    /// Planning produced nothing; a forced retry is being issued.
    PlanningRetry,
    /// The deterministic fallback chose a tool after the retry came up empty.
    FallbackSelected { tool: String },
    ToolStarted { tool: String },
    /// The planning/execution/evaluation loop finished.
    RoundsCompleted { rounds: usize, tool_calls: usize },
    SynthesisCompleted,
    ValidationRound { round: usize, accepted: bool },
    Failed { message: String },
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Wraps the optional callback so a panic inside it can never abort the
/// pipeline.
#[derive(Clone, Default)]
pub(crate) struct ProgressSink {
    callback: Option<ProgressCallback>,
}

impl ProgressSink {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self { callback }
    }

    pub fn set(&mut self, callback: Option<ProgressCallback>) {
        self.callback = callback;
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(callback) = &self.callback {
            let result = catch_unwind(AssertUnwindSafe(|| callback(&event)));
            if result.is_err() {
                warn!("Progress callback panicked on {:?}, continuing", event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_without_callback_is_noop() {
        let sink = ProgressSink::default();
        sink.emit(ProgressEvent::AnalysisCompleted);
    }

    #[test]
    fn test_emit_invokes_callback() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let sink = ProgressSink::new(Some(Arc::new(move |_event| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        })));

        sink.emit(ProgressEvent::AnalysisCompleted);
        sink.emit(ProgressEvent::ToolStarted {
            tool: "calendar_list_events".to_string(),
        });
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_panic_does_not_propagate() {
        let sink = ProgressSink::new(Some(Arc::new(|_event| {
            panic!("callback blew up");
        })));

        // Must not unwind into the caller
        sink.emit(ProgressEvent::SynthesisCompleted);
    }
}
