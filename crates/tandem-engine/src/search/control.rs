//! Search control: the cooperative stop flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared stop signal for a running search.
///
/// Cancellation is coarse: MCTS checks the flag between iterations and
/// iterative deepening between depths. A depth or iteration already in
/// progress always completes.
#[derive(Debug, Clone)]
pub struct SearchControl {
    stopped: Arc<AtomicBool>,
    start: Instant,
    deadline: Option<Duration>,
}

impl SearchControl {
    /// Control driven by an externally owned flag.
    pub fn new(stopped: Arc<AtomicBool>) -> Self {
        Self {
            stopped,
            start: Instant::now(),
            deadline: None,
        }
    }

    /// Control that only stops when [`stop`](Self::stop) is called.
    pub fn unbounded() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }

    /// This control, additionally reporting stopped once `limit` has
    /// elapsed since it was created.
    pub fn with_deadline(mut self, limit: Duration) -> Self {
        self.deadline = Some(limit);
        self
    }

    /// Request that the search wind down.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Whether a stop was requested or the deadline passed.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
            || self
                .deadline
                .is_some_and(|limit| self.start.elapsed() >= limit)
    }

    /// Time since this control was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Reference to the shared stop flag.
    pub fn stop_flag(&self) -> &Arc<AtomicBool> {
        &self.stopped
    }
}

impl Default for SearchControl {
    fn default() -> Self {
        Self::unbounded()
    }
}
