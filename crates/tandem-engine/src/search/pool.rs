//! Scoped worker pool for root fan-out.
//!
//! Root children are handed out through a shared atomic cursor; every worker
//! owns an independent copy of the root position and plays each claimed move
//! on its own copy. Results come back in the order of the input moves no
//! matter which worker finished first.

use std::sync::atomic::{AtomicUsize, Ordering};

use tandem_core::GameState;
use tracing::trace;

/// Fixed-width pool of scoped threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// A pool of `workers` threads (at least one).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Configured worker count.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `f` to the successor of `state` under each move.
    ///
    /// Returns one result per move, in `moves` order. A panicking worker
    /// re-raises its panic on the calling thread.
    pub fn map_children<S, T, F>(&self, state: &S, moves: &[S::Move], f: F) -> Vec<T>
    where
        S: GameState,
        T: Send,
        F: Fn(&S) -> T + Sync,
    {
        let width = self.workers.min(moves.len());
        if width <= 1 {
            // Single worker: no scope overhead
            return moves.iter().map(|mv| f(&state.play(mv))).collect();
        }

        let cursor = AtomicUsize::new(0);
        let mut slots: Vec<Option<T>> = moves.iter().map(|_| None).collect();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..width)
                .map(|worker| {
                    let local = state.clone();
                    let cursor = &cursor;
                    let f = &f;
                    s.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let idx = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some(mv) = moves.get(idx) else {
                                break;
                            };
                            done.push((idx, f(&local.play(mv))));
                        }
                        trace!(worker, evaluated = done.len(), "root worker finished");
                        done
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (idx, value) in done {
                            slots[idx] = Some(value);
                        }
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
        });

        slots.into_iter().flatten().collect()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(1)
    }
}
