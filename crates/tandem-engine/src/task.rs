//! Searches running on a background thread.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::error::SearchError;
use crate::search::control::SearchControl;

/// A search running on its own thread.
///
/// The closure receives the task's [`SearchControl`]; [`cancel`](Self::cancel)
/// raises its stop flag.
#[derive(Debug)]
pub struct SearchTask<T> {
    handle: Option<JoinHandle<()>>,
    rx: mpsc::Receiver<T>,
    control: SearchControl,
}

impl<T: Send + 'static> SearchTask<T> {
    /// Start `search` on a new thread.
    pub fn spawn<F>(search: F) -> Self
    where
        F: FnOnce(&SearchControl) -> T + Send + 'static,
    {
        Self::spawn_with_notify(search, || {})
    }

    /// Start `search` on a new thread and call `notify` on that thread once
    /// the result is ready to collect.
    pub fn spawn_with_notify<F, N>(search: F, notify: N) -> Self
    where
        F: FnOnce(&SearchControl) -> T + Send + 'static,
        N: FnOnce() + Send + 'static,
    {
        let control = SearchControl::unbounded();
        let worker_control = control.clone();
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            let result = search(&worker_control);
            if tx.send(result).is_err() {
                debug!("search result dropped, task was abandoned");
            }
            notify();
        });
        Self {
            handle: Some(handle),
            rx,
            control,
        }
    }
}

impl<T> SearchTask<T> {
    /// The task's control handle.
    pub fn control(&self) -> &SearchControl {
        &self.control
    }

    /// Ask the search to wind down.
    pub fn cancel(&self) {
        self.control.stop();
    }

    /// Whether the search thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Take the result if it is ready. A taken result is not returned again.
    pub fn poll(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Block until the search finishes and return its result.
    pub fn join(mut self) -> Result<T, SearchError> {
        let result = self.rx.recv().map_err(|_| SearchError::TaskFailed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        result
    }
}

/// Holds at most one in-flight search.
#[derive(Debug)]
pub struct SearchSlot<T> {
    task: Option<SearchTask<T>>,
}

impl<T: Send + 'static> SearchSlot<T> {
    /// Start a search, or fail with [`SearchError::Busy`] if one is running.
    pub fn start<F, N>(&mut self, search: F, notify: N) -> Result<&SearchControl, SearchError>
    where
        F: FnOnce(&SearchControl) -> T + Send + 'static,
        N: FnOnce() + Send + 'static,
    {
        if self.task.is_some() {
            return Err(SearchError::Busy);
        }
        let task = self.task.insert(SearchTask::spawn_with_notify(search, notify));
        Ok(task.control())
    }
}

impl<T> SearchSlot<T> {
    pub fn new() -> Self {
        Self { task: None }
    }

    /// Whether a search occupies the slot.
    pub fn is_busy(&self) -> bool {
        self.task.is_some()
    }

    /// Stop the running search, if any.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.cancel();
        }
    }

    /// Wait for the running search and free the slot.
    ///
    /// Returns `None` when the slot was already empty.
    pub fn finish(&mut self) -> Option<Result<T, SearchError>> {
        self.task.take().map(SearchTask::join)
    }
}

impl<T> Default for SearchSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
