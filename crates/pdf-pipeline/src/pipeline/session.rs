use super::CancelToken;
use crate::distribute::ChunkId;
use crate::types::{PipelineError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Workers are running or output is still pending
    Running,
    /// Cancellation was requested; workers finish their current item
    Draining,
    /// Every chunk operation returned
    Completed,
    /// Channel closed and resources released
    Destroyed,
}

/// How one chunk ended
#[derive(Debug)]
pub enum ChunkOutcome<T, E> {
    Finished(T),
    /// The operation returned an error, e.g. the source failed to open
    Failed(E),
    Panicked(String),
    /// Skipped because the session was cancelled before the chunk started
    NotStarted,
}

impl<T, E> ChunkOutcome<T, E> {
    pub fn is_finished(&self) -> bool {
        matches!(self, ChunkOutcome::Finished(_))
    }
}

/// Counts a worker as done when dropped, panics included
pub(super) struct FinishGuard(Arc<AtomicUsize>);

impl FinishGuard {
    pub(super) fn new(counter: Arc<AtomicUsize>) -> Self {
        Self(counter)
    }
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

type WorkerHandle<T, E> = JoinHandle<Option<std::result::Result<T, E>>>;

/// Live state of one pipeline run
pub struct Session<R, T, E> {
    outputs: mpsc::Receiver<R>,
    handles: Vec<(ChunkId, WorkerHandle<T, E>)>,
    results: BTreeMap<ChunkId, ChunkOutcome<T, E>>,
    chunk_count: usize,
    finished: Arc<AtomicUsize>,
    cancel: CancelToken,
    abandon: CancelToken,
    poll_interval: Duration,
    draining: bool,
    destroyed: bool,
}

impl<R, T, E> Session<R, T, E> {
    pub(super) fn new(outputs: mpsc::Receiver<R>, chunk_count: usize, poll_interval: Duration) -> Self {
        Self {
            outputs,
            handles: Vec::with_capacity(chunk_count),
            results: BTreeMap::new(),
            chunk_count,
            finished: Arc::new(AtomicUsize::new(0)),
            cancel: CancelToken::new(),
            abandon: CancelToken::new(),
            poll_interval,
            draining: false,
            destroyed: false,
        }
    }

    pub(super) fn track(&mut self, id: ChunkId, handle: WorkerHandle<T, E>) {
        self.handles.push((id, handle));
    }

    pub(super) fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub(super) fn abandon_token(&self) -> CancelToken {
        self.abandon.clone()
    }

    pub(super) fn finished_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.finished)
    }

    pub fn state(&self) -> SessionState {
        if self.destroyed {
            SessionState::Destroyed
        } else if self.draining {
            SessionState::Draining
        } else if self.all_done() {
            SessionState::Completed
        } else {
            SessionState::Running
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// True once every chunk operation has returned, drained or not
    pub fn all_done(&self) -> bool {
        self.finished.load(Ordering::SeqCst) >= self.chunk_count
    }

    /// Take the buffered results.
    ///
    /// With `block` set and nothing buffered, waits up to one poll interval
    /// for the first result.
    pub async fn poll_outputs(&mut self, block: bool) -> Vec<R> {
        let mut outputs = Vec::new();
        if block && !self.destroyed {
            if let Ok(Some(first)) = tokio::time::timeout(self.poll_interval, self.outputs.recv()).await {
                outputs.push(first);
            }
        }
        while let Ok(output) = self.outputs.try_recv() {
            outputs.push(output);
        }
        outputs
    }

    /// Ask workers to stop.
    ///
    /// Chunks that have not started are abandoned. With `set_cancel_flag`
    /// running workers also see the cancel signal and stop after their
    /// current item.
    pub fn cancel_all(&mut self, set_cancel_flag: bool) {
        if self.destroyed {
            return;
        }
        self.draining = true;
        self.abandon.cancel();
        if set_cancel_flag {
            self.cancel.cancel();
        }
    }

    /// Wait until every worker returned, draining the channel meanwhile so
    /// no worker stays blocked on a full channel.
    pub async fn wait_for_all(&mut self) -> Vec<R> {
        let mut outputs = Vec::new();
        while !self.all_done() {
            if self.destroyed {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }
            outputs.extend(self.poll_outputs(true).await);
        }
        outputs.extend(self.poll_outputs(false).await);
        outputs
    }

    /// Per-chunk outcomes, available once [`all_done`](Self::all_done)
    pub async fn results(&mut self) -> Result<&BTreeMap<ChunkId, ChunkOutcome<T, E>>> {
        if !self.all_done() {
            return Err(PipelineError::SessionPending);
        }

        for (id, handle) in self.handles.drain(..) {
            let outcome = match handle.await {
                Ok(Some(Ok(value))) => ChunkOutcome::Finished(value),
                Ok(Some(Err(e))) => ChunkOutcome::Failed(e),
                Ok(None) => ChunkOutcome::NotStarted,
                Err(e) if e.is_panic() => ChunkOutcome::Panicked(panic_message(e.into_panic())),
                Err(e) => ChunkOutcome::Panicked(e.to_string()),
            };
            self.results.insert(id, outcome);
        }

        Ok(&self.results)
    }

    /// Release the session. Safe to call repeatedly and after a partial drain.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.cancel.cancel();
        self.abandon.cancel();
        self.outputs.close();
        let mut dropped = 0;
        while self.outputs.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            log::debug!("Discarded {dropped} undrained outputs on session destroy");
        }
        // Unfinished blocking workers cannot be aborted; detaching lets them
        // run to their next cancellation check.
        self.handles.clear();
        self.destroyed = true;
    }
}

impl<R, T, E> Drop for Session<R, T, E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
