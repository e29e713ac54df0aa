//! Chunked worker pool with streamed per-item output
//!
//! [`TaskPipeline::submit`] starts one blocking worker per chunk. Workers
//! push results through a bounded channel that the caller drains with
//! [`Session::poll_outputs`] while it watches for cancellation.

mod session;

pub use session::{ChunkOutcome, Session, SessionState};

use crate::distribute::{Chunk, ChunkId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Cooperative cancellation flag shared between a caller and its workers
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can guard the next operation
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle given to the chunk operation inside a worker
#[derive(Debug)]
pub struct TaskContext<R> {
    chunk: ChunkId,
    outputs: mpsc::Sender<R>,
    cancel: CancelToken,
}

impl<R> TaskContext<R> {
    pub fn chunk_id(&self) -> ChunkId {
        self.chunk
    }

    /// True once the session asked workers to stop
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Send one result to the driver, waiting while the channel is full.
    ///
    /// Returns false when the session is gone and nobody will read it.
    pub fn write_output(&self, output: R) -> bool {
        self.outputs.blocking_send(output).is_ok()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Output channel capacity shared by all workers
    pub channel_capacity: usize,
    /// Longest time a blocking poll waits for output
    pub poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskPipeline {
    config: PipelineConfig,
}

impl TaskPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Start one worker per chunk and return the live session.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit<I, R, T, E, F>(&self, chunks: Vec<Chunk<I>>, operation: F) -> Session<R, T, E>
    where
        I: Send + 'static,
        R: Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(&TaskContext<R>, Chunk<I>) -> Result<T, E> + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let operation = Arc::new(operation);
        let mut session = Session::new(rx, chunks.len(), self.config.poll_interval);

        for chunk in chunks {
            let ctx = TaskContext {
                chunk: chunk.id,
                outputs: tx.clone(),
                cancel: session.cancel_token(),
            };
            let abandoned = session.abandon_token();
            let finished = session.finished_counter();
            let operation = Arc::clone(&operation);
            let id = chunk.id;

            let handle = tokio::task::spawn_blocking(move || {
                let _done = session::FinishGuard::new(finished);
                if abandoned.is_cancelled() {
                    log::debug!("{} abandoned before start", ctx.chunk);
                    return None;
                }
                log::debug!("{} started with {} items", ctx.chunk, chunk.len());
                Some(operation(&ctx, chunk))
            });
            session.track(id, handle);
        }

        session
    }
}
