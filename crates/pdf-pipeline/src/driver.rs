//! Runs a chunked operation to completion or cancellation and aggregates the
//! streamed per-item results into a [`RunReport`].

use crate::distribute::{Chunk, ChunkId, distribute};
use crate::pipeline::{ChunkOutcome, PipelineConfig, TaskContext, TaskPipeline};
use crate::progress::OperationContext;
use crate::work::{ItemReport, Operation, TaskReturn};
use std::collections::BTreeMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// How a run ended. Cancellation is an outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Cancelled,
}

/// Aggregated counts of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    /// Includes skipped items
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Item ordinal to error message
    pub failures: BTreeMap<usize, String>,
    /// Chunks that failed or panicked as a whole
    pub chunk_failures: BTreeMap<ChunkId, String>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Number of items that reported back
    pub fn finished(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn record<R: ItemReport>(&mut self, item: &R) {
        match item.operation() {
            Operation::Errored => {
                self.failed += 1;
                let message = item.error().unwrap_or("unknown error").to_string();
                self.failures.insert(item.ordinal(), message);
            }
            Operation::Skipped => {
                self.succeeded += 1;
                self.skipped += 1;
            }
            Operation::Created | Operation::Overwritten => self.succeeded += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Finished in {:.2}s; total: {}; success: {}; skipped: {}; failure: {}",
            self.elapsed.as_secs_f64(),
            self.total,
            self.succeeded,
            self.skipped,
            self.failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub summary: RunSummary,
}

impl RunReport {
    /// Report for a run that had nothing to do
    pub fn empty() -> Self {
        Self {
            outcome: RunOutcome::Completed,
            summary: RunSummary::default(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.outcome == RunOutcome::Cancelled
    }

    /// First fatal chunk failure of a completed run. A cancelled run never
    /// fails; its chunk failures stay in the summary.
    pub fn fatal_error(&self) -> Option<(ChunkId, &str)> {
        if self.is_cancelled() {
            return None;
        }
        self.summary
            .chunk_failures
            .iter()
            .next()
            .map(|(id, message)| (*id, message.as_str()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DriverOptions {
    pub worker_count: NonZeroUsize,
    pub pipeline: PipelineConfig,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            worker_count: NonZeroUsize::MIN,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl DriverOptions {
    pub fn with_workers(worker_count: NonZeroUsize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }
}

/// Drives one pipeline session from submit to destroy
pub struct PipelineDriver<'a> {
    options: DriverOptions,
    context: &'a OperationContext,
}

impl<'a> PipelineDriver<'a> {
    pub fn new(options: DriverOptions, context: &'a OperationContext) -> Self {
        Self { options, context }
    }

    /// Distribute `items`, run `operation` on every chunk and hand each
    /// streamed result to `sink` after it was counted.
    ///
    /// Watches the context's cancel token while polling. On cancel the
    /// workers are asked to stop, every worker is awaited and the outputs
    /// they still produced are drained before the report is returned.
    pub async fn run<I, R, E, F, S>(
        &self,
        name: &str,
        items: Vec<I>,
        operation: F,
        mut sink: S,
    ) -> RunReport
    where
        I: Send + 'static,
        R: ItemReport + Send + 'static,
        E: fmt::Display + Send + 'static,
        F: Fn(&TaskContext<R>, Chunk<I>) -> Result<TaskReturn, E> + Send + Sync + 'static,
        S: FnMut(R),
    {
        let started = Instant::now();
        let reporter = &self.context.reporter;
        let cancel = &self.context.cancel;
        let total = items.len();
        let mut summary = RunSummary::new(total);
        let mut outcome = RunOutcome::Completed;

        reporter.start(name, total);

        let chunks = distribute(items, self.options.worker_count);
        log::debug!("{name}: {} chunks for {total} items", chunks.len());

        let pipeline = TaskPipeline::new(self.options.pipeline);
        let mut session = pipeline.submit(chunks, operation);

        let mut accept = |item: R, summary: &mut RunSummary| {
            summary.record(&item);
            reporter.progress(summary.finished(), total);
            reporter.status(&item.describe());
            sink(item);
        };

        loop {
            if cancel.is_cancelled() {
                log::info!("{name}: cancel requested, waiting for workers");
                session.cancel_all(true);
                for item in session.wait_for_all().await {
                    accept(item, &mut summary);
                }
                outcome = RunOutcome::Cancelled;
                break;
            }
            if session.all_done() {
                break;
            }
            for item in session.poll_outputs(true).await {
                accept(item, &mut summary);
            }
        }

        for item in session.poll_outputs(false).await {
            accept(item, &mut summary);
        }

        let mut lines = Vec::new();
        match session.results().await {
            Ok(results) => {
                for (id, chunk) in results {
                    match chunk {
                        ChunkOutcome::Finished(ret) => lines.push(format!("[Task] {id}: {ret}")),
                        ChunkOutcome::Failed(e) => {
                            lines.push(format!("[Task] {id}: error: {e}"));
                            summary.chunk_failures.insert(*id, e.to_string());
                        }
                        ChunkOutcome::Panicked(message) => {
                            lines.push(format!("[Task] {id}: panicked: {message}"));
                            summary.chunk_failures.insert(*id, message.clone());
                        }
                        ChunkOutcome::NotStarted => lines.push(format!("[Task] {id}: not started")),
                    }
                }
            }
            Err(e) => log::warn!("{name}: {e}"),
        }
        session.destroy();

        for line in &lines {
            reporter.status(line);
        }

        summary.elapsed = started.elapsed();
        if outcome == RunOutcome::Cancelled {
            reporter.status(&format!("[Cancelled] {summary}"));
        } else {
            reporter.status(&summary.to_string());
        }

        RunReport { outcome, summary }
    }
}
