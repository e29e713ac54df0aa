use crate::duplicate::OverwritePrompt;
use crate::pipeline::CancelToken;
use std::fmt;
use std::sync::Arc;

/// Receives progress from a running operation
pub trait ProgressReporter: Send + Sync {
    /// A run of `total` items is about to start
    fn start(&self, _operation: &str, _total: usize) {}

    /// `done` of `total` items have reported back
    fn progress(&self, _done: usize, _total: usize) {}

    /// One human readable status line
    fn status(&self, _line: &str) {}
}

/// Writes status lines through the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter {
    pub verbose: bool,
}

impl LogReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for LogReporter {
    fn start(&self, operation: &str, total: usize) {
        log::info!("{operation}: {total} items");
    }

    fn progress(&self, done: usize, total: usize) {
        log::debug!("progress {done}/{total}");
    }

    fn status(&self, line: &str) {
        if self.verbose {
            log::info!("{line}");
        } else {
            log::debug!("{line}");
        }
    }
}

/// Forwards counts to an inner reporter and drops the status lines
struct QuietReporter(Arc<dyn ProgressReporter>);

impl ProgressReporter for QuietReporter {
    fn start(&self, operation: &str, total: usize) {
        self.0.start(operation, total);
    }

    fn progress(&self, done: usize, total: usize) {
        self.0.progress(done, total);
    }
}

/// Everything an operation needs from its caller besides its options
#[derive(Clone)]
pub struct OperationContext {
    pub cancel: CancelToken,
    pub reporter: Arc<dyn ProgressReporter>,
    pub prompt: Option<Arc<dyn OverwritePrompt>>,
}

impl OperationContext {
    pub fn new(reporter: Arc<dyn ProgressReporter>) -> Self {
        Self {
            cancel: CancelToken::new(),
            reporter,
            prompt: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn OverwritePrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Same context with status lines suppressed unless `verbose`
    pub fn verbosity(&self, verbose: bool) -> Self {
        let mut ctx = self.clone();
        if !verbose {
            ctx.reporter = Arc::new(QuietReporter(Arc::clone(&self.reporter)));
        }
        ctx
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new(Arc::new(LogReporter::new(true)))
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("cancel", &self.cancel)
            .field("prompt", &self.prompt.is_some())
            .finish_non_exhaustive()
    }
}
