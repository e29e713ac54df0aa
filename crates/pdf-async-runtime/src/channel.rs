//! Progress and overwrite prompts carried over the update channel

use crate::PdfUpdate;
use pdf_pipeline::{OverwritePrompt, ProgressReporter};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

/// Forwards progress of a running operation as [`PdfUpdate`]s
pub struct ChannelReporter {
    update_tx: mpsc::UnboundedSender<PdfUpdate>,
    operation: Mutex<String>,
}

impl ChannelReporter {
    pub fn new(update_tx: mpsc::UnboundedSender<PdfUpdate>) -> Self {
        Self {
            update_tx,
            operation: Mutex::new(String::new()),
        }
    }

    fn operation(&self) -> String {
        self.operation
            .lock()
            .map(|name| name.clone())
            .unwrap_or_default()
    }

    fn send(&self, update: PdfUpdate) {
        // The front end may be gone already
        let _ = self.update_tx.send(update);
    }
}

impl ProgressReporter for ChannelReporter {
    fn start(&self, operation: &str, total: usize) {
        if let Ok(mut name) = self.operation.lock() {
            *name = operation.to_string();
        }
        self.send(PdfUpdate::Started {
            operation: operation.to_string(),
            total,
        });
    }

    fn progress(&self, done: usize, total: usize) {
        self.send(PdfUpdate::Progress {
            operation: self.operation(),
            current: done,
            total,
        });
    }

    fn status(&self, line: &str) {
        self.send(PdfUpdate::Status {
            line: line.to_string(),
        });
    }
}

/// Asks the front end through [`PdfUpdate::ConfirmOverwrite`].
///
/// Blocks the calling thread until the answer arrives, so it must only be
/// invoked off the async executor, as pipeline workers are.
pub struct ChannelPrompt {
    update_tx: mpsc::UnboundedSender<PdfUpdate>,
}

impl ChannelPrompt {
    pub fn new(update_tx: mpsc::UnboundedSender<PdfUpdate>) -> Self {
        Self { update_tx }
    }
}

impl OverwritePrompt for ChannelPrompt {
    fn confirm_overwrite(&self, path: &Path) -> bool {
        let (reply, answer) = oneshot::channel();
        let request = PdfUpdate::ConfirmOverwrite {
            path: path.to_path_buf(),
            reply,
        };
        if self.update_tx.send(request).is_err() {
            log::warn!("No front end to confirm overwrite of {}", path.display());
            return false;
        }
        answer.blocking_recv().unwrap_or(false)
    }
}
