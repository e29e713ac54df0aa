use std::path::PathBuf;
use tokio::sync::oneshot;

mod channel;
mod worker;

pub use channel::{ChannelPrompt, ChannelReporter};
pub use worker::worker_task;

// Re-export types from library crates
pub use pdf_pages::{ImagesToPdfOptions, MergeOptions, MergeSummary, PagesToImagesOptions};
pub use pdf_pipeline::{CancelToken, RunOutcome, RunReport, RunSummary};

/// Commands sent from a front end to the worker
#[derive(Debug)]
pub enum PdfCommand {
    PagesToImages { options: PagesToImagesOptions },
    ImagesToPdf { options: ImagesToPdfOptions },
    MergePdfs { options: MergeOptions },
}

impl PdfCommand {
    /// Operation name used in every update about this command
    pub fn operation(&self) -> &'static str {
        match self {
            PdfCommand::PagesToImages { .. } => pdf_pages::pages_to_images::OPERATION_NAME,
            PdfCommand::ImagesToPdf { .. } => pdf_pages::images_to_pdf::OPERATION_NAME,
            PdfCommand::MergePdfs { .. } => pdf_pages::merge::OPERATION_NAME,
        }
    }
}

/// Updates sent from the worker to the front end
#[derive(Debug)]
pub enum PdfUpdate {
    Started {
        operation: String,
        total: usize,
    },
    Progress {
        operation: String,
        current: usize,
        total: usize,
    },
    /// One human readable status line
    Status {
        line: String,
    },
    /// An output file exists and the policy asks the user.
    /// Dropping `reply` without an answer declines.
    ConfirmOverwrite {
        path: PathBuf,
        reply: oneshot::Sender<bool>,
    },
    Completed {
        operation: String,
        report: RunReport,
    },
    Cancelled {
        operation: String,
        report: RunReport,
    },
    Merged {
        summary: MergeSummary,
    },
    Error {
        operation: String,
        message: String,
    },
}
