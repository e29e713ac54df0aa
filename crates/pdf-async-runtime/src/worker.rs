use crate::channel::{ChannelPrompt, ChannelReporter};
use crate::{PdfCommand, PdfUpdate};
use pdf_pages::{images_to_pdf, merge_pdfs, pages_to_images};
use pdf_pipeline::{CancelToken, OperationContext, RunReport};
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Async worker task that processes PDF commands one at a time and sends
/// updates.
///
/// `cancel` stops the running command. The flag is cleared after every
/// command, so a request made while idle applies to the next one.
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<PdfCommand>,
    update_tx: mpsc::UnboundedSender<PdfUpdate>,
    cancel: CancelToken,
) {
    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &update_tx, &cancel).await;
        cancel.reset();
    }
    log::debug!("Command channel closed, worker exiting");
}

async fn process_command(
    cmd: PdfCommand,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
    cancel: &CancelToken,
) {
    let operation = cmd.operation();
    let context = OperationContext::new(Arc::new(ChannelReporter::new(update_tx.clone())))
        .with_cancel(cancel.clone())
        .with_prompt(Arc::new(ChannelPrompt::new(update_tx.clone())));

    match cmd {
        PdfCommand::PagesToImages { options } => {
            let result = pages_to_images(&options, &context).await;
            send_report(operation, result, update_tx);
        }
        PdfCommand::ImagesToPdf { options } => {
            let result = images_to_pdf(&options, &context).await;
            send_report(operation, result, update_tx);
        }
        PdfCommand::MergePdfs { options } => {
            let _ = update_tx.send(PdfUpdate::Started {
                operation: operation.to_string(),
                total: options.pdf_files.len(),
            });
            match merge_pdfs(&options).await {
                Ok(summary) => {
                    let _ = update_tx.send(PdfUpdate::Merged { summary });
                }
                Err(e) => send_error(operation, e, update_tx),
            }
        }
    }
}

fn send_report<E: Display>(
    operation: &str,
    result: Result<RunReport, E>,
    update_tx: &mpsc::UnboundedSender<PdfUpdate>,
) {
    let update = match result {
        Ok(report) if report.is_cancelled() => PdfUpdate::Cancelled {
            operation: operation.to_string(),
            report,
        },
        Ok(report) => PdfUpdate::Completed {
            operation: operation.to_string(),
            report,
        },
        Err(e) => return send_error(operation, e, update_tx),
    };
    let _ = update_tx.send(update);
}

fn send_error(operation: &str, error: impl Display, update_tx: &mpsc::UnboundedSender<PdfUpdate>) {
    log::error!("{operation} failed: {error}");
    let _ = update_tx.send(PdfUpdate::Error {
        operation: operation.to_string(),
        message: error.to_string(),
    });
}
