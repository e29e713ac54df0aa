mod cli;
mod logger;
mod prompt;

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use cli::Cli;
use logger::StderrLogger;
use pdf_async_runtime::{CancelToken, PdfCommand, PdfUpdate, worker_task};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    StderrLogger::new(cli.log_level()).init()?;

    let command = cli.command.into_command(cli.quiet).await?;
    run(command).await
}

/// Run one command on the worker and report its updates until it finishes
async fn run(command: PdfCommand) -> Result<()> {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let cancel = CancelToken::new();

    let worker = tokio::spawn(worker_task(command_rx, update_tx, cancel.clone()));
    watch_ctrl_c(cancel);

    command_tx
        .send(command)
        .map_err(|_| anyhow!("PDF worker is not running"))?;
    // The worker exits once this command is done
    drop(command_tx);

    let mut result = Ok(());
    while let Some(update) = update_rx.recv().await {
        match update {
            PdfUpdate::Started { operation, total } => {
                log::info!("{operation}: {total} items");
            }
            PdfUpdate::Progress {
                operation,
                current,
                total,
            } => {
                log::debug!("{operation}: {current}/{total}");
            }
            PdfUpdate::Status { line } => log::info!("{line}"),
            PdfUpdate::ConfirmOverwrite { path, reply } => {
                let answer = tokio::task::spawn_blocking(move || prompt::ask_overwrite(&path))
                    .await
                    .unwrap_or(false);
                let _ = reply.send(answer);
            }
            PdfUpdate::Completed { operation, report } => {
                println!("{operation}: {}", report.summary);
                if report.summary.failed > 0 {
                    result = Err(anyhow!(
                        "{} of {} items failed",
                        report.summary.failed,
                        report.summary.total
                    ));
                }
            }
            PdfUpdate::Cancelled { operation, report } => {
                println!("{operation}: [Cancelled] {}", report.summary);
                result = Err(anyhow!("{operation} cancelled"));
            }
            PdfUpdate::Merged { summary } => {
                println!(
                    "Merged {} files ({} pages) → {} in {:.2}s",
                    summary.files,
                    summary.pages,
                    summary.output_file.display(),
                    summary.elapsed.as_secs_f64()
                );
            }
            PdfUpdate::Error { operation, message } => {
                result = Err(anyhow!("{operation} failed: {message}"));
            }
        }
    }

    if let Err(e) = worker.await {
        bail!("PDF worker stopped unexpectedly: {e}");
    }
    result
}

/// First Ctrl-C cancels cooperatively, a second one aborts
fn watch_ctrl_c(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        log::warn!("Cancelling, waiting for running items to finish (Ctrl-C again to abort)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            log::error!("Aborted");
            std::process::exit(130);
        }
    });
}
