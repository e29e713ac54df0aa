use image::{Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_async_runtime::*;
use pdf_pipeline::DuplicatePolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

struct Worker {
    command_tx: mpsc::UnboundedSender<PdfCommand>,
    update_rx: mpsc::UnboundedReceiver<PdfUpdate>,
    cancel: CancelToken,
}

fn spawn_worker() -> Worker {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let cancel = CancelToken::new();
    tokio::spawn(worker_task(command_rx, update_tx, cancel.clone()));
    Worker {
        command_tx,
        update_rx,
        cancel,
    }
}

impl Worker {
    async fn next(&mut self) -> PdfUpdate {
        tokio::time::timeout(Duration::from_secs(30), self.update_rx.recv())
            .await
            .expect("worker stalled")
            .expect("worker exited")
    }

    /// Skip progress and status updates until a terminal one arrives
    async fn finish(&mut self) -> PdfUpdate {
        loop {
            match self.next().await {
                PdfUpdate::Started { .. } | PdfUpdate::Progress { .. } | PdfUpdate::Status { .. } => {}
                other => return other,
            }
        }
    }
}

fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(8, 8, Rgb([0, 128, 255])).save(&path).unwrap();
    path
}

fn write_test_pdf(path: &Path, num_pages: usize) {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..num_pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(num_pages as i64)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn images_command(images: Vec<PathBuf>, dest: &Path, policy: DuplicatePolicy) -> PdfCommand {
    PdfCommand::ImagesToPdf {
        options: ImagesToPdfOptions {
            image_files: images,
            dest_file: dest.to_string_lossy().into_owned(),
            duplicate_policy: policy,
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn test_images_to_pdf_streams_progress() {
    let dir = tempfile::tempdir().unwrap();
    let images = vec![write_png(dir.path(), "a.png"), write_png(dir.path(), "b.png")];
    let dest = dir.path().join("out.pdf");

    let mut worker = spawn_worker();
    worker
        .command_tx
        .send(images_command(images, &dest, DuplicatePolicy::Overwrite))
        .unwrap();

    match worker.next().await {
        PdfUpdate::Started { operation, total } => {
            assert_eq!(operation, "images-to-pdf");
            assert_eq!(total, 2);
        }
        other => panic!("Expected Started, got {other:?}"),
    }

    let mut last_progress = 0;
    let mut statuses = Vec::new();
    let report = loop {
        match worker.next().await {
            PdfUpdate::Progress { current, total, .. } => {
                assert_eq!(total, 2);
                last_progress = current;
            }
            PdfUpdate::Status { line } => statuses.push(line),
            PdfUpdate::Completed { operation, report } => {
                assert_eq!(operation, "images-to-pdf");
                break report;
            }
            other => panic!("Unexpected update {other:?}"),
        }
    };

    assert_eq!(last_progress, 2);
    assert_eq!(report.summary.succeeded, 2);
    assert!(statuses.iter().any(|line| line.starts_with("[Task] chunk-0:")));
    assert!(statuses.iter().any(|line| line.starts_with("PDF saved:")));
    assert!(dest.is_file());
}

#[tokio::test]
async fn test_confirm_overwrite_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.pdf");
    std::fs::write(&dest, b"old").unwrap();
    let images = vec![write_png(dir.path(), "a.png")];

    let mut worker = spawn_worker();

    // Declined: the file stays
    worker
        .command_tx
        .send(images_command(images.clone(), &dest, DuplicatePolicy::AskUser))
        .unwrap();
    match worker.finish().await {
        PdfUpdate::ConfirmOverwrite { path, reply } => {
            assert_eq!(path, dest);
            reply.send(false).unwrap();
        }
        other => panic!("Expected ConfirmOverwrite, got {other:?}"),
    }
    match worker.finish().await {
        PdfUpdate::Completed { report, .. } => assert_eq!(report.summary.skipped, 1),
        other => panic!("Expected Completed, got {other:?}"),
    }
    assert_eq!(std::fs::read(&dest).unwrap(), b"old");

    // Accepted: the file is replaced
    worker
        .command_tx
        .send(images_command(images, &dest, DuplicatePolicy::AskUser))
        .unwrap();
    match worker.finish().await {
        PdfUpdate::ConfirmOverwrite { reply, .. } => reply.send(true).unwrap(),
        other => panic!("Expected ConfirmOverwrite, got {other:?}"),
    }
    match worker.finish().await {
        PdfUpdate::Completed { report, .. } => assert_eq!(report.summary.skipped, 0),
        other => panic!("Expected Completed, got {other:?}"),
    }
    assert!(std::fs::read(&dest).unwrap().starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_cancel_then_next_command_runs() {
    let dir = tempfile::tempdir().unwrap();
    let images: Vec<_> = (0..6)
        .map(|i| write_png(dir.path(), &format!("{i}.png")))
        .collect();

    let mut worker = spawn_worker();
    worker.cancel.cancel();

    worker
        .command_tx
        .send(images_command(images.clone(), &dir.path().join("first.pdf"), DuplicatePolicy::Overwrite))
        .unwrap();
    match worker.finish().await {
        PdfUpdate::Cancelled { operation, .. } => assert_eq!(operation, "images-to-pdf"),
        other => panic!("Expected Cancelled, got {other:?}"),
    }

    worker
        .command_tx
        .send(images_command(images, &dir.path().join("second.pdf"), DuplicatePolicy::Overwrite))
        .unwrap();
    match worker.finish().await {
        PdfUpdate::Completed { report, .. } => assert_eq!(report.summary.succeeded, 6),
        other => panic!("Expected Completed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_merge_command() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.pdf");
    let second = dir.path().join("b.pdf");
    write_test_pdf(&first, 2);
    write_test_pdf(&second, 4);

    let mut worker = spawn_worker();
    worker
        .command_tx
        .send(PdfCommand::MergePdfs {
            options: MergeOptions {
                pdf_files: vec![first, second],
                output_file: dir.path().join("merged.pdf"),
            },
        })
        .unwrap();

    match worker.finish().await {
        PdfUpdate::Merged { summary } => {
            assert_eq!(summary.files, 2);
            assert_eq!(summary.pages, 6);
        }
        other => panic!("Expected Merged, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_command_reports_error() {
    let mut worker = spawn_worker();
    worker
        .command_tx
        .send(PdfCommand::PagesToImages {
            options: PagesToImagesOptions::new("/definitely/not/here.pdf"),
        })
        .unwrap();

    match worker.finish().await {
        PdfUpdate::Error { operation, message } => {
            assert_eq!(operation, "pages-to-images");
            assert!(message.contains("input_file"));
        }
        other => panic!("Expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_worker_exits_when_commands_close() {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, _update_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(worker_task(command_rx, update_tx, CancelToken::new()));
    drop(command_tx);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
