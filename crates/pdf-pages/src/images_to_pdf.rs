//! Pack image files into a single PDF, one page per image

use crate::io::save_pdf;
use crate::options::ImagesToPdfOptions;
use crate::types::*;
use crate::util::{ensure_parent_dir, open_in_file_manager};
use image::{ColorType, GenericImageView, ImageFormat};
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_pipeline::template::variables::builtin_context;
use pdf_pipeline::{
    Chunk, Disposition, DriverOptions, ErrorPolicy, ItemReport, NameGenerator, Operation,
    OperationContext, PipelineDriver, PipelineError, RunOutcome, RunReport, RunSummary,
    TaskContext, TaskReturn,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const OPERATION_NAME: &str = "images-to-pdf";
const PRODUCER: &str = concat!("pdf-pages ", env!("CARGO_PKG_VERSION"));

/// An image XObject ready to be placed on a page
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub width: u32,
    pub height: u32,
    pub stream: Stream,
    /// Alpha channel as a separate soft mask
    pub smask: Option<Stream>,
}

/// Outcome of one image file
#[derive(Debug, Clone)]
pub struct ImageResult {
    pub ordinal: usize,
    pub path: PathBuf,
    pub image: Option<EncodedImage>,
    pub error: Option<String>,
}

impl ItemReport for ImageResult {
    fn ordinal(&self) -> usize {
        self.ordinal
    }

    fn operation(&self) -> Operation {
        if self.error.is_some() {
            Operation::Errored
        } else {
            Operation::Created
        }
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn describe(&self) -> String {
        match &self.error {
            Some(e) => format!("Error processing page {}: {}", self.ordinal + 1, e),
            None => format!("Page processed: {}", self.ordinal + 1),
        }
    }
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: Option<&str>) -> Dictionary {
    let mut dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
    ]);
    if let Some(filter) = filter {
        dict.set("Filter", Object::Name(filter.as_bytes().to_vec()));
    }
    dict
}

fn flate_stream(dict: Dictionary, data: Vec<u8>) -> Result<Stream> {
    let mut stream = Stream::new(dict, data);
    stream.compress()?;
    Ok(stream)
}

/// Read an image file and turn it into a PDF image stream.
///
/// Three-component and gray JPEG files are embedded as is. Everything else,
/// including CMYK and YCCK JPEGs, is decoded and stored deflated, with any
/// alpha channel moved to a soft mask.
pub fn encode_image(path: &Path) -> Result<EncodedImage> {
    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    let (width, height) = decoded.dimensions();
    let color = decoded.color();

    // The decoder converts four-component JPEGs to RGB, so ask the frame header
    let passthrough = format == ImageFormat::Jpeg
        && matches!(
            (color, jpeg_components(&bytes)),
            (ColorType::L8, Some(1)) | (ColorType::Rgb8, Some(3))
        );
    if passthrough {
        let color_space = if color == ColorType::L8 { "DeviceGray" } else { "DeviceRGB" };
        let dict = image_dict(width, height, color_space, Some("DCTDecode"));
        return Ok(EncodedImage {
            width,
            height,
            stream: Stream::new(dict, bytes).with_compression(false),
            smask: None,
        });
    }

    let gray = color.channel_count() <= 2;
    let stream = if gray {
        flate_stream(image_dict(width, height, "DeviceGray", None), decoded.to_luma8().into_raw())?
    } else {
        flate_stream(image_dict(width, height, "DeviceRGB", None), decoded.to_rgb8().into_raw())?
    };

    let smask = if color.has_alpha() {
        let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|p| p.0[3]).collect();
        Some(flate_stream(image_dict(width, height, "DeviceGray", None), alpha)?)
    } else {
        None
    };

    Ok(EncodedImage {
        width,
        height,
        stream,
        smask,
    })
}

/// Component count from the first start-of-frame segment of a JPEG stream
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if bytes.get(..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut pos = 2;
    loop {
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        // Markers may be padded with fill bytes
        while *bytes.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        let marker = *bytes.get(pos + 1)?;
        pos += 2;
        match marker {
            0x01 | 0xD0..=0xD8 => continue,
            0xD9 | 0xDA => return None,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                // length(2) precision(1) height(2) width(2) components(1)
                return bytes.get(pos + 7).copied();
            }
            _ => {}
        }
        let len = u16::from_be_bytes([*bytes.get(pos)?, *bytes.get(pos + 1)?]) as usize;
        pos += len;
    }
}

/// Build a document with one page per image, each page sized to its image
/// at one point per pixel.
pub fn build_document(images: Vec<EncodedImage>, metadata: &PdfMetadata) -> Result<Document> {
    if images.is_empty() {
        return Err(PagesError::NoPages);
    }

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(images.len());

    for image in images {
        let EncodedImage {
            width,
            height,
            mut stream,
            smask,
        } = image;

        if let Some(mask) = smask {
            let mask_id = doc.add_object(mask);
            stream.dict.set("SMask", Object::Reference(mask_id));
        }
        let image_id = doc.add_object(stream);

        let content = format!("q {width} 0 0 {height} 0 0 cm /Im0 Do Q");
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let resources = Dictionary::from_iter(vec![(
            "XObject",
            Object::Dictionary(Dictionary::from_iter(vec![("Im0", Object::Reference(image_id))])),
        )]);

        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width as i64),
                    Object::Integer(height as i64),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_count)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut info = Dictionary::new();
    info.set("Producer", Object::string_literal(PRODUCER));
    for (key, value) in metadata.entries() {
        info.set(key, Object::string_literal(value));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    Ok(doc)
}

/// Worker body: encode every image of the chunk, streaming each result
fn encode_chunk(
    task: &TaskContext<ImageResult>,
    chunk: Chunk<(usize, PathBuf)>,
    errors: ErrorPolicy,
) -> Result<TaskReturn> {
    let mut ret = TaskReturn::new(chunk.len());

    for (ordinal, path) in chunk.items {
        if task.is_cancelled() {
            log::debug!("{} cancelled, stopping", task.chunk_id());
            break;
        }

        let result = match encode_image(&path) {
            Ok(image) => {
                ret.success += 1;
                ImageResult {
                    ordinal,
                    path,
                    image: Some(image),
                    error: None,
                }
            }
            Err(e) => {
                log::error!("Error processing image {}: {}", path.display(), e);
                ret.failure += 1;
                ret.item_errors.insert(ordinal, e.to_string());
                ImageResult {
                    ordinal,
                    path,
                    image: None,
                    error: Some(e.to_string()),
                }
            }
        };

        let failed = result.error.is_some();
        if !task.write_output(result) {
            break;
        }
        if failed && errors == ErrorPolicy::Stop {
            log::warn!("{} stopping after image error", task.chunk_id());
            break;
        }
    }

    Ok(ret)
}

/// Convert `options.image_files` into one PDF at the expanded `dest_file`.
///
/// The duplicate policy is applied to the destination once, before any work.
/// With [`ErrorPolicy::Stop`] a failed image fails the run and nothing is
/// written; with [`ErrorPolicy::Continue`] failed images are left out.
pub async fn images_to_pdf(
    options: &ImagesToPdfOptions,
    context: &OperationContext,
) -> Result<RunReport> {
    options.validate()?;
    let workers = options.workers()?;
    let total = options.image_files.len();

    let names = NameGenerator::new(builtin_context(None, total));
    let dest = std::path::absolute(names.generate(&options.dest_file).map_err(PipelineError::from)?)?;

    // Prompts may block on user input
    let policy = options.duplicate_policy;
    let prompt = context.prompt.clone();
    let target = dest.clone();
    let disposition =
        tokio::task::spawn_blocking(move || policy.resolve(&target, prompt.as_deref())).await??;
    if disposition == Disposition::Skip {
        context
            .reporter
            .status(&format!("[Skipped] {} already exists", dest.display()));
        let mut summary = RunSummary::new(total);
        summary.succeeded = total;
        summary.skipped = total;
        return Ok(RunReport {
            outcome: RunOutcome::Completed,
            summary,
        });
    }
    ensure_parent_dir(&dest)?;

    let items: Vec<(usize, PathBuf)> = options.image_files.iter().cloned().enumerate().collect();
    let error_policy = options.error_policy;
    let context = context.verbosity(options.verbose);
    let driver = PipelineDriver::new(DriverOptions::with_workers(workers), &context);

    let mut pages = BTreeMap::new();
    let report = driver
        .run(
            OPERATION_NAME,
            items,
            move |task, chunk| encode_chunk(task, chunk, error_policy),
            |result: ImageResult| {
                if let Some(image) = result.image {
                    pages.insert(result.ordinal, image);
                }
            },
        )
        .await;

    if let Some((chunk, message)) = report.fatal_error() {
        return Err(PagesError::ChunkFailed {
            chunk: chunk.to_string(),
            message: message.to_string(),
        });
    }
    if report.is_cancelled() {
        context.reporter.status("Cancelled by user");
        return Ok(report);
    }
    if error_policy == ErrorPolicy::Stop {
        if let Some((ordinal, message)) = report.summary.failures.iter().next() {
            return Err(PagesError::ItemFailed {
                page: ordinal + 1,
                message: message.clone(),
            });
        }
    }

    let doc = build_document(pages.into_values().collect(), &options.metadata)?;
    save_pdf(doc, &dest).await?;
    context
        .reporter
        .status(&format!("PDF saved: {}", dest.display()));

    if options.open_output_dir {
        if let Some(parent) = dest.parent() {
            open_in_file_manager(parent);
        }
    }

    Ok(report)
}
