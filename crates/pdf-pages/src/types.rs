use pdf_pipeline::PipelineError;
use pdfium_render::prelude::PdfiumError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagesError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Pdfium error: {0}")]
    Pdfium(#[from] PdfiumError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JPEG encoding error: {0}")]
    Jpeg(#[from] jpeg_encoder::EncodingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("{chunk} failed: {message}")]
    ChunkFailed { chunk: String, message: String },
    #[error("Error processing page {page}: {message}")]
    ItemFailed { page: usize, message: String },
    #[error("No pages to write")]
    NoPages,
}

impl PagesError {
    /// Shorthand for a parameter error from the pipeline crate
    pub fn parameter(name: &str, reason: impl Into<String>) -> Self {
        PagesError::Pipeline(PipelineError::parameter(name, reason))
    }
}

pub type Result<T> = std::result::Result<T, PagesError>;

/// Output color model of rendered pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColorSpace {
    #[default]
    Rgb,
    Gray,
    /// Four channel JPEG output only
    Cmyk,
}

/// Crop rectangle in PDF points, origin at the top left of the page
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CropRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl CropRect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// An all-zero rectangle means no crop
    pub fn is_empty(&self) -> bool {
        self.left == 0.0 && self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Document information written into a generated PDF
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
}

impl PdfMetadata {
    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    /// Set entries as Info dictionary key and value
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("Title", self.title.as_deref()),
            ("Author", self.author.as_deref()),
            ("Subject", self.subject.as_deref()),
            ("Keywords", self.keywords.as_deref()),
            ("Creator", self.creator.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
    }
}

/// Result of a merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSummary {
    pub output_file: PathBuf,
    pub files: usize,
    pub pages: usize,
    pub elapsed: Duration,
}
