use crate::types::*;
use pdf_pipeline::{DuplicatePolicy, ErrorPolicy, ensure_in_range, ensure_non_empty, page_range};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_OUTPUT_DIR: &str = "$indir/output/";
pub const DEFAULT_FILENAME_PATTERN: &str = "page-$page.png";
pub const DEFAULT_DPI: u32 = 300;
pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 7000;
pub const MAX_ROTATION: u32 = 360;
pub const DEFAULT_MERGE_OUTPUT: &str = "merged.pdf";

/// Options for rendering PDF pages to image files
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PagesToImagesOptions {
    // Input
    pub input_file: PathBuf,
    pub page_ranges: String,

    // Output, both expanded as templates
    pub output_dir: String,
    pub filename_pattern: String,

    // Rendering
    pub dpi: u32,
    pub crop: Option<CropRect>,
    pub alpha: bool,
    pub rotation: u32,
    pub render_annotations: bool,
    pub color_space: ColorSpace,

    // Policies
    pub duplicate_policy: DuplicatePolicy,
    pub error_policy: ErrorPolicy,
    pub worker_count: usize,

    // Misc
    pub verbose: bool,
    pub open_output_dir: bool,
}

impl Default for PagesToImagesOptions {
    fn default() -> Self {
        Self {
            input_file: PathBuf::new(),
            page_ranges: page_range::ALL_PAGES.to_string(),
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            filename_pattern: DEFAULT_FILENAME_PATTERN.to_string(),
            dpi: DEFAULT_DPI,
            crop: None,
            alpha: false,
            rotation: 0,
            render_annotations: true,
            color_space: ColorSpace::Rgb,
            duplicate_policy: DuplicatePolicy::Skip,
            error_policy: ErrorPolicy::Continue,
            worker_count: 1,
            verbose: true,
            open_output_dir: false,
        }
    }
}

impl PagesToImagesOptions {
    pub fn new(input_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            ..Default::default()
        }
    }

    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref()).await
    }

    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path.as_ref()).await
    }

    /// Check every parameter without touching anything but the input path
    pub fn validate(&self) -> Result<()> {
        ensure_file_exists("input_file", &self.input_file)?;
        ensure_non_empty("filename_pattern", &self.filename_pattern)?;
        ensure_in_range("dpi", self.dpi, MIN_DPI, Some(MAX_DPI))?;
        ensure_in_range("rotation", self.rotation, 0, Some(MAX_ROTATION))?;
        if self.rotation % 90 != 0 {
            return Err(PagesError::parameter("rotation", "not a multiple of 90"));
        }
        self.workers()?;

        if let Some(crop) = &self.crop {
            if !crop.is_empty() {
                if crop.left < 0.0 || crop.top < 0.0 {
                    return Err(PagesError::parameter("crop", "negative offset"));
                }
                if crop.width() <= 0.0 || crop.height() <= 0.0 {
                    return Err(PagesError::parameter("crop", "empty rectangle"));
                }
            }
        }

        if self.color_space == ColorSpace::Cmyk && !is_jpeg_name(&self.filename_pattern) {
            return Err(PagesError::parameter(
                "filename_pattern",
                "CMYK output requires a .jpg or .jpeg extension",
            ));
        }

        Ok(())
    }

    pub fn workers(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.worker_count)
            .ok_or_else(|| PagesError::parameter("worker_count", "less than 1"))
    }

    /// Crop to apply, ignoring an all-zero rectangle
    pub fn effective_crop(&self) -> Option<CropRect> {
        self.crop.filter(|c| !c.is_empty())
    }

    /// Rotation in quarter turns, 360 folds back to 0
    pub fn quarter_turns(&self) -> u32 {
        (self.rotation / 90) % 4
    }
}

/// Options for packing images into one PDF, one page per image
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImagesToPdfOptions {
    pub image_files: Vec<PathBuf>,
    /// Expanded as a template
    pub dest_file: String,
    pub duplicate_policy: DuplicatePolicy,
    pub error_policy: ErrorPolicy,
    pub worker_count: usize,
    pub metadata: PdfMetadata,
    pub verbose: bool,
    pub open_output_dir: bool,
}

impl Default for ImagesToPdfOptions {
    fn default() -> Self {
        Self {
            image_files: Vec::new(),
            dest_file: String::new(),
            duplicate_policy: DuplicatePolicy::AskUser,
            error_policy: ErrorPolicy::Stop,
            worker_count: 1,
            metadata: PdfMetadata::default(),
            verbose: true,
            open_output_dir: false,
        }
    }
}

impl ImagesToPdfOptions {
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref()).await
    }

    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path.as_ref()).await
    }

    pub fn validate(&self) -> Result<()> {
        ensure_non_empty("dest_file", &self.dest_file)?;
        if self.image_files.is_empty() {
            return Err(PagesError::parameter("image_files", "empty list"));
        }
        for path in &self.image_files {
            ensure_file_exists("image_files", path)?;
        }
        self.workers()?;
        Ok(())
    }

    pub fn workers(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.worker_count)
            .ok_or_else(|| PagesError::parameter("worker_count", "less than 1"))
    }
}

/// Options for concatenating PDF files
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MergeOptions {
    pub pdf_files: Vec<PathBuf>,
    pub output_file: PathBuf,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            pdf_files: Vec::new(),
            output_file: PathBuf::from(DEFAULT_MERGE_OUTPUT),
        }
    }
}

impl MergeOptions {
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref()).await
    }

    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path.as_ref()).await
    }

    pub fn validate(&self) -> Result<()> {
        if self.pdf_files.is_empty() {
            return Err(PagesError::parameter("pdf_files", "No PDF files provided"));
        }
        if self.output_file.as_os_str().is_empty() {
            return Err(PagesError::parameter("output_file", "No output file provided"));
        }
        for path in &self.pdf_files {
            ensure_file_exists("pdf_files", path)?;
        }
        Ok(())
    }
}

fn ensure_file_exists(name: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(PagesError::parameter(name, "empty path"));
    }
    if !path.is_file() {
        return Err(PagesError::parameter(
            name,
            format!("file not found: {}", path.display()),
        ));
    }
    Ok(())
}

pub(crate) fn is_jpeg_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}

#[cfg(feature = "serde")]
async fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| PagesError::Config(format!("Failed to parse config: {}", e)))
}

#[cfg(feature = "serde")]
async fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PagesError::Config(format!("Failed to serialize config: {}", e)))?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
