use pdf_pages::*;
use pdf_pipeline::{DuplicatePolicy, ErrorPolicy, PipelineError};
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn input_file() -> NamedTempFile {
    tempfile::Builder::new().suffix(".pdf").tempfile().unwrap()
}

fn assert_parameter(result: Result<()>, expected: &str) {
    match result {
        Err(PagesError::Pipeline(PipelineError::Parameter { name, .. })) => {
            assert_eq!(name, expected);
        }
        other => panic!("Expected parameter error for {expected}, got {other:?}"),
    }
}

#[test]
fn test_pages_defaults() {
    let options = PagesToImagesOptions::default();
    assert_eq!(options.output_dir, "$indir/output/");
    assert_eq!(options.filename_pattern, "page-$page.png");
    assert_eq!(options.page_ranges, "ALL");
    assert_eq!(options.dpi, 300);
    assert_eq!(options.rotation, 0);
    assert!(options.render_annotations);
    assert!(!options.alpha);
    assert_eq!(options.color_space, ColorSpace::Rgb);
    assert_eq!(options.duplicate_policy, DuplicatePolicy::Skip);
    assert_eq!(options.error_policy, ErrorPolicy::Continue);
    assert_eq!(options.worker_count, 1);
    assert!(options.verbose);
}

#[test]
fn test_pages_validation_missing_input() {
    let options = PagesToImagesOptions::new("/definitely/not/here.pdf");
    assert_parameter(options.validate(), "input_file");

    let options = PagesToImagesOptions::default();
    assert_parameter(options.validate(), "input_file");
}

#[test]
fn test_pages_validation_numeric_ranges() {
    let input = input_file();
    let mut options = PagesToImagesOptions::new(input.path());
    assert!(options.validate().is_ok());

    options.dpi = 71;
    assert_parameter(options.validate(), "dpi");
    options.dpi = 7001;
    assert_parameter(options.validate(), "dpi");
    options.dpi = 7000;
    assert!(options.validate().is_ok());

    options.rotation = 45;
    assert_parameter(options.validate(), "rotation");
    options.rotation = 450;
    assert_parameter(options.validate(), "rotation");
    options.rotation = 270;
    assert!(options.validate().is_ok());
    assert_eq!(options.quarter_turns(), 3);

    options.worker_count = 0;
    assert_parameter(options.validate(), "worker_count");
}

#[test]
fn test_pages_validation_pattern_and_crop() {
    let input = input_file();
    let mut options = PagesToImagesOptions::new(input.path());

    options.filename_pattern = "  ".to_string();
    assert_parameter(options.validate(), "filename_pattern");

    options.filename_pattern = "page-$page.png".to_string();
    options.color_space = ColorSpace::Cmyk;
    assert_parameter(options.validate(), "filename_pattern");
    options.filename_pattern = "page-$page.JPG".to_string();
    assert!(options.validate().is_ok());

    options.crop = Some(CropRect::new(10.0, 10.0, 5.0, 20.0));
    assert_parameter(options.validate(), "crop");
    options.crop = Some(CropRect::new(0.0, 0.0, 0.0, 0.0));
    assert!(options.validate().is_ok());
    assert!(options.effective_crop().is_none());
}

#[test]
fn test_images_validation() {
    let mut options = ImagesToPdfOptions::default();
    assert_parameter(options.validate(), "dest_file");

    options.dest_file = "out.pdf".to_string();
    assert_parameter(options.validate(), "image_files");

    options.image_files.push(PathBuf::from("/definitely/not/here.png"));
    assert_parameter(options.validate(), "image_files");

    let image = input_file();
    options.image_files = vec![image.path().to_path_buf()];
    assert!(options.validate().is_ok());

    options.worker_count = 0;
    assert_parameter(options.validate(), "worker_count");
}

#[test]
fn test_merge_validation() {
    let mut options = MergeOptions::default();
    assert_eq!(options.output_file, PathBuf::from("merged.pdf"));
    assert_parameter(options.validate(), "pdf_files");

    let input = input_file();
    options.pdf_files.push(input.path().to_path_buf());
    options.output_file = PathBuf::new();
    assert_parameter(options.validate(), "output_file");
}

#[test]
fn test_metadata_entries_skip_empty() {
    let metadata = PdfMetadata {
        title: Some("Scans".to_string()),
        author: Some(String::new()),
        ..Default::default()
    };
    let entries: Vec<_> = metadata.entries().collect();
    assert_eq!(entries, vec![("Title", "Scans")]);
    assert!(PdfMetadata::default().is_empty());
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_save_and_load_options() {
    let mut options = PagesToImagesOptions::new("input.pdf");
    options.page_ranges = "1-3,N".to_string();
    options.dpi = 150;
    options.crop = Some(CropRect::new(0.0, 0.0, 200.0, 100.0));
    options.color_space = ColorSpace::Gray;
    options.duplicate_policy = DuplicatePolicy::Overwrite;
    options.worker_count = 4;

    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path();

    options.save(path).await.unwrap();
    let loaded = PagesToImagesOptions::load(path).await.unwrap();
    assert_eq!(options, loaded);
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_load_partial_options_uses_defaults() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), br#"{"image_files": ["a.png"], "dest_file": "out.pdf"}"#).unwrap();

    let loaded = ImagesToPdfOptions::load(temp_file.path()).await.unwrap();
    assert_eq!(loaded.image_files, vec![PathBuf::from("a.png")]);
    assert_eq!(loaded.duplicate_policy, DuplicatePolicy::AskUser);
    assert_eq!(loaded.worker_count, 1);
}

#[cfg(feature = "serde")]
#[tokio::test]
async fn test_load_invalid_config() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), b"not json").unwrap();
    assert!(matches!(
        MergeOptions::load(temp_file.path()).await,
        Err(PagesError::Config(_))
    ));
}
