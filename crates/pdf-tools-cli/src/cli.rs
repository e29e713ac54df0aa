use anyhow::{Result, anyhow};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use pdf_async_runtime::PdfCommand;
use pdf_pages::{ColorSpace, CropRect, ImagesToPdfOptions, MergeOptions, PagesToImagesOptions};
use pdf_pipeline::{DuplicatePolicy, ErrorPolicy};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pdft", about = "Bulk PDF page tools", version)]
pub struct Cli {
    /// More log output, repeat for trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print warnings, errors and the final result
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render selected pages of a PDF to image files
    PagesToImages(PagesToImagesArgs),

    /// Combine images into one PDF, one page per image
    ImagesToPdf(ImagesToPdfArgs),

    /// Concatenate PDF files
    Merge(MergeArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Load options from a JSON file; flags given here take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the effective options to a JSON file before running
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,
}

#[derive(Args)]
pub struct PolicyArgs {
    /// What to do when an output file exists
    #[arg(long, value_enum)]
    pub duplicates: Option<DuplicateArg>,

    /// What to do when a single item fails
    #[arg(long, value_enum)]
    pub errors: Option<ErrorArg>,

    /// Number of workers, or `auto` for one per CPU
    #[arg(short = 'j', long, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Open the output directory when done
    #[arg(long)]
    pub open: bool,
}

#[derive(Args)]
pub struct PagesToImagesArgs {
    /// Input PDF file
    pub input: Option<PathBuf>,

    /// Output directory template
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// File name template, e.g. `page-$page.png` (`$pageno` is the source page)
    #[arg(short = 'n', long)]
    pub pattern: Option<String>,

    /// Pages to render, e.g. `1-3,N`, `ODD`, `N-1`
    #[arg(short = 'r', long)]
    pub pages: Option<String>,

    /// Render resolution
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Crop rectangle in points from the top left: LEFT,TOP,RIGHT,BOTTOM
    #[arg(long, value_parser = parse_crop)]
    pub crop: Option<CropRect>,

    /// Keep a transparent background
    #[arg(long)]
    pub alpha: bool,

    /// Clockwise rotation in degrees, a multiple of 90
    #[arg(long)]
    pub rotate: Option<u32>,

    /// Leave out annotations and form fields
    #[arg(long)]
    pub no_annotations: bool,

    /// Output color model
    #[arg(long, value_enum)]
    pub color: Option<ColorArg>,

    #[command(flatten)]
    pub policy: PolicyArgs,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args)]
pub struct ImagesToPdfArgs {
    /// Image files in page order
    pub images: Vec<PathBuf>,

    /// Output PDF file template
    #[arg(short, long)]
    pub output: Option<String>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub subject: Option<String>,

    #[arg(long)]
    pub keywords: Option<String>,

    #[arg(long)]
    pub creator: Option<String>,

    #[command(flatten)]
    pub policy: PolicyArgs,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args)]
pub struct MergeArgs {
    /// PDF files in merge order
    pub inputs: Vec<PathBuf>,

    /// Output PDF file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DuplicateArg {
    Skip,
    Overwrite,
    Ask,
    Fail,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ErrorArg {
    Stop,
    Continue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorArg {
    Rgb,
    Gray,
    Cmyk,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(arg: DuplicateArg) -> Self {
        match arg {
            DuplicateArg::Skip => Self::Skip,
            DuplicateArg::Overwrite => Self::Overwrite,
            DuplicateArg::Ask => Self::AskUser,
            DuplicateArg::Fail => Self::Fail,
        }
    }
}

impl From<ErrorArg> for ErrorPolicy {
    fn from(arg: ErrorArg) -> Self {
        match arg {
            ErrorArg::Stop => Self::Stop,
            ErrorArg::Continue => Self::Continue,
        }
    }
}

impl From<ColorArg> for ColorSpace {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Rgb => Self::Rgb,
            ColorArg::Gray => Self::Gray,
            ColorArg::Cmyk => Self::Cmyk,
        }
    }
}

fn parse_workers(s: &str) -> Result<usize, String> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1));
    }
    match s.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected `auto` or a positive number, got `{s}`")),
    }
}

fn parse_crop(s: &str) -> Result<CropRect, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid crop `{s}`: {e}"))?;
    match values[..] {
        [left, top, right, bottom] => Ok(CropRect::new(left, top, right, bottom)),
        _ => Err(format!("expected LEFT,TOP,RIGHT,BOTTOM, got `{s}`")),
    }
}

impl PolicyArgs {
    fn apply(
        &self,
        duplicates: &mut DuplicatePolicy,
        errors: &mut ErrorPolicy,
        workers: &mut usize,
        open: &mut bool,
    ) {
        if let Some(arg) = self.duplicates {
            *duplicates = arg.into();
        }
        if let Some(arg) = self.errors {
            *errors = arg.into();
        }
        if let Some(n) = self.workers {
            *workers = n;
        }
        if self.open {
            *open = true;
        }
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_some<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl Commands {
    /// Build the command from the optional config file and the flags.
    ///
    /// `quiet` also turns off per-item status lines.
    pub async fn into_command(self, quiet: bool) -> Result<PdfCommand> {
        match self {
            Commands::PagesToImages(args) => {
                let options = args.into_options(quiet).await?;
                Ok(PdfCommand::PagesToImages { options })
            }
            Commands::ImagesToPdf(args) => {
                let options = args.into_options(quiet).await?;
                Ok(PdfCommand::ImagesToPdf { options })
            }
            Commands::Merge(args) => {
                let options = args.into_options().await?;
                Ok(PdfCommand::MergePdfs { options })
            }
        }
    }
}

impl PagesToImagesArgs {
    pub async fn into_options(self, quiet: bool) -> Result<PagesToImagesOptions> {
        let mut options = match &self.config.config {
            Some(path) => PagesToImagesOptions::load(path)
                .await
                .map_err(|e| load_error(path, e))?,
            None => PagesToImagesOptions::default(),
        };

        set(&mut options.input_file, self.input);
        set(&mut options.output_dir, self.output_dir);
        set(&mut options.filename_pattern, self.pattern);
        set(&mut options.page_ranges, self.pages);
        set(&mut options.dpi, self.dpi);
        set_some(&mut options.crop, self.crop);
        set(&mut options.rotation, self.rotate);
        set(&mut options.color_space, self.color.map(Into::into));
        if self.alpha {
            options.alpha = true;
        }
        if self.no_annotations {
            options.render_annotations = false;
        }
        self.policy.apply(
            &mut options.duplicate_policy,
            &mut options.error_policy,
            &mut options.worker_count,
            &mut options.open_output_dir,
        );
        if quiet {
            options.verbose = false;
        }

        if let Some(path) = &self.config.save_config {
            options.save(path).await.map_err(|e| save_error(path, e))?;
            log::info!("Options saved to {}", path.display());
        }
        Ok(options)
    }
}

impl ImagesToPdfArgs {
    pub async fn into_options(self, quiet: bool) -> Result<ImagesToPdfOptions> {
        let mut options = match &self.config.config {
            Some(path) => ImagesToPdfOptions::load(path)
                .await
                .map_err(|e| load_error(path, e))?,
            None => ImagesToPdfOptions::default(),
        };

        if !self.images.is_empty() {
            options.image_files = self.images;
        }
        set(&mut options.dest_file, self.output);
        set_some(&mut options.metadata.title, self.title);
        set_some(&mut options.metadata.author, self.author);
        set_some(&mut options.metadata.subject, self.subject);
        set_some(&mut options.metadata.keywords, self.keywords);
        set_some(&mut options.metadata.creator, self.creator);
        self.policy.apply(
            &mut options.duplicate_policy,
            &mut options.error_policy,
            &mut options.worker_count,
            &mut options.open_output_dir,
        );
        if quiet {
            options.verbose = false;
        }

        if let Some(path) = &self.config.save_config {
            options.save(path).await.map_err(|e| save_error(path, e))?;
            log::info!("Options saved to {}", path.display());
        }
        Ok(options)
    }
}

impl MergeArgs {
    pub async fn into_options(self) -> Result<MergeOptions> {
        let mut options = match &self.config.config {
            Some(path) => MergeOptions::load(path)
                .await
                .map_err(|e| load_error(path, e))?,
            None => MergeOptions::default(),
        };

        if !self.inputs.is_empty() {
            options.pdf_files = self.inputs;
        }
        set(&mut options.output_file, self.output);

        if let Some(path) = &self.config.save_config {
            options.save(path).await.map_err(|e| save_error(path, e))?;
            log::info!("Options saved to {}", path.display());
        }
        Ok(options)
    }
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> anyhow::Error {
    anyhow!("Failed to load options from {}: {}", path.display(), e)
}

fn save_error(path: &Path, e: impl std::fmt::Display) -> anyhow::Error {
    anyhow!("Failed to save options to {}: {}", path.display(), e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::ffi::OsString;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("3"), Ok(3));
        assert!(parse_workers("AUTO").unwrap() >= 1);
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_parse_crop() {
        assert_eq!(
            parse_crop("0, 10.5,200,300"),
            Ok(CropRect::new(0.0, 10.5, 200.0, 300.0))
        );
        assert!(parse_crop("1,2,3").is_err());
        assert!(parse_crop("a,b,c,d").is_err());
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::try_parse_from(["pdft", "-vv", "merge", "a.pdf"]).unwrap();
        assert_eq!(cli.log_level(), LevelFilter::Trace);
        let cli = Cli::try_parse_from(["pdft", "merge", "-q", "a.pdf"]).unwrap();
        assert_eq!(cli.log_level(), LevelFilter::Warn);
        assert!(Cli::try_parse_from(["pdft", "-v", "-q", "merge"]).is_err());
    }

    #[tokio::test]
    async fn test_pages_to_images_flags() {
        let cli = Cli::try_parse_from([
            "pdft",
            "-q",
            "pages-to-images",
            "book.pdf",
            "-r",
            "1-3,N",
            "--dpi",
            "150",
            "--color",
            "cmyk",
            "-n",
            "p$page.jpg",
            "--duplicates",
            "ask",
            "-j",
            "4",
            "--no-annotations",
        ])
        .unwrap();
        let quiet = cli.quiet;

        let PdfCommand::PagesToImages { options } = cli.command.into_command(quiet).await.unwrap() else {
            panic!("wrong command");
        };
        assert_eq!(options.input_file, PathBuf::from("book.pdf"));
        assert_eq!(options.page_ranges, "1-3,N");
        assert_eq!(options.dpi, 150);
        assert_eq!(options.color_space, ColorSpace::Cmyk);
        assert_eq!(options.filename_pattern, "p$page.jpg");
        assert_eq!(options.duplicate_policy, DuplicatePolicy::AskUser);
        assert_eq!(options.worker_count, 4);
        assert!(!options.render_annotations);
        assert!(!options.verbose);
        // Untouched values keep their defaults
        assert_eq!(options.output_dir, "$indir/output/");
        assert_eq!(options.error_policy, ErrorPolicy::Continue);
    }

    #[tokio::test]
    async fn test_config_file_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("options.json");
        let base = ImagesToPdfOptions {
            image_files: vec![PathBuf::from("a.png"), PathBuf::from("b.png")],
            dest_file: "album.pdf".to_string(),
            worker_count: 2,
            ..Default::default()
        };
        base.save(&config).await.unwrap();

        let saved = dir.path().join("effective.json");
        let args: Vec<OsString> = vec![
            "pdft".into(),
            "images-to-pdf".into(),
            "-o".into(),
            "book.pdf".into(),
            "--title".into(),
            "Scans".into(),
            "--config".into(),
            config.clone().into_os_string(),
            "--save-config".into(),
            saved.clone().into_os_string(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        let PdfCommand::ImagesToPdf { options } = cli.command.into_command(false).await.unwrap() else {
            panic!("wrong command");
        };
        assert_eq!(options.image_files, base.image_files);
        assert_eq!(options.dest_file, "book.pdf");
        assert_eq!(options.worker_count, 2);
        assert_eq!(options.metadata.title.as_deref(), Some("Scans"));

        let reloaded = ImagesToPdfOptions::load(&saved).await.unwrap();
        assert_eq!(reloaded, options);
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let cli = Cli::try_parse_from(["pdft", "merge", "--config", "/definitely/not/here.json"]).unwrap();
        let err = cli.command.into_command(false).await.unwrap_err();
        assert!(err.to_string().contains("Failed to load options"));
    }
}
