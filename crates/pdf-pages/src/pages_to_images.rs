//! Render a page selection of one PDF to image files

use crate::options::{DEFAULT_OUTPUT_DIR, PagesToImagesOptions};
use crate::pdfium::{init_pdfium, page_count};
use crate::render::{RenderSettings, render_page, save_image};
use crate::types::*;
use crate::util::{ensure_parent_dir, open_in_file_manager};
use pdf_pipeline::template::variables::{self, builtin_context};
use pdf_pipeline::{
    Chunk, DriverOptions, ItemPolicy, NameGenerator, OperationContext, PageRange, PageResult,
    PipelineDriver, PipelineError, RunReport, TaskContext, TaskReturn, WorkItem, process_page_chunk,
};
use std::path::{Path, PathBuf};

pub const OPERATION_NAME: &str = "pages-to-images";

/// Output locations for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub output_dir: PathBuf,
    pub items: Vec<WorkItem>,
}

/// Expand the output directory and filename templates for every selected page.
///
/// `$index` and `$page` count items in selection order, so a reversed or
/// repeating range still gets distinct names. `$pageno` is the source page
/// number. Missing directories are created.
pub fn plan_outputs(
    options: &PagesToImagesOptions,
    input_file: &Path,
    page_count: usize,
) -> Result<OutputPlan> {
    let range = PageRange::parse(&options.page_ranges, page_count).map_err(PipelineError::from)?;

    let mut names = NameGenerator::new(builtin_context(Some(input_file), page_count));

    let dir_template = if options.output_dir.trim().is_empty() {
        DEFAULT_OUTPUT_DIR
    } else {
        options.output_dir.as_str()
    };
    let output_dir = std::path::absolute(names.generate(dir_template).map_err(PipelineError::from)?)?;
    std::fs::create_dir_all(&output_dir)?;

    let mut items = Vec::with_capacity(range.len());
    for (ordinal, page_index) in range.into_iter().enumerate() {
        names.set(variables::CURRENT_INDEX, ordinal);
        names.set(variables::CURRENT_PAGE, ordinal + 1);
        names.set(variables::SOURCE_PAGE, page_index + 1);
        let filename = names
            .generate(&options.filename_pattern)
            .map_err(PipelineError::from)?;
        let output = output_dir.join(filename);
        ensure_parent_dir(&output)?;
        items.push(WorkItem {
            ordinal,
            page_index,
            output,
        });
    }

    Ok(OutputPlan { output_dir, items })
}

/// Render the selected pages of `options.input_file` to image files.
///
/// Cancellation through `context` yields a [`RunReport`] with the cancelled
/// outcome. A chunk that failed as a whole is returned as an error once every
/// worker finished.
pub async fn pages_to_images(
    options: &PagesToImagesOptions,
    context: &OperationContext,
) -> Result<RunReport> {
    options.validate()?;
    let workers = options.workers()?;
    let input = std::path::absolute(&options.input_file)?;

    let count_path = input.clone();
    let total_pages = tokio::task::spawn_blocking(move || page_count(&count_path)).await??;
    log::debug!("{} has {} pages", input.display(), total_pages);

    let plan = plan_outputs(options, &input, total_pages)?;

    let policy = ItemPolicy {
        duplicates: options.duplicate_policy,
        errors: options.error_policy,
        prompt: context.prompt.clone(),
    };
    let settings = RenderSettings::from(options);
    let context = context.verbosity(options.verbose);
    let driver = PipelineDriver::new(DriverOptions::with_workers(workers), &context);

    let source = input.clone();
    let report = driver
        .run(
            OPERATION_NAME,
            plan.items,
            move |task, chunk| render_chunk(task, chunk, &source, &policy, &settings),
            |_: PageResult| {},
        )
        .await;

    if let Some((chunk, message)) = report.fatal_error() {
        return Err(PagesError::ChunkFailed {
            chunk: chunk.to_string(),
            message: message.to_string(),
        });
    }

    if options.open_output_dir && !report.is_cancelled() {
        open_in_file_manager(&plan.output_dir);
    }

    Ok(report)
}

/// Worker body: open the document once and render every item of the chunk
fn render_chunk(
    task: &TaskContext<PageResult>,
    chunk: Chunk<WorkItem>,
    source: &Path,
    policy: &ItemPolicy,
    settings: &RenderSettings,
) -> Result<TaskReturn> {
    let pdfium = init_pdfium()?;
    let document = pdfium.load_pdf_from_file(source, None)?;

    let ret = process_page_chunk(task, chunk, policy, |item| {
        let image = render_page(&document, item.page_index, settings)?;
        save_image(image, &item.output, settings.color_space, settings.alpha)
    })?;

    Ok(ret)
}
