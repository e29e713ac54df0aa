use pdfium_render::prelude::{Pdfium, PdfiumError};
use std::path::Path;

/// Directory searched for a bundled pdfium library, relative to the working directory
pub const VENDOR_LIB_DIR: &str = "vendor/pdfium/lib";

/// Initialize Pdfium, trying the vendored library first, then falling back to system
pub fn init_pdfium() -> Result<Pdfium, PdfiumError> {
    let vendor_path = std::env::current_dir()
        .ok()
        .map(|dir| dir.join(VENDOR_LIB_DIR))
        .filter(|p| p.exists());

    if let Some(vendor_path) = vendor_path {
        if let Ok(binding) =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&vendor_path))
        {
            return Ok(Pdfium::new(binding));
        }
        log::debug!("Vendored pdfium at {} failed to bind", vendor_path.display());
    }

    Pdfium::bind_to_system_library().map(Pdfium::new)
}

/// Count the pages of `path` with a short-lived document handle
pub fn page_count(path: &Path) -> Result<usize, PdfiumError> {
    let pdfium = init_pdfium()?;
    let document = pdfium.load_pdf_from_file(path, None)?;
    Ok(document.pages().len() as usize)
}
