pub mod images_to_pdf;
pub mod io;
pub mod merge;
mod options;
pub mod pages_to_images;
pub mod pdfium;
pub mod render;
mod types;
pub mod util;

pub use images_to_pdf::{build_document, encode_image, images_to_pdf};
pub use io::{load_pdf, load_pdfs, save_pdf};
pub use merge::{merge_documents, merge_pdfs};
pub use options::*;
pub use pages_to_images::{OutputPlan, pages_to_images, plan_outputs};
pub use types::*;
