//! Page rasterization and image file output

use crate::options::PagesToImagesOptions;
use crate::types::*;
use image::{DynamicImage, GenericImageView};
use jpeg_encoder::{ColorType, Encoder};
use pdfium_render::prelude::{PdfColor, PdfDocument, PdfRenderConfig};
use std::path::Path;

pub const PDF_POINTS_PER_INCH: f32 = 72.0;
const JPEG_QUALITY: u8 = 90;

/// Render settings shared by every page of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub dpi: u32,
    pub crop: Option<CropRect>,
    pub alpha: bool,
    pub quarter_turns: u32,
    pub render_annotations: bool,
    pub color_space: ColorSpace,
}

impl From<&PagesToImagesOptions> for RenderSettings {
    fn from(options: &PagesToImagesOptions) -> Self {
        Self {
            dpi: options.dpi,
            crop: options.effective_crop(),
            alpha: options.alpha,
            quarter_turns: options.quarter_turns(),
            render_annotations: options.render_annotations,
            color_space: options.color_space,
        }
    }
}

impl RenderSettings {
    fn scale(&self) -> f32 {
        self.dpi as f32 / PDF_POINTS_PER_INCH
    }
}

/// Render one page of an open document to an image
pub fn render_page(
    document: &PdfDocument,
    page_index: usize,
    settings: &RenderSettings,
) -> Result<DynamicImage> {
    let index = u16::try_from(page_index)
        .map_err(|_| PagesError::Config(format!("page index {page_index} out of range")))?;
    let page = document.pages().get(index)?;

    let scale = settings.scale();
    let width = page.width().value;
    let height = page.height().value;

    let mut config = PdfRenderConfig::new()
        .set_target_width((width * scale).round().max(1.0) as i32)
        .set_target_height((height * scale).round().max(1.0) as i32)
        .render_annotations(settings.render_annotations)
        .render_form_data(settings.render_annotations);
    if settings.alpha {
        config = config.set_clear_color(PdfColor::new(255, 255, 255, 0));
    }

    let bitmap = page.render_with_config(&config)?;
    let mut image = bitmap.as_image();

    if let Some(crop) = settings.crop {
        image = crop_image(&image, &crop, scale)?;
    }

    image = match settings.quarter_turns {
        1 => image.rotate90(),
        2 => image.rotate180(),
        3 => image.rotate270(),
        _ => image,
    };

    Ok(image)
}

/// Cut `crop` (in points) out of an image rendered at `scale` pixels per point
pub fn crop_image(image: &DynamicImage, crop: &CropRect, scale: f32) -> Result<DynamicImage> {
    let (width, height) = image.dimensions();
    let to_px = |v: f32, max: u32| ((v * scale).round().max(0.0) as u32).min(max);

    let left = to_px(crop.left, width);
    let top = to_px(crop.top, height);
    let right = to_px(crop.right, width);
    let bottom = to_px(crop.bottom, height);

    if right <= left || bottom <= top {
        return Err(PagesError::Config(format!(
            "crop rectangle lies outside the {width}x{height} page"
        )));
    }

    Ok(image.crop_imm(left, top, right - left, bottom - top))
}

/// Convert to the requested color model and write to `path`.
///
/// The file format follows the extension. CMYK goes through the JPEG
/// encoder since the image crate has no four channel JPEG writer.
pub fn save_image(image: DynamicImage, path: &Path, color_space: ColorSpace, alpha: bool) -> Result<()> {
    match color_space {
        ColorSpace::Rgb if alpha => image.to_rgba8().save(path)?,
        ColorSpace::Rgb => image.to_rgb8().save(path)?,
        ColorSpace::Gray if alpha => image.to_luma_alpha8().save(path)?,
        ColorSpace::Gray => image.to_luma8().save(path)?,
        ColorSpace::Cmyk => save_cmyk_jpeg(&image, path)?,
    }
    Ok(())
}

fn save_cmyk_jpeg(image: &DynamicImage, path: &Path) -> Result<()> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let too_large = || PagesError::Config(format!("{width}x{height} exceeds the JPEG size limit"));
    let width = u16::try_from(width).map_err(|_| too_large())?;
    let height = u16::try_from(height).map_err(|_| too_large())?;

    let cmyk = rgb_to_cmyk(rgb.as_raw());
    let encoder = Encoder::new_file(path, JPEG_QUALITY)?;
    encoder.encode(&cmyk, width, height, ColorType::Cmyk)?;
    Ok(())
}

/// Naive RGB to CMYK conversion without a color profile
pub fn rgb_to_cmyk(rgb: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(rgb.len() / 3 * 4);
    for px in rgb.chunks_exact(3) {
        let max = px[0].max(px[1]).max(px[2]);
        let k = 255 - max;
        if max == 0 {
            out.extend_from_slice(&[0, 0, 0, 255]);
            continue;
        }
        let channel = |v: u8| ((u16::from(max - v) * 255) / u16::from(max)) as u8;
        out.extend_from_slice(&[channel(px[0]), channel(px[1]), channel(px[2]), k]);
    }
    out
}
