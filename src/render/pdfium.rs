// pdfium-render wrapper: page -> DynamicImage (in-memory only)

use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;

use crate::error::PdfResizeError;

/// A page rendered to pixels together with its size in PDF points.
pub struct RenderedPage {
    pub image: DynamicImage,
    pub width_pts: f64,
    pub height_pts: f64,
}

/// Resolves the path to the pdfium shared library.
///
/// Search order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` environment variable
/// 2. `vendor/pdfium/lib/` relative to the project root (for development)
fn resolve_pdfium_lib_path() -> crate::error::Result<PathBuf> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Ok(p);
        }
        return Err(PdfResizeError::render(format!(
            "PDFIUM_DYNAMIC_LIB_PATH is set to '{}' but the path does not exist",
            path
        )));
    }

    if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
        let vendor_path = PathBuf::from(&manifest_dir).join("vendor/pdfium/lib");
        if vendor_path.exists() {
            return Ok(vendor_path);
        }
    }

    Err(PdfResizeError::render(
        "pdfium library not found: set PDFIUM_DYNAMIC_LIB_PATH or place libpdfium.so in vendor/pdfium/lib/",
    ))
}

/// Creates a new Pdfium instance by dynamically loading the shared library.
fn create_pdfium() -> crate::error::Result<Pdfium> {
    let lib_path = resolve_pdfium_lib_path()?;
    let lib_path_str = lib_path.to_str().ok_or_else(|| {
        PdfResizeError::render("pdfium library path contains non-UTF-8 characters")
    })?;
    let bindings =
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(lib_path_str))?;
    Ok(Pdfium::new(bindings))
}

fn check_dpi(dpi: u32) -> crate::error::Result<()> {
    if dpi == 0 {
        return Err(PdfResizeError::render("DPI must be positive"));
    }
    Ok(())
}

/// Renders one already-loaded page at the specified DPI.
fn render_loaded_page(page: &PdfPage<'_>, dpi: u32) -> crate::error::Result<RenderedPage> {
    // PDF default user unit: 1 point = 1/72 inch
    let width_pts = page.width().value;
    let height_pts = page.height().value;
    let width_px = ((width_pts * dpi as f32 / 72.0).round() as i32).max(1);
    let height_px = ((height_pts * dpi as f32 / 72.0).round() as i32).max(1);

    let config = PdfRenderConfig::new()
        .set_target_width(width_px)
        .set_target_height(height_px);

    let bitmap = page.render_with_config(&config)?;

    Ok(RenderedPage {
        image: bitmap.as_image(),
        width_pts: width_pts as f64,
        height_pts: height_pts as f64,
    })
}

/// Renders a page of an in-memory PDF at the specified DPI.
///
/// # Arguments
/// * `pdf_bytes` - Serialized PDF
/// * `page_index` - 0-indexed page number
/// * `dpi` - Resolution in dots per inch (72 DPI = 1 point per pixel)
///
/// # Errors
/// Returns `PdfResizeError::RenderError` if the pdfium library cannot be
/// loaded, the document cannot be opened, the page index is out of range,
/// or rendering fails.
pub fn render_page(
    pdf_bytes: &[u8],
    page_index: usize,
    dpi: u32,
) -> crate::error::Result<RenderedPage> {
    check_dpi(dpi)?;

    let pdfium = create_pdfium()?;
    let document = pdfium.load_pdf_from_byte_slice(pdf_bytes, None)?;

    let page_index_u16 = u16::try_from(page_index)
        .map_err(|_| PdfResizeError::render("page index exceeds u16 range"))?;
    let page = document.pages().get(page_index_u16)?;
    render_loaded_page(&page, dpi)
}

/// Renders every page of an in-memory PDF in order, handing each one to
/// `on_page` before the next is rendered.
///
/// The library is bound and the document parsed once for the whole run.
/// Stops at the first error from rendering or from `on_page`.
pub fn render_pages<F>(pdf_bytes: &[u8], dpi: u32, mut on_page: F) -> crate::error::Result<()>
where
    F: FnMut(usize, RenderedPage) -> crate::error::Result<()>,
{
    check_dpi(dpi)?;

    let pdfium = create_pdfium()?;
    let document = pdfium.load_pdf_from_byte_slice(pdf_bytes, None)?;

    for (page_index, page) in document.pages().iter().enumerate() {
        let rendered = render_loaded_page(&page, dpi)?;
        on_page(page_index, rendered)?;
    }
    Ok(())
}
