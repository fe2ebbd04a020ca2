#[cfg(feature = "raster")]
pub mod pdfium;

#[cfg(feature = "raster")]
pub use pdfium::{RenderedPage, render_page, render_pages};

#[cfg(not(feature = "raster"))]
pub struct RenderedPage {
    pub image: image::DynamicImage,
    pub width_pts: f64,
    pub height_pts: f64,
}

/// Built without the `raster` feature: page rendering is unavailable and
/// every rasterization attempt fails (and is skipped by the controller).
#[cfg(not(feature = "raster"))]
pub fn render_page(
    _pdf_bytes: &[u8],
    _page_index: usize,
    _dpi: u32,
) -> crate::error::Result<RenderedPage> {
    Err(crate::error::PdfResizeError::render(
        "built without the `raster` feature",
    ))
}

#[cfg(not(feature = "raster"))]
pub fn render_pages<F>(_pdf_bytes: &[u8], _dpi: u32, _on_page: F) -> crate::error::Result<()>
where
    F: FnMut(usize, RenderedPage) -> crate::error::Result<()>,
{
    Err(crate::error::PdfResizeError::render(
        "built without the `raster` feature",
    ))
}
