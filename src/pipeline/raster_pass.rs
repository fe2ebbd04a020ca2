// Full-page rasterization: every page becomes one JPEG covering the page

use crate::config::preset::CompressionPreset;
use crate::engine::{PdfEngine, RasterPage};
use crate::error::PdfResizeError;

/// Render every page of `doc` at the preset DPI and build a new image-only
/// document with the same page count and page sizes.
///
/// Pages are rendered in one run over the document. Each page's pixel buffer
/// is dropped as soon as it is encoded. Any page failing to render or encode
/// fails the whole pass.
pub fn rasterize_pages<E: PdfEngine>(
    engine: &E,
    doc: &E::Document,
    preset: CompressionPreset,
) -> crate::error::Result<E::Document> {
    let page_count = engine.page_count(doc);
    let mut pages = Vec::with_capacity(page_count);

    engine.render_pages(doc, preset.resolution, |page_index, rendered| {
        let encoded = engine.encode_jpeg(&rendered.image, preset.quality)?;
        tracing::trace!(
            page = page_index,
            width = encoded.width,
            height = encoded.height,
            jpeg_bytes = encoded.data.len(),
            "page rasterized"
        );

        pages.push(RasterPage {
            jpeg: encoded.data,
            pixel_width: encoded.width,
            pixel_height: encoded.height,
            grayscale: encoded.grayscale,
            width_pts: rendered.width_pts,
            height_pts: rendered.height_pts,
        });
        Ok(())
    })?;

    if pages.len() != page_count {
        return Err(PdfResizeError::render(format!(
            "rendered {} pages, document has {}",
            pages.len(),
            page_count
        )));
    }

    engine.build_raster_document(pages)
}
