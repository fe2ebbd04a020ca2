//! The document/codec capabilities the compression policy depends on.
//!
//! The controller and both passes are written against [`PdfEngine`] only, so
//! they can be exercised with a fake engine that returns deterministic sizes.
//! [`LopdfEngine`] is the production implementation.

pub mod lopdf_engine;

use image::DynamicImage;
use lopdf::ObjectId;

use crate::codec::{EncodedImage, jpeg, resample};
pub use crate::pdf::writer::RasterPage;
pub use crate::render::RenderedPage;
pub use lopdf_engine::LopdfEngine;

/// Reference id of an image resource, unique within one document.
pub type Xref = ObjectId;

pub trait PdfEngine {
    /// A working copy of a document. Every attempt opens its own.
    type Document;

    /// Parse a serialized document. Failure here is an input error.
    fn open(&self, input: &[u8]) -> crate::error::Result<Self::Document>;

    fn page_count(&self, doc: &Self::Document) -> usize;

    /// Image resources drawn by one page, including those nested in form
    /// XObjects. The same xref may appear on several pages.
    fn page_images(&self, doc: &Self::Document, page_index: usize)
    -> crate::error::Result<Vec<Xref>>;

    /// Size of the image's stored (still encoded) bytes.
    fn stored_image_len(&self, doc: &Self::Document, xref: Xref) -> crate::error::Result<usize>;

    fn decode_image(&self, doc: &Self::Document, xref: Xref) -> crate::error::Result<DynamicImage>;

    /// Shrink so neither side exceeds `max_dimension`, keeping the aspect ratio.
    fn downscale(&self, image: DynamicImage, max_dimension: u32) -> DynamicImage {
        resample::fit_within(image, max_dimension)
    }

    fn encode_jpeg(&self, image: &DynamicImage, quality: u8) -> crate::error::Result<EncodedImage> {
        jpeg::encode_dynamic(image, quality)
    }

    /// Overwrite the image's stored bytes in place. Every page referencing
    /// `xref` sees the replacement.
    fn replace_image(
        &self,
        doc: &mut Self::Document,
        xref: Xref,
        encoded: EncodedImage,
    ) -> crate::error::Result<()>;

    fn render_page(
        &self,
        doc: &Self::Document,
        page_index: usize,
        dpi: u32,
    ) -> crate::error::Result<RenderedPage>;

    /// Render every page in order, passing each to `on_page` as soon as it
    /// is ready. Engines that can share setup across pages override this.
    fn render_pages<F>(&self, doc: &Self::Document, dpi: u32, mut on_page: F) -> crate::error::Result<()>
    where
        F: FnMut(usize, RenderedPage) -> crate::error::Result<()>,
    {
        for page_index in 0..self.page_count(doc) {
            on_page(page_index, self.render_page(doc, page_index, dpi)?)?;
        }
        Ok(())
    }

    /// Build a new document with one full-page image per entry.
    fn build_raster_document(&self, pages: Vec<RasterPage>)
    -> crate::error::Result<Self::Document>;

    /// Lossless compaction followed by serialization. The length of the
    /// returned bytes is the attempt's size.
    fn compact(&self, doc: Self::Document) -> crate::error::Result<Vec<u8>>;
}
