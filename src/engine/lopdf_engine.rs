// lopdf + image + pdfium によるエンジン実装

use image::DynamicImage;

use super::{PdfEngine, RasterPage, RenderedPage, Xref};
use crate::codec::EncodedImage;
use crate::error::PdfResizeError;
use crate::pdf::image_xobject::{decode_image_stream, read_image_meta, replace_with_jpeg};
use crate::pdf::optimizer::{compact, save_to_bytes};
use crate::pdf::reader::PdfDocument;
use crate::pdf::writer::RasterPageWriter;

#[derive(Debug, Clone)]
pub struct LopdfEngine {
    /// 保存時にオブジェクトストリーム/XRefストリームを使用する。
    pub object_streams: bool,
}

impl Default for LopdfEngine {
    fn default() -> Self {
        Self {
            object_streams: true,
        }
    }
}

impl LopdfEngine {
    pub fn new(object_streams: bool) -> Self {
        Self { object_streams }
    }
}

impl PdfEngine for LopdfEngine {
    type Document = PdfDocument;

    fn open(&self, input: &[u8]) -> crate::error::Result<PdfDocument> {
        PdfDocument::from_bytes(input)
    }

    fn page_count(&self, doc: &PdfDocument) -> usize {
        doc.page_count()
    }

    fn page_images(&self, doc: &PdfDocument, page_index: usize) -> crate::error::Result<Vec<Xref>> {
        doc.page_image_ids(page_index)
    }

    fn stored_image_len(&self, doc: &PdfDocument, xref: Xref) -> crate::error::Result<usize> {
        Ok(doc.image_stream(xref)?.content.len())
    }

    fn decode_image(&self, doc: &PdfDocument, xref: Xref) -> crate::error::Result<DynamicImage> {
        let stream = doc.image_stream(xref)?;
        let meta = read_image_meta(doc.document(), stream)?;
        decode_image_stream(stream, &meta)
    }

    fn replace_image(
        &self,
        doc: &mut PdfDocument,
        xref: Xref,
        encoded: EncodedImage,
    ) -> crate::error::Result<()> {
        let stream = doc.image_stream_mut(xref)?;
        replace_with_jpeg(stream, encoded);
        Ok(())
    }

    fn render_page(
        &self,
        doc: &PdfDocument,
        page_index: usize,
        dpi: u32,
    ) -> crate::error::Result<RenderedPage> {
        let source = doc.source_bytes().ok_or_else(|| {
            PdfResizeError::render("document has no serialized source to render from")
        })?;
        crate::render::render_page(source, page_index, dpi)
    }

    fn render_pages<F>(&self, doc: &PdfDocument, dpi: u32, on_page: F) -> crate::error::Result<()>
    where
        F: FnMut(usize, RenderedPage) -> crate::error::Result<()>,
    {
        let source = doc.source_bytes().ok_or_else(|| {
            PdfResizeError::render("document has no serialized source to render from")
        })?;
        crate::render::render_pages(source, dpi, on_page)
    }

    fn build_raster_document(&self, pages: Vec<RasterPage>) -> crate::error::Result<PdfDocument> {
        let mut writer = RasterPageWriter::new();
        for page in pages {
            writer.add_page(page)?;
        }
        Ok(PdfDocument::from_document(writer.finish()?))
    }

    fn compact(&self, doc: PdfDocument) -> crate::error::Result<Vec<u8>> {
        let mut document = doc.into_document();
        let stats = compact(&mut document);
        tracing::debug!(
            deduplicated = stats.deduplicated,
            pruned = stats.pruned,
            compressed = stats.compressed,
            "compacted document"
        );
        save_to_bytes(&mut document, self.object_streams)
    }
}
