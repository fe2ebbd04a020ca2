// ページ全面画像からなる新規PDFの組立

use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// ラスタライズ済みの1ページ分のデータ。
#[derive(Debug, Clone)]
pub struct RasterPage {
    /// DCTDecode 用のJPEGバイト列
    pub jpeg: Vec<u8>,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub grayscale: bool,
    /// 元ページの寸法（ポイント）
    pub width_pts: f64,
    pub height_pts: f64,
}

/// ページ全面を1枚の画像で覆うページだけからなるPDFを構築する。
pub struct RasterPageWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for RasterPageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterPageWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// JPEG画像XObjectを追加する。
    ///
    /// 戻り値はXObjectのオブジェクトID。
    fn add_image_xobject(&mut self, page: RasterPage) -> ObjectId {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => page.pixel_width as i64,
            "Height" => page.pixel_height as i64,
            "ColorSpace" => if page.grayscale { "DeviceGray" } else { "DeviceRGB" },
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        let stream = Stream::new(dict, page.jpeg);
        self.doc.add_object(Object::Stream(stream))
    }

    /// 画像をページ全面に引き伸ばして描画するコンテンツストリームを生成する。
    ///
    /// `q <width> 0 0 <height> 0 0 cm /<name> Do Q`
    pub fn build_full_page_content_stream(name: &str, width_pts: f64, height_pts: f64) -> Vec<u8> {
        format!("q {width_pts:.4} 0 0 {height_pts:.4} 0 0 cm /{name} Do Q").into_bytes()
    }

    /// ラスタページを1枚追加する。
    ///
    /// 戻り値は追加したページのオブジェクトID。
    pub fn add_page(&mut self, page: RasterPage) -> crate::error::Result<ObjectId> {
        if !(page.width_pts > 0.0 && page.height_pts > 0.0) {
            return Err(crate::error::PdfResizeError::pdf_write(format!(
                "invalid page size {}x{} pt",
                page.width_pts, page.height_pts
            )));
        }

        let (width_pts, height_pts) = (page.width_pts, page.height_pts);
        let image_id = self.add_image_xobject(page);

        let resources_id = self.doc.add_object(dictionary! {
            "XObject" => dictionary! {
                "Im0" => Object::Reference(image_id),
            },
        });

        let content_bytes = Self::build_full_page_content_stream("Im0", width_pts, height_pts);
        let content_id = self
            .doc
            .add_object(Object::Stream(Stream::new(dictionary! {}, content_bytes)));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(width_pts as f32),
                Object::Real(height_pts as f32),
            ],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());

        Ok(page_id)
    }

    /// Pagesノード・Catalogを設定し、Documentを返す。
    pub fn finish(mut self) -> crate::error::Result<Document> {
        if self.kids.is_empty() {
            return Err(crate::error::PdfResizeError::pdf_write(
                "raster document has no pages",
            ));
        }

        let count = self.kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids,
            "Count" => count,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        Ok(self.doc)
    }
}
