use std::collections::HashSet;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId};

/// 読み込み済みPDF。
///
/// lopdfのオブジェクトグラフと、ページ描画用の元バイト列を保持する。
/// ラスタライズで新規構築したドキュメントは元バイト列を持たない。
pub struct PdfDocument {
    doc: Document,
    source: Option<Arc<[u8]>>,
}

impl PdfDocument {
    /// バイト列からPDFを読み込む。読み込めない場合は入力エラー。
    pub fn from_bytes(bytes: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(bytes).map_err(|e| {
            crate::error::PdfResizeError::pdf_read(format!("not a readable PDF: {e}"))
        })?;
        if doc.get_pages().is_empty() {
            return Err(crate::error::PdfResizeError::pdf_read(
                "document has no pages",
            ));
        }
        Ok(Self {
            doc,
            source: Some(Arc::from(bytes)),
        })
    }

    /// 新規構築したDocumentをラップする（元バイト列なし）。
    pub fn from_document(doc: Document) -> Self {
        Self { doc, source: None }
    }

    /// 内部のlopdf Documentへの参照を返す。
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    /// 読み込み元のバイト列（ページ描画に使用）。
    pub fn source_bytes(&self) -> Option<&[u8]> {
        self.source.as_deref()
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// ページインデックス(0-indexed)からObjectIdを取得する。
    fn get_page_id(&self, page_index: usize) -> crate::error::Result<ObjectId> {
        let page_num = u32::try_from(page_index + 1).map_err(|_| {
            crate::error::PdfResizeError::pdf_read("page index exceeds u32 range")
        })?;
        self.doc.get_pages().get(&page_num).copied().ok_or_else(|| {
            crate::error::PdfResizeError::pdf_read(format!("page {} not found", page_num))
        })
    }

    /// 指定ページ(0-indexed)が参照する画像XObjectのObjectId一覧を返す。
    ///
    /// Form XObject内にネストされた画像も再帰的に収集する。
    /// 直接埋め込みの（参照を持たない）ストリームは置換できないため対象外。
    /// 同一ページ内の重複は除去し、出現順を保つ。
    pub fn page_image_ids(&self, page_index: usize) -> crate::error::Result<Vec<ObjectId>> {
        let page_id = self.get_page_id(page_index)?;
        let (resource_dict, resource_ids) = self.doc.get_page_resources(page_id)?;

        let mut images = Vec::new();
        let mut visited = HashSet::new();

        // ページ辞書に直接埋め込まれたResources
        if let Some(dict) = resource_dict {
            self.collect_images_from_resources(dict, &mut images, &mut visited);
        }

        // 参照されているResources（親ページツリーから継承されたものも含む）
        for res_id in resource_ids {
            if let Ok(dict) = self.doc.get_dictionary(res_id) {
                self.collect_images_from_resources(dict, &mut images, &mut visited);
            }
        }

        Ok(images)
    }

    /// リソース辞書のXObjectエントリを走査し、画像を収集する。
    fn collect_images_from_resources(
        &self,
        resources: &Dictionary,
        images: &mut Vec<ObjectId>,
        visited: &mut HashSet<ObjectId>,
    ) {
        let Ok(xobject_entry) = resources.get(b"XObject") else {
            return; // XObjectエントリがない場合は何もしない
        };

        let xobject_dict = match xobject_entry {
            Object::Dictionary(d) => d,
            Object::Reference(id) => match self.doc.get_dictionary(*id) {
                Ok(d) => d,
                Err(_) => return,
            },
            _ => return,
        };

        for (_, value) in xobject_dict.iter() {
            if let Object::Reference(id) = value {
                self.collect_xobject(*id, images, visited);
            }
        }
    }

    /// XObjectを判定し、Imageなら収集、Formならそのリソースへ再帰する。
    fn collect_xobject(
        &self,
        id: ObjectId,
        images: &mut Vec<ObjectId>,
        visited: &mut HashSet<ObjectId>,
    ) {
        // 循環参照するFormへの無限再帰を防ぐ
        if !visited.insert(id) {
            return;
        }

        let Ok(stream) = self.doc.get_object(id).and_then(Object::as_stream) else {
            return;
        };

        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => images.push(id),
            Ok(b"Form") => {
                let resources = match stream.dict.get(b"Resources") {
                    Ok(Object::Dictionary(d)) => Some(d),
                    Ok(Object::Reference(res_id)) => self.doc.get_dictionary(*res_id).ok(),
                    _ => None,
                };
                if let Some(resources) = resources {
                    self.collect_images_from_resources(resources, images, visited);
                }
            }
            _ => {}
        }
    }

    /// 画像ストリームの格納バイト列（エンコード済み・未デコード）を返す。
    pub fn image_stream(&self, id: ObjectId) -> crate::error::Result<&lopdf::Stream> {
        let stream = self.doc.get_object(id).and_then(Object::as_stream)?;
        match stream.dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => Ok(stream),
            _ => Err(crate::error::PdfResizeError::pdf_read(format!(
                "object {} {} R is not an image XObject",
                id.0, id.1
            ))),
        }
    }

    pub fn image_stream_mut(&mut self, id: ObjectId) -> crate::error::Result<&mut lopdf::Stream> {
        Ok(self.doc.get_object_mut(id).and_then(Object::as_stream_mut)?)
    }
}
