// 可逆圧縮: 重複ストリーム統合、孤立オブジェクト除去、FlateDecode圧縮、保存

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, ObjectId, SaveOptions};
use sha2::{Digest, Sha256};

/// 可逆圧縮の各ステップで変化したオブジェクト数。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompactStats {
    pub deduplicated: usize,
    pub pruned: usize,
    pub compressed: usize,
}

fn hash_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// 型タグと長さ接頭辞付きでオブジェクトをハッシュへ流し込む。
///
/// 異なるオブジェクトが同じバイト列にならないよう、値はすべて生のバイトで扱う。
fn hash_object(hasher: &mut Sha256, object: &Object) {
    match object {
        Object::Null => hasher.update([0u8]),
        Object::Boolean(b) => hasher.update([1u8, *b as u8]),
        Object::Integer(i) => {
            hasher.update([2u8]);
            hasher.update(i.to_le_bytes());
        }
        Object::Real(r) => {
            hasher.update([3u8]);
            hasher.update(r.to_le_bytes());
        }
        Object::Name(name) => {
            hasher.update([4u8]);
            hash_bytes(hasher, name);
        }
        // リテラル/16進の表記差は同じ文字列として扱う
        Object::String(bytes, _) => {
            hasher.update([5u8]);
            hash_bytes(hasher, bytes);
        }
        Object::Array(items) => {
            hasher.update([6u8]);
            hasher.update((items.len() as u64).to_le_bytes());
            for item in items {
                hash_object(hasher, item);
            }
        }
        Object::Dictionary(dict) => {
            hasher.update([7u8]);
            hash_dictionary(hasher, dict, false);
        }
        Object::Stream(stream) => {
            hasher.update([8u8]);
            hash_dictionary(hasher, &stream.dict, true);
            hash_bytes(hasher, &stream.content);
        }
        Object::Reference((number, generation)) => {
            hasher.update([9u8]);
            hasher.update(number.to_le_bytes());
            hasher.update(generation.to_le_bytes());
        }
    }
}

fn hash_dictionary(hasher: &mut Sha256, dict: &lopdf::Dictionary, skip_length: bool) {
    let entries: Vec<_> = dict
        .iter()
        .filter(|(key, _)| !(skip_length && key.as_slice() == b"Length"))
        .collect();
    hasher.update((entries.len() as u64).to_le_bytes());
    for (key, value) in entries {
        hash_bytes(hasher, key);
        hash_object(hasher, value);
    }
}

/// ストリームの辞書（/Length を除く）と内容からSHA-256ダイジェストを計算する。
fn stream_digest(stream: &lopdf::Stream) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hash_dictionary(&mut hasher, &stream.dict, true);
    hash_bytes(&mut hasher, &stream.content);
    hasher.finalize().into()
}

/// オブジェクト内の参照を置換表に従って書き換える。
fn rewrite_references(object: &mut Object, replacements: &BTreeMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            if let Some(new_id) = replacements.get(id) {
                *id = *new_id;
            }
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                rewrite_references(item, replacements);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                rewrite_references(value, replacements);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                rewrite_references(value, replacements);
            }
        }
        _ => {}
    }
}

fn same_content(objects: &BTreeMap<ObjectId, Object>, kept: ObjectId, stream: &lopdf::Stream) -> bool {
    matches!(objects.get(&kept), Some(Object::Stream(first)) if first.content == stream.content)
}

/// 内容が完全に一致するストリームを1つに統合し、参照を付け替える。
///
/// 最小のObjectIdを持つストリームを残す。統合した数を返す。
pub fn deduplicate_streams(doc: &mut Document) -> usize {
    let mut first_seen: HashMap<[u8; 32], ObjectId> = HashMap::new();
    let mut replacements: BTreeMap<ObjectId, ObjectId> = BTreeMap::new();

    // objectsはBTreeMapなのでID順に走査される
    for (id, object) in doc.objects.iter() {
        let Object::Stream(stream) = object else {
            continue;
        };
        let digest = stream_digest(stream);
        match first_seen.get(&digest) {
            Some(kept) if same_content(&doc.objects, *kept, stream) => {
                replacements.insert(*id, *kept);
            }
            Some(_) => {}
            None => {
                first_seen.insert(digest, *id);
            }
        }
    }

    if replacements.is_empty() {
        return 0;
    }

    for object in doc.objects.values_mut() {
        rewrite_references(object, &replacements);
    }
    for (_, value) in doc.trailer.iter_mut() {
        rewrite_references(value, &replacements);
    }
    for id in replacements.keys() {
        doc.objects.remove(id);
    }

    replacements.len()
}

/// ドキュメント内の未圧縮ストリームにFlateDecode圧縮を適用する。
///
/// 既にフィルターが設定されているストリームはスキップする（二重圧縮防止）。
/// 圧縮後の方が大きくなるストリームは元のまま残す。圧縮した数を返す。
pub fn compress_streams(doc: &mut Document) -> usize {
    let mut compressed_count = 0;

    for object in doc.objects.values_mut() {
        let Object::Stream(stream) = object else {
            continue;
        };
        // Skip streams that already have a filter
        if stream.dict.get(b"Filter").is_ok() || stream.content.is_empty() {
            continue;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        if encoder.write_all(&stream.content).is_err() {
            continue;
        }
        let Ok(compressed) = encoder.finish() else {
            continue;
        };

        if compressed.len() < stream.content.len() {
            stream.dict.set("Filter", "FlateDecode");
            stream.set_content(compressed);
            compressed_count += 1;
        }
    }

    compressed_count
}

/// 孤立オブジェクト（どこからも参照されていないオブジェクト）を除去する。
pub fn delete_unused_objects(doc: &mut Document) -> usize {
    doc.prune_objects().len()
}

/// 可逆圧縮の全パスを順序通りに実行する。
///
/// 1. 重複ストリームを統合
/// 2. 孤立オブジェクトを除去
/// 3. 未圧縮ストリームを圧縮
/// 4. オブジェクト番号を詰め直す
pub fn compact(doc: &mut Document) -> CompactStats {
    let deduplicated = deduplicate_streams(doc);
    let pruned = delete_unused_objects(doc);
    let compressed = compress_streams(doc);
    doc.renumber_objects();

    CompactStats {
        deduplicated,
        pruned,
        compressed,
    }
}

/// PDFドキュメントをバイト列として出力する。
///
/// `object_streams` が有効な場合はオブジェクトストリームとXRefストリームを使う。
pub fn save_to_bytes(doc: &mut Document, object_streams: bool) -> crate::error::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if object_streams {
        let options = SaveOptions::builder()
            .use_object_streams(true)
            .use_xref_streams(true)
            .compression_level(9)
            .build();
        doc.save_with_options(&mut buf, options)
            .map_err(|e| crate::error::PdfResizeError::pdf_write(e.to_string()))?;
    } else {
        doc.save_to(&mut buf)
            .map_err(|e| crate::error::PdfResizeError::pdf_write(e.to_string()))?;
    }
    Ok(buf)
}
