// LopdfEngine: lopdfで生成したPDFに対する画像再圧縮・可逆圧縮・ラスタ文書構築

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use pdf_resizer::codec::jpeg::encode_rgb_to_jpeg;
use pdf_resizer::config::preset::CompressionPreset;
use pdf_resizer::engine::{LopdfEngine, PdfEngine, RasterPage};
use pdf_resizer::pipeline::controller::{ResizeConfig, SizeTargetController, Step, Strategy};
use pdf_resizer::pipeline::image_pass::{ImagePassOptions, recompress_images};

/// 滑らかなグラデーション画像（JPEGで大きく縮む）
fn smooth_rgb(width: u32, height: u32) -> image::RgbImage {
    image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

fn jpeg_image_stream(width: u32, height: u32, quality: u8) -> Stream {
    let data = encode_rgb_to_jpeg(&smooth_rgb(width, height), quality).expect("encode jpeg");
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        data,
    )
}

fn raw_gray_image_stream(width: u32, height: u32) -> Stream {
    let data: Vec<u8> = (0..width * height).map(|i| (i * 37 % 251) as u8).collect();
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        data,
    )
}

/// 各ページが `page_images[i]` の画像名→IDを描画するPDFを構築する。
fn build_pdf(doc: &mut Document, page_images: &[Vec<(&str, ObjectId)>]) -> Vec<u8> {
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for images in page_images {
        let mut xobjects = Dictionary::new();
        let mut content = String::new();
        for (name, id) in images {
            xobjects.set(*name, Object::Reference(*id));
            content.push_str(&format!("q 100 0 0 100 0 0 cm /{name} Do Q\n"));
        }
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "XObject" => xobjects },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save test pdf");
    buf
}

fn stream_content(doc: &Document, id: ObjectId) -> Vec<u8> {
    doc.get_object(id)
        .and_then(Object::as_stream)
        .expect("stream")
        .content
        .clone()
}

// ============================================================
// 1. Image pass on a real document
// ============================================================

#[test]
fn test_large_jpeg_recompressed_small_image_untouched() {
    let mut doc = Document::with_version("1.5");
    let photo = doc.add_object(jpeg_image_stream(600, 400, 100));
    let icon = doc.add_object(raw_gray_image_stream(20, 20)); // 400 bytes
    let bytes = build_pdf(&mut doc, &[vec![("Im0", photo), ("Im1", icon)]]);

    let engine = LopdfEngine::default();
    let mut working = engine.open(&bytes).expect("open");
    let original_photo = stream_content(working.document(), photo);
    let original_icon = stream_content(working.document(), icon);

    let stats = recompress_images(
        &engine,
        &mut working,
        CompressionPreset::new(150, 75),
        &ImagePassOptions::default(),
    );

    assert_eq!(stats.distinct, 2);
    assert_eq!(stats.replaced, 1);
    assert_eq!(stats.skipped_small, 1);
    let new_photo = stream_content(working.document(), photo);
    assert!(new_photo.len() < original_photo.len());
    assert_eq!(stream_content(working.document(), icon), original_icon);
}

#[test]
fn test_image_shared_by_pages_replaced_once() {
    let mut doc = Document::with_version("1.5");
    let photo = doc.add_object(jpeg_image_stream(300, 300, 100));
    let bytes = build_pdf(
        &mut doc,
        &[
            vec![("Im0", photo)],
            vec![("Im0", photo)],
            vec![("Shared", photo)],
        ],
    );

    let engine = LopdfEngine::default();
    let mut working = engine.open(&bytes).expect("open");
    let stats = recompress_images(
        &engine,
        &mut working,
        CompressionPreset::new(96, 65),
        &ImagePassOptions::default(),
    );

    assert_eq!(stats.distinct, 1);
    assert_eq!(stats.duplicate_refs, 2);
    assert_eq!(stats.replaced, 1);
    for page_index in 0..3 {
        assert_eq!(engine.page_images(&working, page_index).expect("images"), vec![photo]);
    }
}

#[test]
fn test_oversized_image_bounded_by_resolution_factor() {
    let mut doc = Document::with_version("1.5");
    let photo = doc.add_object(jpeg_image_stream(1200, 300, 100));
    let bytes = build_pdf(&mut doc, &[vec![("Im0", photo)]]);

    let engine = LopdfEngine::default();
    let mut working = engine.open(&bytes).expect("open");
    let options = ImagePassOptions {
        min_image_bytes: 2048,
        max_dimension_factor: 4,
    };
    // bound = 100 × 4 = 400
    let stats = recompress_images(&engine, &mut working, CompressionPreset::new(100, 75), &options);
    assert_eq!(stats.replaced, 1);

    let stream = working.image_stream(photo).expect("image");
    let width = stream.dict.get(b"Width").and_then(Object::as_i64).expect("width");
    let height = stream.dict.get(b"Height").and_then(Object::as_i64).expect("height");
    assert_eq!(width, 400);
    assert_eq!(height, 100);
    assert_eq!(
        stream.dict.get(b"Filter").and_then(Object::as_name).expect("filter"),
        b"DCTDecode"
    );
}

#[test]
fn test_recompression_that_would_grow_keeps_original() {
    // 既に低品質・小サイズのJPEGは q75 で再エンコードしても小さくならない
    let mut doc = Document::with_version("1.5");
    let photo = doc.add_object(jpeg_image_stream(300, 200, 10));
    let bytes = build_pdf(&mut doc, &[vec![("Im0", photo)]]);

    let engine = LopdfEngine::default();
    let mut working = engine.open(&bytes).expect("open");
    let before = stream_content(working.document(), photo);
    let options = ImagePassOptions {
        min_image_bytes: 0,
        max_dimension_factor: 11,
    };
    let stats = recompress_images(&engine, &mut working, CompressionPreset::new(150, 95), &options);

    assert_eq!(stats.replaced, 0);
    assert_eq!(stats.not_smaller, 1);
    assert_eq!(stream_content(working.document(), photo), before);
}

#[test]
fn test_undecodable_image_is_left_untouched() {
    let mut doc = Document::with_version("1.5");
    let broken = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 100,
            "Height" => 100,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "JBIG2Decode",
        },
        vec![0x55; 4096],
    ));
    let bytes = build_pdf(&mut doc, &[vec![("Im0", broken)]]);

    let engine = LopdfEngine::default();
    let mut working = engine.open(&bytes).expect("open");
    let stats = recompress_images(
        &engine,
        &mut working,
        CompressionPreset::new(150, 75),
        &ImagePassOptions::default(),
    );

    assert_eq!(stats.failed, 1);
    assert_eq!(stream_content(working.document(), broken), vec![0x55; 4096]);
}

#[test]
fn test_inverted_decode_image_is_left_untouched() {
    // サンプルはほぼ0だが /Decode [1 0] により白く表示される
    let mut doc = Document::with_version("1.5");
    let inverted = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 200,
            "Height" => 200,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Decode" => vec![1.into(), 0.into()],
        },
        (0..200 * 200).map(|i| (i % 7) as u8).collect::<Vec<u8>>(),
    ));
    let bytes = build_pdf(&mut doc, &[vec![("Im0", inverted)]]);

    let engine = LopdfEngine::default();
    let mut working = engine.open(&bytes).expect("open");
    let before = stream_content(working.document(), inverted);
    let stats = recompress_images(
        &engine,
        &mut working,
        CompressionPreset::new(150, 75),
        &ImagePassOptions::default(),
    );

    assert_eq!(stats.replaced, 0);
    assert_eq!(stats.failed, 1);
    let stream = working.image_stream(inverted).expect("image");
    assert_eq!(stream.content, before);
    assert!(stream.dict.get(b"Decode").is_ok());
}

#[test]
fn test_jpeg_in_spot_color_space_is_left_untouched() {
    let mut doc = Document::with_version("1.5");
    let gray = image::GrayImage::from_fn(300, 200, |x, y| image::Luma([((x + y) % 256) as u8]));
    let data = pdf_resizer::codec::jpeg::encode_gray_to_jpeg(&gray, 100).expect("encode jpeg");
    let tint = doc.add_object(dictionary! {
        "FunctionType" => 2,
        "Domain" => vec![0.into(), 1.into()],
        "C0" => vec![0.into(), 0.into(), 0.into(), 0.into()],
        "C1" => vec![0.into(), 0.into(), 0.into(), 1.into()],
        "N" => 1,
    });
    let spot = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 300,
            "Height" => 200,
            "ColorSpace" => vec![
                Object::Name(b"Separation".to_vec()),
                Object::Name(b"Spot".to_vec()),
                Object::Name(b"DeviceCMYK".to_vec()),
                Object::Reference(tint),
            ],
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        data.clone(),
    ));
    let bytes = build_pdf(&mut doc, &[vec![("Im0", spot)]]);

    let engine = LopdfEngine::default();
    let mut working = engine.open(&bytes).expect("open");
    let stats = recompress_images(
        &engine,
        &mut working,
        CompressionPreset::new(50, 40),
        &ImagePassOptions::default(),
    );

    assert_eq!(stats.replaced, 0);
    assert_eq!(stats.failed, 1);
    let stream = working.image_stream(spot).expect("image");
    assert_eq!(stream.content, data);
    let family = stream
        .dict
        .get(b"ColorSpace")
        .and_then(Object::as_array)
        .and_then(|cs| cs[0].as_name())
        .expect("color space family");
    assert_eq!(family, b"Separation");
}

// ============================================================
// 2. Controller with the real engine
// ============================================================

#[test]
fn test_target_zero_returns_loadable_lossless_result() {
    let mut doc = Document::with_version("1.5");
    let photo = doc.add_object(jpeg_image_stream(400, 300, 100));
    let bytes = build_pdf(&mut doc, &[vec![("Im0", photo)], vec![]]);

    let engine = LopdfEngine::default();
    let outcome = SizeTargetController::new(&engine, ResizeConfig::default())
        .resize(&bytes, 0)
        .expect("resize");

    assert_eq!(outcome.selected, Step::LOSSLESS);
    assert_eq!(outcome.attempts.len(), 1);
    let reloaded = Document::load_mem(&outcome.bytes).expect("reload");
    assert_eq!(reloaded.get_pages().len(), 2);

    // the photo's encoded bytes survive lossless compaction
    let original = encode_rgb_to_jpeg(&smooth_rgb(400, 300), 100).expect("encode");
    let found = reloaded.objects.values().any(|object| {
        matches!(object, Object::Stream(stream) if stream.content == original)
    });
    assert!(found);
}

#[test]
fn test_image_ladder_reaches_target_below_lossless_size() {
    let mut doc = Document::with_version("1.5");
    let photo = doc.add_object(jpeg_image_stream(800, 600, 100));
    let bytes = build_pdf(&mut doc, &[vec![("Im0", photo)]]);

    let engine = LopdfEngine::default();
    let controller = SizeTargetController::new(&engine, ResizeConfig::default());
    let baseline = controller.resize(&bytes, 0).expect("baseline").size();

    let outcome = controller
        .resize(&bytes, (baseline - 1) as i64)
        .expect("resize");

    assert!(outcome.target_met);
    assert_eq!(outcome.selected.strategy, Strategy::ImageRecompression);
    assert!(outcome.size() < baseline);
    let reloaded = Document::load_mem(&outcome.bytes).expect("reload");
    assert_eq!(reloaded.get_pages().len(), 1);
}

#[test]
fn test_unreadable_input_reports_read_error() {
    let engine = LopdfEngine::default();
    let result = SizeTargetController::new(&engine, ResizeConfig::default())
        .resize(b"this is not a pdf", 1000);

    assert!(matches!(
        result,
        Err(pdf_resizer::error::PdfResizeError::PdfReadError(_))
    ));
}

// ============================================================
// 3. Raster document
// ============================================================

#[test]
fn test_build_raster_document_keeps_page_sizes() {
    let engine = LopdfEngine::default();
    let jpeg = encode_rgb_to_jpeg(&smooth_rgb(85, 110), 70).expect("encode");
    let pages = vec![
        RasterPage {
            jpeg: jpeg.clone(),
            pixel_width: 85,
            pixel_height: 110,
            grayscale: false,
            width_pts: 612.0,
            height_pts: 792.0,
        },
        RasterPage {
            jpeg,
            pixel_width: 85,
            pixel_height: 110,
            grayscale: false,
            width_pts: 595.0,
            height_pts: 842.0,
        },
    ];

    let raster = engine.build_raster_document(pages).expect("build");
    assert_eq!(engine.page_count(&raster), 2);
    let bytes = engine.compact(raster).expect("compact");

    let reloaded = Document::load_mem(&bytes).expect("reload");
    let page_ids: Vec<ObjectId> = reloaded.get_pages().values().copied().collect();
    assert_eq!(page_ids.len(), 2);

    let media_box = reloaded
        .get_dictionary(page_ids[1])
        .and_then(|page| page.get(b"MediaBox"))
        .and_then(Object::as_array)
        .expect("media box");
    let width = media_box[2].as_float().expect("width");
    let height = media_box[3].as_float().expect("height");
    assert!((width - 595.0).abs() < 0.01);
    assert!((height - 842.0).abs() < 0.01);
}

#[test]
fn test_compact_without_object_streams_is_loadable() {
    let mut doc = Document::with_version("1.5");
    let photo = doc.add_object(jpeg_image_stream(64, 64, 90));
    let bytes = build_pdf(&mut doc, &[vec![("Im0", photo)]]);

    let engine = LopdfEngine::new(false);
    let working = engine.open(&bytes).expect("open");
    let compacted = engine.compact(working).expect("compact");

    assert!(compacted.starts_with(b"%PDF"));
    let reloaded = Document::load_mem(&compacted).expect("reload");
    assert_eq!(reloaded.get_pages().len(), 1);
}
