// 画像XObjectのデコード（DCT/Flate/非圧縮）とJPEGへの置換

use crate::codec::EncodedImage;
use crate::error::PdfResizeError;
use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Document, Object};
use std::io::Read;

/// デコードに必要な色空間の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
}

impl ColorModel {
    pub fn channels(self) -> usize {
        match self {
            ColorModel::Gray => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }
}

/// 画像XObjectのメタデータ
#[derive(Debug, Clone)]
pub struct ImageMeta {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color: Option<ColorModel>,
    pub filters: Vec<String>,
    pub predictor: i64,
    pub image_mask: bool,
    /// `/Decode` 配列（指定がある場合のみ）
    pub decode: Option<Vec<f32>>,
}

impl ImageMeta {
    /// `/Decode` が無いか、色モデルの既定値 `[0 1 0 1 ...]` と一致するか。
    pub fn has_default_decode(&self) -> bool {
        let Some(decode) = &self.decode else {
            return true;
        };
        let Some(color) = self.color else {
            return false;
        };
        decode.len() == color.channels() * 2
            && decode
                .chunks(2)
                .all(|pair| pair[0] == 0.0 && pair[1] == 1.0)
    }
}

/// 画像XObjectのストリームから画像メタデータを読み取る。
pub fn read_image_meta(doc: &Document, stream: &lopdf::Stream) -> crate::error::Result<ImageMeta> {
    let dict = &stream.dict;

    let width = dict_get_u32(dict, b"Width")?;
    let height = dict_get_u32(dict, b"Height")?;
    // BitsPerComponent: missing keyの場合のみデフォルト8、型エラーは伝播
    let bits_per_component = match dict.get(b"BitsPerComponent") {
        Ok(_) => dict_get_u32(dict, b"BitsPerComponent")? as u8,
        Err(_) => 8,
    };

    let color = match dict.get(b"ColorSpace") {
        Ok(obj) => resolve_color_model(doc, obj),
        Err(_) => None,
    };

    let filters = match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).to_string()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|obj| obj.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).to_string())
            .collect(),
        _ => Vec::new(),
    };

    let predictor = match dict.get(b"DecodeParms") {
        Ok(Object::Dictionary(parms)) => parms
            .get(b"Predictor")
            .and_then(Object::as_i64)
            .unwrap_or(1),
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|obj| obj.as_dict().ok())
            .filter_map(|parms| parms.get(b"Predictor").and_then(Object::as_i64).ok())
            .next()
            .unwrap_or(1),
        _ => 1,
    };

    let image_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));

    let decode = match dict.get(b"Decode") {
        Ok(Object::Array(arr)) => Some(
            arr.iter()
                .map(|v| v.as_float().unwrap_or(f32::NAN))
                .collect(),
        ),
        Ok(_) => Some(Vec::new()),
        Err(_) => None,
    };

    Ok(ImageMeta {
        width,
        height,
        bits_per_component,
        color,
        filters,
        predictor,
        image_mask,
        decode,
    })
}

/// ColorSpaceオブジェクトを解決してデコード可能な色モデルに分類する。
///
/// 名前・参照・ICCBased配列（/N 成分数）に対応。Indexed等はNone。
fn resolve_color_model(doc: &Document, obj: &Object) -> Option<ColorModel> {
    match obj {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(ColorModel::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(ColorModel::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(ColorModel::Cmyk),
            _ => None,
        },
        Object::Reference(id) => resolve_color_model(doc, doc.get_object(*id).ok()?),
        Object::Array(arr) => {
            let family = arr.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let profile = match arr.get(1)? {
                        Object::Reference(id) => doc.get_object(*id).ok()?.as_stream().ok()?,
                        Object::Stream(s) => s,
                        _ => return None,
                    };
                    match profile.dict.get(b"N").and_then(Object::as_i64).ok()? {
                        1 => Some(ColorModel::Gray),
                        3 => Some(ColorModel::Rgb),
                        4 => Some(ColorModel::Cmyk),
                        _ => None,
                    }
                }
                b"CalGray" => Some(ColorModel::Gray),
                b"CalRGB" => Some(ColorModel::Rgb),
                _ => None,
            }
        }
        _ => None,
    }
}

/// 辞書からu32値を取得するヘルパー（負の値はエラー）
fn dict_get_u32(dict: &lopdf::Dictionary, key: &[u8]) -> crate::error::Result<u32> {
    match dict.get(key) {
        Ok(Object::Integer(i)) => u32::try_from(*i).map_err(|_| {
            PdfResizeError::image_decode(format!(
                "Value out of u32 range for {:?}: {}",
                String::from_utf8_lossy(key),
                i
            ))
        }),
        Ok(Object::Real(f)) if *f >= 0.0 && *f <= u32::MAX as f32 => Ok(*f as u32),
        Ok(other) => Err(PdfResizeError::image_decode(format!(
            "Expected integer for {:?}, got {:?}",
            String::from_utf8_lossy(key),
            other
        ))),
        Err(_) => Err(PdfResizeError::image_decode(format!(
            "Missing required key: {:?}",
            String::from_utf8_lossy(key),
        ))),
    }
}

/// 画像XObjectのストリームデータをデコードしてDynamicImageに変換する。
///
/// 対応フィルタ:
/// - DCTDecode (JPEG、フィルタ連鎖の最後のみ)
/// - FlateDecode (raw pixels + zlib、PNG predictor対応)
/// - 非圧縮 (raw pixels)
///
/// CMYKは RGB に変換して返す。
pub fn decode_image_stream(
    stream: &lopdf::Stream,
    meta: &ImageMeta,
) -> crate::error::Result<DynamicImage> {
    if meta.image_mask {
        return Err(PdfResizeError::image_decode(
            "stencil masks (/ImageMask) are not recompressed",
        ));
    }
    if meta.width == 0 || meta.height == 0 {
        return Err(PdfResizeError::image_decode(format!(
            "invalid image dimensions {}x{}",
            meta.width, meta.height
        )));
    }

    // 置換後のJPEGは DeviceGray/DeviceRGB としてしか表現できない
    let color = meta.color.ok_or_else(|| {
        PdfResizeError::image_decode("unsupported or missing color space")
    })?;
    if !meta.has_default_decode() {
        return Err(PdfResizeError::image_decode(format!(
            "non-default /Decode array {:?} is not recompressed",
            meta.decode
        )));
    }

    let mut data = stream.content.clone();

    for (i, filter) in meta.filters.iter().enumerate() {
        let is_last = i + 1 == meta.filters.len();
        match filter.as_str() {
            "FlateDecode" | "Fl" => data = inflate(&data)?,
            "DCTDecode" | "DCT" if is_last => return decode_jpeg(&data),
            other => {
                return Err(PdfResizeError::image_decode(format!(
                    "Unsupported image filter: {}",
                    other
                )));
            }
        }
    }

    if meta.bits_per_component != 8 {
        return Err(PdfResizeError::image_decode(format!(
            "Unsupported BitsPerComponent: {}",
            meta.bits_per_component
        )));
    }

    if meta.predictor >= 10 {
        let row_len = meta.width as usize * color.channels();
        data = undo_png_predictor(&data, row_len, color.channels())?;
    } else if meta.predictor != 1 {
        return Err(PdfResizeError::image_decode(format!(
            "Unsupported predictor: {}",
            meta.predictor
        )));
    }

    decode_raw(&data, meta.width, meta.height, color)
}

/// JPEGデータをデコード
fn decode_jpeg(data: &[u8]) -> crate::error::Result<DynamicImage> {
    let reader = image::ImageReader::new(std::io::Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| PdfResizeError::image_decode(format!("JPEG decode error: {}", e)))?;
    reader
        .decode()
        .map_err(|e| PdfResizeError::image_decode(format!("JPEG decode error: {}", e)))
}

/// zlib展開
fn inflate(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| PdfResizeError::image_decode(format!("FlateDecode error: {}", e)))?;
    Ok(decompressed)
}

/// PNG predictor (Predictor >= 10) を解除する。
///
/// 各行の先頭1バイトがフィルタ種別 (0:None 1:Sub 2:Up 3:Average 4:Paeth)。
fn undo_png_predictor(data: &[u8], row_len: usize, bpp: usize) -> crate::error::Result<Vec<u8>> {
    let stride = row_len + 1;
    if row_len == 0 || data.len() < stride {
        return Err(PdfResizeError::image_decode("predictor data too short"));
    }

    let rows = data.len() / stride;
    let mut out = vec![0u8; rows * row_len];

    for r in 0..rows {
        let filter = data[r * stride];
        let src = &data[r * stride + 1..(r + 1) * stride];
        let (done, current) = out.split_at_mut(r * row_len);
        let prev: &[u8] = if r == 0 {
            &[]
        } else {
            &done[(r - 1) * row_len..]
        };
        let cur = &mut current[..row_len];

        for i in 0..row_len {
            let left = if i >= bpp { cur[i - bpp] } else { 0 };
            let up = prev.get(i).copied().unwrap_or(0);
            let up_left = if i >= bpp {
                prev.get(i - bpp).copied().unwrap_or(0)
            } else {
                0
            };
            let predicted = match filter {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((left as u16 + up as u16) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(PdfResizeError::image_decode(format!(
                        "invalid PNG filter type {}",
                        other
                    )));
                }
            };
            cur[i] = src[i].wrapping_add(predicted);
        }
    }

    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Raw pixelデータからDynamicImageを構築
fn decode_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color: ColorModel,
) -> crate::error::Result<DynamicImage> {
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| PdfResizeError::image_decode("image dimensions overflow"))?;
    let expected = pixels * color.channels();
    if data.len() < expected {
        return Err(PdfResizeError::image_decode(format!(
            "{:?} data too short: expected {}, got {}",
            color,
            expected,
            data.len()
        )));
    }
    let samples = &data[..expected];

    match color {
        ColorModel::Gray => GrayImage::from_raw(width, height, samples.to_vec())
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(|| PdfResizeError::image_decode("Failed to create Gray image")),
        ColorModel::Rgb => RgbImage::from_raw(width, height, samples.to_vec())
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| PdfResizeError::image_decode("Failed to create RGB image")),
        ColorModel::Cmyk => {
            let rgb: Vec<u8> = samples.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| PdfResizeError::image_decode("Failed to create RGB image from CMYK"))
        }
    }
}

/// 単純なCMYK → RGB 変換（カラーマネジメントなし）
fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - cmyk[3] as u16;
    [
        ((255 - cmyk[0] as u16) * k / 255) as u8,
        ((255 - cmyk[1] as u16) * k / 255) as u8,
        ((255 - cmyk[2] as u16) * k / 255) as u8,
    ]
}

/// 画像ストリームの内容をJPEGで置き換え、辞書を整合させる。
///
/// SMaskは保持する。元データ前提の DecodeParms / Decode / 色キーMask は除去する。
pub fn replace_with_jpeg(stream: &mut lopdf::Stream, encoded: EncodedImage) {
    let dict = &mut stream.dict;
    dict.set("Filter", "DCTDecode");
    dict.set(
        "ColorSpace",
        if encoded.grayscale {
            "DeviceGray"
        } else {
            "DeviceRGB"
        },
    );
    dict.set("BitsPerComponent", 8);
    dict.set("Width", encoded.width as i64);
    dict.set("Height", encoded.height as i64);
    dict.remove(b"DecodeParms");
    dict.remove(b"Decode");
    if matches!(dict.get(b"Mask"), Ok(Object::Array(_))) {
        dict.remove(b"Mask");
    }
    stream.set_content(encoded.data);
}
