// image crate: pixel buffer -> JPEG bytes

use crate::error::PdfResizeError;
use image::{DynamicImage, GrayImage, RgbImage};
use std::io::Cursor;

/// JPEG-encoded pixel data ready to be stored as a `/DCTDecode` image stream.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// `true` for single-channel (DeviceGray) output, `false` for DeviceRGB.
    pub grayscale: bool,
}

fn check_quality(quality: u8) -> crate::error::Result<()> {
    if !(1..=100).contains(&quality) {
        return Err(PdfResizeError::jpeg_encode(format!(
            "JPEG quality must be 1-100, got {}",
            quality
        )));
    }
    Ok(())
}

/// Encode an arbitrary pixel buffer to JPEG.
///
/// Images without colour information stay single-channel; everything else
/// (RGBA, 16-bit, CMYK already converted on decode) is flattened to 8-bit RGB.
/// Alpha is dropped; soft masks live in a separate `/SMask` stream.
pub fn encode_dynamic(image: &DynamicImage, quality: u8) -> crate::error::Result<EncodedImage> {
    check_quality(quality)?;

    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(PdfResizeError::jpeg_encode(format!(
            "cannot encode empty {}x{} image",
            width, height
        )));
    }

    if image.color().has_color() {
        let data = encode_rgb_to_jpeg(&image.to_rgb8(), quality)?;
        Ok(EncodedImage {
            data,
            width,
            height,
            grayscale: false,
        })
    } else {
        let data = encode_gray_to_jpeg(&image.to_luma8(), quality)?;
        Ok(EncodedImage {
            data,
            width,
            height,
            grayscale: true,
        })
    }
}

/// Encode an RGB image to JPEG bytes.
pub fn encode_rgb_to_jpeg(rgb: &RgbImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    check_quality(quality)?;
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;

    Ok(buf.into_inner())
}

/// Encode a grayscale image to JPEG bytes.
pub fn encode_gray_to_jpeg(gray: &GrayImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    check_quality(quality)?;
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    gray.write_with_encoder(encoder)?;

    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbaImage};

    #[test]
    fn test_encode_rgb_produces_jpeg_marker() {
        let rgb = RgbImage::from_pixel(16, 16, Rgb([10, 200, 30]));
        let data = encode_rgb_to_jpeg(&rgb, 75).expect("encode");
        assert_eq!(&data[..2], &[0xFF, 0xD8], "JPEG SOI marker expected");
    }

    #[test]
    fn test_encode_dynamic_keeps_grayscale() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(20, 10, Luma([128])));
        let encoded = encode_dynamic(&gray, 60).expect("encode");
        assert!(encoded.grayscale);
        assert_eq!((encoded.width, encoded.height), (20, 10));
    }

    #[test]
    fn test_encode_dynamic_drops_alpha() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, image::Rgba([1, 2, 3, 4])));
        let encoded = encode_dynamic(&rgba, 60).expect("encode");
        assert!(!encoded.grayscale);
        let decoded = image::load_from_memory(&encoded.data).expect("decode");
        assert_eq!(decoded.color().channel_count(), 3);
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let mut rgb = RgbImage::new(64, 64);
        for (x, y, pixel) in rgb.enumerate_pixels_mut() {
            *pixel = Rgb([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 7) as u8]);
        }
        let high = encode_rgb_to_jpeg(&rgb, 95).expect("encode high");
        let low = encode_rgb_to_jpeg(&rgb, 20).expect("encode low");
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_invalid_quality() {
        let rgb = RgbImage::new(4, 4);
        assert!(encode_rgb_to_jpeg(&rgb, 0).is_err());
        assert!(encode_rgb_to_jpeg(&rgb, 101).is_err());
    }
}
