use image::DynamicImage;
use image::imageops::FilterType;

/// 長辺が `max_dimension` を超える場合のみ、縦横比を保ったまま Lanczos3 で縮小する。
///
/// 縮小後の幅・高さはいずれも `max_dimension` 以下になる。
/// 既に収まっている画像は（拡大せず）そのまま返す。
pub fn fit_within(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    if max_dimension == 0 {
        return image;
    }
    if image.width() <= max_dimension && image.height() <= max_dimension {
        return image;
    }
    image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_small_image_untouched() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(100, 50));
        let out = fit_within(img, 200);
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn test_landscape_bound_by_width() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(400, 200));
        let out = fit_within(img, 100);
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn test_portrait_bound_by_height() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(300, 900));
        let out = fit_within(img, 300);
        assert_eq!((out.width(), out.height()), (100, 300));
    }

    #[test]
    fn test_one_side_over_bound() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(120, 80));
        let out = fit_within(img, 100);
        assert!(out.width() <= 100 && out.height() <= 100);
        assert_eq!(out.width(), 100);
    }
}
