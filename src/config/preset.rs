use serde::Deserialize;

use crate::error::PdfResizeError;

/// 1回の試行の圧縮強度を表す (解像度, JPEG品質) の組。
///
/// `resolution` は画像パスでは最大寸法の算出基準、ラスタライズパスではDPIとして使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct CompressionPreset {
    pub resolution: u32,
    pub quality: u8,
}

impl CompressionPreset {
    pub const fn new(resolution: u32, quality: u8) -> Self {
        Self {
            resolution,
            quality,
        }
    }

    /// 画像パスで許容する最大ピクセル寸法 (`resolution × factor`)。
    pub fn max_dimension(&self, factor: u32) -> u32 {
        self.resolution.saturating_mul(factor)
    }
}

impl std::fmt::Display for CompressionPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}dpi/q{}", self.resolution, self.quality)
    }
}

/// 画像再圧縮のデフォルトラダー（弱 → 強）。
pub const DEFAULT_IMAGE_PRESETS: [CompressionPreset; 4] = [
    CompressionPreset::new(150, 75),
    CompressionPreset::new(96, 65),
    CompressionPreset::new(72, 50),
    CompressionPreset::new(50, 40),
];

/// ページラスタライズのデフォルトラダー（弱 → 強）。
pub const DEFAULT_RASTER_PRESETS: [CompressionPreset; 3] = [
    CompressionPreset::new(150, 70),
    CompressionPreset::new(96, 60),
    CompressionPreset::new(72, 50),
];

/// プリセット列が圧縮強度の厳密な昇順になっているか検証する。
///
/// 各プリセットは直前より解像度・品質とも高くなく、少なくとも一方が厳密に低い必要がある。
pub fn validate_ladder(name: &str, presets: &[CompressionPreset]) -> crate::error::Result<()> {
    if presets.is_empty() {
        return Err(PdfResizeError::config(format!(
            "{name}: preset ladder cannot be empty"
        )));
    }

    for preset in presets {
        if preset.resolution == 0 {
            return Err(PdfResizeError::config(format!(
                "{name}: resolution must be positive, got {preset}"
            )));
        }
        if !(1..=100).contains(&preset.quality) {
            return Err(PdfResizeError::config(format!(
                "{name}: quality must be 1-100, got {}",
                preset.quality
            )));
        }
    }

    for pair in presets.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let not_weaker = next.resolution <= prev.resolution && next.quality <= prev.quality;
        let stronger = next.resolution < prev.resolution || next.quality < prev.quality;
        if !(not_weaker && stronger) {
            return Err(PdfResizeError::config(format!(
                "{name}: presets must be strictly increasing in aggressiveness ({prev} -> {next})"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladders_are_valid() {
        validate_ladder("image_presets", &DEFAULT_IMAGE_PRESETS).expect("image ladder");
        validate_ladder("raster_presets", &DEFAULT_RASTER_PRESETS).expect("raster ladder");
    }

    #[test]
    fn test_max_dimension() {
        assert_eq!(CompressionPreset::new(150, 75).max_dimension(11), 1650);
        assert_eq!(CompressionPreset::new(50, 40).max_dimension(11), 550);
    }

    #[test]
    fn test_reversed_ladder_rejected() {
        let ladder = [CompressionPreset::new(72, 50), CompressionPreset::new(150, 75)];
        assert!(validate_ladder("image_presets", &ladder).is_err());
    }

    #[test]
    fn test_repeated_preset_rejected() {
        let ladder = [CompressionPreset::new(96, 60), CompressionPreset::new(96, 60)];
        assert!(validate_ladder("raster_presets", &ladder).is_err());
    }

    #[test]
    fn test_quality_only_step_accepted() {
        let ladder = [CompressionPreset::new(96, 60), CompressionPreset::new(96, 40)];
        assert!(validate_ladder("raster_presets", &ladder).is_ok());
    }

    #[test]
    fn test_invalid_quality_rejected() {
        assert!(validate_ladder("image_presets", &[CompressionPreset::new(96, 0)]).is_err());
        assert!(validate_ladder("image_presets", &[CompressionPreset::new(96, 101)]).is_err());
    }

    #[test]
    fn test_empty_ladder_rejected() {
        assert!(validate_ladder("image_presets", &[]).is_err());
    }
}
