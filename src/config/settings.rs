use std::path::Path;

use serde::Deserialize;

use super::preset::{
    CompressionPreset, DEFAULT_IMAGE_PRESETS, DEFAULT_RASTER_PRESETS, validate_ladder,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// このバイト数未満の画像（アイコン・ロゴ等）は再圧縮しない。
    pub min_image_bytes: usize,
    /// 最大寸法 = resolution × max_dimension_factor
    pub max_dimension_factor: u32,
    /// 保存時にオブジェクトストリーム/XRefストリームを使用する。
    pub object_streams: bool,
    pub parallel_workers: usize,
    pub image_presets: Vec<CompressionPreset>,
    pub raster_presets: Vec<CompressionPreset>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            min_image_bytes: 2048,
            max_dimension_factor: 11,
            object_streams: true,
            parallel_workers: 0,
            image_presets: DEFAULT_IMAGE_PRESETS.to_vec(),
            raster_presets: DEFAULT_RASTER_PRESETS.to_vec(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let settings: Settings = serde_yml::from_str(yaml).map_err(|e| {
            crate::error::PdfResizeError::config(format!("Failed to parse settings YAML: {e}"))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.max_dimension_factor == 0 {
            return Err(crate::error::PdfResizeError::config(
                "max_dimension_factor must be positive",
            ));
        }
        validate_ladder("image_presets", &self.image_presets)?;
        validate_ladder("raster_presets", &self.raster_presets)
    }
}
