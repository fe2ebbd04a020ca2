use super::job::Job;
use super::preset::{CompressionPreset, validate_ladder};
use super::settings::Settings;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub target_size: u64,
    pub min_image_bytes: usize,
    pub max_dimension_factor: u32,
    pub object_streams: bool,
    pub image_presets: Vec<CompressionPreset>,
    pub raster_presets: Vec<CompressionPreset>,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        MergedConfig {
            target_size: job.target_size,
            min_image_bytes: job.min_image_bytes.unwrap_or(settings.min_image_bytes),
            max_dimension_factor: settings.max_dimension_factor,
            object_streams: settings.object_streams,
            image_presets: job
                .image_presets
                .clone()
                .unwrap_or_else(|| settings.image_presets.clone()),
            raster_presets: job
                .raster_presets
                .clone()
                .unwrap_or_else(|| settings.raster_presets.clone()),
        }
    }

    /// Jobで上書きされたラダーも含めて検証する。
    pub fn validate(&self) -> crate::error::Result<()> {
        validate_ladder("image_presets", &self.image_presets)?;
        validate_ladder("raster_presets", &self.raster_presets)
    }
}
