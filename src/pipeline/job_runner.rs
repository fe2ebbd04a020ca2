// ジョブ単位: PDF読込 -> サイズ目標圧縮 -> 出力PDF書込

use std::path::PathBuf;

use crate::config::merged::MergedConfig;
use crate::engine::{LopdfEngine, PdfEngine};
use crate::pipeline::controller::{ResizeConfig, SizeTargetController, Step};

/// Configuration for a single job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// 0 = no target (lossless compaction only)
    pub target_size: u64,
    pub resize: ResizeConfig,
    pub object_streams: bool,
}

impl JobConfig {
    pub fn from_merged(input_path: PathBuf, output_path: PathBuf, merged: &MergedConfig) -> Self {
        JobConfig {
            input_path,
            output_path,
            target_size: merged.target_size,
            resize: ResizeConfig {
                min_image_bytes: merged.min_image_bytes,
                max_dimension_factor: merged.max_dimension_factor,
                image_presets: merged.image_presets.clone(),
                raster_presets: merged.raster_presets.clone(),
            },
            object_streams: merged.object_streams,
        }
    }
}

/// Result of processing a single job.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub input_size: usize,
    /// 可逆圧縮のみの結果サイズ
    pub original_size: usize,
    pub output_size: usize,
    pub target_size: u64,
    pub selected: Step,
    pub target_met: bool,
}

/// Run a single job with the production engine.
pub fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    let engine = LopdfEngine::new(config.object_streams);
    run_job_with(&engine, config)
}

/// Read the input file, shrink it towards the target and write the output.
pub fn run_job_with<E: PdfEngine>(engine: &E, config: &JobConfig) -> crate::error::Result<JobResult> {
    let input = std::fs::read(&config.input_path)?;
    tracing::info!(
        input = %config.input_path.display(),
        size = input.len(),
        target = config.target_size,
        "job started"
    );

    let target_bytes = i64::try_from(config.target_size).unwrap_or(i64::MAX);
    let controller = SizeTargetController::new(engine, config.resize.clone());
    let outcome = controller.resize(&input, target_bytes)?;

    std::fs::write(&config.output_path, &outcome.bytes)?;

    Ok(JobResult {
        input_path: config.input_path.clone(),
        output_path: config.output_path.clone(),
        input_size: input.len(),
        original_size: outcome.original_size,
        output_size: outcome.size(),
        target_size: config.target_size,
        selected: outcome.selected,
        target_met: outcome.target_met,
    })
}
