// サイズ目標に向けた段階的圧縮: 可逆 -> 画像再圧縮ラダー -> ラスタ化ラダー

use std::fmt;

use crate::config::preset::{CompressionPreset, DEFAULT_IMAGE_PRESETS, DEFAULT_RASTER_PRESETS};
use crate::engine::PdfEngine;
use crate::error::PdfResizeError;
use crate::pipeline::image_pass::{ImagePassOptions, count_images, recompress_images};
use crate::pipeline::raster_pass::rasterize_pages;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Lossless,
    ImageRecompression,
    Rasterization,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Lossless => "lossless",
            Strategy::ImageRecompression => "image-recompression",
            Strategy::Rasterization => "rasterization",
        };
        f.write_str(name)
    }
}

/// One entry of the escalation plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Step {
    pub strategy: Strategy,
    /// `None` only for [`Strategy::Lossless`].
    pub preset: Option<CompressionPreset>,
}

impl Step {
    pub const LOSSLESS: Step = Step {
        strategy: Strategy::Lossless,
        preset: None,
    };

    pub fn image(preset: CompressionPreset) -> Self {
        Step {
            strategy: Strategy::ImageRecompression,
            preset: Some(preset),
        }
    }

    pub fn raster(preset: CompressionPreset) -> Self {
        Step {
            strategy: Strategy::Rasterization,
            preset: Some(preset),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.preset {
            Some(preset) => write!(f, "{}@{}", self.strategy, preset),
            None => write!(f, "{}", self.strategy),
        }
    }
}

/// 試行1回分の記録。`size` が `None` の試行は失敗。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    pub step: Step,
    pub size: Option<usize>,
    pub met_target: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeConfig {
    pub min_image_bytes: usize,
    pub max_dimension_factor: u32,
    pub image_presets: Vec<CompressionPreset>,
    pub raster_presets: Vec<CompressionPreset>,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        ResizeConfig {
            min_image_bytes: 2048,
            max_dimension_factor: 11,
            image_presets: DEFAULT_IMAGE_PRESETS.to_vec(),
            raster_presets: DEFAULT_RASTER_PRESETS.to_vec(),
        }
    }
}

impl ResizeConfig {
    /// 試行順序: 可逆圧縮、画像プリセット順、ラスタプリセット順。
    pub fn plan(&self) -> Vec<Step> {
        let mut steps = Vec::with_capacity(1 + self.image_presets.len() + self.raster_presets.len());
        steps.push(Step::LOSSLESS);
        steps.extend(self.image_presets.iter().copied().map(Step::image));
        steps.extend(self.raster_presets.iter().copied().map(Step::raster));
        steps
    }

    fn image_pass_options(&self) -> ImagePassOptions {
        ImagePassOptions {
            min_image_bytes: self.min_image_bytes,
            max_dimension_factor: self.max_dimension_factor,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResizeOutcome {
    pub bytes: Vec<u8>,
    pub selected: Step,
    /// 実行順の試行履歴
    pub attempts: Vec<AttemptRecord>,
    /// 可逆圧縮のみの結果（A0）のサイズ
    pub original_size: usize,
    pub target_met: bool,
}

impl ResizeOutcome {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

fn meets_target(size: usize, target_bytes: i64) -> bool {
    target_bytes > 0 && (size as u64) <= target_bytes as u64
}

/// Drives one document towards a byte budget.
///
/// Every attempt starts again from the original input bytes, so later
/// presets never compound the loss of earlier ones. The first attempt whose
/// size fits the budget is returned. When nothing fits, the smallest
/// successful attempt is returned instead (the earliest on ties).
pub struct SizeTargetController<'a, E: PdfEngine> {
    engine: &'a E,
    config: ResizeConfig,
}

impl<'a, E: PdfEngine> SizeTargetController<'a, E> {
    pub fn new(engine: &'a E, config: ResizeConfig) -> Self {
        Self { engine, config }
    }

    /// `target_bytes <= 0` は目標なし（可逆圧縮結果をそのまま返す）。
    pub fn resize(&self, input: &[u8], target_bytes: i64) -> crate::error::Result<ResizeOutcome> {
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        // A0: 失敗は入力エラーとしてそのまま返す
        let source = self.engine.open(input)?;
        let image_count = count_images(self.engine, &source);
        let baseline = self.engine.compact(source)?;
        let original_size = baseline.len();
        let baseline_met = meets_target(original_size, target_bytes);
        attempts.push(AttemptRecord {
            step: Step::LOSSLESS,
            size: Some(original_size),
            met_target: baseline_met,
        });
        tracing::info!(
            step = %Step::LOSSLESS,
            size = original_size,
            target = target_bytes,
            images = image_count,
            "attempt finished"
        );

        if target_bytes <= 0 || baseline_met {
            return Ok(ResizeOutcome {
                bytes: baseline,
                selected: Step::LOSSLESS,
                attempts,
                original_size,
                target_met: true,
            });
        }

        let mut best_step = Step::LOSSLESS;
        let mut best = baseline;

        if image_count == 0 {
            tracing::info!("document has no image resources; skipping image recompression");
        }

        for step in self.config.plan().into_iter().skip(1) {
            if step.strategy == Strategy::ImageRecompression && image_count == 0 {
                continue;
            }

            match self.attempt(input, step) {
                Ok(bytes) => {
                    let size = bytes.len();
                    let met_target = meets_target(size, target_bytes);
                    tracing::info!(step = %step, size, target = target_bytes, "attempt finished");
                    attempts.push(AttemptRecord {
                        step,
                        size: Some(size),
                        met_target,
                    });

                    if met_target {
                        return Ok(ResizeOutcome {
                            bytes,
                            selected: step,
                            attempts,
                            original_size,
                            target_met: true,
                        });
                    }
                    if size < best.len() {
                        best_step = step;
                        best = bytes;
                    }
                }
                Err(e) => {
                    tracing::warn!(step = %step, error = %e, "attempt failed; continuing");
                    attempts.push(AttemptRecord {
                        step,
                        size: None,
                        met_target: false,
                    });
                }
            }
        }

        tracing::warn!(
            target = target_bytes,
            achieved = best.len(),
            step = %best_step,
            "target size not reachable; returning smallest result"
        );

        Ok(ResizeOutcome {
            bytes: best,
            selected: best_step,
            attempts,
            original_size,
            target_met: false,
        })
    }

    /// 元の入力から1ステップ分の候補を作る。
    fn attempt(&self, input: &[u8], step: Step) -> crate::error::Result<Vec<u8>> {
        match (step.strategy, step.preset) {
            (Strategy::Lossless, _) => {
                let doc = self.engine.open(input)?;
                self.engine.compact(doc)
            }
            (_, None) => Err(PdfResizeError::config(format!(
                "step {step} requires a compression preset"
            ))),
            (Strategy::ImageRecompression, Some(preset)) => {
                let mut doc = self.engine.open(input)?;
                let stats = recompress_images(
                    self.engine,
                    &mut doc,
                    preset,
                    &self.config.image_pass_options(),
                );
                tracing::debug!(
                    %preset,
                    distinct = stats.distinct,
                    duplicate_refs = stats.duplicate_refs,
                    skipped_small = stats.skipped_small,
                    replaced = stats.replaced,
                    not_smaller = stats.not_smaller,
                    failed = stats.failed,
                    "image pass finished"
                );
                self.engine.compact(doc)
            }
            (Strategy::Rasterization, Some(preset)) => {
                let source = self.engine.open(input)?;
                let rasterized = rasterize_pages(self.engine, &source, preset)?;
                drop(source);
                self.engine.compact(rasterized)
            }
        }
    }
}
