// Per-image recompression over every distinct image resource of a document

use std::collections::HashSet;

use crate::config::preset::CompressionPreset;
use crate::engine::{PdfEngine, Xref};

/// Thresholds shared by every preset of the image ladder.
#[derive(Debug, Clone, Copy)]
pub struct ImagePassOptions {
    /// Images whose stored bytes are below this size are never touched.
    pub min_image_bytes: usize,
    /// Max pixel dimension = preset resolution × this factor.
    pub max_dimension_factor: u32,
}

impl Default for ImagePassOptions {
    fn default() -> Self {
        Self {
            min_image_bytes: 2048,
            max_dimension_factor: 11,
        }
    }
}

/// Counters for one pass. `distinct` counts each xref once.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    pub distinct: usize,
    pub duplicate_refs: usize,
    pub skipped_small: usize,
    pub replaced: usize,
    pub not_smaller: usize,
    pub failed: usize,
}

/// What happened to a single image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    TooSmall { size: usize },
    Replaced { before: usize, after: usize },
    NotSmaller { before: usize, candidate: usize },
}

/// Count the distinct image resources drawn anywhere in the document.
pub fn count_images<E: PdfEngine>(engine: &E, doc: &E::Document) -> usize {
    let mut seen: HashSet<Xref> = HashSet::new();
    for page_index in 0..engine.page_count(doc) {
        if let Ok(xrefs) = engine.page_images(doc, page_index) {
            seen.extend(xrefs);
        }
    }
    seen.len()
}

/// Recompress every distinct image of `doc` in place under one preset.
///
/// Each xref is visited at most once, however many pages draw it. A failure
/// on one image is logged and leaves that image untouched; the pass never
/// aborts.
pub fn recompress_images<E: PdfEngine>(
    engine: &E,
    doc: &mut E::Document,
    preset: CompressionPreset,
    options: &ImagePassOptions,
) -> PassStats {
    let mut stats = PassStats::default();
    let mut processed: HashSet<Xref> = HashSet::new();
    let max_dimension = preset.max_dimension(options.max_dimension_factor);

    for page_index in 0..engine.page_count(doc) {
        let xrefs = match engine.page_images(doc, page_index) {
            Ok(xrefs) => xrefs,
            Err(e) => {
                tracing::warn!(page = page_index, error = %e, "cannot list page images; skipping page");
                continue;
            }
        };

        for xref in xrefs {
            if !processed.insert(xref) {
                stats.duplicate_refs += 1;
                continue;
            }
            stats.distinct += 1;

            match recompress_one(engine, doc, xref, preset, max_dimension, options.min_image_bytes) {
                Ok(ImageOutcome::TooSmall { size }) => {
                    tracing::trace!(xref = ?xref, size, "image below size threshold");
                    stats.skipped_small += 1;
                }
                Ok(ImageOutcome::Replaced { before, after }) => {
                    tracing::debug!(xref = ?xref, before, after, "image recompressed");
                    stats.replaced += 1;
                }
                Ok(ImageOutcome::NotSmaller { before, candidate }) => {
                    tracing::debug!(xref = ?xref, before, candidate, "recompressed image not smaller; kept original");
                    stats.not_smaller += 1;
                }
                Err(e) => {
                    tracing::warn!(xref = ?xref, %preset, error = %e, "image recompression failed; kept original");
                    stats.failed += 1;
                }
            }
        }
    }

    stats
}

/// Decode, bound, re-encode and conditionally replace one image.
///
/// The stored bytes are replaced only when the new encoding is strictly
/// smaller.
pub fn recompress_one<E: PdfEngine>(
    engine: &E,
    doc: &mut E::Document,
    xref: Xref,
    preset: CompressionPreset,
    max_dimension: u32,
    min_image_bytes: usize,
) -> crate::error::Result<ImageOutcome> {
    let before = engine.stored_image_len(doc, xref)?;
    if before < min_image_bytes {
        return Ok(ImageOutcome::TooSmall { size: before });
    }

    let decoded = engine.decode_image(doc, xref)?;
    let bounded = engine.downscale(decoded, max_dimension);
    let encoded = engine.encode_jpeg(&bounded, preset.quality)?;
    drop(bounded);

    let after = encoded.data.len();
    if after < before {
        engine.replace_image(doc, xref, encoded)?;
        Ok(ImageOutcome::Replaced { before, after })
    } else {
        Ok(ImageOutcome::NotSmaller {
            before,
            candidate: after,
        })
    }
}
