use serde::Deserialize;

use super::preset::CompressionPreset;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub input: String,
    pub output: String,
    /// 目標サイズ（バイト）。0は「目標なし: 可逆圧縮のみ」。
    #[serde(default, deserialize_with = "deserialize_byte_size")]
    pub target_size: u64,
    pub min_image_bytes: Option<usize>,
    pub image_presets: Option<Vec<CompressionPreset>>,
    pub raster_presets: Option<Vec<CompressionPreset>>,
}

/// サイズ文字列をバイト数に変換する。
///
/// 形式:
/// - 数値のみ: `"512000"`（バイト）
/// - 単位付き: `"500KB"`, `"1.5 MB"`, `"2g"`（1024基数、大文字小文字を区別しない）
///
/// 単位: `B`, `K`/`KB`/`KiB`, `M`/`MB`/`MiB`, `G`/`GB`/`GiB`
pub fn parse_byte_size(s: &str) -> crate::error::Result<u64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(crate::error::PdfResizeError::config(
            "Size cannot be empty",
        ));
    }

    let split_at = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number_str, unit_str) = trimmed.split_at(split_at);

    let multiplier: u64 = match unit_str.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1024,
        "m" | "mb" | "mib" => 1024 * 1024,
        "g" | "gb" | "gib" => 1024 * 1024 * 1024,
        other => {
            return Err(crate::error::PdfResizeError::config(format!(
                "Unknown size unit: '{other}'"
            )));
        }
    };

    if number_str.is_empty() {
        return Err(crate::error::PdfResizeError::config(format!(
            "Missing number in size: '{trimmed}'"
        )));
    }

    if let Ok(whole) = number_str.parse::<u64>() {
        return whole.checked_mul(multiplier).ok_or_else(|| {
            crate::error::PdfResizeError::config(format!("Size overflows: '{trimmed}'"))
        });
    }

    let value: f64 = number_str.parse().map_err(|_| {
        crate::error::PdfResizeError::config(format!("Invalid number in size: '{number_str}'"))
    })?;
    let bytes = (value * multiplier as f64).round();
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        return Err(crate::error::PdfResizeError::config(format!(
            "Size overflows: '{trimmed}'"
        )));
    }
    Ok(bytes as u64)
}

/// serdeのdeserialize_withで使用するサイズデシリアライザ（整数・文字列の両方を受け付ける）
fn deserialize_byte_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSize {
        Bytes(u64),
        Text(String),
    }

    match RawSize::deserialize(deserializer)? {
        RawSize::Bytes(n) => Ok(n),
        RawSize::Text(s) => parse_byte_size(&s).map_err(serde::de::Error::custom),
    }
}
