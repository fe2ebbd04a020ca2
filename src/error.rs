use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfResizeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("PDF write error: {0}")]
    PdfWriteError(String),

    #[error("Image decode error: {0}")]
    ImageDecodeError(String),

    #[error("JPEG encode error: {0}")]
    JpegEncodeError(String),

    #[error("Render error: {0}")]
    RenderError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`PdfResizeError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl PdfResizeError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create a PDF read error.
    pdf_read => PdfReadError,
    /// Create a PDF write error.
    pdf_write => PdfWriteError,
    /// Create an image decode error.
    image_decode => ImageDecodeError,
    /// Create a JPEG encode error.
    jpeg_encode => JpegEncodeError,
    /// Create a render error.
    render => RenderError,
}

impl From<lopdf::Error> for PdfResizeError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfReadError(e.to_string())
    }
}

impl From<serde_yml::Error> for PdfResizeError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

#[cfg(feature = "raster")]
impl From<pdfium_render::prelude::PdfiumError> for PdfResizeError {
    fn from(e: pdfium_render::prelude::PdfiumError) -> Self {
        Self::RenderError(e.to_string())
    }
}

impl From<image::ImageError> for PdfResizeError {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::Decoding(_) => Self::ImageDecodeError(e.to_string()),
            other => Self::JpegEncodeError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfResizeError>;
