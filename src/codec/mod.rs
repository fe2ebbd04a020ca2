pub mod jpeg;
pub mod resample;

pub use jpeg::EncodedImage;
