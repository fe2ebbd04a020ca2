pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod render;
