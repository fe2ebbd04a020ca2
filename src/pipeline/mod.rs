pub mod controller;
pub mod image_pass;
pub mod job_runner;
pub mod orchestrator;
pub mod raster_pass;
