//! Image generation module for Quillbar
//!
//! Generates images from a text prompt through a Replicate-style prediction
//! API. Features:
//! - Prediction create-and-poll client behind the `ImageBackend` seam
//! - Output normalization to an ordered list of URLs
//! - Download and save of a generated image

mod client;
mod download;
mod models;
mod types;

pub use client::{ImageBackend, ImageClient, ImageClientBuilder};
pub use download::{default_output_path, download_image, download_to, save_image};
pub use models::{IMAGE_MODELS, ImageModel};
pub use types::{
    ImageJob, ImageOutput, Prediction, PredictionInput, PredictionStatus, PredictionUrls,
    normalize_output,
};
