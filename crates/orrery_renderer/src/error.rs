//! Errors reported before or instead of a finished render.
//!
//! Per-ray numerical trouble (grazing hits, total internal reflection,
//! zero-length vectors) is handled where it happens and never shows up here.

use orrery_core::LoadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid resolution {width}x{height}: both dimensions must be at least 2")]
    InvalidResolution { width: u32, height: u32 },

    #[error("Invalid vertical field of view {0}: must be between 0 and 180 degrees")]
    InvalidFov(f32),

    #[error("Invalid aperture radius {0}: must be finite and non-negative")]
    InvalidAperture(f32),

    #[error("Invalid focus distance {0}: must be finite and positive")]
    InvalidFocusDistance(f32),

    #[error("Degenerate camera basis: {0}")]
    DegenerateCamera(String),

    #[error("Samples per pixel must be greater than zero")]
    ZeroSamples,

    #[error("Max depth must be greater than zero")]
    ZeroMaxDepth,

    #[error("Invalid minimum hit distance {0}: must be finite and non-negative")]
    InvalidTMin(f32),

    #[error("Invalid primitive '{name}': {reason}")]
    InvalidPrimitive { name: String, reason: String },

    #[error("Invalid {material} material: {reason}")]
    InvalidMaterial { material: &'static str, reason: String },

    #[error("BVH leaf size must be at least 1")]
    InvalidLeafSize,

    #[error("Scene error: {0}")]
    Scene(#[from] LoadError),

    #[error("Frame buffer is {frame_width}x{frame_height} but the viewport is {width}x{height}")]
    FrameSizeMismatch {
        frame_width: u32,
        frame_height: u32,
        width: u32,
        height: u32,
    },

    #[error("Render cancelled after {completed} of {total} samples")]
    Cancelled { completed: u32, total: u32 },

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type RenderResult<T> = Result<T, RenderError>;
