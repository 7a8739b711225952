//! Orrery Core - scene description and render settings.
//!
//! This crate provides:
//!
//! - **Scene description**: `SceneDescription`, `ObjectDesc`, `MaterialDesc`, `ShapeDesc`
//! - **Settings**: `RenderSettings` with JSON loading and defaults for every field
//! - **Presets**: the built-in `planets` and `orrery_test` scenes
//!
//! # Example
//!
//! ```ignore
//! use orrery_core::{preset, RenderSettings};
//!
//! let scene = preset("planets")?;
//! let settings = RenderSettings::from_path("render.json")?;
//! println!("{} objects at {}x{}", scene.object_count(), settings.width, settings.height);
//! ```

pub mod presets;
pub mod scene;
pub mod settings;

// Re-export commonly used types
pub use presets::{preset, PRESET_NAMES};
pub use scene::{LoadError, LoadResult, MaterialDesc, MaterialRef, ObjectDesc, SceneDescription, ShapeDesc};
pub use settings::{RenderSettings, SkySettings};
