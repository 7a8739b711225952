//! Render settings.
//!
//! Everything a launcher needs to configure a render: camera placement and
//! lens, quality, reproducibility and environment colors. Every field has a
//! default so a settings file only needs the values it changes.

use std::path::Path;

use orrery_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::LoadResult;

/// Environment colors the sky gradient blends between (linear RGB).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkySettings {
    /// Color straight up
    pub sky: [f32; 3],
    /// Color at the horizon
    pub horizon: [f32; 3],
    /// Color for every direction below the horizon
    pub ground: [f32; 3],
}

impl Default for SkySettings {
    fn default() -> Self {
        // Dusk palette
        Self {
            sky: rgb8(28, 20, 97),
            horizon: rgb8(249, 177, 92),
            ground: rgb8(41, 16, 45),
        }
    }
}

fn rgb8(r: u8, g: u8, b: u8) -> [f32; 3] {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

/// Full render configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Vertical field of view in degrees
    pub vertical_fov: f32,
    /// Camera position
    pub position: [f32; 3],
    /// Point the camera looks at
    pub target: [f32; 3],
    /// Lens radius for depth of field (0 = pinhole)
    pub aperture_radius: f32,
    /// Distance to the plane of perfect focus (defaults to the target distance)
    pub focus_distance: Option<f32>,
    /// Samples per pixel
    pub samples: u32,
    /// Maximum number of bounces per path
    pub max_depth: u32,
    /// Base seed; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Worker threads; `None` uses every core
    pub threads: Option<usize>,
    /// Maximum primitives per BVH leaf
    pub bvh_leaf_size: usize,
    /// Environment colors
    pub sky: SkySettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            // Viewport height 2 at focal length 2
            vertical_fov: 53.13,
            position: [0.0, -10.0, 2.0],
            target: [0.0, -2.0, 0.0],
            aperture_radius: 0.0,
            focus_distance: None,
            samples: 16,
            max_depth: 8,
            seed: None,
            threads: None,
            bvh_leaf_size: 1,
            sky: SkySettings::default(),
        }
    }
}

impl RenderSettings {
    /// Parse settings from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> LoadResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref();
        let settings = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded render settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> LoadResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn target(&self) -> Vec3 {
        Vec3::from_array(self.target)
    }

    /// Aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}
