//! Viewport: maps the pixel grid to a batch of primary rays.
//!
//! World up is fixed to +Z. The basis is `forward`, `right = forward × Z` and
//! `down = forward × right`, so a camera looking straight up or down has no
//! basis and is rejected at configuration time.

use orrery_core::RenderSettings;
use orrery_math::{Ray, Vec3, WORLD_UP};
use rayon::prelude::*;

use crate::context::{Phase, RenderContext};
use crate::sampling::{random_in_unit_disk, sample_square};
use crate::{RayBatch, RenderError, RenderResult};

/// Plain camera parameters, consumed by [`Viewport::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
    /// Vertical field of view in degrees
    pub vertical_fov: f32,
    pub position: Vec3,
    pub target: Vec3,
    /// Lens radius; 0 gives a pinhole
    pub aperture_radius: f32,
    /// Distance to the plane of sharp focus (`None` = distance to target)
    pub focus_distance: Option<f32>,
}

impl ViewportConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            vertical_fov: settings.vertical_fov,
            position: settings.position(),
            target: settings.target(),
            aperture_radius: settings.aperture_radius,
            focus_distance: settings.focus_distance,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_fov(mut self, vertical_fov: f32) -> Self {
        self.vertical_fov = vertical_fov;
        self
    }

    /// Set camera position and look-at target.
    pub fn with_position(mut self, position: Vec3, target: Vec3) -> Self {
        self.position = position;
        self.target = target;
        self
    }

    pub fn with_aperture(mut self, aperture_radius: f32) -> Self {
        self.aperture_radius = aperture_radius;
        self
    }

    pub fn with_focus_distance(mut self, focus_distance: f32) -> Self {
        self.focus_distance = Some(focus_distance);
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self::from_settings(&RenderSettings::default())
    }
}

/// Camera basis and per-pixel target lattice, derived once per
/// configuration.
#[derive(Debug, Clone)]
pub struct Viewport {
    config: ViewportConfig,
    forward: Vec3,
    right: Vec3,
    down: Vec3,
    h_step: Vec3,
    v_step: Vec3,
    /// Row-major, top row first
    targets: Vec<Vec3>,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> RenderResult<Self> {
        validate(&config)?;

        let offset = config.target - config.position;
        let forward = offset
            .try_normalize()
            .ok_or_else(|| RenderError::DegenerateCamera("position and target coincide".to_string()))?;
        let right = forward.cross(WORLD_UP).try_normalize().ok_or_else(|| {
            RenderError::DegenerateCamera(format!("view direction {forward} is parallel to world up"))
        })?;
        let down = forward.cross(right);

        let focus = config.focus_distance.unwrap_or_else(|| offset.length());

        let half_height = focus * (config.vertical_fov.to_radians() / 2.0).tan();
        let half_width = half_height * config.aspect_ratio();

        // Edge pixels sit exactly on the viewport border
        let h_step = right * (2.0 * half_width / (config.width - 1) as f32);
        let v_step = down * (2.0 * half_height / (config.height - 1) as f32);
        let top_left = config.position + forward * focus - right * half_width - down * half_height;

        let width = config.width as usize;
        let targets = (0..config.pixel_count())
            .map(|p| top_left + (p % width) as f32 * h_step + (p / width) as f32 * v_step)
            .collect();

        log::debug!(
            "Viewport {}x{}: fov {}, focus {:.3}, aperture {}",
            config.width,
            config.height,
            config.vertical_fov,
            focus,
            config.aperture_radius
        );

        Ok(Self {
            config,
            forward,
            right,
            down,
            h_step,
            v_step,
            targets,
        })
    }

    /// Replace the configuration, recomputing the basis and lattice. On
    /// error the viewport keeps its previous state.
    pub fn reconfigure(&mut self, config: ViewportConfig) -> RenderResult<()> {
        if config != self.config {
            *self = Self::new(config)?;
        }
        Ok(())
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    pub fn pixel_count(&self) -> usize {
        self.targets.len()
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn down(&self) -> Vec3 {
        self.down
    }

    /// Point on the focus plane that pixel `(i, j)` looks through.
    pub fn pixel_target(&self, i: u32, j: u32) -> Vec3 {
        self.targets[j as usize * self.config.width as usize + i as usize]
    }

    /// One ray per pixel, row-major.
    ///
    /// With `jitter`, each target moves uniformly within its pixel's
    /// footprint and each origin moves uniformly over the lens disk. The
    /// random streams are keyed by `sample` and the chunk index, so the
    /// batch depends only on the context seed.
    pub fn generate_rays(&self, jitter: bool, sample: u32, ctx: &RenderContext) -> RayBatch {
        let position = self.config.position;
        if !jitter {
            return RayBatch::from_rays(self.targets.iter().map(|&t| Ray::new(position, t - position)));
        }

        let aperture = self.config.aperture_radius;
        let chunks: Vec<Vec<Ray>> = ctx.install(|| {
            self.targets
                .par_chunks(ctx.chunk_size())
                .enumerate()
                .map(|(chunk, targets)| {
                    let mut rng = ctx.rng(sample, Phase::Camera, chunk);
                    targets
                        .iter()
                        .map(|&target| {
                            let s = sample_square(&mut rng);
                            let target = target + s.x * self.h_step + s.y * self.v_step;

                            let origin = if aperture > 0.0 {
                                let lens = random_in_unit_disk(&mut rng) * aperture;
                                position + lens.x * self.right + lens.y * self.down
                            } else {
                                position
                            };
                            Ray::new(origin, target - origin)
                        })
                        .collect()
                })
                .collect()
        });

        RayBatch::from_rays(chunks.into_iter().flatten())
    }
}

fn validate(config: &ViewportConfig) -> RenderResult<()> {
    if config.width < 2 || config.height < 2 {
        return Err(RenderError::InvalidResolution {
            width: config.width,
            height: config.height,
        });
    }
    if !(config.vertical_fov > 0.0 && config.vertical_fov < 180.0) {
        return Err(RenderError::InvalidFov(config.vertical_fov));
    }
    if !(config.aperture_radius.is_finite() && config.aperture_radius >= 0.0) {
        return Err(RenderError::InvalidAperture(config.aperture_radius));
    }
    if let Some(d) = config.focus_distance {
        if !(d.is_finite() && d > 0.0) {
            return Err(RenderError::InvalidFocusDistance(d));
        }
    }
    if !(config.position.is_finite() && config.target.is_finite()) {
        return Err(RenderError::DegenerateCamera("position and target must be finite".to_string()));
    }
    Ok(())
}
