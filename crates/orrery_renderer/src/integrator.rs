//! Batch path tracer.
//!
//! Every sample traces all pixels together. The bounce recursion is
//! flattened into a loop over an active set: each depth traverses the
//! surviving rays as one batch, shades them chunk by chunk, and keeps only
//! the paths that scattered. Paths still active at `max_depth` are cut off
//! and contribute nothing, which slightly underestimates energy in scenes
//! with long bright chains; raise `max_depth` if that matters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use orrery_core::{RenderSettings, SkySettings};
use orrery_math::{Interval, Ray, Vec3};
use rand::RngCore;
use rayon::prelude::*;

use crate::buffer::{FrameHandle, ImageBuffer, PixelBuffer};
use crate::camera::Viewport;
use crate::context::{Phase, RenderContext};
use crate::material::Color;
use crate::scene::{Hit, Scene};
use crate::{RayBatch, RenderError, RenderResult};

/// Environment seen by rays that escape the scene.
///
/// Above the horizon the color blends from `horizon` to `sky` with the
/// direction's Z component; everything below is a flat `ground`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyGradient {
    pub sky: Color,
    pub horizon: Color,
    pub ground: Color,
}

impl SkyGradient {
    pub fn new(sky: Color, horizon: Color, ground: Color) -> Self {
        Self { sky, horizon, ground }
    }

    pub fn from_settings(settings: &SkySettings) -> Self {
        Self::new(
            Color::from_array(settings.sky),
            Color::from_array(settings.horizon),
            Color::from_array(settings.ground),
        )
    }

    /// Color for a unit direction.
    #[inline]
    pub fn color(&self, direction: Vec3) -> Color {
        if direction.z > 0.0 {
            self.horizon.lerp(self.sky, direction.z.min(1.0))
        } else {
            self.ground
        }
    }
}

impl Default for SkyGradient {
    fn default() -> Self {
        Self::from_settings(&SkySettings::default())
    }
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorConfig {
    /// Samples per pixel
    pub samples: u32,
    /// Maximum number of surface interactions per path
    pub max_depth: u32,
    /// Minimum hit distance, suppresses self-intersection after a bounce
    pub t_min: f32,
    pub sky: SkyGradient,
}

impl IntegratorConfig {
    pub fn new(samples: u32, max_depth: u32) -> Self {
        Self {
            samples,
            max_depth,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            samples: settings.samples,
            max_depth: settings.max_depth,
            t_min: 0.001,
            sky: SkyGradient::from_settings(&settings.sky),
        }
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_t_min(mut self, t_min: f32) -> Self {
        self.t_min = t_min;
        self
    }

    pub fn with_sky(mut self, sky: SkyGradient) -> Self {
        self.sky = sky;
        self
    }

    fn validate(&self) -> RenderResult<()> {
        if self.samples == 0 {
            return Err(RenderError::ZeroSamples);
        }
        if self.max_depth == 0 {
            return Err(RenderError::ZeroMaxDepth);
        }
        if !(self.t_min.is_finite() && self.t_min >= 0.0) {
            return Err(RenderError::InvalidTMin(self.t_min));
        }
        Ok(())
    }
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self::from_settings(&RenderSettings::default())
    }
}

/// Counters collected over a render.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    pub samples: u32,
    /// Rays sent through the scene, primary and bounced
    pub rays_traced: u64,
    /// Paths still active when `max_depth` was reached
    pub cut_off: u64,
    /// Path contributions dropped because they were NaN or infinite
    pub non_finite: u64,
    pub elapsed: Duration,
}

/// Optional hooks into a running render.
#[derive(Debug, Clone, Default)]
pub struct RenderControl {
    cancel: Option<Arc<AtomicBool>>,
    frame: Option<FrameHandle>,
}

impl RenderControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop before the next sample once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Publish the running average to `frame` after every sample.
    pub fn with_frame(mut self, frame: FrameHandle) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// What happened to one path at one depth.
enum Outcome {
    /// Path finished; the value is the last factor of its radiance.
    Done(Color),
    /// Path scattered along `ray`.
    Continue { ray: Ray, attenuation: Color },
}

/// Per-sample counters, folded into [`RenderStats`].
#[derive(Default)]
struct SampleStats {
    rays_traced: u64,
    cut_off: u64,
}

#[derive(Debug, Clone)]
pub struct Integrator {
    config: IntegratorConfig,
}

impl Integrator {
    pub fn new(config: IntegratorConfig) -> RenderResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Render to gamma-corrected 8-bit pixels.
    pub fn render(&self, scene: &Scene, viewport: &Viewport, ctx: &RenderContext) -> RenderResult<PixelBuffer> {
        self.render_with_control(scene, viewport, ctx, &RenderControl::default())
            .map(|(pixels, _)| pixels)
    }

    /// Render the averaged linear-light image, before gamma and quantization.
    pub fn render_linear(&self, scene: &Scene, viewport: &Viewport, ctx: &RenderContext) -> RenderResult<ImageBuffer> {
        self.accumulate(scene, viewport, ctx, &RenderControl::default())
            .map(|(image, _)| image)
    }

    /// Render with cancellation and progressive frames.
    pub fn render_with_control(
        &self,
        scene: &Scene,
        viewport: &Viewport,
        ctx: &RenderContext,
        control: &RenderControl,
    ) -> RenderResult<(PixelBuffer, RenderStats)> {
        let (image, stats) = self.accumulate(scene, viewport, ctx, control)?;
        Ok((image.to_pixels(), stats))
    }

    fn accumulate(
        &self,
        scene: &Scene,
        viewport: &Viewport,
        ctx: &RenderContext,
        control: &RenderControl,
    ) -> RenderResult<(ImageBuffer, RenderStats)> {
        let (width, height) = (viewport.width(), viewport.height());
        if let Some(frame) = &control.frame {
            let (frame_width, frame_height) = frame.dimensions();
            if (frame_width, frame_height) != (width, height) {
                return Err(RenderError::FrameSizeMismatch {
                    frame_width,
                    frame_height,
                    width,
                    height,
                });
            }
        }

        let total = self.config.samples;
        log::info!(
            "Rendering {}x{}, {} samples, max depth {}, {} objects",
            width,
            height,
            total,
            self.config.max_depth,
            scene.len()
        );

        let start = Instant::now();
        let mut sum = ImageBuffer::new(width, height);
        let mut stats = RenderStats::default();

        for sample in 0..total {
            if control.is_cancelled() {
                log::info!("Render cancelled after {} of {} samples", sample, total);
                return Err(RenderError::Cancelled {
                    completed: sample,
                    total,
                });
            }

            let (radiance, sample_stats) = self.trace_sample(scene, viewport, ctx, sample);

            let mut non_finite = 0u64;
            for (acc, value) in sum.pixels.iter_mut().zip(radiance) {
                if value.is_finite() {
                    *acc += value;
                } else {
                    non_finite += 1;
                }
            }
            if non_finite > 0 {
                log::warn!("Sample {}: dropped {} non-finite path contributions", sample, non_finite);
            }

            stats.samples += 1;
            stats.rays_traced += sample_stats.rays_traced;
            stats.cut_off += sample_stats.cut_off;
            stats.non_finite += non_finite;

            if let Some(frame) = &control.frame {
                frame.publish(&sum.scaled(1.0 / stats.samples as f32).to_pixels());
            }
            log::debug!(
                "Sample {}/{}: {} rays, {} cut off",
                sample + 1,
                total,
                sample_stats.rays_traced,
                sample_stats.cut_off
            );
        }

        stats.elapsed = start.elapsed();
        log::info!(
            "Render finished in {:.2?}: {} rays traced, {} paths cut off, {} non-finite",
            stats.elapsed,
            stats.rays_traced,
            stats.cut_off,
            stats.non_finite
        );

        Ok((sum.scaled(1.0 / total as f32), stats))
    }

    /// Radiance of one path per pixel.
    fn trace_sample(
        &self,
        scene: &Scene,
        viewport: &Viewport,
        ctx: &RenderContext,
        sample: u32,
    ) -> (Vec<Color>, SampleStats) {
        let window = Interval::new(self.config.t_min, f32::INFINITY);
        let chunk_size = ctx.chunk_size();

        let mut rays = viewport.generate_rays(true, sample, ctx);
        let n = rays.len();
        let mut throughput = vec![Color::ONE; n];
        let mut radiance = vec![Color::ZERO; n];
        // active[k] is the pixel that rays[k] belongs to
        let mut active: Vec<usize> = (0..n).collect();
        let mut stats = SampleStats::default();

        for depth in 0..self.config.max_depth {
            if active.is_empty() {
                break;
            }
            stats.rays_traced += active.len() as u64;

            let hits = scene.traverse(&rays, window, ctx);
            let outcomes: Vec<Outcome> = ctx.install(|| {
                rays.par_chunks(chunk_size)
                    .zip(hits.par_chunks(chunk_size))
                    .flat_map_iter(|((chunk, view), hits)| {
                        let mut rng = ctx.rng(sample, Phase::Bounce(depth), chunk);
                        (0..view.len())
                            .map(|k| self.shade(scene, &view.get(k), hits[k], &mut rng))
                            .collect::<Vec<_>>()
                    })
                    .collect()
            });

            let mut next_active = Vec::with_capacity(active.len());
            let mut next_rays = Vec::with_capacity(active.len());
            for (&pixel, outcome) in active.iter().zip(outcomes) {
                match outcome {
                    Outcome::Done(color) => radiance[pixel] = throughput[pixel] * color,
                    Outcome::Continue { ray, attenuation } => {
                        throughput[pixel] *= attenuation;
                        next_active.push(pixel);
                        next_rays.push(ray);
                    }
                }
            }

            active = next_active;
            rays = RayBatch::from_rays(next_rays);
        }

        stats.cut_off = active.len() as u64;
        (radiance, stats)
    }

    fn shade(&self, scene: &Scene, ray: &Ray, hit: Option<Hit>, rng: &mut dyn RngCore) -> Outcome {
        let Some(hit) = hit else {
            return Outcome::Done(self.config.sky.color(ray.direction));
        };

        let material = &scene.object(hit.object).material;
        let result = material.bounce(ray, &hit.record, rng);
        if result.continues {
            Outcome::Continue {
                ray: Ray::new(hit.record.point, result.out_direction),
                attenuation: result.attenuation,
            }
        } else {
            Outcome::Done(result.attenuation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::ViewportConfig;
    use crate::material::{Diffuse, Glowing};
    use crate::scene::Object;
    use crate::sphere::Sphere;

    fn ctx(threads: usize) -> RenderContext {
        RenderContext::new(Some(threads), Some(2024)).unwrap().with_chunk_size(16)
    }

    fn viewport() -> Viewport {
        Viewport::new(
            ViewportConfig::new(12, 8)
                .with_position(Vec3::new(0.0, -6.0, 0.0), Vec3::ZERO)
                .with_fov(40.0)
                .with_aperture(0.0),
        )
        .unwrap()
    }

    fn sphere_scene() -> Scene {
        Scene::build(
            vec![Object::new(
                "ball",
                Sphere::new(Vec3::ZERO, 1.0).unwrap(),
                Arc::new(Diffuse::new(Vec3::splat(0.5)).unwrap()),
            )],
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_sky_gradient() {
        let sky = SkyGradient::new(Color::new(0.0, 0.0, 1.0), Color::new(1.0, 0.5, 0.0), Color::splat(0.1));

        assert_eq!(sky.color(Vec3::Z), Color::new(0.0, 0.0, 1.0));
        assert_eq!(sky.color(Vec3::new(1.0, 0.0, 1e-9).normalize()).x, 1.0);
        assert_eq!(sky.color(-Vec3::Z), Color::splat(0.1));
        assert_eq!(sky.color(Vec3::X), Color::splat(0.1));
        let mid = sky.color(Vec3::new(1.0, 0.0, 1.0).normalize());
        assert!(mid.z > 0.0 && mid.z < 1.0);
    }

    #[test]
    fn test_rejects_zero_samples_and_depth() {
        assert!(matches!(
            Integrator::new(IntegratorConfig::new(0, 4)),
            Err(RenderError::ZeroSamples)
        ));
        assert!(matches!(
            Integrator::new(IntegratorConfig::new(4, 0)),
            Err(RenderError::ZeroMaxDepth)
        ));
    }

    #[test]
    fn test_rejects_bad_t_min() {
        for t_min in [f32::NAN, f32::INFINITY, -5.0] {
            assert!(matches!(
                Integrator::new(IntegratorConfig::new(1, 1).with_t_min(t_min)),
                Err(RenderError::InvalidTMin(_))
            ));
        }
        assert!(Integrator::new(IntegratorConfig::new(1, 1).with_t_min(0.0)).is_ok());
    }

    #[test]
    fn test_empty_scene_shows_sky() {
        let scene = Scene::build(Vec::new(), 1).unwrap();
        let sky = SkyGradient::new(Color::new(0.0, 0.0, 1.0), Color::new(1.0, 1.0, 0.0), Color::new(0.0, 1.0, 0.0));
        let integrator = Integrator::new(IntegratorConfig::new(2, 3).with_sky(sky)).unwrap();

        let image = integrator.render_linear(&scene, &viewport(), &ctx(2)).unwrap();

        // Top row looks above the horizon, bottom row below
        let top = image.get(6, 0);
        let bottom = image.get(6, 7);
        assert!(top.x > 0.5 && top.z > 0.0);
        assert_eq!(bottom, Color::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_emitter_seen_directly() {
        let scene = Scene::build(
            vec![Object::new(
                "lamp",
                Sphere::new(Vec3::ZERO, 1.0).unwrap(),
                Arc::new(Glowing::new(Color::ONE, 0.5, 0.5).unwrap()),
            )],
            1,
        )
        .unwrap();
        let integrator = Integrator::new(IntegratorConfig::new(1, 1)).unwrap();

        let image = integrator.render_linear(&scene, &viewport(), &ctx(1)).unwrap();

        // Uniform glow of 0.5 over the silhouette
        assert!((image.get(6, 4) - Color::splat(0.5)).length() < 1e-6);
    }

    #[test]
    fn test_depth_cutoff_contributes_nothing() {
        let scene = sphere_scene();
        let integrator = Integrator::new(IntegratorConfig::new(1, 1)).unwrap();
        let viewport = viewport();

        let (pixels, stats) = integrator
            .render_with_control(&scene, &viewport, &ctx(2), &RenderControl::new())
            .unwrap();

        // With one interaction every path that hits the ball is cut off
        assert_eq!(pixels.get(6, 4), [0, 0, 0]);
        assert!(stats.cut_off > 0);
        assert_eq!(stats.rays_traced, viewport.pixel_count() as u64);
    }

    #[test]
    fn test_same_seed_same_image_any_thread_count() {
        let scene = sphere_scene();
        let integrator = Integrator::new(IntegratorConfig::new(3, 4)).unwrap();

        let a = integrator.render_linear(&scene, &viewport(), &ctx(1)).unwrap();
        let b = integrator.render_linear(&scene, &viewport(), &ctx(4)).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_cancel_before_first_sample() {
        let flag = Arc::new(AtomicBool::new(true));
        let control = RenderControl::new().with_cancel_flag(flag);
        let integrator = Integrator::new(IntegratorConfig::new(4, 2)).unwrap();

        let result = integrator.render_with_control(&sphere_scene(), &viewport(), &ctx(1), &control);

        assert!(matches!(result, Err(RenderError::Cancelled { completed: 0, total: 4 })));
    }

    #[test]
    fn test_frames_published_per_sample() {
        let frame = FrameHandle::new(12, 8);
        let control = RenderControl::new().with_frame(frame.clone());
        let integrator = Integrator::new(IntegratorConfig::new(5, 3)).unwrap();

        let (pixels, stats) = integrator
            .render_with_control(&sphere_scene(), &viewport(), &ctx(2), &control)
            .unwrap();

        assert_eq!(stats.samples, 5);
        assert_eq!(frame.generation(), 5);
        assert_eq!(frame.snapshot(), pixels);
    }

    #[test]
    fn test_frame_size_must_match() {
        let control = RenderControl::new().with_frame(FrameHandle::new(3, 3));
        let integrator = Integrator::new(IntegratorConfig::new(1, 1)).unwrap();

        assert!(matches!(
            integrator.render_with_control(&sphere_scene(), &viewport(), &ctx(1), &control),
            Err(RenderError::FrameSizeMismatch { .. })
        ));
    }
}
