//! Orrery renderer - batch Monte Carlo path tracing
//!
//! Primary rays for every pixel are generated, traced and shaded together
//! as batches; bounces are handled by shrinking the batch to the paths that
//! are still alive. All parallel work runs on the pool of an explicit
//! [`RenderContext`] and draws from seeded per-chunk random streams, so a
//! render is reproducible from its seed.

mod buffer;
mod bvh;
mod camera;
mod context;
mod error;
mod hittable;
mod integrator;
mod material;
mod ray;
mod sampling;
mod scene;
mod sphere;

pub use buffer::{color_to_rgb8, linear_to_gamma, FrameHandle, ImageBuffer, PixelBuffer};
pub use bvh::{Bvh, BvhNode, BvhStats, PrimitiveHit};
pub use camera::{Viewport, ViewportConfig};
pub use context::{Phase, RenderContext, DEFAULT_CHUNK_SIZE};
pub use error::{RenderError, RenderResult};
pub use hittable::{HitBatch, HitRecord, Hittable};
pub use integrator::{Integrator, IntegratorConfig, RenderControl, RenderStats, SkyGradient};
pub use material::{
    material_from_desc, reflect, reflectance, refract, Color, Diffuse, Glass, Glowing, Material, Metal,
    ScatterResult, Shiny,
};
pub use ray::{RayBatch, RayView};
pub use scene::{Hit, Object, Scene};
pub use sphere::Sphere;

/// Re-export Vec3 and common math types from orrery_math
pub use orrery_math::{Aabb, Interval, Ray, Vec3};
