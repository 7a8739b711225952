//! Sphere primitive.

use orrery_math::{Aabb, Interval, Ray, Vec3};

use crate::hittable::{HitBatch, HitRecord, Hittable};
use crate::{RayBatch, RenderError, RenderResult};

/// A sphere. Geometry only: the material is attached by the scene object.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    bbox: Aabb,
}

impl Sphere {
    /// Create a sphere. The radius must be finite and strictly positive.
    pub fn new(center: Vec3, radius: f32) -> RenderResult<Self> {
        if !center.is_finite() {
            return Err(invalid(format!("center {center} is not finite")));
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(invalid(format!("radius {radius} must be finite and positive")));
        }

        let rvec = Vec3::splat(radius);
        Ok(Self {
            center,
            radius,
            bbox: Aabb::from_points(center - rvec, center + rvec),
        })
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Closed-form intersection for a unit-direction ray.
    ///
    /// With `oc = C - O` and `|D| = 1` the quadratic reduces to
    /// `t = h ± sqrt(h² - c)` where `h = D·oc` and `c = oc·oc - r²`, which
    /// avoids the cancellation of the textbook `b² - 4ac` form.
    ///
    /// `c` itself still carries an absolute error that grows with the
    /// coordinate magnitudes, so an origin lying on a large sphere can land a
    /// little inside it. Origins within that tolerance are treated as on the
    /// surface: they never hit the near root, and rays leaving the surface
    /// never hit the sphere at all.
    #[inline]
    fn intersect(&self, origin: Vec3, direction: Vec3, ray_t: Interval) -> Option<HitRecord> {
        let oc = self.center - origin;
        let h = direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let on_surface = c.abs() <= self.surface_tolerance(origin);
        if on_surface && h <= 0.0 {
            return None;
        }

        let discriminant = h * h - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // The near root is where a ray from outside enters; if it is behind
        // the window, the far root is the exit seen from inside.
        let near = h - sqrtd;
        let (root, front_face) = if !on_surface && ray_t.surrounds(near) {
            (near, true)
        } else {
            let far = h + sqrtd;
            if !ray_t.surrounds(far) {
                return None;
            }
            (far, false)
        };

        let point = origin + root * direction;
        let normal = (point - self.center) / self.radius;
        Some(HitRecord::new(root, point, normal, front_face))
    }

    /// Bound on `|c|` for an origin that lies on the surface, scaled by the
    /// largest magnitude that went into computing `oc`.
    #[inline]
    fn surface_tolerance(&self, origin: Vec3) -> f32 {
        let scale = self
            .center
            .abs()
            .max_element()
            .max(origin.abs().max_element())
            .max(self.radius);
        SURFACE_EPSILON * scale * 2.0 * self.radius
    }
}

/// Relative distance from the surface within which an origin counts as on it.
const SURFACE_EPSILON: f32 = 1e-5;

fn invalid(reason: String) -> RenderError {
    RenderError::InvalidPrimitive {
        name: "sphere".to_string(),
        reason,
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        self.intersect(ray.origin, ray.direction, ray_t)
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    /// Straight loop over the batch arrays.
    fn hit_batch(&self, rays: &RayBatch, ray_t: Interval) -> HitBatch {
        let records = rays
            .origins()
            .iter()
            .zip(rays.directions())
            .map(|(&o, &d)| self.intersect(o, d, ray_t).unwrap_or(HitRecord::MISS))
            .collect();
        HitBatch { records }
    }
}
