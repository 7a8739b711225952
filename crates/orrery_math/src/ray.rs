use crate::Vec3;

/// Normalize `v`, falling back to `fallback` when `v` has zero (or
/// non-finite) length.
#[inline]
pub fn safe_normalize(v: Vec3, fallback: Vec3) -> Vec3 {
    v.try_normalize().unwrap_or(fallback)
}

/// A half-line with an origin and a unit direction.
///
/// The direction is normalized on construction; use [`Ray::from_unit`] when
/// the caller already guarantees unit length.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray, normalizing `direction`.
    ///
    /// A zero-length direction degrades to +Z rather than producing NaN.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: safe_normalize(direction, Vec3::Z),
        }
    }

    /// Create a ray from a direction that is already unit length.
    #[inline]
    pub fn from_unit(origin: Vec3, direction: Vec3) -> Self {
        debug_assert!((direction.length_squared() - 1.0).abs() < 1e-3);
        Self { origin, direction }
    }

    /// Point along the ray at parameter t: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_ray_direction_is_unit() {
        let ray = Ray::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 3.0, 4.0));

        assert!((ray.direction.length() - 1.0).abs() < 1e-6);
        assert_eq!(ray.direction, Vec3::new(0.0, 0.6, 0.8));
    }

    #[test]
    fn test_ray_at_matches_definition() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let origin = Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
            let direction = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            let ray = Ray::new(origin, direction);
            let t: f32 = rng.gen_range(0.0..20.0);

            let expected = ray.origin + t * ray.direction;
            assert!((ray.at(t) - expected).length() < 1e-5);
            assert!((ray.direction.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_zero_direction_does_not_produce_nan() {
        let ray = Ray::new(Vec3::ZERO, Vec3::ZERO);

        assert!(ray.direction.is_finite());
        assert_eq!(ray.direction, Vec3::Z);
    }

    #[test]
    fn test_safe_normalize_fallback() {
        assert_eq!(safe_normalize(Vec3::ZERO, Vec3::X), Vec3::X);
        assert_eq!(safe_normalize(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::Y), Vec3::Y);
        assert_eq!(safe_normalize(Vec3::new(0.0, 0.0, -2.0), Vec3::X), -Vec3::Z);
    }
}
