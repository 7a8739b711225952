use crate::{Interval, Ray, Vec3};

/// Minimum extent of a box along any axis. Flat boxes are padded up to this
/// so the slab test never works with a zero-width slab.
const MIN_EXTENT: f32 = 1e-4;

/// Axis-aligned bounding box used by the BVH.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box containing nothing. Identity element for [`Aabb::surrounding`].
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Box from two arbitrary corners, padded to a minimum thickness.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let mut aabb = Self {
            min: a.min(b),
            max: a.max(b),
        };
        aabb.pad_to_minimums();
        aabb
    }

    /// Union of two boxes.
    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max.cmplt(self.min).any()
    }

    /// Extent along one axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, axis: usize) -> Interval {
        Interval::new(self.min[axis], self.max[axis])
    }

    /// Returns true if `other` lies entirely inside this box.
    pub fn contains_box(&self, other: &Aabb) -> bool {
        other.is_empty() || (self.min.cmple(other.min).all() && self.max.cmpge(other.max).all())
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Total surface area, the cost weight of the SAH split heuristic.
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Slab test: does `ray` cross this box for some `t` inside `ray_t`?
    ///
    /// A direction component of zero (or one so small its reciprocal
    /// overflows) makes that axis a pure containment check on the origin, so
    /// `0 * inf` never turns into NaN.
    pub fn hit(&self, ray: &Ray, mut ray_t: Interval) -> bool {
        for axis in 0..3 {
            let origin = ray.origin[axis];
            let slab = self.axis_interval(axis);
            let inv = ray.direction[axis].recip();

            if !inv.is_finite() {
                if !slab.contains(origin) {
                    return false;
                }
                continue;
            }

            let mut t0 = (slab.min - origin) * inv;
            let mut t1 = (slab.max - origin) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            ray_t.min = t0.max(ray_t.min);
            ray_t.max = t1.min(ray_t.max);
            if ray_t.max <= ray_t.min {
                return false;
            }
        }
        true
    }

    fn pad_to_minimums(&mut self) {
        for axis in 0..3 {
            let extent = self.max[axis] - self.min[axis];
            if extent < MIN_EXTENT {
                let padding = (MIN_EXTENT - extent) / 2.0;
                self.min[axis] -= padding;
                self.max[axis] += padding;
            }
        }
    }
}
