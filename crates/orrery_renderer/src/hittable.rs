//! Hittable trait and hit records for ray-object intersection.

use orrery_math::{Aabb, Interval, Ray, Vec3};

use crate::RayBatch;

/// Record of a ray-surface intersection.
///
/// The normal is the outward geometric normal. It is not flipped towards
/// the ray; `front_face` says which side was struck so materials can decide
/// for themselves (glass needs to know whether it is entering or leaving).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Whether anything was hit
    pub hit: bool,
    /// Ray parameter of the intersection (`+inf` on a miss)
    pub t: f32,
    /// Point of intersection
    pub point: Vec3,
    /// Unit outward surface normal
    pub normal: Vec3,
    /// True if the ray origin is outside the surface
    pub front_face: bool,
}

impl HitRecord {
    pub const MISS: HitRecord = HitRecord {
        hit: false,
        t: f32::INFINITY,
        point: Vec3::ZERO,
        normal: Vec3::ZERO,
        front_face: false,
    };

    pub fn new(t: f32, point: Vec3, normal: Vec3, front_face: bool) -> Self {
        Self {
            hit: true,
            t,
            point,
            normal,
            front_face,
        }
    }

    /// The normal on the side the ray arrived from.
    #[inline]
    pub fn facing_normal(&self) -> Vec3 {
        if self.front_face {
            self.normal
        } else {
            -self.normal
        }
    }
}

impl Default for HitRecord {
    fn default() -> Self {
        Self::MISS
    }
}

/// One hit record per ray of a batch, in batch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitBatch {
    pub records: Vec<HitRecord>,
}

impl HitBatch {
    /// A batch where every ray missed.
    pub fn misses(len: usize) -> Self {
        Self {
            records: vec![HitRecord::MISS; len],
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn hit_count(&self) -> usize {
        self.records.iter().filter(|r| r.hit).count()
    }

    /// Keep, per ray, whichever record is nearer. Returns the indices of the
    /// rays where `other` won.
    pub fn merge_nearest(&mut self, other: &HitBatch) -> Vec<usize> {
        debug_assert_eq!(self.len(), other.len());
        let mut replaced = Vec::new();
        for (i, (mine, theirs)) in self.records.iter_mut().zip(&other.records).enumerate() {
            if theirs.hit && theirs.t < mine.t {
                *mine = *theirs;
                replaced.push(i);
            }
        }
        replaced
    }
}

/// Geometry that rays can intersect.
pub trait Hittable: Send + Sync {
    /// Nearest intersection with `t` strictly inside `ray_t`, if any.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord>;

    /// Axis-aligned bounds of the geometry.
    fn bounding_box(&self) -> Aabb;

    /// Intersect a whole batch, one record per ray. Runs on the calling
    /// thread; callers split batches across the context pool themselves.
    fn hit_batch(&self, rays: &RayBatch, ray_t: Interval) -> HitBatch {
        let records = rays
            .iter()
            .map(|ray| self.hit(&ray, ray_t).unwrap_or(HitRecord::MISS))
            .collect();
        HitBatch { records }
    }
}
