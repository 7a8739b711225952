//! Renderable scene: objects plus the BVH built over them.

use std::fmt;
use std::sync::Arc;

use orrery_core::{SceneDescription, ShapeDesc};
use orrery_math::{Aabb, Interval, Vec3};
use rayon::prelude::*;

use crate::bvh::{Bvh, BvhStats};
use crate::context::RenderContext;
use crate::hittable::{HitBatch, HitRecord, Hittable};
use crate::material::{material_from_desc, Material};
use crate::sphere::Sphere;
use crate::{RayBatch, RenderError, RenderResult};

/// A shape bound to the material that shades it.
pub struct Object {
    pub name: String,
    pub shape: Box<dyn Hittable>,
    pub material: Arc<dyn Material>,
}

impl Object {
    pub fn new(name: impl Into<String>, shape: impl Hittable + 'static, material: Arc<dyn Material>) -> Self {
        Self {
            name: name.into(),
            shape: Box::new(shape),
            material,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("bbox", &self.shape.bounding_box())
            .field("material", &self.material)
            .finish()
    }
}

/// Nearest hit of a ray and the index of the object it struck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub record: HitRecord,
    pub object: usize,
}

/// Immutable once built; rebuild to change anything.
#[derive(Debug)]
pub struct Scene {
    objects: Vec<Object>,
    bvh: Bvh,
}

impl Scene {
    /// Build the BVH over `objects`.
    pub fn build(objects: Vec<Object>, leaf_size: usize) -> RenderResult<Self> {
        let boxes: Vec<Aabb> = objects.iter().map(|o| o.shape.bounding_box()).collect();
        let bvh = Bvh::build(&boxes, leaf_size)?;

        let stats = bvh.stats();
        log::info!(
            "Scene ready: {} objects, BVH {} nodes / {} leaves, depth {}",
            objects.len(),
            stats.nodes,
            stats.leaves,
            stats.depth
        );

        Ok(Self { objects, bvh })
    }

    /// Instantiate every object of a description and build the BVH.
    ///
    /// Unresolved material names, bad material parameters and degenerate
    /// shapes are all reported with the offending object's name.
    pub fn from_description(desc: &SceneDescription, leaf_size: usize) -> RenderResult<Self> {
        let mut objects = Vec::with_capacity(desc.objects.len());

        for object in &desc.objects {
            let material_desc = desc.resolve_material(object)?;
            let material = material_from_desc(material_desc).map_err(|err| match err {
                RenderError::InvalidMaterial { material, reason } => RenderError::InvalidMaterial {
                    material,
                    reason: format!("object '{}': {reason}", object.name),
                },
                other => other,
            })?;

            let shape = match object.shape {
                ShapeDesc::Sphere { center, radius } => Sphere::new(Vec3::from_array(center), radius),
            }
            .map_err(|err| match err {
                RenderError::InvalidPrimitive { reason, .. } => RenderError::InvalidPrimitive {
                    name: object.name.clone(),
                    reason,
                },
                other => other,
            })?;

            objects.push(Object::new(object.name.clone(), shape, material));
        }

        let bounds = desc.world_bounds();
        log::debug!(
            "Instantiated scene '{}' spanning {} to {}",
            desc.name,
            bounds.min,
            bounds.max
        );
        Self::build(objects, leaf_size)
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn object(&self, index: usize) -> &Object {
        &self.objects[index]
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn bvh_stats(&self) -> BvhStats {
        self.bvh.stats()
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bvh.bounding_box()
    }

    /// Nearest hit per ray through the BVH, one entry per ray in batch
    /// order. Chunks of the batch are traversed in parallel on the context's
    /// pool.
    pub fn traverse(&self, rays: &RayBatch, ray_t: Interval, ctx: &RenderContext) -> Vec<Option<Hit>> {
        ctx.install(|| {
            rays.par_chunks(ctx.chunk_size())
                .flat_map_iter(|(_, chunk)| {
                    self.bvh
                        .traverse(chunk, ray_t, |p, ray, window| self.objects[p].shape.hit(ray, window))
                        .into_iter()
                        .map(|hit| hit.map(|(object, record)| Hit { record, object }))
                })
                .collect()
        })
    }

    /// Same result as [`Scene::traverse`] by testing every object against
    /// the whole batch. Used to validate the BVH.
    pub fn traverse_linear(&self, rays: &RayBatch, ray_t: Interval) -> Vec<Option<Hit>> {
        let mut nearest = HitBatch::misses(rays.len());
        let mut owner = vec![None; rays.len()];

        for (index, object) in self.objects.iter().enumerate() {
            let batch = object.shape.hit_batch(rays, ray_t);
            for i in nearest.merge_nearest(&batch) {
                owner[i] = Some(index);
            }
        }

        nearest
            .records
            .into_iter()
            .zip(owner)
            .map(|(record, object)| object.map(|object| Hit { record, object }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Diffuse;
    use orrery_core::{LoadError, MaterialDesc};

    fn grey() -> Arc<dyn Material> {
        Arc::new(Diffuse::new(Vec3::splat(0.5)).unwrap())
    }

    #[test]
    fn test_traverse_reports_object_index() {
        let ctx = RenderContext::new(Some(2), Some(1)).unwrap().with_chunk_size(2);
        let scene = Scene::build(
            vec![
                Object::new("near", Sphere::new(Vec3::new(0.0, 5.0, 0.0), 1.0).unwrap(), grey()),
                Object::new("far", Sphere::new(Vec3::new(0.0, 10.0, 0.0), 1.0).unwrap(), grey()),
                Object::new("side", Sphere::new(Vec3::new(5.0, 0.0, 0.0), 1.0).unwrap(), grey()),
            ],
            1,
        )
        .unwrap();
        let rays = RayBatch::new(vec![Vec3::ZERO; 3], vec![Vec3::Y, Vec3::X, -Vec3::Y]);

        let hits = scene.traverse(&rays, Interval::new(0.001, f32::INFINITY), &ctx);

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].map(|h| h.object), Some(0));
        assert!((hits[0].map_or(0.0, |h| h.record.t) - 4.0).abs() < 1e-5);
        assert_eq!(hits[1].map(|h| h.object), Some(2));
        assert!(hits[2].is_none());
        assert_eq!(hits, scene.traverse_linear(&rays, Interval::new(0.001, f32::INFINITY)));
    }

    #[test]
    fn test_from_description_names_bad_objects() {
        let desc = SceneDescription::new("bad").with_object(
            "moon",
            ShapeDesc::sphere(Vec3::ZERO, 0.0),
            MaterialDesc::Diffuse { albedo: [0.5; 3] },
        );
        match Scene::from_description(&desc, 1) {
            Err(RenderError::InvalidPrimitive { name, .. }) => assert_eq!(name, "moon"),
            other => panic!("unexpected {other:?}"),
        }

        let desc = SceneDescription::new("bad").with_object(
            "sun",
            ShapeDesc::sphere(Vec3::ZERO, 1.0),
            MaterialDesc::Metal {
                albedo: [0.5; 3],
                fuzz: 2.0,
            },
        );
        match Scene::from_description(&desc, 1) {
            Err(RenderError::InvalidMaterial { material, reason }) => {
                assert_eq!(material, "metal");
                assert!(reason.contains("sun"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_from_description_unknown_material() {
        let desc = SceneDescription::new("bad").with_object_named("earth", ShapeDesc::sphere(Vec3::ZERO, 1.0), "ocean");

        assert!(matches!(
            Scene::from_description(&desc, 1),
            Err(RenderError::Scene(LoadError::UnknownMaterial { .. }))
        ));
    }

    #[test]
    fn test_presets_build() {
        for name in orrery_core::PRESET_NAMES {
            let scene = Scene::from_description(&orrery_core::preset(name).unwrap(), 1).unwrap();
            assert!(!scene.is_empty());
            assert_eq!(scene.bvh_stats().leaves, scene.len());
        }
    }
}
