//! BVH traversal must agree with testing every object.

use std::sync::Arc;

use orrery_renderer::{Diffuse, Interval, Object, RayBatch, RenderContext, Scene, Sphere, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_scene(rng: &mut StdRng, count: usize, leaf_size: usize) -> Scene {
    let material = Arc::new(Diffuse::new(Vec3::splat(0.5)).unwrap());
    let objects = (0..count)
        .map(|i| {
            let center = Vec3::new(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
            );
            let sphere = Sphere::new(center, rng.gen_range(0.1..6.0)).unwrap();
            Object::new(format!("sphere{i}"), sphere, material.clone())
        })
        .collect();
    Scene::build(objects, leaf_size).unwrap()
}

fn random_rays(rng: &mut StdRng, count: usize) -> RayBatch {
    let mut origins = Vec::with_capacity(count);
    let mut directions = Vec::with_capacity(count);
    for i in 0..count {
        origins.push(Vec3::new(
            rng.gen_range(-60.0..60.0),
            rng.gen_range(-60.0..60.0),
            rng.gen_range(-60.0..60.0),
        ));
        // Every fourth ray is axis aligned
        let direction = if i % 4 == 0 {
            [Vec3::X, -Vec3::Y, Vec3::Z][rng.gen_range(0..3)]
        } else {
            Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
        };
        directions.push(direction);
    }
    RayBatch::new(origins, directions)
}

#[test]
fn traversal_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(0xB7);
    let ctx = RenderContext::new(Some(4), Some(1)).unwrap().with_chunk_size(64);
    let window = Interval::new(0.001, f32::INFINITY);

    for round in 0..8 {
        let count = [1, 2, 3, 17, 64, 200, 500, 1000][round];
        let scene = random_scene(&mut rng, count, 1 + round % 4);
        let rays = random_rays(&mut rng, 2000);

        let fast = scene.traverse(&rays, window, &ctx);
        let slow = scene.traverse_linear(&rays, window);

        let mut hits = 0;
        for (i, (a, b)) in fast.iter().zip(&slow).enumerate() {
            match (a, b) {
                (None, None) => {}
                (Some(a), Some(b)) => {
                    hits += 1;
                    assert!(
                        (a.record.t - b.record.t).abs() <= 1e-4 * b.record.t.max(1.0),
                        "ray {i}: t {} vs {}",
                        a.record.t,
                        b.record.t
                    );
                }
                _ => panic!("ray {i} with {count} objects: bvh {a:?} vs brute force {b:?}"),
            }
        }
        assert!(count < 100 || hits > 0);
    }
}

#[test]
fn window_limits_hits() {
    let mut rng = StdRng::seed_from_u64(0xB8);
    let ctx = RenderContext::new(Some(2), Some(1)).unwrap();
    let scene = random_scene(&mut rng, 300, 2);
    let rays = random_rays(&mut rng, 1000);
    let window = Interval::new(0.001, 15.0);

    let fast = scene.traverse(&rays, window, &ctx);

    assert_eq!(fast, scene.traverse_linear(&rays, window));
    for hit in fast.into_iter().flatten() {
        assert!(hit.record.t > 0.001 && hit.record.t < 15.0);
    }
}
