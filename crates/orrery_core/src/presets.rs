//! Built-in reference scenes.

use orrery_math::Vec3;

use crate::scene::{MaterialDesc, SceneDescription, ShapeDesc};
use crate::{LoadError, LoadResult};

/// Names accepted by [`preset`].
pub const PRESET_NAMES: &[&str] = &["planets", "orrery_test"];

/// Look up a built-in scene by name.
pub fn preset(name: &str) -> LoadResult<SceneDescription> {
    match name {
        "planets" => Ok(planets()),
        "orrery_test" => Ok(orrery_test()),
        other => Err(LoadError::UnknownPreset(other.to_string())),
    }
}

/// Sun, earth and moon above a very large ground sphere.
pub fn planets() -> SceneDescription {
    SceneDescription::new("planets")
        .with_material(
            "sun",
            MaterialDesc::Glowing {
                albedo: [1.0, 0.7, 0.0],
                glow_min: 1.0,
                glow_max: 4.0,
            },
        )
        .with_material(
            "earth",
            MaterialDesc::Metal {
                albedo: [0.2, 0.5, 0.8],
                fuzz: 0.3,
            },
        )
        .with_material(
            "moon",
            MaterialDesc::Metal {
                albedo: [0.3, 0.3, 0.3],
                fuzz: 1.0,
            },
        )
        .with_material(
            "ground",
            MaterialDesc::Metal {
                albedo: [0.4, 0.6, 0.5],
                fuzz: 1.0,
            },
        )
        .with_object_named("sun", ShapeDesc::sphere(Vec3::new(-10.0, 6.0, 0.0), 6.0), "sun")
        .with_object_named("earth", ShapeDesc::sphere(Vec3::ZERO, 2.0), "earth")
        .with_object_named("moon", ShapeDesc::sphere(Vec3::new(-1.0, -1.0, -1.0), 1.0), "moon")
        .with_object_named(
            "ground",
            ShapeDesc::sphere(Vec3::new(0.0, 0.0, -1000.0), 998.0),
            "ground",
        )
}

/// Metal ground, a mirror "sun" and a glass "earth".
pub fn orrery_test() -> SceneDescription {
    SceneDescription::new("orrery_test")
        .with_object(
            "ground",
            ShapeDesc::sphere(Vec3::new(0.0, 0.0, -1000.0), 1000.0),
            MaterialDesc::Metal {
                albedo: [0.35, 0.78, 0.52],
                fuzz: 0.7,
            },
        )
        .with_object(
            "sun",
            ShapeDesc::sphere(Vec3::new(-4.5, 0.0, 2.0), 2.0),
            MaterialDesc::Shiny {
                albedo: [0.9, 0.7, 0.0],
            },
        )
        .with_object(
            "earth",
            ShapeDesc::sphere(Vec3::new(0.0, 0.0, 2.0), 2.0),
            MaterialDesc::Glass { eta: 1.5 },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_resolves() {
        for name in PRESET_NAMES {
            let scene = preset(name).unwrap();
            assert_eq!(scene.name, *name);
            assert!(scene.validate().is_ok());
            assert!(scene.object_count() > 0);
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(preset("saturn"), Err(LoadError::UnknownPreset(name)) if name == "saturn"));
    }

    #[test]
    fn test_planets_has_one_emitter() {
        let scene = planets();
        let emitters = scene
            .objects
            .iter()
            .filter(|o| scene.resolve_material(o).unwrap().is_emissive())
            .count();
        assert_eq!(emitters, 1);
    }
}
