//! Scene description types for Orrery.
//!
//! A `SceneDescription` is the renderer-agnostic, serializable form of a
//! scene: named materials plus a list of objects, each pairing a shape with
//! a material. The renderer turns it into intersectable geometry.

use std::collections::BTreeMap;
use std::path::Path;

use orrery_math::{Aabb, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading scene descriptions or settings.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Object '{object}' references unknown material '{material}'")]
    UnknownMaterial { object: String, material: String },

    #[error("Unknown scene preset: {0}")]
    UnknownPreset(String),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Surface response of an object, as authored.
///
/// Colors are linear RGB in `[0, 1]`. Range checks happen when the renderer
/// instantiates the material, not here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MaterialDesc {
    /// Lambertian scatterer.
    Diffuse { albedo: [f32; 3] },

    /// Perfect mirror.
    Shiny { albedo: [f32; 3] },

    /// Mirror roughened by `fuzz` (0 = mirror, 1 = very rough).
    Metal { albedo: [f32; 3], fuzz: f32 },

    /// Clear dielectric with index of refraction `eta`.
    Glass { eta: f32 },

    /// Emitter whose brightness goes from `glow_min` at grazing view
    /// angles to `glow_max` head-on.
    Glowing {
        albedo: [f32; 3],
        glow_min: f32,
        glow_max: f32,
    },
}

impl MaterialDesc {
    pub fn is_emissive(&self) -> bool {
        matches!(self, MaterialDesc::Glowing { .. })
    }
}

/// Geometry of an object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeDesc {
    Sphere { center: [f32; 3], radius: f32 },
}

impl ShapeDesc {
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        ShapeDesc::Sphere {
            center: center.to_array(),
            radius,
        }
    }

    /// Bounds of the authored shape, as reported by
    /// [`SceneDescription::world_bounds`].
    pub fn bounds(&self) -> Aabb {
        match self {
            ShapeDesc::Sphere { center, radius } => {
                let c = Vec3::from_array(*center);
                let r = Vec3::splat(radius.abs());
                Aabb::from_points(c - r, c + r)
            }
        }
    }
}

/// Either the name of a material in the scene's material table or an
/// inline definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialRef {
    Named(String),
    Inline(MaterialDesc),
}

/// One renderable object: a shape bound to a single material.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectDesc {
    pub name: String,
    pub shape: ShapeDesc,
    pub material: MaterialRef,
}

/// A complete scene: named materials and the objects that use them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Scene name (preset name or file stem)
    #[serde(default)]
    pub name: String,

    /// Shared materials, referenced by name from objects
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialDesc>,

    pub objects: Vec<ObjectDesc>,
}

impl SceneDescription {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Register a shared material under `name`.
    pub fn with_material(mut self, name: impl Into<String>, material: MaterialDesc) -> Self {
        self.materials.insert(name.into(), material);
        self
    }

    /// Add an object that uses an inline material.
    pub fn with_object(mut self, name: impl Into<String>, shape: ShapeDesc, material: MaterialDesc) -> Self {
        self.objects.push(ObjectDesc {
            name: name.into(),
            shape,
            material: MaterialRef::Inline(material),
        });
        self
    }

    /// Add an object that uses a named material from the table.
    pub fn with_object_named(
        mut self,
        name: impl Into<String>,
        shape: ShapeDesc,
        material: impl Into<String>,
    ) -> Self {
        self.objects.push(ObjectDesc {
            name: name.into(),
            shape,
            material: MaterialRef::Named(material.into()),
        });
        self
    }

    /// Look up the material an object uses.
    pub fn resolve_material<'a>(&'a self, object: &'a ObjectDesc) -> LoadResult<&'a MaterialDesc> {
        match &object.material {
            MaterialRef::Inline(desc) => Ok(desc),
            MaterialRef::Named(name) => self.materials.get(name).ok_or_else(|| LoadError::UnknownMaterial {
                object: object.name.clone(),
                material: name.clone(),
            }),
        }
    }

    /// Check every named material reference resolves.
    pub fn validate(&self) -> LoadResult<()> {
        for object in &self.objects {
            self.resolve_material(object)?;
        }
        Ok(())
    }

    /// Parse a scene from JSON and validate its material references.
    pub fn from_json_str(json: &str) -> LoadResult<Self> {
        let scene: SceneDescription = serde_json::from_str(json)?;
        scene.validate()?;
        log::debug!(
            "Parsed scene '{}': {} objects, {} named materials",
            scene.name,
            scene.objects.len(),
            scene.materials.len()
        );
        Ok(scene)
    }

    /// Load a scene from a JSON file. An unnamed scene takes the file stem.
    pub fn from_path(path: impl AsRef<Path>) -> LoadResult<Self> {
        let path = path.as_ref();
        let mut scene = Self::from_json_str(&std::fs::read_to_string(path)?)?;
        if scene.name.is_empty() {
            scene.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        log::info!("Loaded scene '{}' from {}", scene.name, path.display());
        Ok(scene)
    }

    pub fn to_json(&self) -> LoadResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Object count.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// World-space bounds of every object.
    pub fn world_bounds(&self) -> Aabb {
        self.objects
            .iter()
            .fold(Aabb::EMPTY, |acc, object| Aabb::surrounding(&acc, &object.shape.bounds()))
    }
}
