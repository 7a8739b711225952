// Re-export glam for convenience
pub use glam::*;

// Orrery math types
mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::{safe_normalize, Ray};

/// World up axis. Scenes are authored Z-up: the ground plane is XY.
pub const WORLD_UP: Vec3 = Vec3::Z;
