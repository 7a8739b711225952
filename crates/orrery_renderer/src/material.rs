//! Materials: how a surface responds to an incoming ray.

use std::fmt;
use std::sync::Arc;

use orrery_core::MaterialDesc;
use orrery_math::{safe_normalize, Ray, Vec3};
use rand::RngCore;

use crate::hittable::HitRecord;
use crate::sampling::{gen_f32, random_in_unit_sphere, random_unit_vector};
use crate::{RenderError, RenderResult};

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Outcome of a ray meeting a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterResult {
    /// False when the path ends here (absorbed or emitted)
    pub continues: bool,
    /// Unit direction of the scattered ray
    pub out_direction: Vec3,
    /// Throughput multiplier, or emitted radiance when the path ends
    pub attenuation: Color,
}

impl ScatterResult {
    pub fn scatter(out_direction: Vec3, attenuation: Color) -> Self {
        Self {
            continues: true,
            out_direction,
            attenuation,
        }
    }

    pub fn terminate(direction: Vec3, radiance: Color) -> Self {
        Self {
            continues: false,
            out_direction: direction,
            attenuation: radiance,
        }
    }
}

/// Trait for materials that describe how light interacts with surfaces.
pub trait Material: Send + Sync + fmt::Debug {
    /// Respond to `ray_in` striking the surface at `rec`.
    fn bounce(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> ScatterResult;

    /// True if paths end at this material with emitted light.
    fn is_emissive(&self) -> bool {
        false
    }
}

/// Lambertian (diffuse) material.
#[derive(Debug, Clone)]
pub struct Diffuse {
    albedo: Color,
}

impl Diffuse {
    pub fn new(albedo: Color) -> RenderResult<Self> {
        check_albedo("diffuse", albedo)?;
        Ok(Self { albedo })
    }
}

impl Material for Diffuse {
    fn bounce(&self, _ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> ScatterResult {
        let normal = rec.facing_normal();
        // normal + unit vector can cancel out; fall back to the normal
        let direction = safe_normalize(normal + random_unit_vector(rng), normal);
        ScatterResult::scatter(direction, self.albedo)
    }
}

/// Perfect mirror.
#[derive(Debug, Clone)]
pub struct Shiny {
    albedo: Color,
}

impl Shiny {
    pub fn new(albedo: Color) -> RenderResult<Self> {
        check_albedo("shiny", albedo)?;
        Ok(Self { albedo })
    }
}

impl Material for Shiny {
    fn bounce(&self, ray_in: &Ray, rec: &HitRecord, _rng: &mut dyn RngCore) -> ScatterResult {
        let normal = rec.facing_normal();
        let direction = safe_normalize(reflect(ray_in.direction, normal), normal);
        ScatterResult::scatter(direction, self.albedo)
    }
}

/// Rough mirror.
///
/// The mirror direction is pulled towards the normal by `fuzz`, then
/// jittered by a random offset no longer than `fuzz` times the blended
/// direction's normal component. The result therefore always leaves on the
/// struck side, so no rays are absorbed at grazing angles. This is a tuning
/// heuristic rather than a derived BRDF.
#[derive(Debug, Clone)]
pub struct Metal {
    albedo: Color,
    fuzz: f32,
}

/// Keeps the perturbation strictly shorter than the normal component.
const FUZZ_MARGIN: f32 = 0.999;

impl Metal {
    /// - `albedo`: The color of the metal
    /// - `fuzz`: Roughness in `[0, 1]`, 0 = perfect mirror
    pub fn new(albedo: Color, fuzz: f32) -> RenderResult<Self> {
        check_albedo("metal", albedo)?;
        if !(0.0..=1.0).contains(&fuzz) {
            return Err(RenderError::InvalidMaterial {
                material: "metal",
                reason: format!("fuzz {fuzz} is outside [0, 1]"),
            });
        }
        Ok(Self { albedo, fuzz })
    }
}

impl Material for Metal {
    fn bounce(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> ScatterResult {
        let normal = rec.facing_normal();
        let reflected = safe_normalize(reflect(ray_in.direction, normal), normal);

        let blended = safe_normalize(reflected.lerp(normal, self.fuzz), normal);
        let lean = blended.dot(normal).max(0.0);
        let jitter = random_in_unit_sphere(rng) * (self.fuzz * lean * FUZZ_MARGIN);

        let direction = safe_normalize(blended + jitter, normal);
        ScatterResult::scatter(direction, self.albedo)
    }
}

/// Dielectric (glass) material.
#[derive(Debug, Clone)]
pub struct Glass {
    /// Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    eta: f32,
}

impl Glass {
    pub fn new(eta: f32) -> RenderResult<Self> {
        if !(eta.is_finite() && eta > 0.0) {
            return Err(RenderError::InvalidMaterial {
                material: "glass",
                reason: format!("index of refraction {eta} must be finite and positive"),
            });
        }
        Ok(Self { eta })
    }

    /// Ratio of indices across the boundary, incident over transmitted.
    #[inline]
    fn refraction_ratio(&self, front_face: bool) -> f32 {
        if front_face {
            1.0 / self.eta
        } else {
            self.eta
        }
    }
}

impl Material for Glass {
    fn bounce(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> ScatterResult {
        let normal = rec.facing_normal();
        let ratio = self.refraction_ratio(rec.front_face);
        let unit_direction = ray_in.direction;

        let cos_theta = (-unit_direction).dot(normal).clamp(0.0, 1.0);
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

        let cannot_refract = ratio * sin_theta > 1.0;
        let direction = if cannot_refract || reflectance(cos_theta, ratio) > gen_f32(rng) {
            reflect(unit_direction, normal)
        } else {
            refract(unit_direction, normal, ratio)
        };

        // Clear glass: color comes from whatever is seen through it
        ScatterResult::scatter(safe_normalize(direction, normal), Color::ONE)
    }
}

/// Emitter whose brightness depends on the viewing angle.
///
/// Emission is `albedo * lerp(glow_min, glow_max, |cos|)` where `cos` is
/// the cosine between the incoming ray and the normal: brightest head-on,
/// dimmest at the limb.
#[derive(Debug, Clone)]
pub struct Glowing {
    albedo: Color,
    glow_min: f32,
    glow_max: f32,
}

impl Glowing {
    pub fn new(albedo: Color, glow_min: f32, glow_max: f32) -> RenderResult<Self> {
        check_albedo("glowing", albedo)?;
        if !(glow_min.is_finite() && glow_max.is_finite() && 0.0 <= glow_min && glow_min <= glow_max) {
            return Err(RenderError::InvalidMaterial {
                material: "glowing",
                reason: format!("glow range [{glow_min}, {glow_max}] must satisfy 0 <= min <= max"),
            });
        }
        Ok(Self {
            albedo,
            glow_min,
            glow_max,
        })
    }
}

impl Material for Glowing {
    fn bounce(&self, ray_in: &Ray, rec: &HitRecord, _rng: &mut dyn RngCore) -> ScatterResult {
        let cos = ray_in.direction.dot(rec.normal).abs().min(1.0);
        let glow = self.glow_min + (self.glow_max - self.glow_min) * cos;
        ScatterResult::terminate(ray_in.direction, self.albedo * glow)
    }

    fn is_emissive(&self) -> bool {
        true
    }
}

/// Instantiate a material from its description, validating parameters.
pub fn material_from_desc(desc: &MaterialDesc) -> RenderResult<Arc<dyn Material>> {
    let material: Arc<dyn Material> = match *desc {
        MaterialDesc::Diffuse { albedo } => Arc::new(Diffuse::new(Color::from_array(albedo))?),
        MaterialDesc::Shiny { albedo } => Arc::new(Shiny::new(Color::from_array(albedo))?),
        MaterialDesc::Metal { albedo, fuzz } => Arc::new(Metal::new(Color::from_array(albedo), fuzz)?),
        MaterialDesc::Glass { eta } => Arc::new(Glass::new(eta)?),
        MaterialDesc::Glowing {
            albedo,
            glow_min,
            glow_max,
        } => Arc::new(Glowing::new(Color::from_array(albedo), glow_min, glow_max)?),
    };
    Ok(material)
}

fn check_albedo(material: &'static str, albedo: Color) -> RenderResult<()> {
    if albedo.is_finite() && albedo.cmpge(Color::ZERO).all() && albedo.cmple(Color::ONE).all() {
        Ok(())
    } else {
        Err(RenderError::InvalidMaterial {
            material,
            reason: format!("albedo {albedo} must lie in [0, 1]"),
        })
    }
}

// =============================================================================
// Helper functions
// =============================================================================

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface with unit normal `n` facing it.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

/// Schlick's approximation of Fresnel reflectance.
#[inline]
pub fn reflectance(cosine: f32, ratio: f32) -> f32 {
    let r0 = ((1.0 - ratio) / (1.0 + ratio)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn front_hit(normal: Vec3) -> HitRecord {
        HitRecord::new(1.0, Vec3::ZERO, normal, true)
    }

    fn random_incoming(rng: &mut StdRng, normal: Vec3) -> Vec3 {
        // Any direction arriving from the normal's side
        let mut d = random_unit_vector(rng);
        if d.dot(normal) > 0.0 {
            d = -d;
        }
        safe_normalize(d - normal * 1e-4, -normal)
    }

    #[test]
    fn test_rejects_out_of_range_parameters() {
        assert!(Diffuse::new(Color::new(1.2, 0.0, 0.0)).is_err());
        assert!(Shiny::new(Color::new(-0.1, 0.0, 0.0)).is_err());
        assert!(Metal::new(Color::ONE, 1.5).is_err());
        assert!(Metal::new(Color::ONE, -0.1).is_err());
        assert!(Glass::new(0.0).is_err());
        assert!(Glass::new(f32::NAN).is_err());
        assert!(Glowing::new(Color::ONE, 2.0, 1.0).is_err());
        assert!(Glowing::new(Color::ONE, -1.0, 1.0).is_err());
        assert!(matches!(
            Metal::new(Color::ONE, 2.0),
            Err(RenderError::InvalidMaterial { material: "metal", .. })
        ));
    }

    #[test]
    fn test_diffuse_stays_in_hemisphere() {
        let mut rng = StdRng::seed_from_u64(10);
        let material = Diffuse::new(Color::splat(0.5)).unwrap();
        let rec = front_hit(Vec3::Z);

        for _ in 0..1000 {
            let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z);
            let result = material.bounce(&ray, &rec, &mut rng);

            assert!(result.continues);
            assert!(result.out_direction.dot(Vec3::Z) >= 0.0);
            assert!((result.out_direction.length() - 1.0).abs() < 1e-5);
            assert_eq!(result.attenuation, Color::splat(0.5));
        }
    }

    #[test]
    fn test_diffuse_uses_struck_side() {
        let mut rng = StdRng::seed_from_u64(11);
        let material = Diffuse::new(Color::ONE).unwrap();
        // Struck from inside: scattering must go inward
        let rec = HitRecord::new(1.0, Vec3::ZERO, Vec3::Z, false);
        let ray = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::Z);

        for _ in 0..200 {
            assert!(material.bounce(&ray, &rec, &mut rng).out_direction.z <= 0.0);
        }
    }

    #[test]
    fn test_shiny_reflects_exactly() {
        let mut rng = StdRng::seed_from_u64(12);
        let material = Shiny::new(Color::new(0.9, 0.7, 0.0)).unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, -1.0));

        let result = material.bounce(&ray, &front_hit(Vec3::Z), &mut rng);

        assert!(result.continues);
        assert!((result.out_direction - Vec3::new(1.0, 0.0, 1.0).normalize()).length() < 1e-6);
    }

    #[test]
    fn test_metal_never_crosses_surface() {
        let mut rng = StdRng::seed_from_u64(13);

        for fuzz in [0.0, 0.3, 0.7, 1.0] {
            let material = Metal::new(Color::splat(0.8), fuzz).unwrap();
            for _ in 0..2000 {
                let normal = random_unit_vector(&mut rng);
                let incoming = random_incoming(&mut rng, normal);
                let ray = Ray::new(Vec3::ZERO, incoming);

                let result = material.bounce(&ray, &front_hit(normal), &mut rng);

                assert!(result.continues);
                assert!(result.out_direction.is_finite());
                assert!(result.out_direction.dot(normal) >= 0.0, "fuzz {fuzz} crossed the surface");
            }
        }
    }

    #[test]
    fn test_zero_fuzz_metal_is_a_mirror() {
        let mut rng = StdRng::seed_from_u64(14);
        let metal = Metal::new(Color::ONE, 0.0).unwrap();
        let mirror = Shiny::new(Color::ONE).unwrap();
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.3, -0.2, -1.0));
        let rec = front_hit(Vec3::Z);

        let a = metal.bounce(&ray, &rec, &mut rng).out_direction;
        let b = mirror.bounce(&ray, &rec, &mut rng).out_direction;
        assert!((a - b).length() < 1e-5);
    }

    #[test]
    fn test_attenuation_never_amplifies() {
        let mut rng = StdRng::seed_from_u64(15);
        let materials: Vec<Arc<dyn Material>> = vec![
            Arc::new(Diffuse::new(Color::new(0.1, 0.5, 1.0)).unwrap()),
            Arc::new(Metal::new(Color::new(1.0, 0.2, 0.0), 0.5).unwrap()),
            Arc::new(Shiny::new(Color::ONE).unwrap()),
            Arc::new(Glass::new(1.5).unwrap()),
        ];

        for material in &materials {
            for _ in 0..500 {
                let normal = random_unit_vector(&mut rng);
                let ray = Ray::new(Vec3::ZERO, random_incoming(&mut rng, normal));
                let rec = HitRecord::new(1.0, Vec3::ZERO, normal, rng.gen());

                let a = material.bounce(&ray, &rec, &mut rng).attenuation;
                assert!(a.cmpge(Color::ZERO).all() && a.cmple(Color::ONE).all(), "{material:?} gave {a}");
            }
        }
    }

    #[test]
    fn test_glowing_is_terminal_and_bounded() {
        let mut rng = StdRng::seed_from_u64(16);
        let material = Glowing::new(Color::new(1.0, 0.7, 0.0), 0.5, 3.0).unwrap();

        for _ in 0..500 {
            let normal = random_unit_vector(&mut rng);
            let ray = Ray::new(Vec3::ZERO, random_incoming(&mut rng, normal));
            let result = material.bounce(&ray, &front_hit(normal), &mut rng);

            assert!(!result.continues);
            assert!(result.attenuation.max_element() <= 3.0 + 1e-5);
            assert!(result.attenuation.x >= 0.5 - 1e-5);
        }

        // Head-on is brightest
        let head_on = material.bounce(&Ray::new(Vec3::Z, -Vec3::Z), &front_hit(Vec3::Z), &mut rng);
        assert!((head_on.attenuation.x - 3.0).abs() < 1e-5);
        assert!(material.is_emissive());
    }

    #[test]
    fn test_glass_total_internal_reflection() {
        let mut rng = StdRng::seed_from_u64(17);
        let glass = Glass::new(1.5).unwrap();
        // Inside the glass (back face), 60 degrees from the normal:
        // 1.5 * sin(60) = 1.3 > 1, so refraction is impossible.
        let outward = Vec3::Z;
        let rec = HitRecord::new(1.0, Vec3::ZERO, outward, false);
        let incoming = Vec3::new(60f32.to_radians().sin(), 0.0, 60f32.to_radians().cos());
        let ray = Ray::new(Vec3::new(0.0, 0.0, -1.0), incoming);

        for _ in 0..500 {
            let result = glass.bounce(&ray, &rec, &mut rng);
            assert!(result.out_direction.is_finite());
            // Reflected back into the glass
            assert!(result.out_direction.z < 0.0);
            let expected = reflect(incoming, -outward);
            assert!((result.out_direction - expected).length() < 1e-5);
            assert_eq!(result.attenuation, Color::ONE);
        }
    }

    #[test]
    fn test_glass_head_on_mostly_refracts() {
        let mut rng = StdRng::seed_from_u64(18);
        let glass = Glass::new(1.5).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), -Vec3::Z);
        let rec = front_hit(Vec3::Z);

        let through = (0..1000)
            .filter(|_| glass.bounce(&ray, &rec, &mut rng).out_direction.z < 0.0)
            .count();
        // Normal incidence reflectance of 1.5 glass is 4%
        assert!(through > 900, "only {through} of 1000 refracted");
    }

    #[test]
    fn test_refract_bends_towards_normal() {
        let incoming = Vec3::new(1.0, 0.0, -1.0).normalize();
        let refracted = refract(incoming, Vec3::Z, 1.0 / 1.5);

        let sin_in = incoming.x;
        let sin_out = refracted.normalize().x;
        assert!((sin_out - sin_in / 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_reflectance_limits() {
        assert!((reflectance(1.0, 1.0 / 1.5) - 0.04).abs() < 1e-3);
        assert!((reflectance(0.0, 1.0 / 1.5) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_desc() {
        assert!(material_from_desc(&MaterialDesc::Glowing {
            albedo: [1.0; 3],
            glow_min: 0.0,
            glow_max: 1.0
        })
        .unwrap()
        .is_emissive());
        assert!(material_from_desc(&MaterialDesc::Metal { albedo: [0.5; 3], fuzz: 3.0 }).is_err());
    }
}
