//! Renders a field of random spheres and saves it as PPM.
//!
//! Usage: cargo run --release -p orrery_renderer --example sphere_field [output.ppm]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

use orrery_renderer::{
    Color, Diffuse, Glass, Glowing, Integrator, IntegratorConfig, Material, Metal, Object, PixelBuffer,
    RenderContext, RenderResult, Scene, Sphere, Vec3, Viewport, ViewportConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let filename = std::env::args().nth(1).unwrap_or_else(|| "sphere_field.ppm".to_string());

    let start = std::time::Instant::now();
    let scene = build_scene()?;
    println!("Scene built in {:?} ({} objects)", start.elapsed(), scene.len());

    let viewport = Viewport::new(
        ViewportConfig::new(800, 450)
            .with_position(Vec3::new(13.0, -3.0, 2.0), Vec3::ZERO)
            .with_fov(20.0)
            .with_aperture(0.1)
            .with_focus_distance(10.0),
    )?;
    let integrator = Integrator::new(IntegratorConfig::new(32, 10))?;
    let ctx = RenderContext::new(None, Some(7))?;

    println!("Rendering {}x{} @ 32 spp...", viewport.width(), viewport.height());
    let start = std::time::Instant::now();
    let pixels = integrator.render(&scene, &viewport, &ctx)?;
    println!("Rendered in {:?}", start.elapsed());

    save_ppm(&pixels, &filename)?;
    println!("Saved to {}", filename);
    Ok(())
}

fn build_scene() -> RenderResult<Scene> {
    let mut rng = StdRng::seed_from_u64(3);
    let mut objects = vec![
        object("ground", Vec3::new(0.0, 0.0, -1000.0), 1000.0, Arc::new(Diffuse::new(Color::splat(0.5))?))?,
        object("glass", Vec3::new(0.0, 0.0, 1.0), 1.0, Arc::new(Glass::new(1.5)?))?,
        object("lamp", Vec3::new(-4.0, 0.0, 1.0), 1.0, Arc::new(Glowing::new(Color::new(1.0, 0.7, 0.3), 1.0, 3.0)?))?,
        object("mirror", Vec3::new(4.0, 0.0, 1.0), 1.0, Arc::new(Metal::new(Color::new(0.7, 0.6, 0.5), 0.0)?))?,
    ];

    for a in -5..5 {
        for b in -5..5 {
            let center = Vec3::new(a as f32 + 0.9 * rng.gen::<f32>(), b as f32 + 0.9 * rng.gen::<f32>(), 0.2);
            if (center - Vec3::new(4.0, 0.0, 0.2)).length() <= 0.9 {
                continue;
            }

            let choose: f32 = rng.gen();
            let material: Arc<dyn Material> = if choose < 0.8 {
                let albedo = Color::new(
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                    rng.gen::<f32>() * rng.gen::<f32>(),
                );
                Arc::new(Diffuse::new(albedo)?)
            } else if choose < 0.95 {
                let albedo = Color::new(
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                    0.5 + 0.5 * rng.gen::<f32>(),
                );
                Arc::new(Metal::new(albedo, 0.5 * rng.gen::<f32>())?)
            } else {
                Arc::new(Glass::new(1.5)?)
            };
            objects.push(object(format!("small_{a}_{b}"), center, 0.2, material)?);
        }
    }

    Scene::build(objects, 2)
}

fn object(name: impl Into<String>, center: Vec3, radius: f32, material: Arc<dyn Material>) -> RenderResult<Object> {
    Ok(Object::new(name, Sphere::new(center, radius)?, material))
}

fn save_ppm(pixels: &PixelBuffer, filename: &str) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(filename)?);

    writeln!(writer, "P6")?;
    writeln!(writer, "{} {}", pixels.width(), pixels.height())?;
    writeln!(writer, "255")?;
    writer.write_all(pixels.as_bytes())?;
    writer.flush()
}
