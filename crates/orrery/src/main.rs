//! Orrery launcher.
//!
//! Loads a scene (preset name or JSON file) and optional render settings,
//! renders it, and writes a PNG. While the render runs a watcher thread
//! mirrors the progressive frame to `<output>.preview.png`.
//!
//! ```text
//! orrery [SCENE] [OUTPUT] [--settings FILE] [--samples N] [--seed N] [--threads N] [--no-preview] [--list]
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use orrery_core::{preset, RenderSettings, SceneDescription, PRESET_NAMES};
use orrery_renderer::{
    FrameHandle, Integrator, IntegratorConfig, PixelBuffer, RenderContext, RenderControl, Scene, Viewport,
    ViewportConfig,
};

/// Preview watcher poll rate
const PREVIEW_POLL: Duration = Duration::from_millis(16);
/// Minimum time between preview writes
const PREVIEW_INTERVAL: Duration = Duration::from_secs(1);

/// Render a sphere scene with the Orrery path tracer
#[derive(Parser, Debug)]
#[command(name = "orrery", version, about)]
struct Args {
    /// Preset name or path to a scene `.json` file
    #[arg(default_value = "planets")]
    scene: String,

    /// Where to write the finished PNG
    #[arg(default_value = "orrery.png")]
    output: PathBuf,

    /// Render settings JSON file
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Samples per pixel, overrides the settings file
    #[arg(long)]
    samples: Option<u32>,

    /// Random seed for a reproducible render
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Don't write progressive preview frames
    #[arg(long)]
    no_preview: bool,

    /// List the built-in presets and exit
    #[arg(long)]
    list: bool,
}

fn load_scene(scene: &str) -> Result<SceneDescription> {
    if scene.ends_with(".json") {
        SceneDescription::from_path(scene).with_context(|| format!("Failed to load scene {scene}"))
    } else {
        Ok(preset(scene)?)
    }
}

fn load_settings(args: &Args) -> Result<RenderSettings> {
    let mut settings = match &args.settings {
        Some(path) => RenderSettings::from_path(path)
            .with_context(|| format!("Failed to load settings {}", path.display()))?,
        None => RenderSettings::default(),
    };
    if let Some(samples) = args.samples {
        settings.samples = samples;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    if args.threads.is_some() {
        settings.threads = args.threads;
    }
    Ok(settings)
}

fn save_png(pixels: &PixelBuffer, path: &Path) -> Result<()> {
    let image = image::RgbImage::from_raw(pixels.width(), pixels.height(), pixels.as_bytes().to_vec())
        .context("Pixel buffer does not match its dimensions")?;
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Mirror new frames to disk until `done` is set.
fn spawn_preview(frame: FrameHandle, path: PathBuf, done: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut seen = 0;
        let mut last_write: Option<Instant> = None;

        while !done.load(Ordering::Relaxed) {
            let generation = frame.generation();
            let due = last_write.map_or(true, |t| t.elapsed() >= PREVIEW_INTERVAL);
            if generation != seen && due {
                seen = generation;
                last_write = Some(Instant::now());
                if let Err(err) = save_png(&frame.snapshot(), &path) {
                    log::warn!("Preview write failed: {err:#}");
                } else {
                    log::debug!("Preview frame {} written", generation);
                }
            }
            thread::sleep(PREVIEW_POLL);
        }
    })
}

fn preview_path(output: &Path) -> PathBuf {
    let stem = output.file_stem().map_or_else(|| "orrery".into(), |s| s.to_string_lossy());
    output.with_file_name(format!("{stem}.preview.png"))
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    if args.list {
        for name in PRESET_NAMES {
            println!("{name}");
        }
        return Ok(());
    }

    let description = load_scene(&args.scene)?;
    let settings = load_settings(&args)?;

    let ctx = RenderContext::from_settings(&settings)?;
    let scene = Scene::from_description(&description, settings.bvh_leaf_size)?;
    let viewport = Viewport::new(ViewportConfig::from_settings(&settings))?;
    let integrator = Integrator::new(IntegratorConfig::from_settings(&settings))?;

    log::info!(
        "Scene '{}' ({} objects), seed {}",
        description.name,
        scene.len(),
        ctx.seed()
    );

    let frame = FrameHandle::new(viewport.width(), viewport.height());
    let done = Arc::new(AtomicBool::new(false));
    let preview = (!args.no_preview).then(|| spawn_preview(frame.clone(), preview_path(&args.output), done.clone()));

    let control = RenderControl::new().with_frame(frame);
    let result = integrator.render_with_control(&scene, &viewport, &ctx, &control);

    done.store(true, Ordering::Relaxed);
    if let Some(handle) = preview {
        if handle.join().is_err() {
            log::warn!("Preview thread panicked");
        }
    }

    let (pixels, stats) = result?;
    save_png(&pixels, &args.output)?;

    log::info!(
        "Saved {} ({} samples, {:.2?}, {} rays)",
        args.output.display(),
        stats.samples,
        stats.elapsed,
        stats.rays_traced
    );
    Ok(())
}
