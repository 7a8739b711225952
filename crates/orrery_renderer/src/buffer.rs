//! Pixel storage: linear accumulators, 8-bit output and the shared frame
//! a preview reads while the render runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::material::Color;

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a linear color to gamma-corrected 8-bit RGB. Channels are
/// clamped to the display range; NaN maps to 0.
pub fn color_to_rgb8(color: Color) -> [u8; 3] {
    let channel = |c: f32| (255.0 * linear_to_gamma(c).clamp(0.0, 1.0)) as u8;
    [channel(color.x), channel(color.y), channel(color.z)]
}

/// Linear-light image, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.index(x, y)]
    }

    /// Multiply every pixel by `factor`.
    pub fn scaled(&self, factor: f32) -> ImageBuffer {
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&c| c * factor).collect(),
        }
    }

    /// Gamma-correct and quantize.
    pub fn to_pixels(&self) -> PixelBuffer {
        PixelBuffer {
            width: self.width,
            height: self.height,
            data: self.pixels.iter().map(|&c| color_to_rgb8(c)).collect(),
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Final 8-bit RGB image, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<[u8; 3]>,
}

impl PixelBuffer {
    /// Black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![[0; 3]; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> [u8; 3] {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.data
    }

    /// Tightly packed `RGBRGB...` bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

/// Shared handle to the latest published frame.
///
/// The renderer is the only writer; any number of readers take copies with
/// [`FrameHandle::snapshot`] on their own schedule. A reader may see a frame
/// that is one or more samples old, but never a partially written one. The
/// generation counter increments with every publish so readers can skip
/// frames they already have.
#[derive(Debug, Clone)]
pub struct FrameHandle {
    inner: Arc<FrameInner>,
}

#[derive(Debug)]
struct FrameInner {
    width: u32,
    height: u32,
    pixels: RwLock<Vec<[u8; 3]>>,
    generation: AtomicU64,
}

impl FrameHandle {
    /// Black frame of fixed size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(FrameInner {
                width,
                height,
                pixels: RwLock::new(vec![[0; 3]; width as usize * height as usize]),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.inner.width, self.inner.height)
    }

    /// Number of frames published so far.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Replace the frame contents. Returns the new generation.
    ///
    /// # Panics
    /// If `frame` does not match the handle's dimensions.
    pub fn publish(&self, frame: &PixelBuffer) -> u64 {
        assert_eq!(
            (frame.width, frame.height),
            self.dimensions(),
            "published frame does not match the frame handle"
        );
        {
            let mut pixels = self.inner.pixels.write().unwrap_or_else(PoisonError::into_inner);
            pixels.copy_from_slice(&frame.data);
        }
        self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Copy of the latest frame.
    pub fn snapshot(&self) -> PixelBuffer {
        let pixels = self.inner.pixels.read().unwrap_or_else(PoisonError::into_inner);
        PixelBuffer {
            width: self.inner.width,
            height: self.inner.height,
            data: pixels.clone(),
        }
    }
}
