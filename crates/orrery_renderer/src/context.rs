//! Render context: the explicit compute backend.
//!
//! Holds the worker pool every batch operation runs on and the base seed all
//! random streams derive from. Scene traversal, ray generation and the
//! integrator take a `&RenderContext` instead of reaching for global state.

use std::sync::Arc;

use orrery_core::RenderSettings;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::RenderResult;

/// Rays per work item. Each chunk owns one random stream, so results are
/// identical for a given seed regardless of how many threads run.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Which stage of a sample a random stream feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Primary ray jitter (pixel footprint and lens).
    Camera,
    /// Material sampling at the given bounce depth.
    Bounce(u32),
}

impl Phase {
    fn code(self) -> u64 {
        match self {
            Phase::Camera => 0,
            Phase::Bounce(depth) => depth as u64 + 1,
        }
    }
}

#[derive(Clone)]
pub struct RenderContext {
    pool: Arc<ThreadPool>,
    seed: u64,
    chunk_size: usize,
}

impl RenderContext {
    /// Build a context with `threads` workers (`None` = one per core) and a
    /// base `seed` (`None` = drawn from entropy).
    pub fn new(threads: Option<usize>, seed: Option<u64>) -> RenderResult<Self> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("orrery-worker-{i}"));
        if let Some(threads) = threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;
        let seed = seed.unwrap_or_else(rand::random);

        log::info!(
            "Render context: {} worker threads, seed {}",
            pool.current_num_threads(),
            seed
        );

        Ok(Self {
            pool: Arc::new(pool),
            seed,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    pub fn from_settings(settings: &RenderSettings) -> RenderResult<Self> {
        Self::new(settings.threads, settings.seed)
    }

    /// Override the number of rays per work item.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside this context's worker pool.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Independent random stream for one chunk of one phase of one sample.
    pub fn rng(&self, sample: u32, phase: Phase, chunk: usize) -> StdRng {
        let mut key = splitmix64(self.seed);
        key = splitmix64(key ^ sample as u64);
        key = splitmix64(key ^ phase.code());
        key = splitmix64(key ^ chunk as u64);
        StdRng::seed_from_u64(key)
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("threads", &self.num_threads())
            .field("seed", &self.seed)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

/// SplitMix64 finalizer, used to decorrelate stream keys.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
