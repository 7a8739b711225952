//! Ray batches.
//!
//! A batch stores N rays as two parallel arrays (origins and unit
//! directions). Batches are never mutated after construction; selecting or
//! slicing produces a new batch or a borrowed view.

use orrery_math::{safe_normalize, Ray, Vec3};
use rayon::prelude::*;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RayBatch {
    origins: Vec<Vec3>,
    directions: Vec<Vec3>,
}

impl RayBatch {
    /// Build a batch, normalizing every direction.
    ///
    /// # Panics
    /// If the two arrays differ in length.
    pub fn new(origins: Vec<Vec3>, mut directions: Vec<Vec3>) -> Self {
        assert_eq!(origins.len(), directions.len(), "ray batch arrays must match in length");
        for d in &mut directions {
            *d = safe_normalize(*d, Vec3::Z);
        }
        Self { origins, directions }
    }

    /// Build a batch from rays whose directions are already unit length.
    pub fn from_rays(rays: impl IntoIterator<Item = Ray>) -> Self {
        let (origins, directions) = rays.into_iter().map(|r| (r.origin, r.direction)).unzip();
        Self { origins, directions }
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Ray {
        Ray::from_unit(self.origins[i], self.directions[i])
    }

    pub fn origins(&self) -> &[Vec3] {
        &self.origins
    }

    pub fn directions(&self) -> &[Vec3] {
        &self.directions
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Ray> + '_ {
        self.origins
            .iter()
            .zip(&self.directions)
            .map(|(&o, &d)| Ray::from_unit(o, d))
    }

    /// New batch holding the rays at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> RayBatch {
        Self {
            origins: indices.iter().map(|&i| self.origins[i]).collect(),
            directions: indices.iter().map(|&i| self.directions[i]).collect(),
        }
    }

    pub fn view(&self) -> RayView<'_> {
        RayView {
            origins: &self.origins,
            directions: &self.directions,
        }
    }

    /// Parallel iterator over fixed-size views, paired with their chunk index.
    pub fn par_chunks(&self, chunk_size: usize) -> impl IndexedParallelIterator<Item = (usize, RayView<'_>)> {
        self.origins
            .par_chunks(chunk_size)
            .zip(self.directions.par_chunks(chunk_size))
            .enumerate()
            .map(|(c, (origins, directions))| (c, RayView { origins, directions }))
    }
}

/// A borrowed, read-only window onto part of a [`RayBatch`].
#[derive(Debug, Clone, Copy)]
pub struct RayView<'a> {
    origins: &'a [Vec3],
    directions: &'a [Vec3],
}

impl<'a> RayView<'a> {
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Ray {
        Ray::from_unit(self.origins[i], self.directions[i])
    }

    pub fn origins(&self) -> &'a [Vec3] {
        self.origins
    }

    pub fn directions(&self) -> &'a [Vec3] {
        self.directions
    }
}
