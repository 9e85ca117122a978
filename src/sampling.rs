//! Narrow interface to the external ray sampler.
//!
//! Ray generation, frustum geometry, and densities live in the surrounding
//! NeRF pipeline; the semantic field only needs sample positions and the
//! batch shape they came in.

use burn::prelude::*;

/// Conical frustum batch reduced to the data the field consumes.
#[derive(Debug, Clone)]
pub struct Frustums<B: Backend> {
    /// Sample positions: [rays, samples_per_ray, 3].
    positions: Tensor<B, 3>,
}

impl<B: Backend> Frustums<B> {
    /// Create frustums from sample positions of shape [rays, samples_per_ray, 3].
    pub fn new(positions: Tensor<B, 3>) -> Self {
        Self { positions }
    }

    /// Sample positions in world space: [rays, samples_per_ray, 3].
    pub fn get_positions(&self) -> Tensor<B, 3> {
        self.positions.clone()
    }

    /// Leading batch shape as [rays, samples_per_ray].
    pub fn shape(&self) -> [usize; 2] {
        let [rays, samples, _] = self.positions.dims();
        [rays, samples]
    }
}

/// A batch of samples along camera rays.
#[derive(Debug, Clone)]
pub struct RaySamples<B: Backend> {
    /// Frustum data for each sample.
    pub frustums: Frustums<B>,
}

impl<B: Backend> RaySamples<B> {
    /// Create ray samples from frustums.
    pub fn new(frustums: Frustums<B>) -> Self {
        Self { frustums }
    }

    /// Create ray samples directly from positions of shape
    /// [rays, samples_per_ray, 3].
    pub fn from_positions(positions: Tensor<B, 3>) -> Self {
        Self {
            frustums: Frustums::new(positions),
        }
    }
}
