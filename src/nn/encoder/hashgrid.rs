//! Multi-resolution hash-grid encoder.

use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::Distribution;

use crate::config::HashGridConfig;

// Per-axis multipliers for the corner hash. The x axis is left unscaled.
const HASH_PRIME_Y: i64 = 2_654_435_761;
const HASH_PRIME_Z: i64 = 805_459_861;

/// Multi-resolution hash-grid encoder for 3D positions.
///
/// Each level owns a hash table of learnable feature vectors. A query
/// position is scaled to the level's grid resolution, the eight surrounding
/// corners are hashed into the level's table, and the corner features are
/// trilinearly interpolated. Outputs of all levels are concatenated, so the
/// encoding captures both coarse and fine spatial variation without dense
/// grid memory costs.
///
/// Positions are expected in [0, 1]^3.
#[derive(Module, Debug)]
pub struct HashGridEncoder<B: Backend> {
    /// Feature tables for all levels, stacked: [levels * table_size, features].
    tables: Param<Tensor<B, 2>>,
    /// Grid resolution per level, geometric from start to end resolution.
    #[module(skip)]
    resolutions: Vec<usize>,
    /// Entries per level table.
    #[module(skip)]
    table_size: usize,
    /// Feature width per table entry.
    #[module(skip)]
    features_per_level: usize,
}

impl<B: Backend> HashGridEncoder<B> {
    /// Create a new encoder from configuration.
    pub fn new(config: &HashGridConfig, device: &B::Device) -> Self {
        let table_size = config.table_size();
        let tables = Tensor::random(
            [config.levels * table_size, config.features_per_level],
            Distribution::Uniform(-1e-4, 1e-4),
            device,
        );
        let resolutions = (0..config.levels)
            .map(|level| config.level_resolution(level))
            .collect();

        Self {
            tables: Param::from_tensor(tables),
            resolutions,
            table_size,
            features_per_level: config.features_per_level,
        }
    }

    /// Encode 3D positions.
    ///
    /// Input: positions of shape [batch, 3] in [0, 1]
    /// Output: features of shape [batch, levels * features_per_level]
    pub fn forward(&self, positions: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = positions.dims();
        let device = positions.device();
        let tables = self.tables.val();

        let mut level_outputs = Vec::with_capacity(self.resolutions.len());

        for (level, &resolution) in self.resolutions.iter().enumerate() {
            let scaled = positions.clone().mul_scalar(resolution as f32);
            let floor = scaled.clone().floor();
            let frac = scaled - floor.clone();
            let base = floor.int();

            // Per-axis integer corners and interpolation fractions.
            let x0 = base.clone().slice([0..batch, 0..1]);
            let y0 = base.clone().slice([0..batch, 1..2]);
            let z0 = base.slice([0..batch, 2..3]);
            let fx = frac.clone().slice([0..batch, 0..1]);
            let fy = frac.clone().slice([0..batch, 1..2]);
            let fz = frac.slice([0..batch, 2..3]);

            let level_offset = (level * self.table_size) as i64;
            let mask = (self.table_size - 1) as i64;

            let mut interpolated =
                Tensor::zeros([batch, self.features_per_level], &device);

            for corner in 0..8usize {
                let dx = corner & 1;
                let dy = (corner >> 1) & 1;
                let dz = (corner >> 2) & 1;

                let cx = x0.clone().add_scalar(dx as i64);
                let cy = y0.clone().add_scalar(dy as i64);
                let cz = z0.clone().add_scalar(dz as i64);

                // Prime-multiplied xor hash, masked to the table extent.
                let index = cx
                    .bitwise_xor(cy.mul_scalar(HASH_PRIME_Y))
                    .bitwise_xor(cz.mul_scalar(HASH_PRIME_Z))
                    .bitwise_and_scalar(mask.elem())
                    .add_scalar(level_offset)
                    .reshape([batch]);

                let wx = if dx == 1 { fx.clone() } else { fx.ones_like() - fx.clone() };
                let wy = if dy == 1 { fy.clone() } else { fy.ones_like() - fy.clone() };
                let wz = if dz == 1 { fz.clone() } else { fz.ones_like() - fz.clone() };
                let weight = wx * wy * wz;

                let features = tables.clone().select(0, index);
                interpolated = interpolated + features * weight;
            }

            level_outputs.push(interpolated);
        }

        Tensor::cat(level_outputs, 1)
    }

    /// Get the output dimension.
    pub fn output_dim(&self) -> usize {
        self.resolutions.len() * self.features_per_level
    }

    /// Get the number of resolution levels.
    pub fn num_levels(&self) -> usize {
        self.resolutions.len()
    }
}
