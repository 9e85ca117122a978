//! Spatial distortion functions for unbounded scenes.

use burn::prelude::*;

/// Bounded remapping of unbounded scene coordinates.
///
/// The semantic field normalizes distorted positions from [-2, 2] into
/// [0, 1] before encoding, so implementations must keep their output within
/// that range.
pub trait SpatialDistortion<B: Backend>: Send + Sync {
    /// Map positions of shape [batch, 3] into the contracted space.
    fn apply(&self, positions: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Scene contraction mapping all of space into the radius-2 ball.
///
/// Points inside the unit ball are left untouched; a point at distance `d > 1`
/// is scaled onto radius `2 - 1/d`, so the whole scene lands in [-2, 2]^3
/// with the region near the origin kept metrically faithful.
#[derive(Debug, Clone, Copy, Default)]
pub struct SceneContraction;

impl<B: Backend> SpatialDistortion<B> for SceneContraction {
    fn apply(&self, positions: Tensor<B, 2>) -> Tensor<B, 2> {
        let norm = positions.clone().powf_scalar(2.0).sum_dim(1).sqrt();
        let safe = norm.clone().clamp_min(1e-6);

        // (2 − 1/d) / d, applied only where d > 1.
        let contracted = safe.clone().recip().mul_scalar(2.0) - safe.powf_scalar(2.0).recip();
        let factor = contracted.ones_like().mask_where(norm.greater_elem(1.0), contracted);

        positions * factor
    }
}
