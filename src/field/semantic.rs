//! Semantic field implementation.

use std::fmt;

use burn::prelude::*;
use burn::tensor::ElementConversion;

use crate::config::SemanticFieldConfig;
use crate::error::{Result, SemanticFieldError};
use crate::nn::{HashGridEncoder, ProjectionNetwork, ProjectionNetworkConfig};
use crate::sampling::RaySamples;
use crate::spatial::{SceneContraction, SpatialDistortion};

use super::{FieldHead, SemanticFieldOutputs};

/// Field mapping 3D sample positions to open-vocabulary semantic embeddings.
///
/// A set of multi-resolution hash-grid encoders covers the configured
/// resolution bands; their concatenated outputs feed a compact projection
/// network producing the embedding. Supervision comes from a
/// [`FeatureCache`](crate::data::FeatureCache), composed by the external
/// training loop.
///
/// Note: this struct intentionally doesn't derive Module because it holds
/// the spatial distortion as a trait object alongside the tensor modules.
/// The encoders and heads carry all trainable parameters.
pub struct SemanticField<B: Backend> {
    /// Hash-grid encoders, one per resolution band, in configuration order.
    encoders: Vec<HashGridEncoder<B>>,
    /// Primary projection head (768-d embedding).
    openseg_head: ProjectionNetwork<B>,
    /// Optional second projection head (1152-d embedding).
    clip_head: Option<ProjectionNetwork<B>>,
    /// Contraction applied to raw sample positions.
    spatial_distortion: Box<dyn SpatialDistortion<B>>,
    /// Check the distortion range contract on every forward pass.
    validate_contraction: bool,
}

impl<B: Backend> SemanticField<B> {
    /// Create a new semantic field from configuration.
    ///
    /// Fails fast if the parallel grid lists have unequal lengths or any
    /// resolution band is degenerate. The spatial distortion defaults to
    /// [`SceneContraction`]; see [`with_distortion`](Self::with_distortion).
    pub fn new(config: &SemanticFieldConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;

        let encoders: Vec<HashGridEncoder<B>> = config
            .band_configs()
            .iter()
            .map(|band| HashGridEncoder::new(band, device))
            .collect();

        let total_encoding_dim: usize = encoders.iter().map(|e| e.output_dim()).sum();

        let openseg_head = ProjectionNetworkConfig::new(total_encoding_dim, config.embedding_dim)
            .with_hidden_dim(config.hidden_dim)
            .with_hidden_layers(config.num_hidden_layers)
            .init(device);

        let clip_head = config.second_head_enabled.then(|| {
            ProjectionNetworkConfig::new(total_encoding_dim, config.clip_embedding_dim)
                .with_hidden_dim(config.hidden_dim)
                .with_hidden_layers(config.num_hidden_layers)
                .init(device)
        });

        Ok(Self {
            encoders,
            openseg_head,
            clip_head,
            spatial_distortion: Box::new(SceneContraction),
            validate_contraction: config.validate_contraction,
        })
    }

    /// Replace the default scene contraction.
    pub fn with_distortion(mut self, distortion: Box<dyn SpatialDistortion<B>>) -> Self {
        self.spatial_distortion = distortion;
        self
    }

    /// Number of hash-grid encoders.
    pub fn num_encoders(&self) -> usize {
        self.encoders.len()
    }

    /// Width of the concatenated encoder output.
    pub fn total_encoding_dim(&self) -> usize {
        self.encoders.iter().map(|e| e.output_dim()).sum()
    }

    /// Input width of the projection heads.
    pub fn projection_input_dim(&self) -> usize {
        self.openseg_head.input_dim()
    }

    /// Output width of the primary embedding.
    pub fn embedding_dim(&self) -> usize {
        self.openseg_head.output_dim()
    }

    /// Evaluate the field at a batch of ray samples.
    ///
    /// Positions are detached (query coordinates, not differentiable scene
    /// geometry), contracted, normalized from [-2, 2] into [0, 1], encoded
    /// by every resolution band, and projected to embeddings. The returned
    /// map holds one tensor of shape [rays, samples_per_ray, dim] per
    /// computed channel.
    pub fn get_outputs(&self, ray_samples: &RaySamples<B>) -> Result<SemanticFieldOutputs<B>> {
        let [rays, samples_per_ray] = ray_samples.frustums.shape();

        let positions = ray_samples.frustums.get_positions().detach();
        let flat = positions.reshape([rays * samples_per_ray, 3]);
        let distorted = self.spatial_distortion.apply(flat);

        if self.validate_contraction {
            self.check_contraction_range(&distorted)?;
        }

        // [-2, 2] -> [0, 1] for the hash grids.
        let normalized = distorted.add_scalar(2.0).div_scalar(4.0);

        let encoded: Vec<Tensor<B, 2>> = self
            .encoders
            .iter()
            .map(|encoder| encoder.forward(normalized.clone()))
            .collect();
        let features = Tensor::cat(encoded, 1);

        let mut outputs = SemanticFieldOutputs::new();

        let openseg = self.openseg_head.forward(features.clone());
        outputs.insert(
            FieldHead::OpenSeg,
            openseg.reshape([rays, samples_per_ray, self.openseg_head.output_dim()]),
        );

        if let Some(clip_head) = &self.clip_head {
            let clip = clip_head.forward(features);
            outputs.insert(
                FieldHead::Clip,
                clip.reshape([rays, samples_per_ray, clip_head.output_dim()]),
            );
        }

        Ok(outputs)
    }

    fn check_contraction_range(&self, distorted: &Tensor<B, 2>) -> Result<()> {
        let min: f32 = distorted.clone().min().into_scalar().elem();
        let max: f32 = distorted.clone().max().into_scalar().elem();
        if min < -2.0 || max > 2.0 {
            return Err(SemanticFieldError::DistortionOutOfRange { min, max });
        }
        Ok(())
    }
}

impl<B: Backend> fmt::Debug for SemanticField<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticField")
            .field("num_encoders", &self.num_encoders())
            .field("total_encoding_dim", &self.total_encoding_dim())
            .field("embedding_dim", &self.embedding_dim())
            .field("second_head", &self.clip_head.is_some())
            .finish()
    }
}
