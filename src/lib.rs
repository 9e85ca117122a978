//! # semfield
//!
//! Open-vocabulary semantic feature fields for NeRF scenes, built on Burn.
//!
//! This crate provides the semantic side of a NeRF pipeline: a field that
//! maps 3D sample positions to learned semantic embeddings, and a feature
//! cache that precomputes the 2D image features used to supervise it.
//!
//! ## Features
//!
//! - **Hash-grid encoding**: `HashGridEncoder<B>` covers a resolution band
//!   with geometrically growing hashed feature grids
//! - **Semantic field**: `SemanticField<B>` fuses multiple encoders through
//!   a compact projection network into a 768-d embedding per sample
//! - **Feature cache**: `FeatureCache<B>` extracts per-image features once,
//!   persists them, and serves point queries in original image coordinates
//! - **Scene contraction**: bounded remapping of unbounded scenes ahead of
//!   encoding
//!
//! ## Quick Start
//!
//! ```ignore
//! use semfield::{
//!     config::{FeatureCacheConfig, SemanticFieldConfig},
//!     data::FeatureCache,
//!     field::SemanticField,
//!     sampling::RaySamples,
//! };
//! use burn::backend::NdArray;
//!
//! let device = Default::default();
//!
//! // Cache supervision features for the training images.
//! let cache = FeatureCache::<NdArray>::new(
//!     FeatureCacheConfig::new((480, 640)),
//!     &device,
//!     &image_paths,
//!     Some(cache_dir),
//!     || load_extractor(&device),
//! )?;
//!
//! // Build the field and evaluate it at sampled ray positions.
//! let field = SemanticField::<NdArray>::new(&SemanticFieldConfig::new(), &device)?;
//! let outputs = field.get_outputs(&ray_samples)?;
//! ```
//!
//! The training loop, ray sampling, and the extraction model itself live
//! outside this crate; see [`sampling`] and [`data::FeatureExtractor`] for
//! the interfaces they plug into.
//!
//! ## Feature Flags
//!
//! - `std` (default): Standard library support
//! - `ndarray` (default): CPU backend via ndarray
//! - `wgpu`: GPU acceleration via WebGPU

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod data;
pub mod error;
pub mod field;
pub mod nn;
pub mod sampling;
pub mod spatial;

// Re-export key types for convenience
pub use config::{FeatureCacheConfig, HashGridConfig, SemanticFieldConfig};
pub use data::{FeatureCache, FeatureExtractor, ImagePoint};
pub use error::{Result, SemanticFieldError};
pub use field::{FieldHead, SemanticField, SemanticFieldOutputs};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{FeatureCacheConfig, HashGridConfig, SemanticFieldConfig};
    pub use crate::data::{
        cache_exists, resolve_model_path, FeatureCache, FeatureExtractor, ImagePoint,
    };
    pub use crate::error::{Result, SemanticFieldError};
    pub use crate::field::{FieldHead, SemanticField, SemanticFieldOutputs};
    pub use crate::nn::{HashGridEncoder, ProjectionNetwork, ProjectionNetworkConfig};
    pub use crate::sampling::{Frustums, RaySamples};
    pub use crate::spatial::{SceneContraction, SpatialDistortion};
}
