//! Interface to the external image-segmentation feature extractor.
//!
//! The extractor model itself (and image decoding) is a collaborator
//! outside this crate; the cache only needs a way to turn one image into a
//! feature map at a requested resolution.

use std::path::{Path, PathBuf};

use burn::prelude::*;

use crate::error::Result;

/// Location of the pretrained extraction model, relative to the working
/// directory.
pub const DEFAULT_MODEL_DIR: &str = "models/openseg_exported_clip";

/// Resolve a model artifact location to an absolute path.
pub fn resolve_model_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

/// Per-image semantic feature extraction.
///
/// Implementations typically hold a large pretrained model; the cache
/// acquires one only on a cache miss and drops it as soon as all images
/// are processed.
pub trait FeatureExtractor<B: Backend> {
    /// Extract a feature map for one image.
    ///
    /// `target_size` is the requested (rows, cols) resolution. The result
    /// must have shape [feature_dim, rows, cols].
    fn extract(&self, image_path: &Path, target_size: (usize, usize)) -> Result<Tensor<B, 3>>;

    /// Feature vector width this extractor produces.
    fn feature_dim(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_path_absolute() {
        let resolved = resolve_model_path(DEFAULT_MODEL_DIR).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("models/openseg_exported_clip"));
    }
}
