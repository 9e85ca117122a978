//! Feature cache configuration.

use burn::config::Config;

use crate::error::SemanticFieldError;

/// Configuration for the per-image feature cache.
///
/// `image_shape` is the original (height, width) of the source images; the
/// cache itself stores features at `image_shape / downsample`.
#[derive(Config, Debug)]
pub struct FeatureCacheConfig {
    /// Original image resolution as (height, width).
    pub image_shape: (usize, usize),

    /// Integer factor between original images and the cached feature maps.
    #[config(default = 4)]
    pub downsample: usize,

    /// Feature vector width produced by the extractor.
    #[config(default = 768)]
    pub feature_dim: usize,
}

impl FeatureCacheConfig {
    /// Resolution of the cached feature maps as (rows, cols).
    pub fn cache_resolution(&self) -> (usize, usize) {
        (
            self.image_shape.0 / self.downsample,
            self.image_shape.1 / self.downsample,
        )
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        let (height, width) = self.image_shape;
        if height == 0 || width == 0 {
            return Err(SemanticFieldError::InvalidConfig {
                message: format!("image_shape ({height}, {width}) must be positive"),
            });
        }
        if self.downsample == 0 || self.downsample > height.min(width) {
            return Err(SemanticFieldError::InvalidConfig {
                message: format!(
                    "downsample {} incompatible with image_shape ({height}, {width})",
                    self.downsample
                ),
            });
        }
        if self.feature_dim == 0 {
            return Err(SemanticFieldError::InvalidConfig {
                message: "feature_dim must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_resolution() {
        let config = FeatureCacheConfig::new((480, 640));
        assert_eq!(config.cache_resolution(), (120, 160));
    }

    #[test]
    fn test_custom_downsample() {
        let config = FeatureCacheConfig::new((480, 640)).with_downsample(2);
        assert_eq!(config.cache_resolution(), (240, 320));
    }

    #[test]
    fn test_validation() {
        assert!(FeatureCacheConfig::new((480, 640)).validate().is_ok());
        assert!(FeatureCacheConfig::new((0, 640)).validate().is_err());
        assert!(FeatureCacheConfig::new((480, 640))
            .with_downsample(0)
            .validate()
            .is_err());
        assert!(FeatureCacheConfig::new((2, 2))
            .with_downsample(4)
            .validate()
            .is_err());
        assert!(FeatureCacheConfig::new((480, 640))
            .with_feature_dim(0)
            .validate()
            .is_err());
    }
}
