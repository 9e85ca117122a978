//! Semantic field configuration.

use burn::config::Config;

use crate::error::SemanticFieldError;

use super::HashGridConfig;

/// Configuration for the semantic field.
///
/// The three `grid_*` lists are parallel: entry `i` of each describes one
/// resolution band of the hash encoding. The defaults cover a coarse band
/// (16..128) and a fine band (128..512) with 12 levels each.
#[derive(Config, Debug)]
pub struct SemanticFieldConfig {
    /// Level counts, one per resolution band.
    #[config(default = "vec![12, 12]")]
    pub grid_layers: Vec<usize>,

    /// Hash table size budgets (log2), one per resolution band.
    #[config(default = "vec![19, 19]")]
    pub grid_sizes: Vec<usize>,

    /// (start, end) resolution pairs, one per resolution band.
    #[config(default = "vec![(16, 128), (128, 512)]")]
    pub grid_resolutions: Vec<(usize, usize)>,

    /// Number of hidden layers in the projection network.
    #[config(default = 1)]
    pub num_hidden_layers: usize,

    /// Width of the projection network's hidden layers.
    #[config(default = 256)]
    pub hidden_dim: usize,

    /// Output width of the primary semantic head.
    #[config(default = 768)]
    pub embedding_dim: usize,

    /// Output width of the optional second head.
    #[config(default = 1152)]
    pub clip_embedding_dim: usize,

    /// Build and evaluate the second projection head.
    ///
    /// Placeholder for a differently-supervised embedding head; off by
    /// default. When disabled the output map carries only the primary
    /// channel instead of aliasing it under a second name.
    #[config(default = false)]
    pub second_head_enabled: bool,

    /// Check that distorted positions stay within [-2, 2] before
    /// normalization. Costs a device sync per forward pass.
    #[config(default = true)]
    pub validate_contraction: bool,
}

impl SemanticFieldConfig {
    /// One `HashGridConfig` per configured resolution band.
    ///
    /// Call `validate()` first; this assumes the parallel lists line up.
    pub fn band_configs(&self) -> Vec<HashGridConfig> {
        self.grid_layers
            .iter()
            .zip(&self.grid_sizes)
            .zip(&self.grid_resolutions)
            .map(|((&levels, &hash_size), &(start, end))| {
                HashGridConfig::new(start, end, levels).with_hash_size(hash_size)
            })
            .collect()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.grid_layers.len() != self.grid_sizes.len()
            || self.grid_layers.len() != self.grid_resolutions.len()
        {
            return Err(SemanticFieldError::GridConfigMismatch {
                layers: self.grid_layers.len(),
                sizes: self.grid_sizes.len(),
                resolutions: self.grid_resolutions.len(),
            });
        }
        if self.grid_layers.is_empty() {
            return Err(SemanticFieldError::InvalidConfig {
                message: "at least one resolution band is required".to_string(),
            });
        }
        for band in self.band_configs() {
            band.validate()?;
        }
        if self.hidden_dim == 0 || self.embedding_dim == 0 {
            return Err(SemanticFieldError::InvalidConfig {
                message: "hidden_dim and embedding_dim must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = SemanticFieldConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.band_configs().len(), 2);
    }

    #[test]
    fn test_band_configs() {
        let config = SemanticFieldConfig::new()
            .with_grid_layers(vec![5])
            .with_grid_sizes(vec![16])
            .with_grid_resolutions(vec![(16, 256)]);

        let bands = config.band_configs();
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].start_resolution, 16);
        assert_eq!(bands[0].end_resolution, 256);
        assert_eq!(bands[0].levels, 5);
        assert_eq!(bands[0].hash_size, 16);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let config = SemanticFieldConfig::new()
            .with_grid_layers(vec![12, 12])
            .with_grid_sizes(vec![19])
            .with_grid_resolutions(vec![(16, 128), (128, 512)]);

        match config.validate() {
            Err(SemanticFieldError::GridConfigMismatch {
                layers,
                sizes,
                resolutions,
            }) => {
                assert_eq!(layers, 2);
                assert_eq!(sizes, 1);
                assert_eq!(resolutions, 2);
            }
            other => panic!("expected GridConfigMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_bands_rejected() {
        let config = SemanticFieldConfig::new()
            .with_grid_layers(vec![])
            .with_grid_sizes(vec![])
            .with_grid_resolutions(vec![]);
        assert!(config.validate().is_err());
    }
}
