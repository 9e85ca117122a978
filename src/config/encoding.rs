//! Hash-grid encoding configuration.

use burn::config::Config;

use crate::error::SemanticFieldError;

/// Configuration for one multi-resolution hash-grid encoder.
///
/// An encoder covers a single resolution band: `levels` feature grids whose
/// resolutions grow geometrically from `start_resolution` to
/// `end_resolution`.
#[derive(Config, Debug)]
pub struct HashGridConfig {
    /// Resolution of the coarsest level.
    pub start_resolution: usize,

    /// Resolution of the finest level.
    pub end_resolution: usize,

    /// Number of resolution levels.
    pub levels: usize,

    /// Hash table size per level, as a log2 exponent.
    #[config(default = 19)]
    pub hash_size: usize,

    /// Feature vector width stored per table entry.
    #[config(default = 8)]
    pub features_per_level: usize,
}

impl HashGridConfig {
    /// Per-level geometric growth factor.
    ///
    /// `exp((ln end − ln start) / (levels − 1))`, so level resolutions form
    /// a geometric progression from `start_resolution` to `end_resolution`.
    pub fn growth_factor(&self) -> f64 {
        let start = self.start_resolution as f64;
        let end = self.end_resolution as f64;
        ((end.ln() - start.ln()) / (self.levels - 1) as f64).exp()
    }

    /// Grid resolution at a given level.
    pub fn level_resolution(&self, level: usize) -> usize {
        let res = self.start_resolution as f64 * self.growth_factor().powi(level as i32);
        res.floor() as usize
    }

    /// Number of entries in each level's hash table.
    pub fn table_size(&self) -> usize {
        1 << self.hash_size
    }

    /// Width of the concatenated per-position output.
    pub fn output_dim(&self) -> usize {
        self.levels * self.features_per_level
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.levels < 2 {
            return Err(SemanticFieldError::InvalidConfig {
                message: format!("hash grid needs at least 2 levels, got {}", self.levels),
            });
        }
        if self.start_resolution == 0 || self.end_resolution < self.start_resolution {
            return Err(SemanticFieldError::InvalidConfig {
                message: format!(
                    "invalid resolution band {}..{}",
                    self.start_resolution, self.end_resolution
                ),
            });
        }
        if self.hash_size == 0 || self.hash_size > 30 {
            return Err(SemanticFieldError::InvalidConfig {
                message: format!("hash_size {} outside supported range 1..=30", self.hash_size),
            });
        }
        if self.features_per_level == 0 {
            return Err(SemanticFieldError::InvalidConfig {
                message: "features_per_level must be positive".to_string(),
            });
        }
        Ok(())
    }
}
