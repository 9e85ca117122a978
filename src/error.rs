//! Error types for semfield.

use thiserror::Error;

/// Errors that can occur during semantic field and feature cache operations.
#[derive(Error, Debug)]
pub enum SemanticFieldError {
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// Parallel grid configuration lists have unequal lengths.
    #[error(
        "grid configuration length mismatch: {layers} layer entries, \
         {sizes} size entries, {resolutions} resolution entries"
    )]
    GridConfigMismatch {
        /// Number of `grid_layers` entries.
        layers: usize,
        /// Number of `grid_sizes` entries.
        sizes: usize,
        /// Number of `grid_resolutions` entries.
        resolutions: usize,
    },

    /// Tensor shape mismatch.
    #[error("tensor shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        got: Vec<usize>,
    },

    /// Image index out of bounds for the cached feature tensor.
    #[error("image index {index} out of bounds for cache of {num_images} images")]
    ImageIndexOutOfBounds {
        /// The requested image index.
        index: usize,
        /// Number of cached images.
        num_images: usize,
    },

    /// Pixel coordinate outside the original image extent.
    #[error("point ({x}, {y}) out of bounds for image shape ({height}, {width})")]
    PointOutOfBounds {
        /// Row coordinate in original image space.
        x: f32,
        /// Column coordinate in original image space.
        y: f32,
        /// Original image height.
        height: usize,
        /// Original image width.
        width: usize,
    },

    /// Spatial distortion produced positions outside the contracted range.
    #[error("distorted positions [{min}, {max}] exceed the contracted range [-2, 2]")]
    DistortionOutOfRange {
        /// Minimum distorted coordinate observed.
        min: f32,
        /// Maximum distorted coordinate observed.
        max: f32,
    },

    /// Feature extraction failed.
    #[error("feature extraction failed: {message}")]
    Extraction {
        /// Description of the extraction failure.
        message: String,
    },

    /// Invalid or corrupted persisted cache.
    #[error("invalid cache: {0}")]
    InvalidCache(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for semfield operations.
pub type Result<T> = std::result::Result<T, SemanticFieldError>;
