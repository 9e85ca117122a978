//! Neural network modules for the semantic field.
//!
//! This module provides:
//! - Encoders: multi-resolution hash grids mapping positions to features
//! - Projection networks: compact MLPs mapping features to embeddings

pub mod encoder;
pub mod projection;

pub use encoder::HashGridEncoder;
pub use projection::{ProjectionNetwork, ProjectionNetworkConfig};
