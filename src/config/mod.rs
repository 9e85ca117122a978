//! Configuration types for semfield.
//!
//! This module provides Burn-style configuration structs for the hash-grid
//! encoders, the semantic field, and the feature cache.

mod cache;
mod encoding;
mod field;

pub use cache::FeatureCacheConfig;
pub use encoding::HashGridConfig;
pub use field::SemanticFieldConfig;
