//! Semantic field and its output channels.

mod semantic;

use std::collections::HashMap;

use burn::prelude::*;

pub use semantic::SemanticField;

/// Named output channels of the semantic field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldHead {
    /// Raw concatenated hash-grid features. Reserved; not currently produced.
    HashGrid,
    /// Open-vocabulary segmentation embedding (768-d).
    OpenSeg,
    /// Second embedding head (1152-d). Produced only when the field is
    /// configured with `second_head_enabled`.
    Clip,
}

/// Field outputs keyed by channel. Only channels that were actually
/// computed appear in the map.
pub type SemanticFieldOutputs<B> = HashMap<FieldHead, Tensor<B, 3>>;
