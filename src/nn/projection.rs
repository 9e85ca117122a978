//! Projection network mapping encoder features to semantic embeddings.

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

/// Configuration for a projection network.
#[derive(Config, Debug)]
pub struct ProjectionNetworkConfig {
    /// Input dimension (sum of the encoder output dims).
    pub input_dim: usize,
    /// Output embedding dimension.
    pub output_dim: usize,
    /// Width of every hidden layer.
    #[config(default = 256)]
    pub hidden_dim: usize,
    /// Number of hidden layers.
    #[config(default = 1)]
    pub hidden_layers: usize,
}

impl ProjectionNetworkConfig {
    /// Initialize the network.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ProjectionNetwork<B> {
        let mut hidden = Vec::with_capacity(self.hidden_layers);
        let mut in_dim = self.input_dim;

        for _ in 0..self.hidden_layers {
            hidden.push(LinearConfig::new(in_dim, self.hidden_dim).init(device));
            in_dim = self.hidden_dim;
        }

        ProjectionNetwork {
            hidden,
            output: LinearConfig::new(in_dim, self.output_dim).init(device),
            activation: Relu::new(),
        }
    }
}

/// Compact feed-forward network fusing multi-scale hash-grid features into
/// one embedding.
///
/// ReLU between hidden layers, no output activation. Kept narrow on purpose:
/// it runs at every sampled point along every ray, so throughput wins over
/// expressivity.
#[derive(Module, Debug)]
pub struct ProjectionNetwork<B: Backend> {
    /// Hidden layers, all `hidden_dim` wide.
    hidden: Vec<Linear<B>>,
    /// Output layer to the embedding dimension.
    output: Linear<B>,
    /// Activation between hidden layers.
    activation: Relu,
}

impl<B: Backend> ProjectionNetwork<B> {
    /// Forward pass.
    ///
    /// Input shape: [batch, input_dim]
    /// Output shape: [batch, output_dim]
    pub fn forward(&self, mut x: Tensor<B, 2>) -> Tensor<B, 2> {
        for layer in &self.hidden {
            x = layer.forward(x);
            x = self.activation.forward(x);
        }
        self.output.forward(x)
    }

    /// Get the input dimension.
    pub fn input_dim(&self) -> usize {
        // In Burn, Linear weight is [in_features, out_features]
        self.hidden
            .first()
            .unwrap_or(&self.output)
            .weight
            .dims()[0]
    }

    /// Get the output embedding dimension.
    pub fn output_dim(&self) -> usize {
        self.output.weight.dims()[1]
    }
}
