//! Encoder modules for transforming positions to latent representations.

mod hashgrid;

pub use hashgrid::HashGridEncoder;
