//! Convolutional neural network followed by a multilayer perceptron.
//!
//! The input array is cast to the dtype of the parameters and divided by
//! [`ConvNetworkConfig::normalization_factor`], 255 by default, for normalizing pixel
//! intensities stored as `u8`.
mod base;
mod block;
mod config;
pub use base::ConvNetwork;
pub use block::{ConvBlock, ConvStack};
pub use config::ConvNetworkConfig;
