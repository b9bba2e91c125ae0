//! Convolutional value networks implemented with [candle](https://crates.io/crates/candle-core).
//!
//! [`ConvNetwork`] stacks convolution+ReLU blocks and feeds the flattened feature map
//! into an [`Mlp`]. Either part can be left out, in which case it becomes an identity
//! [`Stage`]. The network is meant to be used as the action-value function of an RL agent,
//! either directly as a [`SubModel1`] or wrapped in a [`ValueModel`] owning its parameters.
//!
//! ```no_run
//! # use anyhow::Result;
//! use border_convnet::{ConvNetwork, ConvNetworkConfig, PerLayer, Size2, ValueModel, ValueModelConfig};
//! use candle_core::{DType, Device, Tensor};
//!
//! # fn main() -> Result<()> {
//! let q_config = ConvNetworkConfig::new([4, 84, 84])
//!     .channels(vec![32, 64, 64])
//!     .kernel_sizes(PerLayer::List(vec![Size2::Square(8), Size2::Square(4), Size2::Square(3)]))
//!     .strides(PerLayer::List(vec![Size2::Square(4), Size2::Square(2), Size2::Square(1)]))
//!     .mlp_layers(vec![512]);
//! let config = ValueModelConfig::default().q_config(q_config);
//! let model = ValueModel::<ConvNetwork>::build(config, Device::Cpu)?;
//!
//! let obs = Tensor::zeros((8, 4, 84, 84), DType::U8, &Device::Cpu)?;
//! let q = model.forward(&obs)?;
//! assert_eq!(q.dims(), &[8, 512]);
//! # Ok(())
//! # }
//! ```
pub mod cnn;
mod error;
pub mod mlp;
pub mod model;
pub mod noisy;
mod param;
mod stage;
pub mod util;
pub use cnn::{ConvNetwork, ConvNetworkConfig};
pub use error::{ConvNetError, Result};
pub use mlp::{Mlp, MlpConfig};
pub use model::{SubModel1, ValueModel, ValueModelConfig};
pub use noisy::NoisyLinear;
pub use param::{PerLayer, Size2};
pub use stage::Stage;
