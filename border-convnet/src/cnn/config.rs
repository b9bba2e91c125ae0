use crate::{
    error::{ConvNetError, Result},
    param::{conv_params, ConvParams},
    PerLayer, Size2,
};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

fn default_kernel_sizes() -> PerLayer<Size2> {
    PerLayer::Single(Size2::Square(1))
}

fn default_strides() -> PerLayer<Size2> {
    PerLayer::Single(Size2::Square(1))
}

fn default_paddings() -> PerLayer<Size2> {
    PerLayer::Single(Size2::Square(0))
}

fn default_normalization_factor() -> f64 {
    255.0
}

fn default_std_init() -> f64 {
    0.5
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`ConvNetwork`](super::ConvNetwork).
///
/// Only `in_dim` is required in YAML:
///
/// ```yaml
/// in_dim: [4, 84, 84]
/// channels: [32, 64, 64]
/// kernel_sizes: [8, 4, 3]
/// strides: [4, 2, 1]
/// mlp_layers: [512]
/// ```
pub struct ConvNetworkConfig {
    pub(super) in_dim: [usize; 3],
    #[serde(default)]
    pub(super) channels: Option<Vec<usize>>,
    #[serde(default)]
    pub(super) mlp_layers: Option<Vec<usize>>,
    #[serde(default = "default_kernel_sizes")]
    pub(super) kernel_sizes: PerLayer<Size2>,
    #[serde(default = "default_strides")]
    pub(super) strides: PerLayer<Size2>,
    #[serde(default = "default_paddings")]
    pub(super) paddings: PerLayer<Size2>,
    #[serde(default = "default_normalization_factor")]
    pub(super) normalization_factor: f64,
    #[serde(default)]
    pub(super) noisy: bool,
    #[serde(default = "default_std_init")]
    pub(super) std_init: f64,
}

impl ConvNetworkConfig {
    /// Creates a configuration without convolution and MLP layers.
    ///
    /// * `in_dim` - Shape of an observation, `(channels, width, height)`.
    pub fn new(in_dim: [usize; 3]) -> Self {
        Self {
            in_dim,
            channels: None,
            mlp_layers: None,
            kernel_sizes: default_kernel_sizes(),
            strides: default_strides(),
            paddings: default_paddings(),
            normalization_factor: default_normalization_factor(),
            noisy: false,
            std_init: default_std_init(),
        }
    }

    /// Sets the number of output channels of each convolution layer.
    pub fn channels(mut self, v: Vec<usize>) -> Self {
        self.channels = Some(v);
        self
    }

    /// Sets the number of units of each MLP layer following the convolution layers.
    pub fn mlp_layers(mut self, v: Vec<usize>) -> Self {
        self.mlp_layers = Some(v);
        self
    }

    /// Sets the kernel sizes of the convolution layers.
    pub fn kernel_sizes(mut self, v: impl Into<PerLayer<Size2>>) -> Self {
        self.kernel_sizes = v.into();
        self
    }

    /// Sets the strides of the convolution layers.
    pub fn strides(mut self, v: impl Into<PerLayer<Size2>>) -> Self {
        self.strides = v.into();
        self
    }

    /// Sets the zero paddings of the convolution layers.
    pub fn paddings(mut self, v: impl Into<PerLayer<Size2>>) -> Self {
        self.paddings = v.into();
        self
    }

    /// Sets the value by which inputs are divided before the convolution layers.
    pub fn normalization_factor(mut self, v: f64) -> Self {
        self.normalization_factor = v;
        self
    }

    /// If `true`, the MLP uses [`NoisyLinear`](crate::NoisyLinear) layers.
    pub fn noisy(mut self, v: bool) -> Self {
        self.noisy = v;
        self
    }

    /// Sets the initial noise scale of the noisy layers.
    pub fn std_init(mut self, v: f64) -> Self {
        self.std_init = v;
        self
    }

    /// Returns the shape of an observation.
    pub fn in_dim(&self) -> [usize; 3] {
        self.in_dim
    }

    /// Checks values which do not depend on the number of layers.
    pub(super) fn check(&self) -> Result<()> {
        if self.in_dim.contains(&0) {
            return Err(ConvNetError::InvalidConfig(format!(
                "in_dim must be positive, got {:?}",
                self.in_dim
            )));
        }
        if let Some(channels) = &self.channels {
            if channels.contains(&0) {
                return Err(ConvNetError::InvalidConfig(format!(
                    "channels must be positive, got {:?}",
                    channels
                )));
            }
        }
        if !(self.normalization_factor.is_finite() && self.normalization_factor > 0.0) {
            return Err(ConvNetError::InvalidConfig(format!(
                "normalization_factor must be positive, got {}",
                self.normalization_factor
            )));
        }
        Ok(())
    }

    /// Returns hyperparameters of each convolution layer.
    ///
    /// Empty if `channels` is not set or empty. Otherwise the channels of the input are put
    /// in front of `channels` and scalar kernel sizes, strides and paddings are broadcast.
    pub(super) fn layer_params(&self) -> Result<Vec<ConvParams>> {
        match self.channels.as_deref() {
            None | Some([]) => Ok(vec![]),
            Some(channels) => {
                let channels: Vec<usize> = std::iter::once(self.in_dim[0])
                    .chain(channels.iter().copied())
                    .collect();
                conv_params(&channels, &self.kernel_sizes, &self.strides, &self.paddings)
            }
        }
    }

    /// Constructs [`ConvNetworkConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ConvNetworkConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
