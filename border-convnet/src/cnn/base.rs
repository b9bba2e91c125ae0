use super::{ConvNetworkConfig, ConvStack};
use crate::{
    error::{ConvNetError, Result},
    mlp::{Mlp, MlpConfig},
    model::SubModel1,
    util::calculate_output_dim,
    Stage,
};
use candle_core::{DType, Device, Tensor};
use candle_nn::{ModuleT, VarBuilder};
use log::{info, trace};

/// Convolution+ReLU layers followed by an [`Mlp`].
///
/// If `channels` is not given in the configuration, the convolution part is
/// [`Stage::Identity`]. Likewise for the MLP part and `mlp_layers`.
///
/// Accepted inputs:
/// * `(channel, width, height)`, a single observation, given a batch axis of size 1.
/// * `(batch, channel, width, height)`.
/// * `(batch, stack, channel, width, height)`, reshaped to `(batch, stack * channel, width, height)`.
pub struct ConvNetwork {
    config: ConvNetworkConfig,
    device: Device,
    dtype: DType,
    conv: Stage<ConvStack>,
    mlp: Stage<Mlp>,
    conv_out_dim: usize,
}

impl ConvNetwork {
    /// Builds the network, registering its parameters in `vb`.
    ///
    /// Parameters of the convolution layers are prefixed with `conv` and those of the
    /// MLP with `mlp`.
    pub fn build(vb: VarBuilder, config: ConvNetworkConfig) -> Result<Self> {
        config.check()?;
        let device = vb.device().clone();
        let dtype = vb.dtype();

        let params = config.layer_params()?;
        let conv = match params.is_empty() {
            true => Stage::Identity,
            false => Stage::Sequential(ConvStack::new(&params, vb.pp("conv"))?),
        };

        let conv_out_dim = calculate_output_dim(&conv, config.in_dim, dtype, &device)?;

        let mlp = match &config.mlp_layers {
            None => Stage::Identity,
            Some(units) => {
                let mlp_config =
                    MlpConfig::new(conv_out_dim, units.clone(), config.noisy, config.std_init);
                Stage::Sequential(Mlp::build(vb.pp("mlp"), mlp_config)?)
            }
        };

        info!(
            "Built ConvNetwork: in_dim = {:?}, {} conv layers, conv_out_dim = {}, mlp_layers = {:?}, noisy = {}",
            config.in_dim,
            params.len(),
            conv_out_dim,
            config.mlp_layers,
            config.noisy
        );

        Ok(Self {
            config,
            device,
            dtype,
            conv,
            mlp,
            conv_out_dim,
        })
    }

    /// Reshapes the input to `(batch, channel, width, height)` and normalizes it.
    fn preprocess(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = match xs.rank() {
            3 => xs.unsqueeze(0)?,
            4 => xs.clone(),
            5 => {
                let (b, s, c, w, h) = xs.dims5()?;
                trace!("Merge stack axis: {:?} -> {:?}", xs.dims(), (b, s * c, w, h));
                xs.reshape((b, s * c, w, h))?
            }
            rank => {
                return Err(ConvNetError::UnsupportedRank {
                    rank,
                    shape: xs.dims().to_vec(),
                })
            }
        };

        Ok(xs
            .to_device(&self.device)?
            .to_dtype(self.dtype)?
            .affine(1.0 / self.config.normalization_factor, 0.0)?)
    }

    /// Outputs the action-value given observation(s), using the mean weights of noisy layers.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.forward_t(xs, false)
    }

    /// Outputs the action-value given observation(s).
    ///
    /// When `train` is `true`, noise is sampled in noisy layers.
    pub fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let xs = self.preprocess(xs)?;
        let xs = self.conv.forward_t(&xs, train)?;
        Ok(self.mlp.forward_t(&xs, train)?)
    }

    /// Returns the number of elements of the output of the convolution layers for an observation.
    pub fn conv_out_dim(&self) -> usize {
        self.conv_out_dim
    }

    /// Returns the number of convolution+ReLU blocks.
    pub fn n_conv_layers(&self) -> usize {
        self.conv.module().map_or(0, ConvStack::len)
    }

    /// Returns the number of elements of the output for an observation.
    pub fn out_dim(&self) -> usize {
        match self.config.mlp_layers.as_ref().and_then(|units| units.last()) {
            Some(&n) => n,
            None => self.conv_out_dim,
        }
    }

    /// Returns the convolution part.
    pub fn conv(&self) -> &Stage<ConvStack> {
        &self.conv
    }

    /// Returns the MLP part.
    pub fn mlp(&self) -> &Stage<Mlp> {
        &self.mlp
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ConvNetworkConfig {
        &self.config
    }
}

impl ModuleT for ConvNetwork {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        ConvNetwork::forward_t(self, xs, train).map_err(|e| match e {
            ConvNetError::Tensor(e) => e,
            e => candle_core::Error::wrap(e),
        })
    }
}

impl SubModel1 for ConvNetwork {
    type Config = ConvNetworkConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        ConvNetwork::forward(self, xs)
    }

    fn forward_t(&self, xs: &Self::Input, train: bool) -> Result<Tensor> {
        ConvNetwork::forward_t(self, xs, train)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        ConvNetwork::build(vb, config)
    }
}
