use super::MlpConfig;
use crate::{
    error::{ConvNetError, Result},
    model::SubModel1,
    NoisyLinear,
};
use candle_core::{Device, Tensor};
use candle_nn::{linear, Linear, Module, ModuleT, VarBuilder};
use log::debug;

/// A fully-connected layer, either ordinary or noisy.
enum Layer {
    Linear(Linear),
    Noisy(NoisyLinear),
}

impl ModuleT for Layer {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        match self {
            Self::Linear(l) => l.forward(xs),
            Self::Noisy(l) => l.forward_t(xs, train),
        }
    }
}

fn check_config(config: &MlpConfig) -> Result<()> {
    if config.units.is_empty() {
        return Err(ConvNetError::InvalidConfig(
            "mlp needs at least one layer".to_string(),
        ));
    }
    if config.in_dim == 0 || config.units.contains(&0) {
        return Err(ConvNetError::InvalidConfig(format!(
            "mlp widths must be positive, got in_dim = {}, units = {:?}",
            config.in_dim, config.units
        )));
    }
    if config.noisy && !(config.std_init.is_finite() && config.std_init > 0.0) {
        return Err(ConvNetError::InvalidConfig(format!(
            "std_init must be positive, got {}",
            config.std_init
        )));
    }
    Ok(())
}

/// Returns vector of linear modules from [`MlpConfig`].
fn create_linear_layers(vs: VarBuilder, config: &MlpConfig) -> Result<Vec<Layer>> {
    let in_dims = std::iter::once(config.in_dim).chain(config.units.iter().copied());
    let in_out_pairs = in_dims.zip(config.units.iter().copied());

    in_out_pairs
        .enumerate()
        .map(|(i, (in_dim, out_dim))| -> Result<Layer> {
            let vs = vs.pp(format!("ln{}", i));
            debug!("mlp layer {}: {} -> {} (noisy = {})", i, in_dim, out_dim, config.noisy);
            let layer = match config.noisy {
                false => Layer::Linear(linear(in_dim, out_dim, vs)?),
                true => Layer::Noisy(NoisyLinear::new(in_dim, out_dim, config.std_init, vs)?),
            };
            Ok(layer)
        })
        .collect()
}

/// Multilayer perceptron with ReLU activation function.
///
/// The input is flattened from the second axis, then every layer, including the last
/// one, is followed by ReLU.
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Layer>,
}

impl Mlp {
    /// Returns the configuration.
    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    /// Returns the number of linear layers.
    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }
}

impl ModuleT for Mlp {
    fn forward_t(&self, xs: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let mut xs = xs.to_device(&self.device)?.flatten_from(1)?;
        for layer in self.layers.iter() {
            xs = layer.forward_t(&xs, train)?.relu()?;
        }
        Ok(xs)
    }
}

impl SubModel1 for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, xs: &Self::Input) -> Result<Tensor> {
        Ok(ModuleT::forward_t(self, xs, false)?)
    }

    fn forward_t(&self, xs: &Self::Input, train: bool) -> Result<Tensor> {
        Ok(ModuleT::forward_t(self, xs, train)?)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Result<Self> {
        check_config(&config)?;
        let device = vs.device().clone();
        let layers = create_linear_layers(vs, &config)?;

        Ok(Self {
            config,
            device,
            layers,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    fn build(config: MlpConfig) -> Result<(VarMap, Mlp)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mlp = Mlp::build(vb.pp("mlp"), config)?;
        Ok((varmap, mlp))
    }

    #[test]
    fn test_mlp_shapes() -> anyhow::Result<()> {
        let (varmap, mlp) = build(MlpConfig::new(12, vec![16, 5], false, 0.5))?;
        assert_eq!(mlp.n_layers(), 2);
        assert_eq!(varmap.all_vars().len(), 4);

        // (batch, 3, 2, 2) is flattened to (batch, 12)
        let xs = Tensor::randn(0f32, 1f32, (7, 3, 2, 2), &Device::Cpu)?;
        let ys = mlp.forward(&xs)?;
        assert_eq!(ys.dims(), &[7, 5]);

        // ReLU is applied after the last layer
        let ys = ys.flatten_all()?.to_vec1::<f32>()?;
        assert!(ys.iter().all(|&y| y >= 0.0));
        Ok(())
    }

    #[test]
    fn test_noisy_mlp() -> anyhow::Result<()> {
        let (varmap, mlp) = build(MlpConfig::new(4, vec![8], true, 0.5))?;
        assert_eq!(varmap.all_vars().len(), 4);

        let xs = Tensor::ones((2, 4), DType::F32, &Device::Cpu)?;
        let ys1 = mlp.forward(&xs)?.to_vec2::<f32>()?;
        let ys2 = mlp.forward(&xs)?.to_vec2::<f32>()?;
        assert_eq!(ys1, ys2);
        Ok(())
    }

    #[test]
    fn test_empty_units_rejected() {
        let r = build(MlpConfig::new(4, vec![], false, 0.5));
        assert!(matches!(r, Err(ConvNetError::InvalidConfig(_))));
    }
}
