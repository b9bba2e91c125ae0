//! Linear layer with factorised Gaussian noise.
//!
//! See Fortunato et al., Noisy Networks for Exploration, <https://arxiv.org/abs/1706.10295>.
use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{Init, Linear, Module, ModuleT, VarBuilder};

/// Linear layer whose weights are perturbed by learnable, factorised Gaussian noise.
///
/// In training mode (`forward_t(xs, true)`) fresh noise is drawn on every call and the
/// effective parameters are `mu + sigma * eps`. In evaluation mode only `mu` is used.
/// The layer keeps no noise between calls.
pub struct NoisyLinear {
    weight_mu: Tensor,
    weight_sigma: Tensor,
    bias_mu: Tensor,
    bias_sigma: Tensor,
    in_dim: usize,
    out_dim: usize,
}

impl NoisyLinear {
    /// Creates the layer, registering `weight_mu`, `weight_sigma`, `bias_mu` and
    /// `bias_sigma` in `vb`.
    ///
    /// `std_init` scales the initial standard deviation of the noise.
    pub fn new(in_dim: usize, out_dim: usize, std_init: f64, vb: VarBuilder) -> Result<Self> {
        let mu_range = 1.0 / (in_dim as f64).sqrt();
        let mu_init = Init::Uniform {
            lo: -mu_range,
            up: mu_range,
        };
        let weight_mu = vb.get_with_hints((out_dim, in_dim), "weight_mu", mu_init)?;
        let weight_sigma = vb.get_with_hints(
            (out_dim, in_dim),
            "weight_sigma",
            Init::Const(std_init / (in_dim as f64).sqrt()),
        )?;
        let bias_mu = vb.get_with_hints(out_dim, "bias_mu", mu_init)?;
        let bias_sigma = vb.get_with_hints(
            out_dim,
            "bias_sigma",
            Init::Const(std_init / (out_dim as f64).sqrt()),
        )?;

        Ok(Self {
            weight_mu,
            weight_sigma,
            bias_mu,
            bias_sigma,
            in_dim,
            out_dim,
        })
    }

    /// Returns the number of input features.
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Returns the number of output features.
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Standard normal samples transformed by `f(x) = sign(x) * sqrt(|x|)`.
    fn scaled_noise(n: usize, dtype: DType, device: &Device) -> Result<Tensor> {
        let xs = Tensor::randn(0f32, 1f32, n, device)?.to_dtype(dtype)?;
        let sign = xs.ge(0f64)?.to_dtype(dtype)?.affine(2.0, -1.0)?;
        sign * xs.abs()?.sqrt()?
    }

    /// Draws noise and returns the perturbed weight and bias.
    fn noisy_params(&self) -> Result<(Tensor, Tensor)> {
        let dtype = self.weight_mu.dtype();
        let device = self.weight_mu.device();
        let eps_in = Self::scaled_noise(self.in_dim, dtype, device)?;
        let eps_out = Self::scaled_noise(self.out_dim, dtype, device)?;
        let weight_eps = eps_out.unsqueeze(1)?.broadcast_mul(&eps_in.unsqueeze(0)?)?;

        let weight = self.weight_mu.add(&self.weight_sigma.mul(&weight_eps)?)?;
        let bias = self.bias_mu.add(&self.bias_sigma.mul(&eps_out)?)?;
        Ok((weight, bias))
    }
}

impl ModuleT for NoisyLinear {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let (weight, bias) = match train {
            true => self.noisy_params()?,
            false => (self.weight_mu.clone(), self.bias_mu.clone()),
        };
        Linear::new(weight, Some(bias)).forward(xs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_nn::VarMap;

    fn build(in_dim: usize, out_dim: usize, std_init: f64) -> Result<(VarMap, NoisyLinear)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let layer = NoisyLinear::new(in_dim, out_dim, std_init, vb.pp("noisy"))?;
        Ok((varmap, layer))
    }

    #[test]
    fn test_initial_params() -> anyhow::Result<()> {
        let (varmap, layer) = build(16, 4, 0.5)?;
        assert_eq!(varmap.all_vars().len(), 4);
        assert_eq!(layer.weight_mu.dims(), &[4, 16]);
        assert_eq!(layer.bias_sigma.dims(), &[4]);

        let sigma = layer.weight_sigma.flatten_all()?.to_vec1::<f32>()?;
        assert!(sigma.iter().all(|s| (s - 0.125).abs() < 1e-6));
        let sigma = layer.bias_sigma.to_vec1::<f32>()?;
        assert!(sigma.iter().all(|s| (s - 0.25).abs() < 1e-6));

        let mu = layer.weight_mu.flatten_all()?.to_vec1::<f32>()?;
        assert!(mu.iter().all(|m| m.abs() <= 0.25));
        Ok(())
    }

    #[test]
    fn test_eval_mode_uses_mean() -> anyhow::Result<()> {
        let (_varmap, layer) = build(8, 3, 0.5)?;
        let xs = Tensor::randn(0f32, 1f32, (5, 8), &Device::Cpu)?;
        let ys1 = layer.forward_t(&xs, false)?;
        let ys2 = layer.forward_t(&xs, false)?;
        let expected = Linear::new(layer.weight_mu.clone(), Some(layer.bias_mu.clone()))
            .forward(&xs)?;

        assert_eq!(ys1.dims(), &[5, 3]);
        assert_eq!(ys1.to_vec2::<f32>()?, ys2.to_vec2::<f32>()?);
        assert_eq!(ys1.to_vec2::<f32>()?, expected.to_vec2::<f32>()?);
        Ok(())
    }

    #[test]
    fn test_train_mode_samples_noise() -> anyhow::Result<()> {
        let (_varmap, layer) = build(8, 3, 0.5)?;
        let xs = Tensor::ones((2, 8), DType::F32, &Device::Cpu)?;
        let ys_eval = layer.forward_t(&xs, false)?;
        let ys1 = layer.forward_t(&xs, true)?;
        let ys2 = layer.forward_t(&xs, true)?;

        let d1 = (&ys1 - &ys_eval)?.abs()?.sum_all()?.to_scalar::<f32>()?;
        let d2 = (&ys1 - &ys2)?.abs()?.sum_all()?.to_scalar::<f32>()?;
        assert!(d1 > 0.0);
        assert!(d2 > 0.0);
        Ok(())
    }

    #[test]
    fn test_scaled_noise() -> anyhow::Result<()> {
        let xs = NoisyLinear::scaled_noise(1000, DType::F32, &Device::Cpu)?.to_vec1::<f32>()?;
        assert_eq!(xs.len(), 1000);
        assert!(xs.iter().any(|&x| x < 0.0));
        assert!(xs.iter().any(|&x| x > 0.0));
        Ok(())
    }
}
