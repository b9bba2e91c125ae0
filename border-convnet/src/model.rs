//! Interface of neural networks used in RL agents.
use crate::error::{ConvNetError, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::{info, trace};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Neural network model not owing its [`VarMap`] internally.
///
/// [`VarMap`]: https://docs.rs/candle-nn/0.8.4/candle_nn/var_map/struct.VarMap.html
pub trait SubModel1: Sized {
    /// Configuration from which [`SubModel1`] is constructed.
    type Config;

    /// Input of the [`SubModel1`].
    type Input;

    /// Output of the [`SubModel1`].
    type Output;

    /// Builds [`SubModel1`] with [`VarBuilder`] and [`SubModel1::Config`].
    ///
    /// [`VarBuilder`]: https://docs.rs/candle-nn/0.8.4/candle_nn/var_builder/type.VarBuilder.html
    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self>;

    /// A generalized forward function.
    fn forward(&self, input: &Self::Input) -> Result<Self::Output>;

    /// Forward function distinguishing training from evaluation.
    ///
    /// Defaults to [`SubModel1::forward`] for models behaving the same in both modes.
    fn forward_t(&self, input: &Self::Input, _train: bool) -> Result<Self::Output> {
        self.forward(input)
    }
}

/// Sets the values of variables in `dest` to those of the same name in `src`.
fn copy_vars(dest: &VarMap, src: &VarMap) -> Result<()> {
    let dest = dest
        .data()
        .lock()
        .map_err(|e| candle_core::Error::Msg(e.to_string()))?;
    let src = src
        .data()
        .lock()
        .map_err(|e| candle_core::Error::Msg(e.to_string()))?;

    for (name, v_dest) in dest.iter() {
        let v_src = src.get(name).ok_or_else(|| {
            ConvNetError::InvalidConfig(format!("variable {} not found in source", name))
        })?;
        v_dest.set(v_src.as_tensor())?;
    }
    trace!("Copied {} variables", dest.len());
    Ok(())
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`ValueModel`].
pub struct ValueModelConfig<Q> {
    pub(crate) q_config: Option<Q>,
}

impl<Q> Default for ValueModelConfig<Q> {
    fn default() -> Self {
        Self { q_config: None }
    }
}

impl<Q> ValueModelConfig<Q>
where
    Q: DeserializeOwned + Serialize,
{
    /// Sets configurations for action-value function.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Constructs [`ValueModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ValueModelConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Action-value function owning its parameters.
///
/// [`ValueModel::try_clone`] rebuilds the network in a fresh [`VarMap`] and copies the
/// parameter values, which gives a target network detached from the source model.
pub struct ValueModel<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + Clone,
{
    device: Device,
    varmap: VarMap,
    q: Q,
    q_config: Q::Config,
}

impl<Q> ValueModel<Q>
where
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + Clone,
{
    /// Constructs [`ValueModel`].
    pub fn build(config: ValueModelConfig<Q::Config>, device: Device) -> Result<Self> {
        let q_config = config
            .q_config
            .ok_or_else(|| ConvNetError::InvalidConfig("q_config is not set".to_string()))?;
        Self::_build(device, q_config, None)
    }

    fn _build(device: Device, q_config: Q::Config, varmap_src: Option<&VarMap>) -> Result<Self> {
        let varmap = VarMap::new();
        let q = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            Q::build(vb, q_config.clone())?
        };

        // Copy parameter values, not the shared storage
        if let Some(varmap_src) = varmap_src {
            copy_vars(&varmap, varmap_src)?;
        }

        Ok(Self {
            device,
            varmap,
            q,
            q_config,
        })
    }

    /// Outputs the action-value given observation(s).
    pub fn forward(&self, obs: &Tensor) -> Result<Tensor> {
        self.q.forward(obs)
    }

    /// Outputs the action-value, with noise in noisy layers when `train` is `true`.
    pub fn forward_t(&self, obs: &Tensor, train: bool) -> Result<Tensor> {
        self.q.forward_t(obs, train)
    }

    /// Returns the sub-model.
    pub fn q(&self) -> &Q {
        &self.q
    }

    /// Returns the device on which the parameters live.
    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn get_varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Saves the parameters in safetensors format.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save value model to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the parameters saved with [`ValueModel::save`].
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load value model from {:?}", path.as_ref());
        Ok(())
    }

    /// Returns a copy of the model with its own parameters.
    pub fn try_clone(&self) -> Result<Self> {
        Self::_build(
            self.device.clone(),
            self.q_config.clone(),
            Some(&self.varmap),
        )
    }
}
