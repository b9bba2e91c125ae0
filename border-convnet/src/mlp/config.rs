use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

fn default_std_init() -> f64 {
    0.5
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp).
pub struct MlpConfig {
    pub(super) in_dim: usize,
    pub(super) units: Vec<usize>,
    #[serde(default)]
    pub(super) noisy: bool,
    #[serde(default = "default_std_init")]
    pub(super) std_init: f64,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    ///
    /// * `in_dim` - The number of input features after flattening.
    /// * `units` - The number of units of each layer. The last one is the output dimension.
    /// * `noisy` - If `true`, [`NoisyLinear`](crate::NoisyLinear) layers are used.
    /// * `std_init` - Initial noise scale of the noisy layers.
    pub fn new(in_dim: usize, units: Vec<usize>, noisy: bool, std_init: f64) -> Self {
        Self {
            in_dim,
            units,
            noisy,
            std_init,
        }
    }

    /// Returns the number of output features.
    pub fn out_dim(&self) -> Option<usize> {
        self.units.last().copied()
    }

    /// Constructs [`MlpConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`MlpConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
