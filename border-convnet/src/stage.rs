use candle_core::{Result, Tensor};
use candle_nn::ModuleT;

/// A part of a network which is either a pass-through or a module.
pub enum Stage<M> {
    /// Returns the input as it is and owns no parameters.
    Identity,

    /// Applies the wrapped module.
    Sequential(M),
}

impl<M> Stage<M> {
    /// Returns `true` if the stage is a pass-through.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Returns the wrapped module, if any.
    pub fn module(&self) -> Option<&M> {
        match self {
            Self::Identity => None,
            Self::Sequential(m) => Some(m),
        }
    }
}

impl<M: ModuleT> ModuleT for Stage<M> {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        match self {
            Self::Identity => Ok(xs.clone()),
            Self::Sequential(m) => m.forward_t(xs, train),
        }
    }
}
