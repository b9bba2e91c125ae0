//! Per-layer hyperparameters of convolution layers.
use crate::error::{ConvNetError, Result};
use serde::{Deserialize, Serialize};

/// Two-dimensional size of a kernel, a stride or a padding.
///
/// `width` acts on axis 2 and `height` on axis 3 of a `(batch, channel, width, height)` tensor.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(untagged)]
pub enum Size2 {
    /// The same size along both spatial axes.
    Square(usize),

    /// Sizes along each spatial axis.
    Rect {
        /// Size along axis 2.
        width: usize,

        /// Size along axis 3.
        height: usize,
    },
}

impl Size2 {
    /// Returns `(width, height)`.
    pub fn pair(&self) -> (usize, usize) {
        match *self {
            Self::Square(n) => (n, n),
            Self::Rect { width, height } => (width, height),
        }
    }

    fn is_positive(&self) -> bool {
        let (w, h) = self.pair();
        w > 0 && h > 0
    }
}

impl From<usize> for Size2 {
    fn from(n: usize) -> Self {
        Self::Square(n)
    }
}

impl From<(usize, usize)> for Size2 {
    fn from((width, height): (usize, usize)) -> Self {
        Self::Rect { width, height }
    }
}

/// A hyperparameter given either once for all layers or once per layer.
///
/// The list variant is tried first when deserializing, so `[3, 3]` is read as two layers
/// with kernel size 3. A rectangular size is written as `{width: 3, height: 4}`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum PerLayer<T> {
    /// One value per layer.
    List(Vec<T>),

    /// A value shared by all layers.
    Single(T),
}

impl<T: Clone> PerLayer<T> {
    /// Returns one value per layer.
    ///
    /// `name` is only used in the error message.
    pub(crate) fn broadcast(&self, name: &'static str, n_layers: usize) -> Result<Vec<T>> {
        match self {
            Self::Single(v) => Ok(vec![v.clone(); n_layers]),
            Self::List(vs) if vs.len() == n_layers => Ok(vs.clone()),
            Self::List(vs) => Err(ConvNetError::ConfigMismatch {
                name,
                len: vs.len(),
                expected: n_layers,
            }),
        }
    }
}

impl From<Size2> for PerLayer<Size2> {
    fn from(v: Size2) -> Self {
        Self::Single(v)
    }
}

impl From<usize> for PerLayer<Size2> {
    fn from(n: usize) -> Self {
        Self::Single(Size2::Square(n))
    }
}

impl From<Vec<Size2>> for PerLayer<Size2> {
    fn from(vs: Vec<Size2>) -> Self {
        Self::List(vs)
    }
}

impl From<Vec<usize>> for PerLayer<Size2> {
    fn from(vs: Vec<usize>) -> Self {
        Self::List(vs.into_iter().map(Size2::Square).collect())
    }
}

/// Hyperparameters of a single convolution layer.
#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) struct ConvParams {
    pub in_channels: usize,
    pub out_channels: usize,
    pub kernel_size: (usize, usize),
    pub stride: (usize, usize),
    pub padding: (usize, usize),
}

/// Zips broadcast hyperparameters into one [`ConvParams`] per layer.
///
/// `channels` includes the channels of the input at its head.
pub(crate) fn conv_params(
    channels: &[usize],
    kernel_sizes: &PerLayer<Size2>,
    strides: &PerLayer<Size2>,
    paddings: &PerLayer<Size2>,
) -> Result<Vec<ConvParams>> {
    let n_layers = channels.len().saturating_sub(1);
    let kernel_sizes = kernel_sizes.broadcast("kernel_sizes", n_layers)?;
    let strides = strides.broadcast("strides", n_layers)?;
    let paddings = paddings.broadcast("paddings", n_layers)?;

    if let Some(k) = kernel_sizes.iter().find(|k| !k.is_positive()) {
        return Err(ConvNetError::InvalidConfig(format!(
            "kernel sizes must be positive, got {:?}",
            k
        )));
    }
    if let Some(s) = strides.iter().find(|s| !s.is_positive()) {
        return Err(ConvNetError::InvalidConfig(format!(
            "strides must be positive, got {:?}",
            s
        )));
    }

    Ok((0..n_layers)
        .map(|i| ConvParams {
            in_channels: channels[i],
            out_channels: channels[i + 1],
            kernel_size: kernel_sizes[i].pair(),
            stride: strides[i].pair(),
            padding: paddings[i].pair(),
        })
        .collect())
}
