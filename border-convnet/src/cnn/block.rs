use crate::{param::ConvParams, util::xavier_uniform};
use candle_core::{Error, Result, Tensor};
use candle_nn::{Init, Module, VarBuilder};
use log::debug;

/// Keeps every `step`-th slice along `dim`, starting from the first one.
fn subsample(xs: &Tensor, dim: usize, step: usize) -> Result<Tensor> {
    if step == 1 {
        return Ok(xs.clone());
    }
    let n = xs.dim(dim)?;
    let ixs = Tensor::arange_step(0u32, n as u32, step as u32, xs.device())?;
    xs.index_select(&ixs, dim)
}

/// A 2D convolution followed by ReLU.
///
/// Zero padding is added symmetrically on each spatial axis before the convolution.
/// Strides may differ between the two spatial axes.
pub struct ConvBlock {
    weight: Tensor,
    bias: Tensor,
    stride: (usize, usize),
    padding: (usize, usize),
}

impl ConvBlock {
    pub(crate) fn new(p: &ConvParams, vb: VarBuilder) -> Result<Self> {
        let (kw, kh) = p.kernel_size;
        let init = xavier_uniform(&[p.out_channels, p.in_channels, kw, kh]);
        let weight = vb.get_with_hints((p.out_channels, p.in_channels, kw, kh), "weight", init)?;
        let bias = vb.get_with_hints(p.out_channels, "bias", Init::Const(0.0))?;

        Ok(Self {
            weight,
            bias,
            stride: p.stride,
            padding: p.padding,
        })
    }

    /// Returns `(out_channels, in_channels, kernel_width, kernel_height)`.
    pub fn weight_shape(&self) -> &[usize] {
        self.weight.dims()
    }

    /// Returns the strides along `(width, height)`.
    pub fn stride(&self) -> (usize, usize) {
        self.stride
    }

    /// Returns the paddings along `(width, height)`.
    pub fn padding(&self) -> (usize, usize) {
        self.padding
    }
}

impl Module for ConvBlock {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let (pw, ph) = self.padding;
        let xs = match pw {
            0 => xs.clone(),
            _ => xs.pad_with_zeros(2, pw, pw)?,
        };
        let xs = match ph {
            0 => xs,
            _ => xs.pad_with_zeros(3, ph, ph)?,
        };

        let (_, _, w, h) = xs.dims4()?;
        let (c_out, _, kw, kh) = self.weight.dims4()?;
        if w < kw || h < kh {
            return Err(Error::Msg(format!(
                "kernel ({}, {}) does not fit in padded input ({}, {})",
                kw, kh, w, h
            )));
        }

        let ys = match self.stride {
            (sw, sh) if sw == sh => xs.conv2d(&self.weight, 0, sw, 1, 1)?,
            (sw, sh) => {
                let ys = xs.conv2d(&self.weight, 0, 1, 1, 1)?;
                subsample(&subsample(&ys, 2, sw)?, 3, sh)?
            }
        };
        ys.broadcast_add(&self.bias.reshape((1, c_out, 1, 1))?)?
            .relu()
    }
}

/// A sequence of [`ConvBlock`]s.
pub struct ConvStack {
    blocks: Vec<ConvBlock>,
}

impl ConvStack {
    pub(crate) fn new(params: &[ConvParams], vb: VarBuilder) -> Result<Self> {
        let blocks = params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                debug!(
                    "conv layer {}: {} -> {}, kernel {:?}, stride {:?}, padding {:?}",
                    i, p.in_channels, p.out_channels, p.kernel_size, p.stride, p.padding
                );
                ConvBlock::new(p, vb.pp(format!("c{}", i)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { blocks })
    }

    /// Returns the number of convolution+ReLU blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if there is no block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the blocks.
    pub fn blocks(&self) -> &[ConvBlock] {
        &self.blocks
    }
}

impl Module for ConvStack {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.blocks
            .iter()
            .try_fold(xs.clone(), |xs, block| block.forward(&xs))
    }
}
