//! Utilities.
use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{Init, ModuleT};
use log::trace;

/// Xavier/Glorot uniform initializer for a weight of the given shape.
///
/// The first two axes are the output and input features. The product of the remaining axes,
/// the receptive field of a convolution kernel, multiplies both fans.
pub fn xavier_uniform(shape: &[usize]) -> Init {
    let receptive_field: usize = shape.iter().skip(2).product();
    let fan_out = shape.first().copied().unwrap_or(1) * receptive_field;
    let fan_in = shape.get(1).copied().unwrap_or(1) * receptive_field;
    let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();

    Init::Uniform {
        lo: -bound,
        up: bound,
    }
}

/// Returns the number of elements in the output of `net` for a single observation.
///
/// A zero tensor of shape `(1, in_dim[0], in_dim[1], in_dim[2])` is fed to `net` in
/// evaluation mode.
pub fn calculate_output_dim<M: ModuleT>(
    net: &M,
    in_dim: [usize; 3],
    dtype: DType,
    device: &Device,
) -> Result<usize> {
    let [c, w, h] = in_dim;
    let xs = Tensor::zeros((1, c, w, h), dtype, device)?;
    let ys = net.forward_t(&xs, false)?;
    trace!("Inferred output shape {:?} from input shape {:?}", ys.dims(), xs.dims());
    Ok(ys.elem_count())
}
