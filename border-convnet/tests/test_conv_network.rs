use anyhow::Result;
use border_convnet::{ConvNetError, ConvNetwork, ConvNetworkConfig, Size2};
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build(config: ConvNetworkConfig) -> border_convnet::Result<(VarMap, ConvNetwork)> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let net = ConvNetwork::build(vb, config)?;
    Ok((varmap, net))
}

fn atari_config() -> ConvNetworkConfig {
    ConvNetworkConfig::new([4, 84, 84])
        .channels(vec![32, 64])
        .kernel_sizes(8)
        .strides(4)
        .paddings(0)
        .mlp_layers(vec![256])
}

fn max_abs_diff(xs: &Tensor, ys: &Tensor) -> Result<f32> {
    Ok((xs - ys)?.abs()?.flatten_all()?.max(0)?.to_scalar::<f32>()?)
}

fn pixels(shape: &[usize]) -> Result<Tensor> {
    Ok(Tensor::rand(0f32, 255f32, shape, &Device::Cpu)?.floor()?)
}

#[test]
fn test_identity_conv_outputs_normalized_input() -> Result<()> {
    init_logger();
    let (_varmap, net) = build(ConvNetworkConfig::new([3, 7, 5]))?;
    let xs = pixels(&[2, 3, 7, 5])?;
    let ys = net.forward(&xs)?;

    assert_eq!(ys.dims(), xs.dims());
    assert!(max_abs_diff(&ys, &(xs / 255.0)?)? < 1e-6);
    Ok(())
}

#[test]
fn test_number_of_conv_layers() -> Result<()> {
    init_logger();
    for n_layers in 1..=4 {
        let channels = vec![2; n_layers];
        let (varmap, net) = build(ConvNetworkConfig::new([1, 8, 8]).channels(channels))?;
        assert_eq!(net.n_conv_layers(), n_layers);
        assert_eq!(varmap.all_vars().len(), 2 * n_layers);
        // 1x1 kernels keep the spatial size
        assert_eq!(net.conv_out_dim(), 2 * 8 * 8);
    }
    Ok(())
}

#[test]
fn test_parameter_list_length_mismatch() {
    init_logger();
    let config = ConvNetworkConfig::new([4, 84, 84])
        .channels(vec![16, 32])
        .kernel_sizes(vec![3, 3, 3]);
    match build(config) {
        Err(ConvNetError::ConfigMismatch {
            name,
            len,
            expected,
        }) => {
            assert_eq!(name, "kernel_sizes");
            assert_eq!(len, 3);
            assert_eq!(expected, 2);
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("construction should fail"),
    }
}

#[test]
fn test_atari_output_shape() -> Result<()> {
    init_logger();
    let (_varmap, net) = build(atari_config())?;
    // 84 -> (84 - 8) / 4 + 1 = 20 -> (20 - 8) / 4 + 1 = 4
    assert_eq!(net.conv_out_dim(), 64 * 4 * 4);
    assert_eq!(net.out_dim(), 256);

    let xs = Tensor::zeros((5, 4, 84, 84), DType::U8, &Device::Cpu)?;
    assert_eq!(net.forward(&xs)?.dims(), &[5, 256]);
    Ok(())
}

#[test]
fn test_unbatched_input() -> Result<()> {
    init_logger();
    let (_varmap, net) = build(atari_config())?;
    let xs = pixels(&[4, 84, 84])?;
    let ys1 = net.forward(&xs)?;
    let ys2 = net.forward(&xs.unsqueeze(0)?)?;

    assert_eq!(ys1.dims(), &[1, 256]);
    assert!(max_abs_diff(&ys1, &ys2)? < 1e-6);
    Ok(())
}

#[test]
fn test_stacked_input() -> Result<()> {
    init_logger();
    let config = ConvNetworkConfig::new([6, 84, 84])
        .channels(vec![8])
        .kernel_sizes(8)
        .strides(4)
        .mlp_layers(vec![16]);
    let (_varmap, net) = build(config)?;

    // (batch, stack, channel, width, height)
    let xs = pixels(&[2, 3, 2, 84, 84])?;
    let ys1 = net.forward(&xs)?;
    let ys2 = net.forward(&xs.reshape((2, 6, 84, 84))?)?;

    assert_eq!(ys1.dims(), &[2, 16]);
    assert!(max_abs_diff(&ys1, &ys2)? < 1e-6);
    Ok(())
}

#[test]
fn test_normalization_factor() -> Result<()> {
    init_logger();
    let f = 17.0;
    let config = ConvNetworkConfig::new([2, 12, 12])
        .channels(vec![4, 4])
        .kernel_sizes(vec![Size2::Square(3), Size2::Rect { width: 2, height: 3 }])
        .strides(vec![2, 1])
        .paddings(1)
        .mlp_layers(vec![8]);

    // Two networks sharing the same parameters with different factors
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let net_f = ConvNetwork::build(vb.clone(), config.clone().normalization_factor(f))?;
    let net_1 = ConvNetwork::build(vb, config.normalization_factor(1.0))?;

    let xs = pixels(&[3, 2, 12, 12])?;
    let ys1 = net_f.forward(&xs)?;
    let ys2 = net_1.forward(&xs.affine(1.0 / f, 0.0)?)?;
    assert!(max_abs_diff(&ys1, &ys2)? < 1e-5);
    Ok(())
}

#[test]
fn test_unsupported_rank() -> Result<()> {
    init_logger();
    let (_varmap, net) = build(atari_config())?;
    let xs = Tensor::zeros((1, 1, 4, 1, 84, 84), DType::U8, &Device::Cpu)?;
    match net.forward(&xs) {
        Err(ConvNetError::UnsupportedRank { rank, shape }) => {
            assert_eq!(rank, 6);
            assert_eq!(shape, vec![1, 1, 4, 1, 84, 84]);
        }
        _ => panic!("rank 6 input should be rejected"),
    }
    Ok(())
}
