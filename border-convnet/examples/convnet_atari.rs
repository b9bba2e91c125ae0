use anyhow::Result;
use border_convnet::{ConvNetwork, ConvNetworkConfig, ValueModel, ValueModelConfig};
use candle_core::{DType, Device, Tensor};
use clap::Parser;
use log::info;

const N_STACK: usize = 4;
const IMG_SIZE: usize = 84;

/// Builds the action-value network of the DQN Nature paper and evaluates it on random frames.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Load the network configuration from a YAML file
    #[arg(long)]
    config: Option<String>,

    /// Save the network configuration to a YAML file
    #[arg(long)]
    save_config: Option<String>,

    /// The number of observations in a batch
    #[arg(long, default_value_t = 32)]
    batch_size: usize,

    /// Use noisy linear layers in the MLP
    #[arg(long, default_value_t = false)]
    noisy: bool,

    /// Sample noise in noisy layers
    #[arg(long, default_value_t = false)]
    train: bool,
}

fn atari_config(noisy: bool) -> ConvNetworkConfig {
    ConvNetworkConfig::new([N_STACK, IMG_SIZE, IMG_SIZE])
        .channels(vec![32, 64, 64])
        .kernel_sizes(vec![8, 4, 3])
        .strides(vec![4, 2, 1])
        .mlp_layers(vec![512])
        .noisy(noisy)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let q_config = match &args.config {
        Some(path) => ConvNetworkConfig::load(path)?,
        None => atari_config(args.noisy),
    };
    println!("{}", serde_yaml::to_string(&q_config)?);
    if let Some(path) = &args.save_config {
        q_config.save(path)?;
        info!("Save config to {}", path);
    }

    let [c, w, h] = q_config.in_dim();
    let config = ValueModelConfig::default().q_config(q_config);
    let model = ValueModel::<ConvNetwork>::build(config, Device::Cpu)?;
    info!(
        "conv_out_dim = {}, out_dim = {}",
        model.q().conv_out_dim(),
        model.q().out_dim()
    );

    let obs = Tensor::rand(0f32, 255f32, (args.batch_size, c, w, h), &Device::Cpu)?
        .floor()?
        .to_dtype(DType::U8)?;
    let q = model.forward_t(&obs, args.train)?;
    info!("input shape = {:?}, output shape = {:?}", obs.dims(), q.dims());

    Ok(())
}
