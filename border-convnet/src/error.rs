//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum ConvNetError {
    /// A per-layer hyperparameter list disagrees with the length of `channels`.
    #[error("parameter list length mismatch: `{name}` has {len} entries, `channels` has {expected}")]
    ConfigMismatch {
        /// Name of the offending field.
        name: &'static str,

        /// Length of the offending list.
        len: usize,

        /// Length of `channels`.
        expected: usize,
    },

    /// A configuration value is out of its domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The rank of the input tensor is not one of 3, 4 or 5.
    #[error("unsupported input rank {rank}, expected 3, 4 or 5 (shape {shape:?})")]
    UnsupportedRank {
        /// Rank of the given tensor.
        rank: usize,

        /// Shape of the given tensor.
        shape: Vec<usize>,
    },

    /// Error raised by candle, shape mismatches between the input and the layers included.
    #[error(transparent)]
    Tensor(#[from] candle_core::Error),

    /// Failed to read or write a file.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failed to (de)serialize a configuration.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type of the library.
pub type Result<T> = std::result::Result<T, ConvNetError>;
