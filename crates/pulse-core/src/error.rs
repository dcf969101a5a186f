//! Error types shared by publisher and observer.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while building a publisher or observer configuration.
///
/// All of these are fatal to startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "threshold ordering violated: aggressive_max ({aggressive_max}) must be below conservative_max ({conservative_max})"
    )]
    ThresholdOrder {
        aggressive_max: f64,
        conservative_max: f64,
    },

    #[error("threshold {name} = {value} is outside [0, 1]")]
    ThresholdRange { name: &'static str, value: f64 },

    #[error("invalid pulse endpoint {0:?}: must be an absolute path without '{{', '}}' or '*'")]
    InvalidEndpoint(String),

    #[error("pulse endpoint {0:?} collides with an application route")]
    EndpointConflict(String),

    #[error("initial load {0} is outside [0, 1]")]
    InitialLoad(f64),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A pulse header that is present but unusable.
///
/// The observer recovers from these locally; they never reach the caller
/// of a wrapped request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PulseHeaderError {
    #[error("pulse header is not visible ASCII")]
    NotAscii,

    #[error("pulse header {0:?} is not a decimal number")]
    NotDecimal(String),

    #[error("pulse value {0} is outside [0, 1]")]
    OutOfRange(f64),
}
