use thiserror::Error;

/// Errors raised by the flight core.
///
/// None of these are per-frame faults: a bad config is caught when the
/// simulator is built, and a bad timestep is a bug in the caller's clock.
#[derive(Error, Debug)]
pub enum FlightError {
    #[error("invalid vehicle config: `{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("invalid timestep {0}: dt must be finite and non-negative")]
    InvalidTimestep(f64),

    #[error("failed to read vehicle config: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse vehicle config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlightError>;
