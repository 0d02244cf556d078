use thiserror::Error;

use crate::status::SensorState;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FeederError {
    #[error("insufficient samples: {collected} of {required} reads succeeded")]
    InsufficientSamples { collected: usize, required: usize },
    #[error("sensor not ready (state {0})")]
    NotReady(SensorState),
    #[error("calibration reading too close to tare offset (delta {delta:.2} counts)")]
    CalibrationTooClose { delta: f64 },
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("feed timed out: {fed_g:.1} g of {target_g} g dispensed")]
    TimeoutExceeded { fed_g: f64, target_g: f64 },
    #[error("weight sensor unavailable: {0}")]
    SensorUnavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing scale")]
    MissingScale,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

/// Find the typed error inside a report, looking through `wrap_err` layers.
pub fn feeder_error(report: &Report) -> Option<&FeederError> {
    report
        .chain()
        .find_map(|e| e.downcast_ref::<FeederError>())
}
