//! Runtime configuration for the feeder engine.
//!
//! These are the structs the core operates on. They are separate from the
//! TOML-deserialized config in `feeder_config`; see `conversions`.

use std::time::Duration;

/// Sampling policy of the `StableReader`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StableCfg {
    /// Read attempts allowed per wanted sample before giving up.
    pub attempts_factor: usize,
    /// Pause after every read attempt.
    pub sample_delay: Duration,
    /// Per-read data-ready timeout handed to the transducer.
    pub read_timeout: Duration,
}

impl Default for StableCfg {
    fn default() -> Self {
        Self {
            attempts_factor: 6,
            sample_delay: Duration::from_millis(10),
            read_timeout: Duration::from_millis(150),
        }
    }
}

/// Weight sensor configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorCfg {
    pub stable: StableCfg,
    /// Samples per stable reading for measurement and calibration.
    pub samples: usize,
    /// Samples per stable reading while taring.
    pub tare_samples: usize,
    /// Settling wait before tare and calibration.
    pub stabilization: Duration,
    /// Weights with a smaller magnitude are reported as 0 g.
    pub deadband_g: f64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            stable: StableCfg::default(),
            samples: 5,
            tare_samples: 20,
            stabilization: Duration::from_secs(2),
            deadband_g: 3.0,
        }
    }
}

/// Stepper geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCfg {
    pub steps_per_rev: u32,
}

impl Default for MotorCfg {
    fn default() -> Self {
        Self { steps_per_rev: 200 }
    }
}

/// Shape of one anti-jam feed burst: forward run, pause, short reverse, pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCfg {
    pub forward_steps: u32,
    /// Half-period of the forward pulse train.
    pub forward_delay: Duration,
    pub forward_pause: Duration,
    pub backward_steps: u32,
    /// Half-period of the reverse pulse train.
    pub backward_delay: Duration,
    pub backward_pause: Duration,
}

impl Default for FeedCfg {
    fn default() -> Self {
        Self {
            forward_steps: 200,
            forward_delay: Duration::from_micros(500),
            forward_pause: Duration::from_millis(200),
            backward_steps: 100,
            backward_delay: Duration::from_micros(2000),
            backward_pause: Duration::from_millis(50),
        }
    }
}
