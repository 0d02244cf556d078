#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration persistence for the feeder.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `PersistedCalibration` is the JSON record written after every successful
//!   tare or calibration (see the `calibration` module).
use serde::Deserialize;

pub mod calibration;

pub use calibration::{PersistedCalibration, read_calibration_file, write_atomic, write_calibration_file};

/// BCM pin numbers.
#[derive(Debug, Deserialize)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    pub motor_step: u8,
    pub motor_dir: u8,
    pub motor_en: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    /// Samples per stable reading
    pub samples: usize,
    /// Samples per stable reading while taring
    pub tare_samples: usize,
    /// Read attempts allowed per wanted sample
    pub attempts_factor: usize,
    pub sample_delay_ms: u64,
    /// Max time to wait for HX711 data-ready per read
    pub read_timeout_ms: u64,
    /// Mechanical settling before tare/calibrate
    pub stabilization_ms: u64,
    /// Magnitudes below this are reported as exactly 0 g
    pub deadband_g: f64,
    /// JSON calibration record location
    pub calibration_file: String,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            samples: 5,
            tare_samples: 20,
            attempts_factor: 6,
            sample_delay_ms: 10,
            read_timeout_ms: 150,
            stabilization_ms: 2000,
            deadband_g: 3.0,
            calibration_file: "kalibrierung.json".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MotorCfg {
    /// Full steps per revolution of the stepper (200 for a 1.8° motor)
    pub steps_per_rev: u32,
    pub feed_forward_steps: u32,
    pub feed_forward_delay_us: u64,
    pub feed_backward_steps: u32,
    pub feed_backward_delay_us: u64,
    pub forward_pause_ms: u64,
    pub backward_pause_ms: u64,
    /// Manual jog burst shape and count
    pub jog_forward_steps: u32,
    pub jog_backward_steps: u32,
    pub jog_repeats: u32,
    /// Half-period for manual jog bursts
    pub jog_delay_us: u64,
    pub jog_pause_ms: u64,
    /// Hard cap on a manual rotation run
    pub jog_max_ms: u64,
    /// Manual rotation stops once the bowl holds more than this
    pub max_weight_g: f64,
    /// Enable line is active low on A4988/DRV8825 boards
    pub enable_active_low: bool,
}

impl Default for MotorCfg {
    fn default() -> Self {
        Self {
            steps_per_rev: 200,
            feed_forward_steps: 200,
            feed_forward_delay_us: 500,
            feed_backward_steps: 100,
            feed_backward_delay_us: 2000,
            forward_pause_ms: 200,
            backward_pause_ms: 50,
            jog_forward_steps: 1500,
            jog_backward_steps: 200,
            jog_repeats: 10,
            jog_delay_us: 1000,
            jog_pause_ms: 500,
            jog_max_ms: 120_000,
            max_weight_g: 1000.0,
            enable_active_low: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FeedingCfg {
    pub default_timeout_s: u64,
}

impl Default for FeedingCfg {
    fn default() -> Self {
        Self {
            default_timeout_s: 300,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LevelCfg {
    /// Distance reported as a full hopper (100 %)
    pub min_distance_cm: f64,
    /// Distance reported as an empty hopper (0 %)
    pub max_distance_cm: f64,
    pub max_retries: u32,
    pub i2c_bus: u8,
}

impl Default for LevelCfg {
    fn default() -> Self {
        Self {
            min_distance_cm: 4.0,
            max_distance_cm: 55.0,
            max_retries: 3,
            i2c_bus: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistoryCfg {
    /// JSON-lines consumption log
    pub file: String,
    pub retention_days: u32,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self {
            file: "consumption.jsonl".to_string(),
            retention_days: 90,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Parameters of the simulated back-end; ignored on real hardware.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationCfg {
    pub zero_counts: i32,
    pub counts_per_gram: f64,
    pub grams_per_step: f64,
    pub noise_counts: i32,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            zero_counts: 84_000,
            counts_per_gram: 420.0,
            grams_per_step: 0.04,
            noise_counts: 40,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub sensor: SensorCfg,
    #[serde(default)]
    pub motor: MotorCfg,
    #[serde(default)]
    pub feeding: FeedingCfg,
    #[serde(default)]
    pub level: LevelCfg,
    #[serde(default)]
    pub history: HistoryCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub simulation: SimulationCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if self.sensor.samples == 0 {
            eyre::bail!("sensor.samples must be >= 1");
        }
        if self.sensor.tare_samples == 0 {
            eyre::bail!("sensor.tare_samples must be >= 1");
        }
        if self.sensor.attempts_factor == 0 {
            eyre::bail!("sensor.attempts_factor must be >= 1");
        }
        if self.sensor.samples > 1000 || self.sensor.tare_samples > 1000 {
            eyre::bail!("sensor sample counts are unreasonably large (>1000)");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }
        if self.sensor.stabilization_ms > 60 * 1000 {
            eyre::bail!("sensor.stabilization_ms is unreasonably large (>60s)");
        }
        if !self.sensor.deadband_g.is_finite() || self.sensor.deadband_g < 0.0 {
            eyre::bail!("sensor.deadband_g must be >= 0.0");
        }
        if self.sensor.calibration_file.trim().is_empty() {
            eyre::bail!("sensor.calibration_file must not be empty");
        }

        // Motor
        if self.motor.steps_per_rev == 0 {
            eyre::bail!("motor.steps_per_rev must be > 0");
        }
        if self.motor.feed_forward_steps == 0 {
            eyre::bail!("motor.feed_forward_steps must be > 0");
        }
        if self.motor.jog_repeats == 0 {
            eyre::bail!("motor.jog_repeats must be >= 1");
        }
        if self.motor.jog_max_ms == 0 {
            eyre::bail!("motor.jog_max_ms must be >= 1");
        }
        if !self.motor.max_weight_g.is_finite() || self.motor.max_weight_g <= 0.0 {
            eyre::bail!("motor.max_weight_g must be > 0.0");
        }

        // Feeding
        if self.feeding.default_timeout_s == 0 {
            eyre::bail!("feeding.default_timeout_s must be >= 1");
        }
        if self.feeding.default_timeout_s > 60 * 60 {
            eyre::bail!("feeding.default_timeout_s is unreasonably large (>1h)");
        }

        // Level
        if !(self.level.min_distance_cm.is_finite() && self.level.max_distance_cm.is_finite()) {
            eyre::bail!("level distances must be finite");
        }
        if self.level.min_distance_cm < 0.0 {
            eyre::bail!("level.min_distance_cm must be >= 0.0");
        }
        if self.level.max_distance_cm <= self.level.min_distance_cm {
            eyre::bail!("level.max_distance_cm must be > level.min_distance_cm");
        }

        // History
        if self.history.retention_days == 0 {
            eyre::bail!("history.retention_days must be >= 1");
        }

        // Simulation
        if !self.simulation.counts_per_gram.is_finite() || self.simulation.counts_per_gram == 0.0 {
            eyre::bail!("simulation.counts_per_gram must be non-zero");
        }
        if !self.simulation.grams_per_step.is_finite() || self.simulation.grams_per_step < 0.0 {
            eyre::bail!("simulation.grams_per_step must be >= 0.0");
        }

        Ok(())
    }
}
