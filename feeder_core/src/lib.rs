#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core feeder logic (hardware-agnostic).
//!
//! All hardware interactions go through the `feeder_traits::Scale`,
//! `feeder_traits::Motor` and `feeder_traits::RangeSensor` traits.
//!
//! ## Architecture
//!
//! - **StableReader**: burst sampling with median/MAD outlier rejection (`stable`)
//! - **Calibration**: offset/scale model and its persistence (`calibration`)
//! - **WeightSensor**: tare -> calibrate -> ready -> measure state machine (`sensor`)
//! - **Motor**: pulse-train drive and rotation accounting (`motor`)
//! - **Feed**: closed-loop feed-until-weight with anti-jam bursts (`feed`)
//! - **Level / History**: hopper fill level and consumption log
//!
//! Every public operation has a `try_*` form returning `eyre::Result` with a
//! typed `FeederError` inside, and a plain form that logs and returns
//! `bool`/`Option`.

pub mod calibration;
pub mod config;
pub mod conversions;
pub mod error;
pub mod feed;
pub mod history;
pub mod hw_error;
pub mod level;
pub mod mocks;
pub mod motor;
pub mod sensor;
pub mod stable;
pub mod status;
pub mod util;

pub use calibration::{
    CalibrationParameters, CalibrationStore, FileCalibrationStore, MemoryCalibrationStore,
};
pub use config::{FeedCfg, MotorCfg, SensorCfg, StableCfg};
pub use error::{BuildError, FeederError, Result};
pub use feed::{FeedController, FeedingOutcome};
pub use history::{ConsumptionLog, DailySummary, FeedRecord};
pub use level::{FillLevel, LevelSensor};
pub use motor::{MotorController, MotorDrive, MotorRunState, RotationPlan, RotationReport, StopReason};
pub use sensor::{WeightSensor, WeightSensorBuilder};
pub use stable::{StableReader, robust_mean};
pub use status::SensorState;
