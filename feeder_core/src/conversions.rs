//! `From` implementations bridging `feeder_config` types to `feeder_core` types.

use std::time::Duration;

use crate::calibration::CalibrationParameters;
use crate::config::{FeedCfg, MotorCfg, SensorCfg, StableCfg};
use crate::level::FillLevel;
use crate::motor::RotationPlan;

// ── SensorCfg ────────────────────────────────────────────────────────────────

impl From<&feeder_config::SensorCfg> for SensorCfg {
    fn from(c: &feeder_config::SensorCfg) -> Self {
        Self {
            stable: StableCfg {
                attempts_factor: c.attempts_factor,
                sample_delay: Duration::from_millis(c.sample_delay_ms),
                read_timeout: Duration::from_millis(c.read_timeout_ms),
            },
            samples: c.samples,
            tare_samples: c.tare_samples,
            stabilization: Duration::from_millis(c.stabilization_ms),
            deadband_g: c.deadband_g,
        }
    }
}

// ── Motor ────────────────────────────────────────────────────────────────────

impl From<&feeder_config::MotorCfg> for MotorCfg {
    fn from(c: &feeder_config::MotorCfg) -> Self {
        Self {
            steps_per_rev: c.steps_per_rev,
        }
    }
}

impl From<&feeder_config::MotorCfg> for FeedCfg {
    fn from(c: &feeder_config::MotorCfg) -> Self {
        Self {
            forward_steps: c.feed_forward_steps,
            forward_delay: Duration::from_micros(c.feed_forward_delay_us),
            forward_pause: Duration::from_millis(c.forward_pause_ms),
            backward_steps: c.feed_backward_steps,
            backward_delay: Duration::from_micros(c.feed_backward_delay_us),
            backward_pause: Duration::from_millis(c.backward_pause_ms),
        }
    }
}

/// Manual jog defaults from `[motor]`; callers may override steps and repeats.
impl From<&feeder_config::MotorCfg> for RotationPlan {
    fn from(c: &feeder_config::MotorCfg) -> Self {
        Self {
            forward_steps: c.jog_forward_steps,
            backward_steps: c.jog_backward_steps,
            repeats: c.jog_repeats,
            step_delay: Duration::from_micros(c.jog_delay_us),
            pause: Duration::from_millis(c.jog_pause_ms),
            max_duration: Duration::from_millis(c.jog_max_ms),
            max_weight_g: Some(c.max_weight_g),
        }
    }
}

// ── Level ────────────────────────────────────────────────────────────────────

impl TryFrom<&feeder_config::LevelCfg> for FillLevel {
    type Error = eyre::Report;

    fn try_from(c: &feeder_config::LevelCfg) -> Result<Self, Self::Error> {
        FillLevel::new(c.min_distance_cm, c.max_distance_cm)
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&feeder_config::PersistedCalibration> for CalibrationParameters {
    fn from(r: &feeder_config::PersistedCalibration) -> Self {
        Self {
            offset: r.offset,
            scale: r.reference_unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_cfg_converts_units() {
        let src = feeder_config::SensorCfg {
            sample_delay_ms: 7,
            read_timeout_ms: 90,
            stabilization_ms: 0,
            ..Default::default()
        };
        let cfg = SensorCfg::from(&src);
        assert_eq!(cfg.stable.sample_delay, Duration::from_millis(7));
        assert_eq!(cfg.stable.read_timeout, Duration::from_millis(90));
        assert_eq!(cfg.stabilization, Duration::ZERO);
        assert_eq!(cfg.samples, 5);
    }

    #[test]
    fn default_motor_config_yields_default_feed_burst() {
        let feed = FeedCfg::from(&feeder_config::MotorCfg::default());
        assert_eq!(feed, FeedCfg::default());
    }

    #[test]
    fn jog_plan_takes_its_burst_shape_from_config() {
        let plan = RotationPlan::from(&feeder_config::MotorCfg::default());
        assert_eq!(plan.forward_steps, 1500);
        assert_eq!(plan.backward_steps, 200);
        assert_eq!(plan.repeats, 10);
        assert_eq!(plan.step_delay, Duration::from_micros(1000));
        assert_eq!(plan.max_weight_g, Some(1000.0));
    }

    #[test]
    fn level_config_is_validated_on_conversion() {
        let bad = feeder_config::LevelCfg {
            min_distance_cm: 10.0,
            max_distance_cm: 10.0,
            ..Default::default()
        };
        assert!(FillLevel::try_from(&bad).is_err());
    }
}
