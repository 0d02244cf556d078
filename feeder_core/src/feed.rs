//! Closed-loop dispensing: anti-jam bursts until the bowl gained the target.

use std::sync::Arc;
use std::time::Duration;

use feeder_traits::{Clock, Direction};

use crate::config::FeedCfg;
use crate::error::{FeederError, Result, feeder_error};
use crate::motor::MotorController;
use crate::sensor::WeightSensor;
use crate::util::round1;

/// Result of one `feed_until_weight` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedingOutcome {
    pub success: bool,
    /// Weight gained since the start, rounded to 0.1 g. May overshoot.
    pub fed_g: f64,
    pub message: String,
    /// Typed cause when `success` is false.
    pub error: Option<FeederError>,
    pub bursts: u32,
}

impl FeedingOutcome {
    fn done(fed_g: f64, target_g: f64, bursts: u32) -> Self {
        Self {
            success: true,
            fed_g,
            message: format!("{fed_g:.1}g fed (target: {target_g}g)"),
            error: None,
            bursts,
        }
    }

    fn failed(err: FeederError, fed_g: f64, bursts: u32) -> Self {
        Self {
            success: false,
            fed_g,
            message: err.to_string(),
            error: Some(err),
            bursts,
        }
    }
}

pub struct FeedController {
    sensor: Arc<WeightSensor>,
    motor: Arc<MotorController>,
    clock: Arc<dyn Clock + Send + Sync>,
    cfg: FeedCfg,
}

impl FeedController {
    pub fn new(
        sensor: Arc<WeightSensor>,
        motor: Arc<MotorController>,
        clock: Arc<dyn Clock + Send + Sync>,
        cfg: FeedCfg,
    ) -> Self {
        Self {
            sensor,
            motor,
            clock,
            cfg,
        }
    }

    pub fn sensor(&self) -> &Arc<WeightSensor> {
        &self.sensor
    }

    pub fn motor(&self) -> &Arc<MotorController> {
        &self.motor
    }

    /// One burst: forward run, settle, short reverse, settle.
    fn burst(&self) -> Result<()> {
        let c = &self.cfg;
        self.motor
            .turn(Direction::Forward, c.forward_steps, c.forward_delay)?;
        self.clock.sleep(c.forward_pause);
        self.motor
            .turn(Direction::Backward, c.backward_steps, c.backward_delay)?;
        self.clock.sleep(c.backward_pause);
        Ok(())
    }

    /// Dispense until the bowl gained `target_g` grams or `timeout` elapsed.
    ///
    /// Never panics or returns an error; failures come back as an outcome
    /// with `success == false` and the motor de-energised. Callers must not
    /// run two feeds on the same motor concurrently.
    pub fn feed_until_weight(&self, target_g: f64, timeout: Duration) -> FeedingOutcome {
        if !target_g.is_finite() || target_g <= 0.0 {
            return FeedingOutcome::failed(
                FeederError::InvalidInput(format!("target must be > 0 g, got {target_g}")),
                0.0,
                0,
            );
        }
        if !self.sensor.is_ready() {
            tracing::error!(state = %self.sensor.state(), "feed refused: weight sensor not ready");
            return FeedingOutcome::failed(
                FeederError::SensorUnavailable(format!("sensor state is {}", self.sensor.state())),
                0.0,
                0,
            );
        }
        let initial = match self.sensor.try_get_weight() {
            Ok(w) => w,
            Err(e) => {
                tracing::error!(error = %e, "feed refused: no initial weight");
                return FeedingOutcome::failed(FeederError::SensorUnavailable(e.to_string()), 0.0, 0);
            }
        };

        tracing::info!(target_g, initial_g = initial, timeout_s = timeout.as_secs_f64(), "feeding started");
        let start = self.clock.now();
        let mut fed = 0.0;
        let mut bursts = 0;

        while self.clock.elapsed(start) < timeout {
            let current = match self.sensor.try_get_weight() {
                Ok(w) => w,
                Err(e) => {
                    self.motor.stop_motor();
                    tracing::error!(error = %e, fed_g = fed, "weight lost during feeding");
                    let err = feeder_error(&e)
                        .cloned()
                        .unwrap_or_else(|| FeederError::SensorUnavailable(e.to_string()));
                    return FeedingOutcome::failed(err, fed, bursts);
                }
            };
            fed = round1(current - initial);
            tracing::debug!(current_g = current, fed_g = fed, bursts, "feed progress");

            if fed >= target_g {
                self.motor.stop_motor();
                tracing::info!(fed_g = fed, target_g, bursts, "feeding complete");
                return FeedingOutcome::done(fed, target_g, bursts);
            }

            if let Err(e) = self.burst() {
                self.motor.stop_motor();
                tracing::error!(error = %e, fed_g = fed, "motor fault during feeding");
                let err = feeder_error(&e)
                    .cloned()
                    .unwrap_or_else(|| FeederError::HardwareFault(e.to_string()));
                return FeedingOutcome::failed(err, fed, bursts);
            }
            bursts += 1;
        }

        self.motor.stop_motor();
        tracing::warn!(fed_g = fed, target_g, bursts, "feeding timed out");
        FeedingOutcome::failed(
            FeederError::TimeoutExceeded {
                fed_g: fed,
                target_g,
            },
            fed,
            bursts,
        )
    }
}
