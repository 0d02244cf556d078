//! Stepper drive and rotation accounting.
//!
//! `MotorDrive` turns a direction and a step count into a pulse train.
//! `MotorController` owns the drive, tracks the running flag and offers the
//! manual rotation helpers. Pulse trains are not interruptible; a stop request
//! takes effect between bursts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use eyre::WrapErr;
use feeder_traits::{Clock, Direction, Motor};

use crate::config::MotorCfg;
use crate::error::{BuildError, Result};
use crate::hw_error::map_actuator_error;
use crate::sensor::WeightSensor;

/// Observable motor status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorRunState {
    pub running: bool,
    /// Always in `0..steps_per_rev`.
    pub position: u32,
}

pub struct MotorDrive {
    motor: Box<dyn Motor + Send>,
    clock: Arc<dyn Clock + Send + Sync>,
    steps_per_rev: u32,
    position: u32,
}

impl MotorDrive {
    pub fn new(
        motor: impl Motor + Send + 'static,
        clock: Arc<dyn Clock + Send + Sync>,
        cfg: MotorCfg,
    ) -> Result<Self> {
        if cfg.steps_per_rev == 0 {
            return Err(BuildError::InvalidConfig("steps_per_rev must be > 0").into());
        }
        Ok(Self {
            motor: Box::new(motor),
            clock,
            steps_per_rev: cfg.steps_per_rev,
            position: 0,
        })
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn steps_per_rev(&self) -> u32 {
        self.steps_per_rev
    }

    fn advance(&mut self, direction: Direction) {
        let spr = i64::from(self.steps_per_rev);
        let next = (i64::from(self.position) + direction.sign()).rem_euclid(spr);
        // rem_euclid keeps it in 0..spr, which fits u32
        self.position = u32::try_from(next).unwrap_or(0);
    }

    /// Enable the driver, set the direction and emit `steps` pulses with
    /// `step_delay` high and low. The driver stays enabled afterwards.
    pub fn turn_steps(&mut self, direction: Direction, steps: u32, step_delay: Duration) -> Result<()> {
        self.motor
            .set_enabled(true)
            .map_err(|e| map_actuator_error(&*e))
            .wrap_err("enable motor driver")?;
        self.motor
            .set_direction(direction)
            .map_err(|e| map_actuator_error(&*e))
            .wrap_err("set motor direction")?;
        for _ in 0..steps {
            self.motor
                .set_step(true)
                .map_err(|e| map_actuator_error(&*e))
                .wrap_err("step pulse")?;
            self.clock.sleep(step_delay);
            self.motor
                .set_step(false)
                .map_err(|e| map_actuator_error(&*e))
                .wrap_err("step pulse")?;
            self.clock.sleep(step_delay);
            self.advance(direction);
        }
        tracing::trace!(?direction, steps, position = self.position, "pulse train done");
        Ok(())
    }

    /// De-energise the driver. Safe to call repeatedly.
    pub fn stop(&mut self) -> Result<()> {
        self.motor
            .set_enabled(false)
            .map_err(|e| map_actuator_error(&*e))
            .wrap_err("disable motor driver")
    }
}

/// Manual rotation request: `repeats` bursts of forward then backward steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationPlan {
    pub forward_steps: u32,
    pub backward_steps: u32,
    pub repeats: u32,
    /// Half-period of the pulse train.
    pub step_delay: Duration,
    /// Pause after each direction change.
    pub pause: Duration,
    pub max_duration: Duration,
    /// Stop once the bowl holds more than this (when a sensor is given).
    pub max_weight_g: Option<f64>,
}

impl Default for RotationPlan {
    fn default() -> Self {
        Self {
            forward_steps: 200,
            backward_steps: 0,
            repeats: 1,
            step_delay: Duration::from_millis(1),
            pause: Duration::from_millis(500),
            max_duration: Duration::from_secs(120),
            max_weight_g: Some(1000.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    Stopped,
    MaxDuration,
    Overweight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationReport {
    pub bursts: u32,
    pub reason: StopReason,
    pub position: u32,
}

pub struct MotorController {
    drive: Mutex<MotorDrive>,
    running: AtomicBool,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl MotorController {
    pub fn new(drive: MotorDrive) -> Self {
        let clock = Arc::clone(&drive.clock);
        Self {
            drive: Mutex::new(drive),
            running: AtomicBool::new(false),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MotorDrive> {
        self.drive.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn run_state(&self) -> MotorRunState {
        MotorRunState {
            running: self.running.load(Ordering::SeqCst),
            position: self.lock().position(),
        }
    }

    pub fn turn(&self, direction: Direction, steps: u32, step_delay: Duration) -> Result<()> {
        self.lock().turn_steps(direction, steps, step_delay)
    }

    pub fn steps_to_zero(&self) -> u32 {
        let d = self.lock();
        (d.steps_per_rev() - d.position()) % d.steps_per_rev()
    }

    /// Turn forward back to logical position 0; returns the steps taken.
    pub fn return_to_zero(&self, step_delay: Duration) -> Result<u32> {
        let mut d = self.lock();
        let steps = (d.steps_per_rev() - d.position()) % d.steps_per_rev();
        if steps > 0 {
            d.turn_steps(Direction::Forward, steps, step_delay)?;
        }
        d.stop()?;
        tracing::info!(steps, "returned to zero");
        Ok(steps)
    }

    /// Clear the running flag without touching the driver. Never blocks, so
    /// it is safe from signal handlers.
    pub fn request_stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("motor stop requested");
        }
    }

    /// Clear the running flag and de-energise the driver. Idempotent.
    pub fn stop_motor(&self) {
        self.request_stop();
        if let Err(e) = self.lock().stop() {
            tracing::error!(error = %e, "failed to disable motor driver");
        }
    }

    pub fn rotate(&self, plan: &RotationPlan, sensor: Option<&WeightSensor>) -> Result<RotationReport> {
        self.running.store(true, Ordering::SeqCst);
        let start = self.clock.now();
        let mut bursts = 0;
        tracing::info!(?plan, "rotation started");

        let outcome = loop {
            if !self.running.load(Ordering::SeqCst) {
                break Ok(StopReason::Stopped);
            }
            if bursts >= plan.repeats {
                break Ok(StopReason::Completed);
            }
            if self.clock.elapsed(start) >= plan.max_duration {
                tracing::warn!(bursts, "rotation hit its time limit");
                break Ok(StopReason::MaxDuration);
            }
            if let (Some(s), Some(max)) = (sensor, plan.max_weight_g) {
                if let Some(w) = s.get_weight().filter(|w| *w > max) {
                    tracing::warn!(grams = w, max_weight_g = max, "bowl over weight; stopping rotation");
                    break Ok(StopReason::Overweight);
                }
            }
            if let Err(e) = self.burst(plan) {
                break Err(e);
            }
            bursts += 1;
        };

        self.running.store(false, Ordering::SeqCst);
        let stop_res = self.lock().stop();
        let reason = outcome.wrap_err("rotation")?;
        stop_res?;
        let report = RotationReport {
            bursts,
            reason,
            position: self.lock().position(),
        };
        tracing::info!(bursts, ?reason, position = report.position, "rotation finished");
        Ok(report)
    }

    fn burst(&self, plan: &RotationPlan) -> Result<()> {
        if plan.forward_steps > 0 {
            self.turn(Direction::Forward, plan.forward_steps, plan.step_delay)?;
            self.clock.sleep(plan.pause);
        }
        if plan.backward_steps > 0 {
            self.turn(Direction::Backward, plan.backward_steps, plan.step_delay)?;
            self.clock.sleep(plan.pause);
        }
        Ok(())
    }
}
