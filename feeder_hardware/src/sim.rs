//! Simulated feeder hardware.
//!
//! One `SimulatedFeeder` owns the physical state (bowl contents, hopper
//! distance, motor lines). The scale, motor and range handles it hands out
//! share that state, so forward steps visibly add food to the bowl.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use feeder_traits::{BoxError, Direction, Motor, RangeSensor, Scale};

use crate::error::HwError;

/// Physical model parameters for the simulation.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Raw counts reported with an empty bowl.
    pub zero_counts: i32,
    /// Raw counts per gram on the bowl.
    pub counts_per_gram: f64,
    /// Grams delivered per forward step of the auger.
    pub grams_per_step: f64,
    /// Peak-to-peak amplitude of the deterministic read noise, in counts.
    pub noise_counts: i32,
    /// Hopper distance reading when full, in mm.
    pub hopper_full_mm: u16,
    /// Hopper distance growth per gram dispensed, in mm.
    pub hopper_mm_per_gram: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            zero_counts: 84_000,
            counts_per_gram: 420.0,
            grams_per_step: 0.04,
            noise_counts: 40,
            hopper_full_mm: 60,
            hopper_mm_per_gram: 0.2,
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    bowl_g: f64,
    dispensed_g: f64,
    enabled: bool,
    direction: Option<Direction>,
    step_high: bool,
    forward_steps: u64,
    backward_steps: u64,
    reads: u64,
    dropout_every: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedFeeder {
    params: SimParams,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedFeeder {
    pub fn new(params: SimParams) -> Self {
        Self {
            params,
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A poisoned simulation is still usable; recover the inner state.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn params(&self) -> SimParams {
        self.params
    }

    pub fn scale(&self) -> SimulatedScale {
        SimulatedScale {
            feeder: self.clone(),
        }
    }

    pub fn motor(&self) -> SimulatedMotor {
        SimulatedMotor {
            feeder: self.clone(),
        }
    }

    pub fn range(&self) -> SimulatedRange {
        SimulatedRange {
            feeder: self.clone(),
        }
    }

    /// Put (or take, when negative) a mass on the bowl.
    pub fn place_weight(&self, grams: f64) {
        let mut s = self.lock();
        s.bowl_g = (s.bowl_g + grams).max(0.0);
    }

    pub fn bowl_grams(&self) -> f64 {
        self.lock().bowl_g
    }

    pub fn forward_steps(&self) -> u64 {
        self.lock().forward_steps
    }

    pub fn backward_steps(&self) -> u64 {
        self.lock().backward_steps
    }

    pub fn motor_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Make every `n`-th scale read fail with a timeout (0 disables).
    pub fn set_dropout_every(&self, n: u64) {
        self.lock().dropout_every = n;
    }
}

pub struct SimulatedScale {
    feeder: SimulatedFeeder,
}

impl Scale for SimulatedScale {
    fn read(&mut self, _timeout: Duration) -> Result<i32, BoxError> {
        let p = self.feeder.params;
        let mut s = self.feeder.lock();
        s.reads = s.reads.wrapping_add(1);
        if s.dropout_every > 0 && s.reads % s.dropout_every == 0 {
            return Err(Box::new(HwError::Timeout));
        }
        // Triangle pattern in [-noise/2, +noise/2]
        let phase = (s.reads % 5) as i32 - 2;
        let noise = phase * p.noise_counts / 4;
        let raw = f64::from(p.zero_counts) + s.bowl_g * p.counts_per_gram + f64::from(noise);
        tracing::trace!(raw, bowl_g = s.bowl_g, "simulated scale read");
        Ok(raw.round() as i32)
    }
}

pub struct SimulatedMotor {
    feeder: SimulatedFeeder,
}

impl Motor for SimulatedMotor {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxError> {
        self.feeder.lock().enabled = enabled;
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), BoxError> {
        self.feeder.lock().direction = Some(direction);
        Ok(())
    }

    fn set_step(&mut self, high: bool) -> Result<(), BoxError> {
        let grams_per_step = self.feeder.params.grams_per_step;
        let mut s = self.feeder.lock();
        let rising = high && !s.step_high;
        s.step_high = high;
        if rising && s.enabled {
            match s.direction {
                Some(Direction::Forward) => {
                    s.forward_steps += 1;
                    s.bowl_g += grams_per_step;
                    s.dispensed_g += grams_per_step;
                }
                Some(Direction::Backward) => s.backward_steps += 1,
                None => {}
            }
        }
        Ok(())
    }
}

pub struct SimulatedRange {
    feeder: SimulatedFeeder,
}

impl RangeSensor for SimulatedRange {
    fn read_mm(&mut self) -> Result<u16, BoxError> {
        let p = self.feeder.params;
        let s = self.feeder.lock();
        let mm = f64::from(p.hopper_full_mm) + s.dispensed_g * p.hopper_mm_per_gram;
        Ok(mm.min(8190.0).round() as u16)
    }
}
