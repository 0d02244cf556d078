//! Feeder hardware back-ends.
//!
//! The simulated back-end is always built. Raspberry Pi back-ends (HX711 load
//! cell, STEP/DIR/EN stepper driver, VL53L0X range sensor) are compiled with
//! the `hardware` feature on Linux.

pub mod error;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hx711;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod stepper;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod vl53l0x;

pub use sim::{SimParams, SimulatedFeeder, SimulatedMotor, SimulatedRange, SimulatedScale};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use hardware::{HardwareMotor, HardwareRange, HardwareScale};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hardware {
    use std::time::Duration;

    use feeder_traits::{BoxError, Direction, Motor, RangeSensor, Scale};

    use crate::error::HwError;
    use crate::hx711::{GAIN_A_128, Hx711};
    use crate::stepper::Stepper;
    use crate::vl53l0x::Vl53l0x;

    pub struct HardwareScale {
        hx711: Hx711,
        max_retries: u32,
    }

    impl HardwareScale {
        pub fn try_new(dt_pin: u8, sck_pin: u8) -> Result<Self, HwError> {
            Ok(Self {
                hx711: Hx711::open(dt_pin, sck_pin, GAIN_A_128)?,
                max_retries: 3,
            })
        }
    }

    impl Scale for HardwareScale {
        fn read(&mut self, timeout: Duration) -> Result<i32, BoxError> {
            let mut attempts = 0;
            loop {
                match self.hx711.read_with_timeout(timeout) {
                    Ok(raw) => {
                        tracing::trace!(raw, "hx711 sample");
                        return Ok(raw);
                    }
                    Err(HwError::DataReadyTimeout) if attempts < self.max_retries => {
                        attempts += 1;
                        tracing::warn!(retries = attempts, "scale timeout, retrying");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "scale read error");
                        return Err(Box::new(e));
                    }
                }
            }
        }
    }

    pub struct HardwareMotor {
        stepper: Stepper,
    }

    impl HardwareMotor {
        pub fn try_new(
            step_pin: u8,
            dir_pin: u8,
            enable_pin: u8,
            enable_active_low: bool,
        ) -> Result<Self, HwError> {
            Ok(Self {
                stepper: Stepper::open(step_pin, dir_pin, enable_pin, enable_active_low)?,
            })
        }
    }

    impl Motor for HardwareMotor {
        fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxError> {
            self.stepper.set_enabled(enabled);
            Ok(())
        }
        fn set_direction(&mut self, direction: Direction) -> Result<(), BoxError> {
            self.stepper.set_direction(direction);
            Ok(())
        }
        fn set_step(&mut self, high: bool) -> Result<(), BoxError> {
            self.stepper.set_step(high);
            Ok(())
        }
    }

    pub struct HardwareRange {
        sensor: Vl53l0x,
    }

    impl HardwareRange {
        pub fn try_new(bus: u8) -> Result<Self, HwError> {
            Ok(Self {
                sensor: Vl53l0x::open(bus, Duration::from_millis(100))?,
            })
        }
    }

    impl RangeSensor for HardwareRange {
        fn read_mm(&mut self) -> Result<u16, BoxError> {
            self.sensor.read_range_mm().map_err(|e| Box::new(e) as BoxError)
        }
    }
}
