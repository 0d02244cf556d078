use feeder_traits::Direction;
use rppal::gpio::{Gpio, OutputPin};

use crate::error::Result;

/// STEP/DIR/EN stepper driver on Raspberry Pi GPIO.
pub struct Stepper {
    step: OutputPin,
    dir: OutputPin,
    enable: OutputPin,
    enable_active_low: bool,
}

impl Stepper {
    pub fn open(step_pin: u8, dir_pin: u8, enable_pin: u8, enable_active_low: bool) -> Result<Self> {
        let gpio = Gpio::new()?;
        let mut step = gpio.get(step_pin)?.into_output();
        let dir = gpio.get(dir_pin)?.into_output();
        let enable = gpio.get(enable_pin)?.into_output();
        step.set_low();
        let mut s = Stepper {
            step,
            dir,
            enable,
            enable_active_low,
        };
        // Driver starts de-energised
        s.set_enabled(false);
        Ok(s)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enable_active_low {
            self.enable.set_high();
        } else {
            self.enable.set_low();
        }
    }

    pub fn set_direction(&mut self, direction: Direction) {
        match direction {
            Direction::Forward => self.dir.set_high(),
            Direction::Backward => self.dir.set_low(),
        }
    }

    pub fn set_step(&mut self, high: bool) {
        if high {
            self.step.set_high();
        } else {
            self.step.set_low();
        }
    }
}
