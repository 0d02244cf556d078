use rppal::gpio::{Gpio, InputPin, OutputPin};
use std::time::Duration;
use tracing::trace;

use crate::error::Result;
use crate::util::wait_until_low_with_timeout;

/// Channel A, gain 128: one extra clock pulse after the 24 data bits.
pub const GAIN_A_128: u8 = 1;

/// Bit-banged HX711 24-bit load-cell ADC.
pub struct Hx711 {
    dt: InputPin,
    sck: OutputPin,
    gain_pulses: u8,
}

impl Hx711 {
    pub fn open(dt_pin: u8, sck_pin: u8, gain_pulses: u8) -> Result<Self> {
        let gpio = Gpio::new()?;
        let dt = gpio.get(dt_pin)?.into_input();
        let mut sck = gpio.get(sck_pin)?.into_output();
        sck.set_low(); // clock idle low; holding it high >60us powers the chip down
        Ok(Self {
            dt,
            sck,
            gain_pulses,
        })
    }

    pub fn read_with_timeout(&mut self, timeout: Duration) -> Result<i32> {
        // DT goes low once a conversion is ready
        let dt = &self.dt;
        wait_until_low_with_timeout(|| dt.is_high(), timeout, Duration::from_micros(200))?;

        let mut value: i32 = 0;
        for _ in 0..24 {
            self.sck.set_high();
            spin_delay();
            value = (value << 1) | i32::from(self.dt.is_high());
            self.sck.set_low();
            spin_delay();
        }

        // Extra pulses select gain/channel of the next conversion
        for _ in 0..self.gain_pulses {
            self.sck.set_high();
            spin_delay();
            self.sck.set_low();
            spin_delay();
        }

        // Sign extend 24-bit two's complement
        if (value & 0x80_0000) != 0 {
            value |= !0xFF_FFFF;
        }
        trace!(raw = value, "hx711 raw read");
        Ok(value)
    }
}

#[inline(always)]
fn spin_delay() {
    std::hint::spin_loop();
}
