use rppal::i2c::I2c;
use std::time::Duration;
use tracing::trace;

use crate::error::Result;
use crate::util::poll_until;

pub const DEFAULT_ADDRESS: u16 = 0x29;

const REG_SYSRANGE_START: u8 = 0x00;
const REG_INTERRUPT_CLEAR: u8 = 0x0B;
const REG_RESULT_INTERRUPT_STATUS: u8 = 0x13;
const REG_RESULT_RANGE_MM: u8 = 0x14 + 10;

/// Minimal single-shot driver for the VL53L0X time-of-flight sensor.
///
/// Uses the factory defaults left by the sensor's boot sequence; no SPAD or
/// reference calibration is performed.
pub struct Vl53l0x {
    i2c: I2c,
    timeout: Duration,
}

impl Vl53l0x {
    pub fn open(bus: u8, timeout: Duration) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(DEFAULT_ADDRESS)?;
        Ok(Self { i2c, timeout })
    }

    fn read_u8(&self, reg: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(&[reg], &mut buf)?;
        Ok(buf[0])
    }

    pub fn read_range_mm(&mut self) -> Result<u16> {
        self.i2c.write(&[REG_SYSRANGE_START, 0x01])?;
        poll_until(
            || Ok(self.read_u8(REG_RESULT_INTERRUPT_STATUS)? & 0x07 != 0),
            self.timeout,
            Duration::from_millis(2),
        )?;
        let mut buf = [0u8; 2];
        self.i2c.write_read(&[REG_RESULT_RANGE_MM], &mut buf)?;
        self.i2c.write(&[REG_INTERRUPT_CLEAR, 0x01])?;
        let mm = u16::from_be_bytes(buf);
        trace!(mm, "vl53l0x range");
        Ok(mm)
    }
}
