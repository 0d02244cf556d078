//! Hardware seams shared by the feeder crates.
//!
//! Every trait returns `Box<dyn Error + Send + Sync>` so back-ends can surface
//! their own error types; `feeder_core` maps them to typed errors.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Raw load-cell transducer (e.g. HX711). Returns sensor-native counts.
pub trait Scale {
    fn read(&mut self, timeout: std::time::Duration) -> Result<i32, BoxError>;
}

/// Rotation direction of the dispensing auger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Conveys food towards the bowl.
    Forward,
    /// Loosens jammed food.
    Backward,
}

impl Direction {
    /// Signed multiplier used for position accounting.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// Pin-level stepper driver (STEP/DIR/EN, e.g. A4988 or DRV8825).
///
/// Pulse timing is owned by the caller; implementations only drive lines.
pub trait Motor {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxError>;
    fn set_direction(&mut self, direction: Direction) -> Result<(), BoxError>;
    fn set_step(&mut self, high: bool) -> Result<(), BoxError>;
}

/// Time-of-flight distance sensor (e.g. VL53L0X).
pub trait RangeSensor {
    fn read_mm(&mut self) -> Result<u16, BoxError>;
}

impl<T: Scale + ?Sized> Scale for Box<T> {
    fn read(&mut self, timeout: std::time::Duration) -> Result<i32, BoxError> {
        (**self).read(timeout)
    }
}

impl<T: Motor + ?Sized> Motor for Box<T> {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxError> {
        (**self).set_enabled(enabled)
    }
    fn set_direction(&mut self, direction: Direction) -> Result<(), BoxError> {
        (**self).set_direction(direction)
    }
    fn set_step(&mut self, high: bool) -> Result<(), BoxError> {
        (**self).set_step(high)
    }
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn read_mm(&mut self) -> Result<u16, BoxError> {
        (**self).read_mm()
    }
}
