//! Observable weight-sensor state.

use std::fmt;

/// Lifecycle of a `WeightSensor`.
///
/// `Init` -> (`tare`) -> `Tared` -> (`calibrate`) -> `Ready`. A tare with an
/// existing calibration goes straight to `Ready`. Any failed transition lands
/// in `Error`, which only a successful tare clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorState {
    /// No usable calibration yet.
    Init,
    /// Offset known, scale not established.
    Tared,
    /// Measurements allowed.
    Ready,
    /// Last transition failed; re-tare to recover.
    Error,
}

impl SensorState {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorState::Init => "init",
            SensorState::Tared => "tared",
            SensorState::Ready => "ready",
            SensorState::Error => "error",
        }
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
