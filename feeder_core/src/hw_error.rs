//! Maps `Box<dyn Error>` from trait boundaries to typed `FeederError`.
//!
//! The traits in `feeder_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `feeder_hardware::HwError` downcasting.

use crate::error::FeederError;

/// Map a trait-boundary error to a typed `FeederError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> FeederError {
    #[cfg(feature = "hardware-errors")]
    {
        use feeder_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::DataReadyTimeout | HwError::RangeTimeout => {
                    FeederError::Timeout
                }
                other => FeederError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        FeederError::Timeout
    } else {
        FeederError::Hardware(s)
    }
}

/// Map any driver error into a `HardwareFault` (used for actuators, where a
/// timeout is as fatal as any other failure).
pub fn map_actuator_error(e: &(dyn std::error::Error + 'static)) -> FeederError {
    match map_hw_error(e) {
        FeederError::HardwareFault(s) | FeederError::Hardware(s) => FeederError::HardwareFault(s),
        other => FeederError::HardwareFault(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_heuristics_detect_timeouts() {
        let e: Box<dyn std::error::Error + Send + Sync> = "sensor Timeout".into();
        assert_eq!(map_hw_error(&*e), FeederError::Timeout);
        let e: Box<dyn std::error::Error + Send + Sync> = "bus glitch".into();
        assert_eq!(map_hw_error(&*e), FeederError::Hardware("bus glitch".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hw_errors_map_precisely() {
        use feeder_hardware::error::HwError;
        let e = HwError::DataReadyTimeout;
        assert_eq!(map_hw_error(&e), FeederError::Timeout);
        let e = HwError::Gpio("pin 17 busy".into());
        assert_eq!(
            map_hw_error(&e),
            FeederError::HardwareFault("gpio error: pin 17 busy".into())
        );
    }

    #[test]
    fn actuator_errors_are_always_faults() {
        let e: Box<dyn std::error::Error + Send + Sync> = "step timeout".into();
        assert!(matches!(map_actuator_error(&*e), FeederError::HardwareFault(_)));
    }
}
