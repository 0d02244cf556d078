//! Human-readable error descriptions, exit codes and structured JSON errors.

use feeder_core::error::{BuildError, FeederError, feeder_error};

/// Stable name of the typed error, used as `reason` in JSON output.
pub fn reason_name(e: &FeederError) -> &'static str {
    match e {
        FeederError::InsufficientSamples { .. } => "InsufficientSamples",
        FeederError::NotReady(_) => "NotReady",
        FeederError::CalibrationTooClose { .. } => "CalibrationTooClose",
        FeederError::Hardware(_) | FeederError::HardwareFault(_) => "HardwareFault",
        FeederError::Timeout => "Timeout",
        FeederError::TimeoutExceeded { .. } => "TimeoutExceeded",
        FeederError::SensorUnavailable(_) => "SensorUnavailable",
        FeederError::InvalidInput(_) => "InvalidInput",
        FeederError::Storage(_) => "Storage",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingScale => "What happened: No scale was provided to the weight sensor.\nLikely causes: The HX711 failed to initialize.\nHow to fix: Check the [pins] section and the HX711 wiring.".to_string(),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(fe) = feeder_error(err) {
        return match fe {
            FeederError::NotReady(state) => format!(
                "What happened: The weight sensor is not ready (state: {state}).\nLikely causes: The scale was never calibrated or the last tare/calibration failed.\nHow to fix: Run `feeder calibrate --grams <known mass>`."
            ),
            FeederError::SensorUnavailable(msg) => format!(
                "What happened: Feeding refused because the weight sensor is not ready ({msg}).\nLikely causes: Missing calibration or a failed tare.\nHow to fix: Run `feeder calibrate --grams <known mass>`, then feed again."
            ),
            FeederError::CalibrationTooClose { delta } => format!(
                "What happened: Calibration rejected; the reading moved only {delta:.1} counts from the tare point.\nLikely causes: No weight on the bowl, or it was placed too late.\nHow to fix: Place the weight during the placement delay (raise --place-delay-s) and retry."
            ),
            FeederError::TimeoutExceeded { fed_g, target_g } => format!(
                "What happened: Feeding timed out after dispensing {fed_g:.1} g of {target_g} g.\nLikely causes: Empty hopper, jammed auger, or a timeout too short for the amount.\nHow to fix: Refill or clear the hopper; raise --timeout-s or [feeding].default_timeout_s."
            ),
            FeederError::InsufficientSamples { collected, required } => format!(
                "What happened: The scale delivered only {collected} of {required} readings.\nLikely causes: HX711 not wired correctly, no power/ground, or read timeout too low.\nHow to fix: Verify DT/SCK pins and power; consider raising sensor.read_timeout_ms."
            ),
            FeederError::Timeout => "What happened: A sensor read timed out.\nLikely causes: Wiring/power issues or a timeout configured too low.\nHow to fix: Check wiring and raise sensor.read_timeout_ms.".to_string(),
            FeederError::Hardware(msg) | FeederError::HardwareFault(msg) => format!(
                "What happened: Hardware fault ({msg}).\nLikely causes: Driver not powered, wrong pins, or missing GPIO permissions.\nHow to fix: Check wiring and [pins]; run `feeder self-check`."
            ),
            FeederError::InvalidInput(msg) => format!(
                "What happened: Invalid input ({msg}).\nLikely causes: A zero, negative or non-numeric amount.\nHow to fix: Pass a positive number of grams."
            ),
            FeederError::Storage(msg) => format!(
                "What happened: Could not write persistent data ({msg}).\nLikely causes: Read-only filesystem or missing permissions.\nHow to fix: Check the calibration_file and history.file locations."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open hx711") || lower.contains("open motor pins") {
        return "What happened: Failed to initialize hardware pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO.".to_string();
    }

    if lower.contains("invalid configuration") {
        let detail = err
            .chain()
            .nth(1)
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        return format!(
            "What happened: Configuration is invalid or incomplete{detail}.\nLikely causes: Missing [pins] (hx711_dt, hx711_sck, motor_step, motor_dir, motor_en), or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: {msg}.\nLikely causes: Wrong --config path or missing file.\nHow to fix: Pass --config <FILE> or create etc/feeder_config.toml."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.chain().nth(1) {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class; anything untyped is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match feeder_error(err) {
        Some(FeederError::NotReady(_) | FeederError::SensorUnavailable(_)) => 3,
        Some(FeederError::TimeoutExceeded { .. }) => 4,
        Some(FeederError::CalibrationTooClose { .. }) => 5,
        Some(
            FeederError::Hardware(_)
            | FeederError::HardwareFault(_)
            | FeederError::Timeout
            | FeederError::InsufficientSamples { .. },
        ) => 6,
        Some(FeederError::InvalidInput(_)) => 7,
        Some(FeederError::Storage(_)) => 8,
        None => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    match feeder_error(err) {
        Some(fe @ FeederError::TimeoutExceeded { fed_g, target_g }) => json!({
            "reason": reason_name(fe),
            "details": { "fed_g": fed_g, "target_g": target_g },
            "message": msg,
        }),
        Some(fe @ FeederError::CalibrationTooClose { delta }) => json!({
            "reason": reason_name(fe),
            "details": { "delta": delta },
            "message": msg,
        }),
        Some(fe) => json!({ "reason": reason_name(fe), "message": msg }),
        None => json!({ "reason": "Error", "message": msg }),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeder_core::SensorState;

    #[test]
    fn exit_codes_are_stable() {
        let e = eyre::Report::new(FeederError::NotReady(SensorState::Init));
        assert_eq!(exit_code_for_error(&e), 3);
        let e = eyre::Report::new(FeederError::TimeoutExceeded {
            fed_g: 12.0,
            target_g: 50.0,
        })
        .wrap_err("feed");
        assert_eq!(exit_code_for_error(&e), 4);
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn timeout_json_carries_partial_amount() {
        let e = eyre::Report::new(FeederError::TimeoutExceeded {
            fed_g: 12.5,
            target_g: 50.0,
        });
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "TimeoutExceeded");
        assert_eq!(v["details"]["fed_g"], 12.5);
        assert!(v["message"].as_str().unwrap().contains("12.5 g"));
    }

    #[test]
    fn config_errors_name_the_key() {
        let e = eyre::eyre!("sensor.samples must be >= 1").wrap_err("invalid configuration");
        let h = humanize(&e);
        assert!(h.contains("Configuration is invalid"));
        assert!(h.contains("sensor.samples"));
    }
}
