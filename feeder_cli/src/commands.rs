//! Subcommand implementations. Results go to stdout (text or one JSON
//! object); logs go to stderr.

use std::time::Duration;

use eyre::WrapErr;
use feeder_core::{FeederError, RotationPlan, SensorState};
use serde_json::json;

use crate::rig::Rig;

fn emit(json_mode: bool, value: serde_json::Value, text: impl FnOnce() -> String) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{}", text());
    }
}

pub fn tare(rig: &Rig, json_mode: bool) -> eyre::Result<()> {
    let offset = rig.sensor.try_tare()?;
    let state = rig.sensor.state();
    emit(
        json_mode,
        json!({ "offset": offset, "state": state.as_str() }),
        || format!("Tare complete: offset {offset:.1} (state: {state})"),
    );
    Ok(())
}

pub fn calibrate(rig: &Rig, json_mode: bool, grams: f64, inverse: bool, place_delay: Duration) -> eyre::Result<()> {
    if !grams.is_finite() || grams <= 0.0 {
        return Err(FeederError::InvalidInput(format!("--grams must be positive, got {grams}")).into());
    }
    rig.sensor.try_tare().wrap_err("tare before calibration")?;
    if !json_mode {
        println!("Tared. Place {grams} g on the bowl...");
    }
    rig.await_calibration_mass(grams, place_delay);
    let params = rig.sensor.try_calibrate(grams, inverse)?;
    emit(
        json_mode,
        json!({ "offset": params.offset, "scale": params.scale, "inverse": inverse }),
        || {
            format!(
                "Calibration complete: offset {:.1}, scale {:.4} counts/g",
                params.offset, params.scale
            )
        },
    );
    Ok(())
}

pub fn weight(rig: &Rig, json_mode: bool, count: u32) -> eyre::Result<()> {
    let mut readings = Vec::new();
    for _ in 0..count.max(1) {
        let g = rig.sensor.try_get_weight()?;
        if !json_mode {
            println!("{g:.1} g");
        }
        readings.push(g);
    }
    if json_mode {
        let last = readings.last().copied();
        println!("{}", json!({ "grams": last, "readings": readings }));
    }
    Ok(())
}

pub fn feed(rig: &Rig, json_mode: bool, grams: f64, timeout: Duration) -> eyre::Result<()> {
    let outcome = rig.feeder.feed_until_weight(grams, timeout);
    if let Err(e) = rig.history.record_outcome(grams, &outcome) {
        tracing::warn!(error = %e, "could not record feeding in history");
    }
    emit(
        json_mode,
        json!({
            "success": outcome.success,
            "fed_g": outcome.fed_g,
            "target_g": grams,
            "bursts": outcome.bursts,
            "message": outcome.message,
        }),
        || {
            if outcome.success {
                format!("Feeding complete: {}", outcome.message)
            } else {
                format!("Feeding failed: {}", outcome.message)
            }
        },
    );
    match outcome.error {
        None => Ok(()),
        Some(e) => Err(eyre::Report::new(e).wrap_err("feed")),
    }
}

pub fn jog(
    rig: &Rig,
    json_mode: bool,
    cfg: &feeder_config::MotorCfg,
    forward: Option<u32>,
    backward: Option<u32>,
    repeat: Option<u32>,
) -> eyre::Result<()> {
    let mut plan = RotationPlan::from(cfg);
    plan.forward_steps = forward.unwrap_or(plan.forward_steps);
    plan.backward_steps = backward.unwrap_or(plan.backward_steps);
    plan.repeats = repeat.unwrap_or(plan.repeats);
    // Only watch the bowl when a weight can actually be read
    let sensor = rig.sensor.is_ready().then_some(rig.sensor.as_ref());
    let report = rig.motor.rotate(&plan, sensor)?;
    emit(
        json_mode,
        json!({
            "bursts": report.bursts,
            "reason": format!("{:?}", report.reason),
            "position": report.position,
        }),
        || {
            format!(
                "Jog finished after {} burst(s) ({:?}); position {}",
                report.bursts, report.reason, report.position
            )
        },
    );
    Ok(())
}

pub fn level(rig: &Rig, json_mode: bool) -> eyre::Result<()> {
    let sensor = rig
        .level
        .as_ref()
        .ok_or_else(|| FeederError::SensorUnavailable("no distance sensor".into()))?;
    let mm = sensor.try_distance_mm()?;
    let cm = f64::from(mm) / 10.0;
    let percent = sensor.fill_level().percent(cm);
    emit(
        json_mode,
        json!({ "distance_mm": mm, "distance_cm": cm, "percent": percent }),
        || format!("Hopper: {percent:.1} % ({cm:.1} cm)"),
    );
    Ok(())
}

pub fn history(rig: &Rig, json_mode: bool, days: usize) -> eyre::Result<()> {
    let summary = rig.history.daily(days)?;
    if json_mode {
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }
    if summary.is_empty() {
        println!("No feedings recorded.");
        return Ok(());
    }
    println!("{:<12} {:>9} {:>5} {:>8} {:>8} {:>8}", "date", "total_g", "n", "avg_g", "min_g", "max_g");
    for d in &summary {
        println!(
            "{:<12} {:>9.1} {:>5} {:>8.1} {:>8.1} {:>8.1}",
            d.date.to_string(),
            d.total_g,
            d.feedings,
            d.avg_g,
            d.min_g,
            d.max_g
        );
    }
    Ok(())
}

pub fn state(rig: &Rig, json_mode: bool) -> eyre::Result<()> {
    let state = rig.sensor.state();
    let cal = rig.sensor.calibration();
    let motor = rig.motor.run_state();
    emit(
        json_mode,
        json!({
            "state": state.as_str(),
            "calibration": cal.map(|c| json!({ "offset": c.offset, "scale": c.scale })),
            "motor": { "running": motor.running, "position": motor.position },
        }),
        || {
            let cal = cal.map_or_else(
                || "none".to_string(),
                |c| format!("offset {:.1}, scale {:.4}", c.offset, c.scale),
            );
            format!("Sensor: {state}\nCalibration: {cal}\nMotor position: {}", motor.position)
        },
    );
    Ok(())
}

/// Hardware presence: the scale answers and the driver can be toggled.
pub fn self_check(rig: &Rig, json_mode: bool) -> eyre::Result<()> {
    let raw = rig.sensor.raw_reading().wrap_err("scale self-check")?;
    rig.motor.stop_motor();
    let distance = rig.level.as_ref().and_then(|l| l.distance_mm());
    emit(
        json_mode,
        json!({ "ok": true, "raw": raw, "distance_mm": distance, "simulated": rig.sim.is_some() }),
        || format!("ok (raw {raw:.0}, distance {})", distance.map_or("n/a".into(), |d| format!("{d} mm"))),
    );
    Ok(())
}

/// Operational readiness: a feed would be accepted right now.
pub fn health(rig: &Rig, json_mode: bool) -> eyre::Result<()> {
    let state = rig.sensor.state();
    let fill = rig.level.as_ref().and_then(|l| l.fill_percent());
    let healthy = state == SensorState::Ready;
    emit(
        json_mode,
        json!({ "healthy": healthy, "state": state.as_str(), "fill_percent": fill }),
        || {
            format!(
                "{} (sensor {state}, hopper {})",
                if healthy { "healthy" } else { "unhealthy" },
                fill.map_or("n/a".into(), |p| format!("{p:.1} %"))
            )
        },
    );
    if healthy {
        Ok(())
    } else {
        Err(FeederError::NotReady(state).into())
    }
}
