//! Hardware assembly: config -> sensor, motor, level sensor, feed controller.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use feeder_core::{
    ConsumptionLog, FeedController, FileCalibrationStore, FillLevel, LevelSensor, MotorController,
    MotorDrive, WeightSensor,
};
use feeder_hardware::SimulatedFeeder;
use feeder_traits::{Clock, MonotonicClock};

pub struct Rig {
    pub sensor: Arc<WeightSensor>,
    pub motor: Arc<MotorController>,
    pub feeder: FeedController,
    pub level: Option<LevelSensor>,
    pub history: ConsumptionLog,
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// Present when running on the simulated back-end.
    pub sim: Option<SimulatedFeeder>,
}

/// Resolve `p` against the directory holding the config file.
pub fn resolve(base: &Path, p: &str) -> PathBuf {
    let path = Path::new(p);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_params(cfg: &feeder_config::SimulationCfg) -> feeder_hardware::SimParams {
    feeder_hardware::SimParams {
        zero_counts: cfg.zero_counts,
        counts_per_gram: cfg.counts_per_gram,
        grams_per_step: cfg.grams_per_step,
        noise_counts: cfg.noise_counts,
        ..feeder_hardware::SimParams::default()
    }
}

pub fn build(cfg: &feeder_config::Config, base: &Path) -> eyre::Result<Rig> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let store = FileCalibrationStore::new(resolve(base, &cfg.sensor.calibration_file));
    let fill = FillLevel::try_from(&cfg.level).wrap_err("invalid configuration")?;

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    let (scale, motor, range, sim) = {
        let scale = feeder_hardware::HardwareScale::try_new(cfg.pins.hx711_dt, cfg.pins.hx711_sck)
            .wrap_err("open hx711")?;
        let motor = feeder_hardware::HardwareMotor::try_new(
            cfg.pins.motor_step,
            cfg.pins.motor_dir,
            cfg.pins.motor_en,
            cfg.motor.enable_active_low,
        )
        .wrap_err("open motor pins")?;
        let range = match feeder_hardware::HardwareRange::try_new(cfg.level.i2c_bus) {
            Ok(r) => Some(r),
            Err(e) => {
                tracing::warn!(error = %e, bus = cfg.level.i2c_bus, "distance sensor unavailable");
                None
            }
        };
        tracing::info!(
            dt = cfg.pins.hx711_dt,
            sck = cfg.pins.hx711_sck,
            step = cfg.pins.motor_step,
            dir = cfg.pins.motor_dir,
            en = cfg.pins.motor_en,
            "hardware back-end"
        );
        (scale, motor, range, None::<SimulatedFeeder>)
    };

    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    let (scale, motor, range, sim) = {
        let sim = SimulatedFeeder::new(sim_params(&cfg.simulation));
        tracing::info!(params = ?sim.params(), "simulated back-end");
        (sim.scale(), sim.motor(), Some(sim.range()), Some(sim))
    };

    let sensor = Arc::new(
        WeightSensor::builder()
            .with_scale(scale)
            .with_store(store)
            .with_clock(Arc::clone(&clock))
            .with_config((&cfg.sensor).into())
            .build()?,
    );
    let motor = Arc::new(MotorController::new(MotorDrive::new(
        motor,
        Arc::clone(&clock),
        (&cfg.motor).into(),
    )?));
    let feeder = FeedController::new(
        Arc::clone(&sensor),
        Arc::clone(&motor),
        Arc::clone(&clock),
        (&cfg.motor).into(),
    );
    let level = range.map(|r| LevelSensor::new(r, fill, cfg.level.max_retries, Arc::clone(&clock)));
    let history = ConsumptionLog::new(resolve(base, &cfg.history.file), cfg.history.retention_days);

    Ok(Rig {
        sensor,
        motor,
        feeder,
        level,
        history,
        clock,
        sim,
    })
}

impl Rig {
    /// Wait for the user to put the calibration mass on the bowl. The
    /// simulation places it itself.
    pub fn await_calibration_mass(&self, grams: f64, delay: Duration) {
        match &self.sim {
            Some(sim) => {
                tracing::info!(grams, "simulation: placing calibration weight");
                sim.place_weight(grams);
            }
            None => {
                tracing::info!(grams, secs = delay.as_secs(), "place the calibration weight now");
                self.clock.sleep(delay);
            }
        }
    }
}
