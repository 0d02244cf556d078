mod cli;
mod commands;
mod error_fmt;
mod rig;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use feeder_core::MotorController;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(json) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn load_config(path: &Path) -> eyre::Result<feeder_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = feeder_config::load_toml(&text).wrap_err("invalid configuration")?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console to stderr (pretty or JSON), optional JSON file log with rotation.
/// Precedence: RUST_LOG > --log-level > [logging].level > info.
fn init_tracing(json: bool, level: Option<&str>, logging: &feeder_config::Logging, base: &Path) {
    let level = level
        .or(logging.level.as_deref())
        .unwrap_or("info")
        .to_string();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_json = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let console_pretty = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .compact()
            .with_writer(std::io::stderr)
    });

    let file_layer = logging.file.as_deref().map(|file| {
        let path = rig::resolve(base, file);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map_or_else(|| base.to_path_buf(), Path::to_path_buf);
        let name = path
            .file_name()
            .map_or_else(|| "feeder.log".into(), |n| n.to_os_string());
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_json)
        .with(console_pretty)
        .with(file_layer)
        .try_init();
}

/// Ctrl-C policy; returns true when the process should exit.
///
/// The first press ends a `jog` rotation between bursts. A second press
/// de-energises the driver, waiting out any pulse train in progress, so the
/// stepper is not left holding current after exit.
fn on_interrupt(motor: &MotorController, interrupted: &AtomicBool) -> bool {
    if interrupted.swap(true, Ordering::SeqCst) {
        motor.stop_motor();
        return true;
    }
    motor.request_stop();
    false
}

fn run(cli: Cli) -> eyre::Result<()> {
    let _ = color_eyre::install();

    let cfg = load_config(&cli.config)?;
    let base = cli
        .config
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging, &base);

    let rig = rig::build(&cfg, &base)?;

    let motor = Arc::clone(&rig.motor);
    let interrupted = AtomicBool::new(false);
    if let Err(e) = ctrlc::set_handler(move || {
        if on_interrupt(&motor, &interrupted) {
            std::process::exit(130);
        }
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }

    let json = cli.json;
    match cli.cmd {
        Commands::Tare => commands::tare(&rig, json),
        Commands::Calibrate {
            grams,
            inverse,
            place_delay_s,
        } => commands::calibrate(&rig, json, grams, inverse, Duration::from_secs(place_delay_s)),
        Commands::Weight { count } => commands::weight(&rig, json, count),
        Commands::Feed { grams, timeout_s } => {
            let timeout = Duration::from_secs(timeout_s.unwrap_or(cfg.feeding.default_timeout_s));
            commands::feed(&rig, json, grams, timeout)
        }
        Commands::Jog {
            forward,
            backward,
            repeat,
        } => commands::jog(&rig, json, &cfg.motor, forward, backward, repeat),
        Commands::Level => commands::level(&rig, json),
        Commands::History { days } => commands::history(&rig, json, days),
        Commands::State => commands::state(&rig, json),
        Commands::SelfCheck => commands::self_check(&rig, json),
        Commands::Health => commands::health(&rig, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feeder_core::mocks::RecordingMotor;
    use feeder_core::{MotorCfg, MotorDrive};
    use feeder_traits::{Direction, MonotonicClock};

    #[test]
    fn second_interrupt_disables_driver_before_exit() {
        let recorder = RecordingMotor::new();
        let drive = MotorDrive::new(recorder.clone(), Arc::new(MonotonicClock::new()), MotorCfg::default()).unwrap();
        let motor = MotorController::new(drive);
        motor.turn(Direction::Forward, 10, Duration::ZERO).unwrap();
        assert!(recorder.enabled());

        let interrupted = AtomicBool::new(false);
        assert!(!on_interrupt(&motor, &interrupted));
        // First press only asks a rotation to stop
        assert!(recorder.enabled());
        assert_eq!(recorder.disables(), 0);

        assert!(on_interrupt(&motor, &interrupted));
        assert!(!recorder.enabled());
        assert_eq!(recorder.disables(), 1);
        assert!(!motor.run_state().running);
    }
}
