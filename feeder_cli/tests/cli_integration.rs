use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

// Minimal sim config with all waits shortened so runs finish quickly
fn write_fast_config(dir: &TempDir) -> PathBuf {
    let toml = r#"
[pins]
# pins are unused in sim backend but must be present
hx711_dt = 17
hx711_sck = 18
motor_step = 21
motor_dir = 26
motor_en = 4

[sensor]
sample_delay_ms = 0
stabilization_ms = 0
calibration_file = "state/cal.json"

[motor]
feed_forward_delay_us = 10
feed_backward_delay_us = 10
forward_pause_ms = 0
backward_pause_ms = 0
jog_delay_us = 10
jog_pause_ms = 0

[history]
file = "state/consumption.jsonl"
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn feeder(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("feeder").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

fn calibrate(cfg: &Path) {
    feeder(cfg)
        .args(["calibrate", "--grams", "100", "--place-delay-s", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Calibration complete"));
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "ok", "stdout")]
#[case(&["state"], 0, "Sensor: init", "stdout")]
#[case(&["level"], 0, "96.1 %", "stdout")]
#[case(&["feed"], 2, "required", "stderr")]
#[case(&["feed", "--grams", "10"], 3, "not ready", "stderr")]
#[case(&["weight"], 3, "not ready", "stderr")]
#[case(&["health"], 3, "unhealthy", "stdout")]
#[case(&["calibrate", "--grams=0", "--place-delay-s", "0"], 7, "Invalid input", "stderr")]
#[case(&["history"], 0, "No feedings recorded", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);

    let assert = feeder(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn calibrate_then_weigh_feed_and_summarize() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    calibrate(&cfg);
    assert!(dir.path().join("state/cal.json").exists());

    feeder(&cfg)
        .arg("weight")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.0 g"));

    feeder(&cfg)
        .args(["feed", "--grams", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Feeding complete"));

    let out = feeder(&cfg)
        .args(["--json", "history", "--days", "3"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let days = v.as_array().unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0]["feedings"], 1);
    assert!(days[0]["total_g"].as_f64().unwrap() >= 10.0);
}

#[test]
fn feed_timeout_reports_partial_amount_and_exit_code() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    calibrate(&cfg);

    let out = feeder(&cfg)
        .args(["--json", "feed", "--grams", "50", "--timeout-s", "0"])
        .assert()
        .code(4)
        .get_output()
        .clone();
    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(result["fed_g"], 0.0);

    let stderr = String::from_utf8(out.stderr).unwrap();
    let err_line = stderr.lines().last().unwrap();
    let err: serde_json::Value = serde_json::from_str(err_line).unwrap();
    assert_eq!(err["reason"], "TimeoutExceeded");
    assert_eq!(err["details"]["target_g"], 50.0);
}

#[test]
fn json_state_after_calibration_is_ready() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    calibrate(&cfg);

    let out = feeder(&cfg)
        .args(["--json", "state"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["state"], "ready");
    let scale = v["calibration"]["scale"].as_f64().unwrap();
    assert!((scale - 420.0).abs() < 2.0, "scale {scale}");
}

#[test]
fn jog_reports_bursts() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    feeder(&cfg)
        .args(["jog", "--forward", "50", "--backward", "10", "--repeat", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 burst(s)"))
        .stdout(predicate::str::contains("position 80"));
}

#[test]
fn jog_without_arguments_uses_configured_defaults() {
    let dir = tempdir().unwrap();
    let cfg = write_fast_config(&dir);
    // 10 bursts of 1500 forward and 200 back end on a whole revolution
    feeder(&cfg)
        .arg("jog")
        .assert()
        .success()
        .stdout(predicate::str::contains("10 burst(s)"))
        .stdout(predicate::str::contains("position 0"));
}

#[test]
fn invalid_config_is_explained() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        "[pins]\nhx711_dt = 1\nhx711_sck = 2\nmotor_step = 3\nmotor_dir = 4\nmotor_en = 5\n[sensor]\nsamples = 0\n",
    )
    .unwrap();
    feeder(&path)
        .arg("state")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains("sensor.samples"));
}

#[test]
fn missing_config_is_explained() {
    let dir = tempdir().unwrap();
    feeder(&dir.path().join("nope.toml"))
        .arg("state")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("read config"));
}
