use feeder_config::load_toml;
use rstest::rstest;

const PINS: &str = r#"
[pins]
hx711_dt = 17
hx711_sck = 18
motor_step = 21
motor_dir = 26
motor_en = 4
"#;

#[test]
fn minimal_config_uses_original_defaults() {
    let cfg = load_toml(PINS).expect("parse TOML");
    cfg.validate().expect("defaults must validate");
    assert_eq!(cfg.sensor.samples, 5);
    assert_eq!(cfg.sensor.tare_samples, 20);
    assert_eq!(cfg.sensor.attempts_factor, 6);
    assert_eq!(cfg.sensor.stabilization_ms, 2000);
    assert_eq!(cfg.sensor.deadband_g, 3.0);
    assert_eq!(cfg.motor.steps_per_rev, 200);
    assert_eq!(cfg.motor.feed_forward_steps, 200);
    assert_eq!(cfg.motor.feed_backward_steps, 100);
    assert_eq!(cfg.motor.jog_forward_steps, 1500);
    assert_eq!(cfg.motor.jog_backward_steps, 200);
    assert_eq!(cfg.motor.jog_repeats, 10);
    assert_eq!(cfg.feeding.default_timeout_s, 300);
    assert_eq!(cfg.level.min_distance_cm, 4.0);
    assert_eq!(cfg.level.max_distance_cm, 55.0);
}

#[test]
fn missing_pins_is_a_parse_error() {
    let err = load_toml("[sensor]\nsamples = 5\n").expect_err("pins are required");
    assert!(err.to_string().contains("pins"));
}

#[rstest]
#[case("[sensor]\nsamples = 0\n", "sensor.samples must be >= 1")]
#[case("[sensor]\ntare_samples = 0\n", "sensor.tare_samples must be >= 1")]
#[case("[sensor]\nattempts_factor = 0\n", "sensor.attempts_factor must be >= 1")]
#[case("[sensor]\ndeadband_g = -1.0\n", "sensor.deadband_g must be >= 0.0")]
#[case("[sensor]\ncalibration_file = \" \"\n", "calibration_file must not be empty")]
#[case("[motor]\nsteps_per_rev = 0\n", "motor.steps_per_rev must be > 0")]
#[case("[motor]\njog_repeats = 0\n", "motor.jog_repeats must be >= 1")]
#[case("[motor]\nmax_weight_g = 0.0\n", "motor.max_weight_g must be > 0.0")]
#[case("[feeding]\ndefault_timeout_s = 0\n", "feeding.default_timeout_s must be >= 1")]
#[case(
    "[level]\nmin_distance_cm = 40.0\nmax_distance_cm = 30.0\n",
    "level.max_distance_cm must be > level.min_distance_cm"
)]
#[case("[history]\nretention_days = 0\n", "history.retention_days must be >= 1")]
#[case("[simulation]\ncounts_per_gram = 0.0\n", "counts_per_gram must be non-zero")]
fn rejects_invalid_values(#[case] section: &str, #[case] needle: &str) {
    let toml = format!("{PINS}\n{section}");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[test]
fn accepts_tuned_sections() {
    let toml = format!(
        r#"{PINS}
[sensor]
samples = 8
stabilization_ms = 0
calibration_file = "/var/lib/feeder/calibration.json"

[motor]
feed_forward_delay_us = 250
jog_max_ms = 5000

[logging]
level = "debug"
rotation = "daily"
"#
    );
    let cfg = load_toml(&toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.sensor.samples, 8);
    assert_eq!(cfg.motor.feed_forward_delay_us, 250);
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
}
