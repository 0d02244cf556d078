#![cfg(all(feature = "hardware", target_os = "linux"))]

use std::time::Duration;

use feeder_hardware::HardwareScale;
use feeder_traits::Scale;

// These only make sense on a Pi with the HX711 wired to BCM 17/18.
// With DT floating high the read must time out instead of spinning.

#[test]
#[ignore = "requires HX711 wiring"]
fn hx711_read_returns_or_times_out() {
    let mut sc = HardwareScale::try_new(17, 18).expect("open hx711 pins");
    let _ = sc.read(Duration::from_millis(50));
}

#[test]
#[ignore = "requires unwired DT pin"]
fn hx711_unwired_times_out() {
    let mut sc = HardwareScale::try_new(17, 18).expect("open hx711 pins");
    let err = sc
        .read(Duration::from_millis(5))
        .expect_err("expect timeout");
    assert!(err.to_string().to_lowercase().contains("timeout"));
}
