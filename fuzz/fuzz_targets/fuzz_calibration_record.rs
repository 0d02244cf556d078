#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let dir = match std::env::temp_dir().canonicalize() {
        Ok(d) => d,
        Err(_) => return,
    };
    let path = dir.join(format!("feeder-fuzz-cal-{}.json", std::process::id()));
    if std::fs::write(&path, data).is_err() {
        return;
    }
    // Accepted records must be usable as a scale model
    if let Ok(Some(rec)) = feeder_config::read_calibration_file(&path) {
        assert!(rec.reference_unit.is_finite() && rec.reference_unit != 0.0);
        assert!(rec.offset.is_finite());
    }
    let _ = std::fs::remove_file(&path);
});
