use std::fs;

use feeder_config::{PersistedCalibration, read_calibration_file, write_calibration_file};
use tempfile::tempdir;

#[test]
fn missing_file_is_none() {
    let dir = tempdir().unwrap();
    let got = read_calibration_file(&dir.path().join("nope.json")).unwrap();
    assert!(got.is_none());
}

#[test]
fn write_then_read_preserves_record_and_leaves_no_temp_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sub").join("kalibrierung.json");
    let rec = PersistedCalibration {
        reference_unit: 500.0,
        offset: 1000.0,
        calibrated: true,
    };
    write_calibration_file(&path, &rec).unwrap();
    assert_eq!(read_calibration_file(&path).unwrap(), Some(rec));
    assert!(!path.with_extension("new").exists());
}

#[test]
fn legacy_two_key_record_counts_as_calibrated() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kalibrierung.json");
    fs::write(&path, r#"{"reference_unit": 452.3, "offset": -81234.0}"#).unwrap();
    let rec = read_calibration_file(&path).unwrap().unwrap();
    assert!(rec.calibrated);
    assert_eq!(rec.reference_unit, 452.3);
}

#[test]
fn corrupt_or_degenerate_records_are_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kalibrierung.json");

    fs::write(&path, "{ not json").unwrap();
    assert!(read_calibration_file(&path).is_err());

    fs::write(&path, r#"{"reference_unit": 0.0, "offset": 10.0}"#).unwrap();
    let err = read_calibration_file(&path).unwrap_err();
    assert!(err.to_string().contains("invalid reference_unit"));
}
