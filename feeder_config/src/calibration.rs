//! JSON calibration record and crash-safe persistence.
//!
//! File layout (flat object):
//! { "reference_unit": 500.0, "offset": 84012.5, "calibrated": true }
//!
//! `reference_unit` is the scale in raw counts per gram. `calibrated` is false
//! when only a tare has ever been stored; records without the key are treated as
//! calibrated.
use serde::{Deserialize, Serialize};
use std::{fs, io::Write, path::Path};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PersistedCalibration {
    pub reference_unit: f64,
    pub offset: f64,
    #[serde(default = "default_calibrated")]
    pub calibrated: bool,
}

fn default_calibrated() -> bool {
    true
}

/// Write `bytes` to `path` through a sibling temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}

/// Read the calibration record.
///
/// Returns `Ok(None)` when the file does not exist; unreadable, malformed or
/// degenerate (zero/non-finite scale) records are errors.
pub fn read_calibration_file(path: &Path) -> eyre::Result<Option<PersistedCalibration>> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => eyre::bail!("read calibration {:?}: {}", path, e),
    };
    let rec: PersistedCalibration = serde_json::from_str(&text)
        .map_err(|e| eyre::eyre!("parse calibration {:?}: {}", path, e))?;
    if !rec.reference_unit.is_finite() || rec.reference_unit == 0.0 {
        eyre::bail!("calibration {:?} has invalid reference_unit {}", path, rec.reference_unit);
    }
    if !rec.offset.is_finite() {
        eyre::bail!("calibration {:?} has non-finite offset", path);
    }
    Ok(Some(rec))
}

/// Overwrite the calibration record atomically.
pub fn write_calibration_file(path: &Path, rec: &PersistedCalibration) -> eyre::Result<()> {
    let json = serde_json::to_vec_pretty(rec)
        .map_err(|e| eyre::eyre!("serialize calibration: {}", e))?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| eyre::eyre!("create {:?}: {}", dir, e))?;
    }
    write_atomic(path, &json).map_err(|e| eyre::eyre!("write calibration {:?}: {}", path, e))
}
