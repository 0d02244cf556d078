//! Linear load-cell model and its persistence.
//!
//! `grams = (raw - offset) / scale`, where `offset` is the empty-bowl reading
//! and `scale` the raw counts per gram.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use feeder_config::{PersistedCalibration, read_calibration_file, write_calibration_file};

use crate::error::{FeederError, Result};

/// Readings closer than this to the offset cannot define a scale.
pub const MIN_CALIBRATION_DELTA: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationParameters {
    /// Raw reading of the empty bowl.
    pub offset: f64,
    /// Raw counts per gram. Never zero.
    pub scale: f64,
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self {
            offset: 0.0,
            scale: 1.0,
        }
    }
}

impl CalibrationParameters {
    /// Derive the scale from a reading with a known mass on the bowl.
    ///
    /// With `inverse` the scale is stored as `known_g / delta`, matching
    /// scales whose driver reports the reciprocal convention.
    pub fn with_known_mass(
        offset: f64,
        known_raw: f64,
        known_g: f64,
        inverse: bool,
    ) -> std::result::Result<Self, FeederError> {
        if !known_g.is_finite() || known_g <= 0.0 {
            return Err(FeederError::InvalidInput(format!(
                "known weight must be a positive number of grams, got {known_g}"
            )));
        }
        let delta = known_raw - offset;
        if !delta.is_finite() || delta.abs() < MIN_CALIBRATION_DELTA {
            return Err(FeederError::CalibrationTooClose { delta });
        }
        let scale = if inverse { known_g / delta } else { delta / known_g };
        Ok(Self { offset, scale })
    }

    #[inline]
    pub fn to_grams(&self, raw: f64) -> f64 {
        (raw - self.offset) / self.scale
    }
}

/// Calibration as persisted: the model plus whether `scale` was measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredCalibration {
    pub params: CalibrationParameters,
    pub calibrated: bool,
}

impl From<&StoredCalibration> for PersistedCalibration {
    fn from(s: &StoredCalibration) -> Self {
        Self {
            reference_unit: s.params.scale,
            offset: s.params.offset,
            calibrated: s.calibrated,
        }
    }
}

/// Where the calibration survives restarts.
///
/// `load` never fails: a missing or unreadable record is simply `None`.
pub trait CalibrationStore: Send {
    fn load(&self) -> Option<StoredCalibration>;
    fn save(&self, rec: &StoredCalibration) -> Result<()>;
}

/// JSON file store (see `feeder_config::calibration` for the layout).
#[derive(Debug, Clone)]
pub struct FileCalibrationStore {
    path: PathBuf,
}

impl FileCalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CalibrationStore for FileCalibrationStore {
    fn load(&self) -> Option<StoredCalibration> {
        match read_calibration_file(&self.path) {
            Ok(Some(rec)) => {
                tracing::info!(
                    path = %self.path.display(),
                    offset = rec.offset,
                    scale = rec.reference_unit,
                    calibrated = rec.calibrated,
                    "calibration loaded"
                );
                Some(StoredCalibration {
                    params: CalibrationParameters::from(&rec),
                    calibrated: rec.calibrated,
                })
            }
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "no calibration file; starting uncalibrated");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable calibration");
                None
            }
        }
    }

    fn save(&self, rec: &StoredCalibration) -> Result<()> {
        write_calibration_file(&self.path, &PersistedCalibration::from(rec))
            .map_err(|e| eyre::Report::new(FeederError::Storage(e.to_string())))?;
        tracing::debug!(path = %self.path.display(), "calibration saved");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    rec: Option<StoredCalibration>,
    saves: u64,
    fail_saves: bool,
}

/// In-process store for tests and simulation runs without a file.
#[derive(Debug, Clone, Default)]
pub struct MemoryCalibrationStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_calibration(params: CalibrationParameters) -> Self {
        let s = Self::default();
        s.lock().rec = Some(StoredCalibration {
            params,
            calibrated: true,
        });
        s
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn current(&self) -> Option<StoredCalibration> {
        self.lock().rec
    }

    pub fn saves(&self) -> u64 {
        self.lock().saves
    }

    /// Make subsequent saves fail with a storage error.
    pub fn set_fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn load(&self) -> Option<StoredCalibration> {
        self.current()
    }

    fn save(&self, rec: &StoredCalibration) -> Result<()> {
        let mut g = self.lock();
        if g.fail_saves {
            return Err(eyre::Report::new(FeederError::Storage(
                "memory store is read-only".into(),
            )));
        }
        g.rec = Some(*rec);
        g.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_mass_yields_counts_per_gram() {
        let p = CalibrationParameters::with_known_mass(1000.0, 71_000.0, 140.0, false).unwrap();
        assert_eq!(p.scale, 500.0);
        assert_eq!(p.to_grams(36_000.0), 70.0);
    }

    #[test]
    fn inverse_convention_stores_reciprocal() {
        let p = CalibrationParameters::with_known_mass(0.0, 500.0, 100.0, true).unwrap();
        assert_eq!(p.scale, 0.2);
    }

    #[test]
    fn rejects_reading_at_offset() {
        let e = CalibrationParameters::with_known_mass(1000.0, 1000.5, 140.0, false).unwrap_err();
        assert_eq!(e, FeederError::CalibrationTooClose { delta: 0.5 });
    }

    #[test]
    fn rejects_non_positive_mass() {
        for g in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                CalibrationParameters::with_known_mass(0.0, 100.0, g, false),
                Err(FeederError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn file_store_round_trips_and_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.json");
        let store = FileCalibrationStore::new(&path);
        assert_eq!(store.load(), None);

        let rec = StoredCalibration {
            params: CalibrationParameters {
                offset: 84_000.0,
                scale: 420.0,
            },
            calibrated: true,
        };
        store.save(&rec).unwrap();
        assert_eq!(store.load(), Some(rec));

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(store.load(), None);
    }
}
