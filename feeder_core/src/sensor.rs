//! Weight sensor state machine: tare -> calibrate -> ready -> measure.
//!
//! All operations are serialized by one mutex; the transducer is a single
//! physical bus and state transitions must be atomic. A second caller blocks
//! until the first finishes.

use std::sync::{Arc, Mutex, MutexGuard};

use feeder_traits::{Clock, MonotonicClock, Scale};

use crate::calibration::{
    CalibrationParameters, CalibrationStore, MemoryCalibrationStore, StoredCalibration,
};
use crate::config::SensorCfg;
use crate::error::{BuildError, FeederError, Result};
use crate::stable::StableReader;
use crate::status::SensorState;
use crate::util::round1;

/// Convert a stable raw reading to displayed grams.
///
/// Magnitudes below `deadband_g` become exactly 0, negatives are floored to
/// 0 and the result is rounded to one decimal.
pub fn net_grams(raw: f64, params: &CalibrationParameters, deadband_g: f64) -> f64 {
    let w = params.to_grams(raw);
    if !w.is_finite() || w.abs() < deadband_g || w < 0.0 {
        return 0.0;
    }
    round1(w)
}

struct Inner {
    scale: Box<dyn Scale + Send>,
    store: Box<dyn CalibrationStore>,
    state: SensorState,
    params: CalibrationParameters,
    /// A scale factor has been measured (now or in a previous run).
    calibrated: bool,
    /// Tared during this process lifetime.
    tared: bool,
}

pub struct WeightSensor {
    inner: Mutex<Inner>,
    reader: StableReader,
    clock: Arc<dyn Clock + Send + Sync>,
    cfg: SensorCfg,
}

impl std::fmt::Debug for WeightSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightSensor")
            .field("state", &self.state())
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct WeightSensorBuilder {
    scale: Option<Box<dyn Scale + Send>>,
    store: Option<Box<dyn CalibrationStore>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    cfg: SensorCfg,
}

impl WeightSensorBuilder {
    pub fn with_scale(mut self, scale: impl Scale + Send + 'static) -> Self {
        self.scale = Some(Box::new(scale));
        self
    }

    pub fn with_store(mut self, store: impl CalibrationStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    /// Share a clock with other components (motor, feed loop).
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_config(mut self, cfg: SensorCfg) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn build(self) -> Result<WeightSensor> {
        let scale = self.scale.ok_or(BuildError::MissingScale)?;
        if self.cfg.samples == 0 || self.cfg.tare_samples == 0 {
            return Err(BuildError::InvalidConfig("sample counts must be >= 1").into());
        }
        if !self.cfg.deadband_g.is_finite() || self.cfg.deadband_g < 0.0 {
            return Err(BuildError::InvalidConfig("deadband_g must be >= 0").into());
        }
        let store = self
            .store
            .unwrap_or_else(|| Box::new(MemoryCalibrationStore::new()));
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        let (params, calibrated, state) = match store.load() {
            Some(rec) if rec.calibrated => (rec.params, true, SensorState::Ready),
            Some(rec) => (rec.params, false, SensorState::Init),
            None => (CalibrationParameters::default(), false, SensorState::Init),
        };
        tracing::info!(state = %state, offset = params.offset, scale = params.scale, "weight sensor initialised");

        Ok(WeightSensor {
            inner: Mutex::new(Inner {
                scale,
                store,
                state,
                params,
                calibrated,
                tared: false,
            }),
            reader: StableReader::new(self.cfg.stable),
            clock,
            cfg: self.cfg,
        })
    }
}

impl WeightSensor {
    pub fn builder() -> WeightSensorBuilder {
        WeightSensorBuilder::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| {
            tracing::warn!("weight sensor lock poisoned; recovering");
            p.into_inner()
        })
    }

    pub fn config(&self) -> &SensorCfg {
        &self.cfg
    }

    pub fn state(&self) -> SensorState {
        self.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SensorState::Ready
    }

    /// Current offset/scale, or `None` while no scale has been measured.
    pub fn calibration(&self) -> Option<CalibrationParameters> {
        let g = self.lock();
        g.calibrated.then_some(g.params)
    }

    fn stable_raw(&self, g: &mut Inner, samples: usize) -> Result<f64> {
        self.reader
            .read(g.scale.as_mut(), self.clock.as_ref(), samples)
    }

    fn persist(g: &Inner) {
        let rec = StoredCalibration {
            params: g.params,
            calibrated: g.calibrated,
        };
        if let Err(e) = g.store.save(&rec) {
            tracing::error!(error = %e, "failed to persist calibration; keeping it in memory");
        }
    }

    /// Zero the scale with an empty bowl. Allowed from every state; the only
    /// way out of `Error`.
    pub fn try_tare(&self) -> Result<f64> {
        let mut g = self.lock();
        tracing::info!(wait_ms = self.cfg.stabilization.as_millis() as u64, "tare: waiting for the bowl to settle");
        self.clock.sleep(self.cfg.stabilization);

        let raw = match self.stable_raw(&mut g, self.cfg.tare_samples) {
            Ok(raw) => raw,
            Err(e) => {
                g.state = SensorState::Error;
                tracing::error!(error = %e, "tare failed");
                return Err(e.wrap_err("tare"));
            }
        };

        g.params.offset = raw;
        g.tared = true;
        Self::persist(&g);
        g.state = if g.calibrated {
            SensorState::Ready
        } else {
            SensorState::Tared
        };
        tracing::info!(offset = raw, state = %g.state, "tare complete");
        Ok(raw)
    }

    pub fn tare(&self) -> bool {
        self.try_tare().is_ok()
    }

    /// Derive the scale from `known_g` grams placed on the tared bowl.
    pub fn try_calibrate(&self, known_g: f64, inverse: bool) -> Result<CalibrationParameters> {
        if !known_g.is_finite() || known_g <= 0.0 {
            return Err(FeederError::InvalidInput(format!(
                "known weight must be a positive number of grams, got {known_g}"
            ))
            .into());
        }

        let mut g = self.lock();
        if !g.tared {
            tracing::warn!(offset = g.params.offset, "calibrating without a tare in this session");
        }
        self.clock.sleep(self.cfg.stabilization);

        let raw = match self.stable_raw(&mut g, self.cfg.samples) {
            Ok(raw) => raw,
            Err(e) => {
                g.state = SensorState::Error;
                tracing::error!(error = %e, "calibration reading failed");
                return Err(e.wrap_err("calibrate"));
            }
        };

        let params = match CalibrationParameters::with_known_mass(g.params.offset, raw, known_g, inverse) {
            Ok(p) if p.scale.is_finite() && p.scale != 0.0 => p,
            Ok(p) => {
                g.state = SensorState::Error;
                return Err(FeederError::CalibrationTooClose {
                    delta: raw - p.offset,
                }
                .into());
            }
            Err(e) => {
                g.state = SensorState::Error;
                tracing::error!(raw, offset = g.params.offset, error = %e, "calibration rejected");
                return Err(e.into());
            }
        };

        g.params = params;
        g.calibrated = true;
        Self::persist(&g);
        g.state = SensorState::Ready;
        tracing::info!(offset = params.offset, scale = params.scale, known_g, inverse, "calibration complete");
        Ok(params)
    }

    pub fn calibrate(&self, known_g: f64, inverse: bool) -> bool {
        self.try_calibrate(known_g, inverse).is_ok()
    }

    /// Net weight in grams; `NotReady` outside `Ready`.
    pub fn try_get_weight(&self) -> Result<f64> {
        let mut g = self.lock();
        if g.state != SensorState::Ready {
            return Err(FeederError::NotReady(g.state).into());
        }
        let raw = self.stable_raw(&mut g, self.cfg.samples)?;
        let grams = net_grams(raw, &g.params, self.cfg.deadband_g);
        tracing::debug!(raw, grams, "weight");
        Ok(grams)
    }

    /// Net weight in grams, or `None` when not ready or the read failed.
    pub fn get_weight(&self) -> Option<f64> {
        match self.try_get_weight() {
            Ok(w) => Some(w),
            Err(e) => {
                match crate::error::feeder_error(&e) {
                    Some(FeederError::NotReady(state)) => {
                        tracing::warn!(state = %state, "weight requested before the sensor is ready");
                    }
                    _ => tracing::error!(error = %e, "weight read failed"),
                }
                None
            }
        }
    }

    /// Stable raw reading regardless of state.
    pub fn raw_reading(&self) -> Result<f64> {
        let mut g = self.lock();
        self.stable_raw(&mut g, self.cfg.samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedScale;
    use feeder_traits::BoxError;
    use feeder_traits::clock::test_clock::TestClock;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread::{self, ThreadId};
    use std::time::Duration;

    fn sensor(scale: &ScriptedScale, store: &MemoryCalibrationStore) -> WeightSensor {
        WeightSensor::builder()
            .with_scale(scale.clone())
            .with_store(store.clone())
            .with_clock(Arc::new(TestClock::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn missing_scale_is_a_build_error() {
        let err = WeightSensor::builder().build().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MissingScale)
        ));
    }

    #[test]
    fn tare_without_calibration_is_tared_not_ready() {
        let scale = ScriptedScale::constant(1000);
        let store = MemoryCalibrationStore::new();
        let s = sensor(&scale, &store);
        assert_eq!(s.state(), SensorState::Init);
        assert!(s.tare());
        assert_eq!(s.state(), SensorState::Tared);
        assert_eq!(s.get_weight(), None);
        let saved = store.current().unwrap();
        assert!(!saved.calibrated);
        assert_eq!(saved.params.offset, 1000.0);
    }

    #[test]
    fn stored_calibration_starts_ready() {
        let scale = ScriptedScale::constant(1000 + 500 * 20);
        let store = MemoryCalibrationStore::with_calibration(CalibrationParameters {
            offset: 1000.0,
            scale: 500.0,
        });
        let s = sensor(&scale, &store);
        assert!(s.is_ready());
        assert_eq!(s.get_weight(), Some(20.0));
    }

    #[test]
    fn tare_waits_for_stabilization() {
        let scale = ScriptedScale::constant(0);
        let clock = TestClock::new();
        let s = WeightSensor::builder()
            .with_scale(scale)
            .with_clock(Arc::new(clock.clone()))
            .build()
            .unwrap();
        s.tare();
        assert!(clock.offset() >= Duration::from_secs(2));
    }

    #[test]
    fn failed_tare_enters_error_and_retare_recovers() {
        let scale = ScriptedScale::failing();
        let store = MemoryCalibrationStore::with_calibration(CalibrationParameters {
            offset: 0.0,
            scale: 10.0,
        });
        let s = sensor(&scale, &store);
        assert!(!s.tare());
        assert_eq!(s.state(), SensorState::Error);
        assert_eq!(s.get_weight(), None);

        scale.set(0);
        assert!(s.tare());
        assert_eq!(s.state(), SensorState::Ready);
    }

    #[test]
    fn invalid_known_weight_leaves_state_alone() {
        let scale = ScriptedScale::constant(1000);
        let store = MemoryCalibrationStore::new();
        let s = sensor(&scale, &store);
        s.tare();
        let err = s.try_calibrate(0.0, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FeederError>(),
            Some(FeederError::InvalidInput(_))
        ));
        assert_eq!(s.state(), SensorState::Tared);
    }

    #[test]
    fn save_failure_keeps_calibration_in_memory() {
        let scale = ScriptedScale::constant(1000);
        let store = MemoryCalibrationStore::new();
        store.set_fail_saves(true);
        let s = sensor(&scale, &store);
        assert!(s.tare());
        scale.set(1000 + 100 * 50);
        assert!(s.calibrate(50.0, false));
        assert!(s.is_ready());
        assert_eq!(store.current(), None);
    }

    /// Scale that notes which thread issued each read and whether two reads
    /// were ever in flight at once.
    #[derive(Clone, Default)]
    struct WatchedScale {
        busy: Arc<AtomicBool>,
        overlapped: Arc<AtomicBool>,
        readers: Arc<Mutex<Vec<ThreadId>>>,
    }

    impl Scale for WatchedScale {
        fn read(&mut self, _timeout: Duration) -> std::result::Result<i32, BoxError> {
            if self.busy.swap(true, Ordering::SeqCst) {
                self.overlapped.store(true, Ordering::SeqCst);
            }
            self.readers.lock().unwrap().push(thread::current().id());
            thread::sleep(Duration::from_micros(200));
            self.busy.store(false, Ordering::SeqCst);
            Ok(1000)
        }
    }

    #[test]
    fn concurrent_tares_run_one_after_the_other() {
        let scale = WatchedScale::default();
        let s = Arc::new(
            WeightSensor::builder()
                .with_scale(scale.clone())
                .with_clock(Arc::new(TestClock::new()))
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let s = Arc::clone(&s);
                thread::spawn(move || s.tare())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }

        assert!(!scale.overlapped.load(Ordering::SeqCst));
        let readers = scale.readers.lock().unwrap().clone();
        // 2 * tare_samples successful reads per tare
        assert_eq!(readers.len(), 80);
        // Each tare's burst is one contiguous block
        let switches = readers.windows(2).filter(|w| w[0] != w[1]).count();
        assert_eq!(switches, 1);
        assert_eq!(s.state(), SensorState::Tared);
    }

    #[test]
    fn net_grams_applies_deadband_and_floor() {
        let p = CalibrationParameters {
            offset: 0.0,
            scale: 10.0,
        };
        assert_eq!(net_grams(29.0, &p, 3.0), 0.0);
        assert_eq!(net_grams(-500.0, &p, 3.0), 0.0);
        assert_eq!(net_grams(30.0, &p, 3.0), 3.0);
        assert_eq!(net_grams(1234.0, &p, 3.0), 123.4);
    }
}
