//! Hopper fill level from a time-of-flight distance reading.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use feeder_traits::{Clock, RangeSensor};

use crate::error::{FeederError, Result};
use crate::hw_error::map_hw_error;
use crate::util::round1;

const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Linear distance-to-percent mapping. A short distance means a full hopper.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillLevel {
    min_distance_cm: f64,
    max_distance_cm: f64,
}

impl FillLevel {
    pub fn new(min_distance_cm: f64, max_distance_cm: f64) -> Result<Self> {
        if !min_distance_cm.is_finite() || !max_distance_cm.is_finite() || min_distance_cm < 0.0 {
            return Err(FeederError::InvalidInput("distances must be finite and >= 0".into()).into());
        }
        if max_distance_cm <= min_distance_cm {
            return Err(FeederError::InvalidInput(format!(
                "max distance ({max_distance_cm} cm) must exceed min distance ({min_distance_cm} cm)"
            ))
            .into());
        }
        Ok(Self {
            min_distance_cm,
            max_distance_cm,
        })
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min_distance_cm, self.max_distance_cm)
    }

    pub fn percent(&self, distance_cm: f64) -> f64 {
        if distance_cm <= self.min_distance_cm {
            return 100.0;
        }
        if distance_cm >= self.max_distance_cm {
            return 0.0;
        }
        let span = self.max_distance_cm - self.min_distance_cm;
        round1(100.0 - (distance_cm - self.min_distance_cm) / span * 100.0)
    }
}

impl Default for FillLevel {
    fn default() -> Self {
        Self {
            min_distance_cm: 4.0,
            max_distance_cm: 55.0,
        }
    }
}

struct Inner {
    sensor: Box<dyn RangeSensor + Send>,
    level: FillLevel,
}

pub struct LevelSensor {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock + Send + Sync>,
    max_retries: u32,
}

impl LevelSensor {
    pub fn new(
        sensor: impl RangeSensor + Send + 'static,
        level: FillLevel,
        max_retries: u32,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                sensor: Box::new(sensor),
                level,
            }),
            clock,
            max_retries: max_retries.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn fill_level(&self) -> FillLevel {
        self.lock().level
    }

    pub fn configure_range(&self, min_distance_cm: f64, max_distance_cm: f64) -> Result<()> {
        let level = FillLevel::new(min_distance_cm, max_distance_cm)?;
        self.lock().level = level;
        tracing::info!(min_distance_cm, max_distance_cm, "fill level range updated");
        Ok(())
    }

    pub fn try_distance_mm(&self) -> Result<u16> {
        let mut g = self.lock();
        let mut last = FeederError::Timeout;
        for attempt in 1..=self.max_retries {
            match g.sensor.read_mm() {
                Ok(mm) => {
                    tracing::trace!(mm, attempt, "range read");
                    return Ok(mm);
                }
                Err(e) => {
                    last = map_hw_error(&*e);
                    tracing::debug!(attempt, error = %last, "range read failed");
                    if attempt < self.max_retries {
                        self.clock.sleep(RETRY_DELAY);
                    }
                }
            }
        }
        Err(eyre::Report::new(last).wrap_err(format!(
            "distance unavailable after {} attempts",
            self.max_retries
        )))
    }

    pub fn distance_mm(&self) -> Option<u16> {
        self.try_distance_mm()
            .map_err(|e| tracing::warn!(error = %e, "distance sensor read failed"))
            .ok()
    }

    pub fn distance_cm(&self) -> Option<f64> {
        self.distance_mm().map(|mm| round1(f64::from(mm) / 10.0))
    }

    pub fn fill_percent(&self) -> Option<f64> {
        let cm = self.distance_cm()?;
        let pct = self.fill_level().percent(cm);
        tracing::debug!(distance_cm = cm, percent = pct, "fill level");
        Some(pct)
    }
}
