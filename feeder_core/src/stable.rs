//! Stable raw readings: burst sampling plus median/MAD outlier rejection.

use feeder_traits::{Clock, Scale};

use crate::config::StableCfg;
use crate::error::{FeederError, Result};
use crate::hw_error::map_hw_error;
use crate::util::{mean, median};

/// Keep samples within this many MADs of the median.
const MAD_CUTOFF: f64 = 2.0;

/// Collects a burst of raw samples and reduces it to one robust value.
#[derive(Debug, Clone, Copy, Default)]
pub struct StableReader {
    cfg: StableCfg,
}

impl StableReader {
    pub fn new(cfg: StableCfg) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &StableCfg {
        &self.cfg
    }

    /// Read up to `2 * desired` successful samples within
    /// `attempts_factor * desired` attempts and return their robust mean.
    ///
    /// Individual read failures are skipped. Fewer than `desired` successes
    /// yields `FeederError::InsufficientSamples`.
    pub fn read(&self, scale: &mut dyn Scale, clock: &dyn Clock, desired: usize) -> Result<f64> {
        let desired = desired.max(1);
        let wanted = desired.saturating_mul(2);
        let max_attempts = desired.saturating_mul(self.cfg.attempts_factor.max(1));

        let mut samples = Vec::with_capacity(wanted);
        let mut last_err = None;
        let mut attempts = 0;
        while samples.len() < wanted && attempts < max_attempts {
            attempts += 1;
            match scale.read(self.cfg.read_timeout) {
                Ok(raw) => samples.push(f64::from(raw)),
                Err(e) => {
                    let mapped = map_hw_error(&*e);
                    tracing::debug!(attempt = attempts, error = %mapped, "scale read failed");
                    last_err = Some(mapped);
                }
            }
            clock.sleep(self.cfg.sample_delay);
        }

        if samples.len() < desired {
            let err = FeederError::InsufficientSamples {
                collected: samples.len(),
                required: desired,
            };
            tracing::warn!(
                collected = samples.len(),
                required = desired,
                attempts,
                last_error = ?last_err,
                "not enough valid samples"
            );
            return Err(eyre::Report::new(err));
        }

        robust_mean(&samples, desired).ok_or_else(|| {
            eyre::Report::new(FeederError::InsufficientSamples {
                collected: 0,
                required: desired,
            })
        })
    }
}

/// Mean of `samples` after median/MAD outlier rejection.
///
/// - MAD > 0: keep samples within `2 * MAD` of the median; if that keeps
///   fewer than half of `desired`, keep the `desired` samples closest to the
///   median instead.
/// - MAD == 0: keep the samples equal to the median (all of them when the
///   burst is constant).
///
/// Returns `None` for an empty slice.
pub fn robust_mean(samples: &[f64], desired: usize) -> Option<f64> {
    let med = median(samples)?;
    let deviations: Vec<f64> = samples.iter().map(|x| (x - med).abs()).collect();
    let mad = median(&deviations)?;

    let kept: Vec<f64> = if mad > 0.0 {
        let limit = MAD_CUTOFF * mad;
        let within: Vec<f64> = samples
            .iter()
            .zip(&deviations)
            .filter(|(_, d)| **d <= limit)
            .map(|(x, _)| *x)
            .collect();
        if within.len() * 2 < desired {
            closest_to_median(samples, &deviations, desired)
        } else {
            within
        }
    } else {
        samples
            .iter()
            .zip(&deviations)
            .filter(|(_, d)| **d == 0.0)
            .map(|(x, _)| *x)
            .collect()
    };

    mean(&kept)
}

fn closest_to_median(samples: &[f64], deviations: &[f64], n: usize) -> Vec<f64> {
    let mut order: Vec<usize> = (0..samples.len()).collect();
    order.sort_by(|&a, &b| deviations[a].total_cmp(&deviations[b]));
    order
        .into_iter()
        .take(n.max(1))
        .map(|i| samples[i])
        .collect()
}
