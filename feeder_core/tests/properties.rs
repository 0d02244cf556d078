//! Properties of the weight conversion and the robust filter.

use feeder_core::sensor::net_grams;
use feeder_core::{CalibrationParameters, robust_mean};
use proptest::prelude::*;

const DEADBAND: f64 = 3.0;

fn params() -> impl Strategy<Value = CalibrationParameters> {
    (-1.0e6f64..1.0e6, prop_oneof![1.0f64..5000.0, -5000.0f64..-1.0])
        .prop_map(|(offset, scale)| CalibrationParameters { offset, scale })
}

proptest! {
    #[test]
    fn deadband_reports_exact_zero(p in params(), w in -2.999f64..2.999) {
        let raw = p.offset + w * p.scale;
        prop_assert_eq!(net_grams(raw, &p, DEADBAND), 0.0);
    }

    #[test]
    fn never_negative(p in params(), raw in -1.0e8f64..1.0e8) {
        let g = net_grams(raw, &p, DEADBAND);
        prop_assert!(g >= 0.0);
        prop_assert!(g.is_sign_positive());
    }

    #[test]
    fn round_trip_above_deadband(p in params(), w in 3.01f64..5000.0) {
        let raw = p.offset + w * p.scale;
        let g = net_grams(raw, &p, DEADBAND);
        prop_assert!((g - (w * 10.0).round() / 10.0).abs() <= 0.1 + 1e-9, "w={} g={}", w, g);
    }

    #[test]
    fn outliers_do_not_escape_the_cluster(
        center in -1.0e5f64..1.0e5,
        spread in 0.0f64..50.0,
        cluster in prop::collection::vec(0.0f64..1.0, 6..30),
        outliers in prop::collection::vec(prop_oneof![1.0e7f64..1.0e9, -1.0e9f64..-1.0e7], 0..20),
    ) {
        // at most 40 % outliers
        let max_out = cluster.len() * 2 / 3;
        let outliers = &outliers[..outliers.len().min(max_out)];
        let tight: Vec<f64> = cluster.iter().map(|u| center + u * spread).collect();
        let lo = tight.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = tight.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut samples = tight.clone();
        samples.extend(outliers.iter().map(|o| center + o));
        let desired = tight.len();
        let m = robust_mean(&samples, desired).unwrap();
        let eps = 1e-9 * (1.0 + center.abs());
        prop_assert!(m >= lo - eps && m <= hi + eps, "mean {} outside [{}, {}]", m, lo, hi);
    }
}
