//! Derived RF quantities computed from forward and reflected power.
//!
//! Both functions are total: zero, negative or non-finite powers fall back
//! to the matched/no-signal defaults (VSWR 1, return loss 0 dB).

use super::reading::Reading;
use serde::Serialize;

/// Upper bound reported for VSWR when the reflection coefficient reaches or
/// exceeds 1 (reflected power at or above forward power). The ratio
/// diverges there, so the value saturates instead.
pub const VSWR_CEILING: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    pub vswr: f64,
    pub return_loss_db: f64,
}

pub fn derive_metrics(reading: &Reading) -> DerivedMetrics {
    DerivedMetrics {
        vswr: derive_vswr(reading.forward_power, reading.reflected_power),
        return_loss_db: derive_return_loss(reading.forward_power, reading.reflected_power),
    }
}

/// VSWR = (1 + ρ) / (1 − ρ) with ρ = √(reflected / forward).
///
/// Returns 1 unless both powers are positive, and [`VSWR_CEILING`] once
/// ρ gets close enough to 1 that the ratio would exceed it.
pub fn derive_vswr(forward_power: f64, reflected_power: f64) -> f64 {
    let Some(rho) = reflection_coefficient(forward_power, reflected_power) else {
        return 1.0;
    };

    let denominator = 1.0 - rho;
    if denominator <= 0.0 {
        return VSWR_CEILING;
    }

    let vswr = (1.0 + rho) / denominator;
    if vswr.is_finite() { vswr.min(VSWR_CEILING) } else { VSWR_CEILING }
}

/// Return loss in dB, 20·log10(ρ), i.e. 10·log10(reflected / forward).
///
/// Negative whenever reflected < forward; more negative is a better match.
/// Returns 0 unless both powers are positive.
pub fn derive_return_loss(forward_power: f64, reflected_power: f64) -> f64 {
    match reflection_coefficient(forward_power, reflected_power) {
        Some(rho) => 20.0 * rho.log10(),
        None => 0.0,
    }
}

fn reflection_coefficient(forward_power: f64, reflected_power: f64) -> Option<f64> {
    let forward = zero_if_missing(forward_power);
    let reflected = zero_if_missing(reflected_power);
    if forward > 0.0 && reflected > 0.0 {
        Some((reflected / forward).sqrt())
    } else {
        None
    }
}

/// NaN and infinities count as missing data, which defaults to zero.
pub(crate) fn zero_if_missing(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_signal() {
        assert_eq!(derive_vswr(1.0, 0.0), 1.0);
        assert_eq!(derive_vswr(0.0, 0.0), 1.0);
        assert_eq!(derive_vswr(-3.0, 1.0), 1.0);
        assert_eq!(derive_return_loss(1.0, 0.0), 0.0);
        assert_eq!(derive_return_loss(0.0, 5.0), 0.0);
    }

    #[test]
    fn test_nan_treated_as_zero() {
        assert_eq!(derive_vswr(f64::NAN, 1.0), 1.0);
        assert_eq!(derive_vswr(10.0, f64::NAN), 1.0);
        assert_eq!(derive_return_loss(f64::INFINITY, 1.0), 0.0);
    }

    #[test]
    fn test_known_values() {
        // ρ = √(1/100) = 0.1
        let vswr = derive_vswr(100.0, 1.0);
        assert!((vswr - 1.1 / 0.9).abs() < 1e-12);

        let rl = derive_return_loss(100.0, 1.0);
        assert!((rl - -20.0).abs() < 1e-12);

        // both formulations agree
        let alt = 10.0 * (1.0f64 / 100.0).log10();
        assert!((rl - alt).abs() < 1e-12);
    }

    #[test]
    fn test_partial_reflection_bounds() {
        let cases = [(1.0, 0.001), (50.0, 2.5), (100.0, 99.0), (0.2, 0.1999)];
        for (forward, reflected) in cases {
            assert!(derive_vswr(forward, reflected) >= 1.0, "vswr for {forward}/{reflected}");
            assert!(derive_return_loss(forward, reflected) <= 0.0, "rl for {forward}/{reflected}");
        }
    }

    #[test]
    fn test_total_reflection_saturates() {
        assert_eq!(derive_vswr(10.0, 10.0), VSWR_CEILING);
        assert_eq!(derive_vswr(10.0, 40.0), VSWR_CEILING);
        assert_eq!(derive_vswr(1.0, 1.0 - 1e-15), VSWR_CEILING);
        assert_eq!(derive_return_loss(10.0, 10.0), 0.0);
    }
}
