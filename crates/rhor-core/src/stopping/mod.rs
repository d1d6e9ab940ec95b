//! Proton stopping-power models.
//!
//! Every model is immutable once built and is shared between the capsule
//! model, the inverse solver and the hohlraum corrector through
//! [`SharedStopping`]. Energies are in MeV, lengths in micrometres.

mod bethe;
mod plasma;
mod table;

pub use bethe::BetheStopping;
pub use plasma::{FieldSpecies, PlasmaStopping};
pub use table::{StoppingTableError, TabulatedStopping, load_stopping_table, parse_stopping_table};

use std::fmt::Debug;
use std::sync::Arc;

/// Fraction of the current energy a single integration sub-step may remove.
const MAX_FRACTIONAL_LOSS: f64 = 0.02;
/// Below this energy a proton counts as ranged out.
pub const RANGE_OUT_ENERGY_MEV: f64 = 0.01;
const MAX_SUBSTEPS: usize = 100_000;

pub type SharedStopping = Arc<dyn StoppingPower>;

pub trait StoppingPower: Debug + Send + Sync {
    /// Stopping power in MeV/um at the given proton energy. Never negative.
    fn dedx(&self, energy_mev: f64) -> f64;

    /// Energy after traversing `thickness_um`, clamped to zero once the
    /// proton ranges out.
    fn eout(&self, energy_mev: f64, thickness_um: f64) -> f64 {
        integrate_downshift(|energy| self.dedx(energy), energy_mev, thickness_um)
    }

    /// Energy a proton must have had before `thickness_um` to leave with
    /// `energy_mev`.
    fn ein(&self, energy_mev: f64, thickness_um: f64) -> f64 {
        integrate_upshift(|energy| self.dedx(energy), energy_mev, thickness_um)
    }
}

/// Adaptive midpoint integration of `dE/dx` forward through a layer.
pub fn integrate_downshift<F>(dedx: F, energy_mev: f64, thickness_um: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    if !energy_mev.is_finite() || !thickness_um.is_finite() {
        return f64::NAN;
    }
    if thickness_um <= 0.0 {
        return energy_mev.max(0.0);
    }

    let mut energy = energy_mev;
    let mut remaining = thickness_um;
    for _ in 0..MAX_SUBSTEPS {
        if energy <= RANGE_OUT_ENERGY_MEV {
            return 0.0;
        }
        if remaining <= 0.0 {
            break;
        }

        let rate = dedx(energy);
        if rate.is_nan() {
            return f64::NAN;
        }
        if rate <= 0.0 {
            break;
        }
        let step = (MAX_FRACTIONAL_LOSS * energy / rate).min(remaining);
        let midpoint = (energy - 0.5 * step * rate).max(0.0);
        energy -= dedx(midpoint) * step;
        remaining -= step;
    }

    if energy <= RANGE_OUT_ENERGY_MEV {
        0.0
    } else {
        energy
    }
}

/// Reverse of [`integrate_downshift`]: energy grows through the layer.
pub fn integrate_upshift<F>(dedx: F, energy_mev: f64, thickness_um: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    if !energy_mev.is_finite() || !thickness_um.is_finite() {
        return f64::NAN;
    }
    if thickness_um <= 0.0 {
        return energy_mev.max(0.0);
    }

    let mut energy = energy_mev.max(RANGE_OUT_ENERGY_MEV);
    let mut remaining = thickness_um;
    for _ in 0..MAX_SUBSTEPS {
        if remaining <= 0.0 {
            break;
        }

        let rate = dedx(energy);
        if rate.is_nan() {
            return f64::NAN;
        }
        if rate <= 0.0 {
            break;
        }
        let step = (MAX_FRACTIONAL_LOSS * energy / rate).min(remaining);
        let midpoint = energy + 0.5 * step * rate;
        energy += dedx(midpoint) * step;
        remaining -= step;
    }

    energy
}

#[cfg(test)]
mod tests {
    use super::{RANGE_OUT_ENERGY_MEV, integrate_downshift, integrate_upshift};

    #[test]
    fn constant_stopping_downshift_is_linear() {
        let energy = integrate_downshift(|_| 0.01, 10.0, 100.0);
        assert!((energy - 9.0).abs() < 1.0e-9);
        let energy = integrate_upshift(|_| 0.01, 9.0, 100.0);
        assert!((energy - 10.0).abs() < 1.0e-9);
    }

    #[test]
    fn downshift_clamps_to_zero_when_ranged_out() {
        assert_eq!(integrate_downshift(|_| 0.1, 1.0, 100.0), 0.0);
        assert_eq!(integrate_downshift(|_| 0.1, RANGE_OUT_ENERGY_MEV, 1.0), 0.0);
    }

    #[test]
    fn zero_thickness_and_vacuum_leave_energy_unchanged() {
        assert_eq!(integrate_downshift(|_| 0.1, 5.0, 0.0), 5.0);
        assert_eq!(integrate_downshift(|_| 0.0, 5.0, 100.0), 5.0);
        assert!(integrate_downshift(|_| 0.1, f64::NAN, 1.0).is_nan());
        assert!(integrate_downshift(|_| f64::NAN, 5.0, 1.0).is_nan());
    }

    #[test]
    fn upshift_inverts_downshift_for_energy_dependent_stopping() {
        let dedx = |energy: f64| 0.05 / energy.max(1.0e-3);
        let after = integrate_downshift(dedx, 12.0, 150.0);
        let before = integrate_upshift(dedx, after, 150.0);
        assert!((before - 12.0).abs() < 1.0e-3, "recovered {before}");
    }
}
