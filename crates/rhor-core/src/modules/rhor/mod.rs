//! Capsule areal density from the mean energy of the escaping protons.
//!
//! [`ForwardRhoRModel`] maps a shell radius to the emerging proton energy,
//! [`InverseRhoRSolver`] tabulates and inverts it, and
//! [`SensitivityAnalyzer`] propagates the parameter uncertainties.

mod forward;
mod inverse;
mod params;
mod sensitivity;

pub use forward::{CompressedProfile, ForwardRhoRModel, STEPS_PER_REGION};
pub use inverse::{InverseRhoRSolver, ModelError};
pub use params::{ParameterValue, ShellModelParameters, ShellParameter};
pub use sensitivity::{RCM_SCAN_STEP, SensitivityAnalyzer};

use serde::Serialize;

/// Areal density (g/cm^2) split by region with its three uncertainty terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RhoRResult {
    pub total: f64,
    pub fuel: f64,
    pub shell: f64,
    pub ablated: f64,
    pub random: f64,
    pub systematic: f64,
    pub model: f64,
}

/// Shell radius (cm) at the time of emission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RcmResult {
    pub value: f64,
    pub random: f64,
    pub systematic: f64,
    pub model: f64,
}

impl RhoRResult {
    /// Every field NaN, for when no inversion table could be built.
    pub fn unavailable() -> Self {
        Self {
            total: f64::NAN,
            fuel: f64::NAN,
            shell: f64::NAN,
            ablated: f64::NAN,
            random: f64::NAN,
            systematic: f64::NAN,
            model: f64::NAN,
        }
    }

    /// Region split at `energy_mev` from the nominal solver, uncertainties
    /// from the half spread of `calc_rhor` over `energy +/- error`.
    pub fn evaluate(
        analyzer: &SensitivityAnalyzer,
        energy_mev: f64,
        random_energy_error: f64,
        systematic_energy_error: f64,
    ) -> Self {
        let solver = analyzer.nominal();
        let (total, rcm) = solver.calc_rhor(energy_mev);
        let (fuel, shell, ablated) = solver.model().rhor_parts(rcm);
        Self {
            total,
            fuel,
            shell,
            ablated,
            random: half_spread(|energy| solver.calc_rhor(energy).0, energy_mev, random_energy_error),
            systematic: half_spread(
                |energy| solver.calc_rhor(energy).0,
                energy_mev,
                systematic_energy_error,
            ),
            model: analyzer.rhor_error(energy_mev),
        }
    }
}

impl RcmResult {
    pub fn unavailable() -> Self {
        Self {
            value: f64::NAN,
            random: f64::NAN,
            systematic: f64::NAN,
            model: f64::NAN,
        }
    }

    pub fn evaluate(
        analyzer: &SensitivityAnalyzer,
        energy_mev: f64,
        random_energy_error: f64,
        systematic_energy_error: f64,
    ) -> Self {
        let solver = analyzer.nominal();
        Self {
            value: solver.calc_rcm(energy_mev),
            random: half_spread(|energy| solver.calc_rcm(energy), energy_mev, random_energy_error),
            systematic: half_spread(|energy| solver.calc_rcm(energy), energy_mev, systematic_energy_error),
            model: analyzer.rcm_error(energy_mev, 0.0),
        }
    }
}

/// `|f(x - dx) - f(x + dx)| / 2`; zero for a zero shift, NaN when either
/// side leaves the table.
fn half_spread<F>(target: F, center: f64, shift: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    if shift == 0.0 {
        return 0.0;
    }
    0.5 * (target(center - shift) - target(center + shift)).abs()
}
