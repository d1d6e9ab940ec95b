use super::inverse::{InverseRhoRSolver, ModelError};
use super::params::{ShellModelParameters, ShellParameter};
use crate::numerics::quadrature_sum;
use rayon::prelude::*;

/// Radial step (cm) of the measurement-error scan in [`SensitivityAnalyzer::rcm_error`].
pub const RCM_SCAN_STEP: f64 = 1.0e-4;
const MAX_SCAN_STEPS: usize = 100_000;

/// Solvers for one parameter moved down and up by its 1 sigma.
#[derive(Debug, Clone)]
struct PerturbedPair {
    parameter: ShellParameter,
    lower: InverseRhoRSolver,
    upper: InverseRhoRSolver,
}

/// One-at-a-time model uncertainty: every parameter with a non-zero sigma
/// gets two perturbed solvers, built once and owned here.
#[derive(Debug, Clone)]
pub struct SensitivityAnalyzer {
    nominal: InverseRhoRSolver,
    perturbed: Vec<PerturbedPair>,
}

impl SensitivityAnalyzer {
    pub fn new(params: ShellModelParameters) -> Result<Self, ModelError> {
        let nominal = InverseRhoRSolver::new(params)?;
        let perturbed: Vec<PerturbedPair> = ShellParameter::ALL
            .par_iter()
            .filter(|parameter| params.sigma(**parameter) > 0.0)
            .filter_map(|&parameter| {
                let build = |sigmas: f64| InverseRhoRSolver::new(params.with_offset(parameter, sigmas));
                match (build(-1.0), build(1.0)) {
                    (Ok(lower), Ok(upper)) => Some(PerturbedPair {
                        parameter,
                        lower,
                        upper,
                    }),
                    (Err(error), _) | (_, Err(error)) => {
                        tracing::warn!(
                            parameter = %parameter,
                            %error,
                            "perturbed solver failed, dropping parameter from model error"
                        );
                        None
                    }
                }
            })
            .collect();
        tracing::debug!(parameters = perturbed.len(), "built perturbed rhoR solvers");

        Ok(Self { nominal, perturbed })
    }

    pub fn nominal(&self) -> &InverseRhoRSolver {
        &self.nominal
    }

    /// Parameters that carry a perturbed solver pair, in declaration order.
    pub fn parameters(&self) -> Vec<ShellParameter> {
        self.perturbed.iter().map(|pair| pair.parameter).collect()
    }

    /// Per-parameter half spread of `target` over nominal, -1 sigma and
    /// +1 sigma. A NaN anywhere in the triple makes that entry NaN.
    pub fn partial_errors<F>(&self, target: F) -> Vec<(ShellParameter, f64)>
    where
        F: Fn(&InverseRhoRSolver) -> f64,
    {
        let nominal = target(&self.nominal);
        self.perturbed
            .iter()
            .map(|pair| {
                let triple = [nominal, target(&pair.lower), target(&pair.upper)];
                if triple.iter().any(|value| value.is_nan()) {
                    return (pair.parameter, f64::NAN);
                }
                let max = triple.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let min = triple.iter().copied().fold(f64::INFINITY, f64::min);
                (pair.parameter, 0.5 * (max - min))
            })
            .collect()
    }

    /// Quadrature sum of the partial errors; NaN entries are left out.
    /// NaN when `target` itself is NaN on the nominal solver.
    pub fn calc_error<F>(&self, target: F) -> f64
    where
        F: Fn(&InverseRhoRSolver) -> f64,
    {
        if target(&self.nominal).is_nan() {
            return f64::NAN;
        }
        let partials: Vec<f64> = self
            .partial_errors(target)
            .into_iter()
            .map(|(_, error)| error)
            .collect();
        quadrature_sum(&partials)
    }

    pub fn eout_error(&self, rcm: f64) -> f64 {
        self.calc_error(|solver| solver.eout(rcm))
    }

    pub fn rhor_error(&self, energy_mev: f64) -> f64 {
        self.calc_error(|solver| solver.calc_rhor(energy_mev).0)
    }

    pub fn rhor_total_error(&self, rcm: f64) -> f64 {
        self.calc_error(|solver| solver.model().rhor_total(rcm))
    }

    /// Model error on Rcm at `energy_mev` combined in quadrature with the
    /// radial spread that an energy error `energy_error_mev` maps onto.
    pub fn rcm_error(&self, energy_mev: f64, energy_error_mev: f64) -> f64 {
        let model = self.calc_error(|solver| solver.calc_rcm(energy_mev));
        let rcm = self.nominal.calc_rcm(energy_mev);
        if !rcm.is_finite() {
            return f64::NAN;
        }
        if !(energy_error_mev > 0.0) {
            return model;
        }

        let outer = self.scan_to_energy(rcm, energy_mev + energy_error_mev, 1.0);
        let inner = self.scan_to_energy(rcm, energy_mev - energy_error_mev, -1.0);
        let measurement = 0.5 * (outer - inner);
        quadrature_sum(&[model, measurement])
    }

    /// Walks the nominal table from `start` in `direction` until the emerging
    /// energy crosses `target`, stopping at the table edge.
    fn scan_to_energy(&self, start: f64, target: f64, direction: f64) -> f64 {
        let mut rcm = start;
        for _ in 0..MAX_SCAN_STEPS {
            let next = rcm + direction * RCM_SCAN_STEP;
            let energy = self.nominal.eout(next);
            if !energy.is_finite() {
                break;
            }
            rcm = next;
            let crossed = if direction > 0.0 {
                energy >= target
            } else {
                energy <= target
            };
            if crossed {
                break;
            }
        }
        rcm
    }
}
