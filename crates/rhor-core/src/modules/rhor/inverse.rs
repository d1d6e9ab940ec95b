use super::forward::ForwardRhoRModel;
use super::params::{ShellModelParameters, ShellParameter};
use crate::domain::RhorError;
use crate::numerics::{InterpolantError, LinearInterpolant};

/// Each table step moves `Rcm` inward by this fraction of itself.
const STEP_DIVISOR: f64 = 50.0;
const MIN_RCM_CM: f64 = 1.0e-4;
const MAX_TABLE_ROWS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("shell model parameters are invalid: {0}")]
    InvalidParameters(String),
    #[error("capsule model produced {rows} usable table rows, need at least 2")]
    TableTooShort { rows: usize },
    #[error(transparent)]
    Interpolant(#[from] InterpolantError),
}

impl From<ModelError> for RhorError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::InvalidParameters(message) => {
                RhorError::input_validation("INPUT.SHELL_MODEL", message)
            }
            other => RhorError::computation("RUN.RHOR_TABLE", other.to_string()),
        }
    }
}

/// Tabulated inversion of the capsule model: measured mean energy to shell
/// radius and areal density. Tables are built once; a parameter change means
/// a new solver.
#[derive(Debug, Clone)]
pub struct InverseRhoRSolver {
    model: ForwardRhoRModel,
    rcm: Vec<f64>,
    eout: Vec<f64>,
    rhor: Vec<f64>,
    rcm_of_energy: LinearInterpolant,
    energy_of_rcm: LinearInterpolant,
    rhor_of_rcm: LinearInterpolant,
}

impl InverseRhoRSolver {
    pub fn new(params: ShellModelParameters) -> Result<Self, ModelError> {
        params
            .validate()
            .map_err(|error| ModelError::InvalidParameters(error.message().to_string()))?;
        let model = ForwardRhoRModel::new(params);

        let mut rcm_table = Vec::new();
        let mut eout_table: Vec<f64> = Vec::new();
        let mut rhor_table = Vec::new();
        let mut rcm = params.value(ShellParameter::InnerRadius);
        while rcm >= MIN_RCM_CM && rcm_table.len() < MAX_TABLE_ROWS {
            let energy = model.eout(rcm);
            if !energy.is_finite() {
                break;
            }
            // Eout must fall strictly as the capsule compresses.
            if eout_table.last().is_none_or(|&previous| energy < previous) {
                rcm_table.push(rcm);
                eout_table.push(energy);
                rhor_table.push(model.rhor_total(rcm));
            }
            if energy <= 0.0 {
                break;
            }
            rcm -= rcm / STEP_DIVISOR;
        }

        if rcm_table.len() < 2 {
            return Err(ModelError::TableTooShort {
                rows: rcm_table.len(),
            });
        }
        tracing::debug!(
            rows = rcm_table.len(),
            rcm_min = rcm_table[rcm_table.len() - 1],
            eout_max = eout_table[0],
            "built rhoR inversion table"
        );

        Ok(Self {
            rcm_of_energy: LinearInterpolant::from_monotonic(&eout_table, &rcm_table)?,
            energy_of_rcm: LinearInterpolant::from_monotonic(&rcm_table, &eout_table)?,
            rhor_of_rcm: LinearInterpolant::from_monotonic(&rcm_table, &rhor_table)?,
            model,
            rcm: rcm_table,
            eout: eout_table,
            rhor: rhor_table,
        })
    }

    pub fn model(&self) -> &ForwardRhoRModel {
        &self.model
    }

    pub fn params(&self) -> &ShellModelParameters {
        self.model.params()
    }

    /// `(rhoR g/cm^2, Rcm cm)` for a mean energy `energy_mev`; NaN outside
    /// the tabulated range.
    pub fn calc_rhor(&self, energy_mev: f64) -> (f64, f64) {
        let rcm = self.calc_rcm(energy_mev);
        (self.model.rhor_total(rcm), rcm)
    }

    pub fn calc_rcm(&self, energy_mev: f64) -> f64 {
        self.rcm_of_energy.evaluate(energy_mev)
    }

    /// Tabulated emerging energy at `rcm`.
    pub fn eout(&self, rcm: f64) -> f64 {
        self.energy_of_rcm.evaluate(rcm)
    }

    /// Tabulated total rhoR at `rcm`, linear between table rows.
    pub fn rhor_table(&self, rcm: f64) -> f64 {
        self.rhor_of_rcm.evaluate(rcm)
    }

    /// Table rows, outermost radius first.
    pub fn rcm_values(&self) -> &[f64] {
        &self.rcm
    }

    pub fn eout_values(&self) -> &[f64] {
        &self.eout
    }

    pub fn rhor_values(&self) -> &[f64] {
        &self.rhor
    }

    /// `(min, max)` energies the solver can invert.
    pub fn energy_range(&self) -> (f64, f64) {
        self.rcm_of_energy.domain()
    }
}
