//! One shot from raw spectrum to areal density: hohlraum correction,
//! Gaussian fit, inversion and uncertainty budget, flattened into an
//! [`AnalysisRecord`].

mod request;

pub use request::{
    AnalysisRequest, DEFAULT_ENERGY_SYSTEMATIC_MEV, RequestError, StoppingTablePaths, WallSource,
    load_analysis_request,
};

use crate::common::constants::{MG_PER_G, UM_PER_CM};
use crate::domain::{AnalysisRecord, RhorResult, Spectrum};
use crate::modules::fit::{GaussFit, estimate_guess, fit};
use crate::modules::hohlraum::{HohlraumCorrector, WallThickness};
use crate::modules::rhor::{RcmResult, RhoRResult, SensitivityAnalyzer};
use crate::numerics::quadrature_sum;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub corrected_spectrum: Spectrum,
    pub fit: GaussFit,
    pub thickness: WallThickness,
    /// Hohlraum correction uncertainty on the mean energy (MeV).
    pub hohlraum_uncertainty: f64,
    pub rhor: RhoRResult,
    pub rcm: RcmResult,
    pub record: AnalysisRecord,
}

pub fn run_analysis(request: &AnalysisRequest) -> RhorResult<AnalysisOutput> {
    let corrector = match &request.wall {
        Some(wall) => {
            let stopping = request.stopping_tables.load().map_err(RequestError::from)?;
            Some(HohlraumCorrector::new(wall.thickness_mode(), stopping, &request.correction)?)
        }
        None => None,
    };
    let corrected = match &corrector {
        Some(corrector) => corrector.correct(&request.spectrum)?,
        None => request.spectrum.clone(),
    };

    let guess = match request.guess {
        Some(guess) => guess,
        None => estimate_guess(&corrected)?,
    };
    let fit = fit(&corrected, guess, &request.fit)?;

    let hohlraum_uncertainty = match &corrector {
        Some(corrector) => corrector
            .correction_uncertainty(&request.spectrum, fit.params(), &request.fit)
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "hohlraum correction uncertainty unavailable");
                f64::NAN
            }),
        None => 0.0,
    };
    let thickness = corrector
        .as_ref()
        .map(HohlraumCorrector::thickness)
        .unwrap_or_default();

    let energy = fit.mean();
    let (minus, plus) = fit.mean_error();
    let random_energy_error = 0.5 * (minus + plus);
    let systematic_energy_error = quadrature_sum(&[hohlraum_uncertainty, request.energy_systematic_mev]);

    let (rhor, rcm) = match SensitivityAnalyzer::new(request.shell) {
        Ok(analyzer) => {
            let rhor = RhoRResult::evaluate(&analyzer, energy, random_energy_error, systematic_energy_error);
            let rcm = RcmResult::evaluate(&analyzer, energy, random_energy_error, systematic_energy_error);
            if rhor.total.is_nan() {
                let (low, high) = analyzer.nominal().energy_range();
                tracing::warn!(energy, low, high, "mean energy outside the rhoR table");
            }
            (rhor, rcm)
        }
        Err(error) => {
            tracing::warn!(%error, "rhoR model unavailable, reporting fit and wall only");
            (RhoRResult::unavailable(), RcmResult::unavailable())
        }
    };
    tracing::info!(
        mean_mev = energy,
        rhor_mg_cm2 = rhor.total * MG_PER_G,
        rcm_um = rcm.value * UM_PER_CM,
        "analysis finished"
    );

    let record = build_record(&fit, &thickness, hohlraum_uncertainty, &rhor, &rcm);
    Ok(AnalysisOutput {
        corrected_spectrum: corrected,
        fit,
        thickness,
        hohlraum_uncertainty,
        rhor,
        rcm,
        record,
    })
}

/// ρR in mg/cm^2, Rcm in um, energies in MeV.
pub fn build_record(
    fit: &GaussFit,
    thickness: &WallThickness,
    hohlraum_uncertainty: f64,
    rhor: &RhoRResult,
    rcm: &RcmResult,
) -> AnalysisRecord {
    let (mean_minus, mean_plus) = fit.mean_error();
    [
        ("mean", fit.mean()),
        ("mean_err_minus", mean_minus),
        ("mean_err_plus", mean_plus),
        ("sigma", fit.sigma()),
        ("yield", fit.amplitude()),
        ("chi2_red", fit.reduced_chi2()),
        ("Au", thickness.au),
        ("Au_unc", thickness.au_unc),
        ("DU", thickness.du),
        ("DU_unc", thickness.du_unc),
        ("Al", thickness.al),
        ("Al_unc", thickness.al_unc),
        ("hohl_unc", hohlraum_uncertainty),
        ("rhoR", rhor.total * MG_PER_G),
        ("rhoR_fuel", rhor.fuel * MG_PER_G),
        ("rhoR_shell", rhor.shell * MG_PER_G),
        ("rhoR_abl", rhor.ablated * MG_PER_G),
        ("rhoR_ran", rhor.random * MG_PER_G),
        ("rhoR_sys", rhor.systematic * MG_PER_G),
        ("rhoR_model", rhor.model * MG_PER_G),
        ("Rcm", rcm.value * UM_PER_CM),
        ("Rcm_ran", rcm.random * UM_PER_CM),
        ("Rcm_sys", rcm.systematic * UM_PER_CM),
        ("Rcm_model", rcm.model * UM_PER_CM),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}
