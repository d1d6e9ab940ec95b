use super::CliError;
use super::helpers::{OutputFlags, emit_record, read_json, read_text};
use rhor_core::common::constants::{MG_PER_G, UM_PER_CM};
use rhor_core::domain::{AnalysisRecord, RhorError, Spectrum};
use rhor_core::modules::analysis::{load_analysis_request, run_analysis};
use rhor_core::modules::fit::{FitOptions, estimate_guess, fit};
use rhor_core::modules::hohlraum::{CorrectionOptions, compute_wall_thickness, parse_wall_geometry};
use rhor_core::modules::rhor::{RcmResult, RhoRResult, SensitivityAnalyzer, ShellModelParameters};
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct AnalyzeArgs {
    /// JSON analysis request
    #[arg(long)]
    request: PathBuf,

    #[command(flatten)]
    output: OutputFlags,
}

#[derive(clap::Args)]
pub(super) struct FitArgs {
    /// JSON array of {energy, yield, error} bins
    #[arg(long)]
    spectrum: PathBuf,

    /// Starting amplitude, mean and sigma
    #[arg(long, num_args = 3, value_names = ["A", "MU", "SIGMA"], allow_negative_numbers = true)]
    guess: Option<Vec<f64>>,

    /// Use every bin instead of a window around the mean
    #[arg(long)]
    unrestricted: bool,

    /// Window half width in sigma when restricted
    #[arg(long, default_value_t = 5.0)]
    window_sigma: f64,

    #[command(flatten)]
    output: OutputFlags,
}

#[derive(clap::Args)]
pub(super) struct ThicknessArgs {
    /// Wall geometry text file with `layer material r z` rows
    #[arg(long)]
    geometry: PathBuf,

    /// Lower polar angle of the line of sight (degrees)
    #[arg(long)]
    theta_min: f64,

    /// Upper polar angle of the line of sight (degrees)
    #[arg(long)]
    theta_max: f64,

    /// Lines of sight sampled across the angle range
    #[arg(long, default_value_t = 25)]
    samples: usize,

    #[command(flatten)]
    output: OutputFlags,
}

#[derive(clap::Args)]
pub(super) struct RhorArgs {
    /// Mean proton energy (MeV)
    #[arg(long)]
    energy: f64,

    /// Random error on the energy (MeV)
    #[arg(long, default_value_t = 0.0)]
    random_error: f64,

    /// Systematic error on the energy (MeV)
    #[arg(long, default_value_t = 0.0)]
    systematic_error: f64,

    /// JSON map of shell model parameter overrides
    #[arg(long)]
    params: Option<PathBuf>,

    #[command(flatten)]
    output: OutputFlags,
}

pub(super) fn run_analyze_command(args: AnalyzeArgs) -> Result<i32, CliError> {
    let request = load_analysis_request(&args.request).map_err(RhorError::from)?;
    let output = run_analysis(&request)?;
    emit_record(&output.record, &args.output)?;
    Ok(0)
}

pub(super) fn run_fit_command(args: FitArgs) -> Result<i32, CliError> {
    let spectrum: Spectrum = read_json(&args.spectrum, "spectrum")?;
    let guess = match args.guess.as_deref() {
        Some(&[amplitude, mean, sigma]) => [amplitude, mean, sigma],
        Some(_) => return Err(CliError::Usage("--guess takes exactly three values".to_string())),
        None => estimate_guess(&spectrum).map_err(RhorError::from)?,
    };
    let options = FitOptions {
        restrict_chi2: !args.unrestricted,
        restrict_window_sigma: args.window_sigma,
        ..FitOptions::default()
    };
    let result = fit(&spectrum, guess, &options).map_err(RhorError::from)?;

    let [amplitude_err, mean_err, sigma_err] = result.asymmetric_errors();
    let mut record: AnalysisRecord = [
        ("yield", result.amplitude()),
        ("yield_err_minus", amplitude_err.0),
        ("yield_err_plus", amplitude_err.1),
        ("mean", result.mean()),
        ("mean_err_minus", mean_err.0),
        ("mean_err_plus", mean_err.1),
        ("sigma", result.sigma()),
        ("sigma_err_minus", sigma_err.0),
        ("sigma_err_plus", sigma_err.1),
        ("chi2", result.chi2()),
        ("chi2_red", result.reduced_chi2()),
        ("bins", result.bins_used() as f64),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();
    if let Some([amplitude, mean, sigma]) = result.parabolic_errors() {
        record.insert("yield_err".to_string(), amplitude);
        record.insert("mean_err".to_string(), mean);
        record.insert("sigma_err".to_string(), sigma);
    }
    emit_record(&record, &args.output)?;
    Ok(0)
}

pub(super) fn run_thickness_command(args: ThicknessArgs) -> Result<i32, CliError> {
    let source = read_text(&args.geometry, "wall geometry")?;
    let geometry = parse_wall_geometry(&source).map_err(RhorError::from)?;
    let options = CorrectionOptions {
        angle_samples: args.samples,
        ..CorrectionOptions::default()
    };
    let thickness = compute_wall_thickness(&geometry, args.theta_min, args.theta_max, &options)
        .map_err(RhorError::from)?;

    let record: AnalysisRecord = [
        ("Au", thickness.au),
        ("Au_unc", thickness.au_unc),
        ("DU", thickness.du),
        ("DU_unc", thickness.du_unc),
        ("Al", thickness.al),
        ("Al_unc", thickness.al_unc),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();
    emit_record(&record, &args.output)?;
    Ok(0)
}

pub(super) fn run_rhor_command(args: RhorArgs) -> Result<i32, CliError> {
    let params = match &args.params {
        Some(path) => read_json::<ShellModelParameters>(path, "shell parameters")?,
        None => ShellModelParameters::default(),
    };
    let analyzer = SensitivityAnalyzer::new(params).map_err(RhorError::from)?;
    let rhor = RhoRResult::evaluate(&analyzer, args.energy, args.random_error, args.systematic_error);
    let rcm = RcmResult::evaluate(&analyzer, args.energy, args.random_error, args.systematic_error);

    let record: AnalysisRecord = [
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
    .collect();
    if rhor.total.is_nan() {
        tracing::warn!(energy = args.energy, "energy outside the rhoR table");
    }
    emit_record(&record, &args.output)?;
    Ok(0)
}
