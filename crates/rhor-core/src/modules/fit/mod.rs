//! Gaussian fit of a proton spectrum with profile-likelihood uncertainties.

mod model;
mod uncertainty;

pub use model::gaussian;

use crate::domain::{RhorError, Spectrum, SpectrumBin};
use crate::numerics::{MinimizeOutcome, NelderMeadOptions};
use model::{ChiSquare, PARAMETER_COUNT, minimize_free};
use serde::{Deserialize, Serialize};

const FREE_ALL: [usize; PARAMETER_COUNT] = [0, 1, 2];
const PROFILE_MAX_ITERATIONS: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Only bins within `restrict_window_sigma` of the candidate mean enter chi2.
    pub restrict_chi2: bool,
    pub restrict_window_sigma: f64,
    pub max_iterations: usize,
    /// Relative simplex tolerance on the parameters.
    pub tolerance: f64,
    pub parabolic_errors: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            restrict_chi2: true,
            restrict_window_sigma: 5.0,
            max_iterations: 5_000,
            tolerance: 1.0e-9,
            parabolic_errors: true,
        }
    }
}

impl FitOptions {
    fn window(&self) -> Option<f64> {
        self.restrict_chi2.then_some(self.restrict_window_sigma)
    }

    fn simplex_options(&self, max_iterations: usize) -> NelderMeadOptions {
        NelderMeadOptions {
            max_iterations,
            x_tolerance: self.tolerance,
            f_tolerance: self.tolerance,
            ..NelderMeadOptions::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("fit needs at least 3 bins with positive error, got {usable}")]
    TooFewBins { usable: usize },
    #[error("initial guess must be finite with positive sigma, got {guess:?}")]
    InvalidGuess { guess: [f64; 3] },
    #[error("spectrum carries no positive yield to estimate a starting point")]
    NoSignal,
}

impl From<FitError> for RhorError {
    fn from(error: FitError) -> Self {
        RhorError::input_validation("INPUT.FIT", error.to_string())
    }
}

/// Best-fit Gaussian `(amplitude, mean, sigma)` and its uncertainties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaussFit {
    amplitude: f64,
    mean: f64,
    sigma: f64,
    chi2: f64,
    bins_used: usize,
    window_bins: usize,
    asymmetric_errors: [(f64, f64); 3],
    parabolic_errors: Option<[f64; 3]>,
    converged: bool,
    iterations: usize,
}

impl GaussFit {
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn params(&self) -> [f64; 3] {
        [self.amplitude, self.mean, self.sigma]
    }

    pub fn evaluate(&self, energy: f64) -> f64 {
        gaussian(energy, self.amplitude, self.mean, self.sigma)
    }

    /// chi2 over every usable bin at the best fit, window or not.
    pub fn chi2(&self) -> f64 {
        self.chi2
    }

    /// chi2 per degree of freedom, NaN with three or fewer bins.
    pub fn reduced_chi2(&self) -> f64 {
        if self.bins_used <= PARAMETER_COUNT {
            return f64::NAN;
        }
        self.chi2 / (self.bins_used - PARAMETER_COUNT) as f64
    }

    pub fn bins_used(&self) -> usize {
        self.bins_used
    }

    /// Bins inside the restricted window at the best fit.
    pub fn window_bins(&self) -> usize {
        self.window_bins
    }

    /// `(minus, plus)` offsets for amplitude, mean and sigma.
    pub fn asymmetric_errors(&self) -> [(f64, f64); 3] {
        self.asymmetric_errors
    }

    pub fn parabolic_errors(&self) -> Option<[f64; 3]> {
        self.parabolic_errors
    }

    pub fn mean_error(&self) -> (f64, f64) {
        self.asymmetric_errors[1]
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

/// Starting point from the integrated yield, the yield-weighted mean and the
/// half-maximum width around the tallest bin. A spectrum that never falls to
/// half its maximum has no resolvable peak and starts from the bin
/// half-width.
pub fn estimate_guess(spectrum: &Spectrum) -> Result<[f64; 3], FitError> {
    let positive: Vec<(f64, f64)> = spectrum
        .bins()
        .iter()
        .filter(|bin| bin.yield_per_mev > 0.0)
        .map(|bin| (bin.energy, bin.yield_per_mev))
        .collect();
    let weight: f64 = positive.iter().map(|(_, y)| y).sum();
    if positive.is_empty() || weight <= 0.0 {
        return Err(FitError::NoSignal);
    }

    let mean = positive.iter().map(|(x, y)| x * y).sum::<f64>() / weight;
    let mut sigma = half_maximum_sigma(spectrum).unwrap_or_else(|| spectrum.half_width(0));
    if !(sigma > 0.0) {
        sigma = 1.0;
    }

    let mut amplitude = spectrum.total_yield();
    if !(amplitude > 0.0) {
        amplitude = weight;
    }
    Ok([amplitude, mean, sigma])
}

/// Gaussian sigma from the interpolated half-maximum crossings on either
/// side of the tallest bin, averaged over the sides that cross.
fn half_maximum_sigma(spectrum: &Spectrum) -> Option<f64> {
    let bins = spectrum.bins();
    let peak = bins
        .iter()
        .enumerate()
        .fold(None, |best: Option<usize>, (index, bin)| match best {
            Some(current) if bins[current].yield_per_mev >= bin.yield_per_mev => Some(current),
            _ => Some(index),
        })?;
    let half = 0.5 * bins[peak].yield_per_mev;
    if !(half > 0.0) {
        return None;
    }

    let sides: Vec<f64> = [
        half_maximum_offset(bins, peak, half, (0..peak).rev()),
        half_maximum_offset(bins, peak, half, peak + 1..bins.len()),
    ]
    .into_iter()
    .flatten()
    .collect();
    if sides.is_empty() {
        return None;
    }
    let half_width_at_half_maximum = sides.iter().sum::<f64>() / sides.len() as f64;
    Some(half_width_at_half_maximum / (2.0 * std::f64::consts::LN_2).sqrt())
}

/// Distance from the peak to where the yield first drops below `half`,
/// walking outward through `indices`.
fn half_maximum_offset(
    bins: &[SpectrumBin],
    peak: usize,
    half: f64,
    indices: impl Iterator<Item = usize>,
) -> Option<f64> {
    let mut inner = peak;
    for outer in indices {
        let (near, far) = (&bins[inner], &bins[outer]);
        if far.yield_per_mev < half {
            let fraction = (near.yield_per_mev - half) / (near.yield_per_mev - far.yield_per_mev);
            let energy = near.energy + fraction * (far.energy - near.energy);
            return Some((energy - bins[peak].energy).abs());
        }
        inner = outer;
    }
    None
}

fn validate_inputs(spectrum: &Spectrum, guess: [f64; 3]) -> Result<(), FitError> {
    if !guess.iter().all(|value| value.is_finite()) || guess[2] <= 0.0 {
        return Err(FitError::InvalidGuess { guess });
    }
    let usable = spectrum
        .bins()
        .iter()
        .filter(|bin| bin.stat_error > 0.0)
        .count();
    if usable < PARAMETER_COUNT {
        return Err(FitError::TooFewBins { usable });
    }
    Ok(())
}

fn minimize_chi2(chi: &ChiSquare<'_>, guess: [f64; 3], options: &FitOptions) -> ([f64; 3], MinimizeOutcome) {
    minimize_free(
        |params| chi.value(params),
        guess,
        &FREE_ALL,
        options.simplex_options(options.max_iterations),
    )
}

/// Best-fit `[A, mu, sigma]` only, without the uncertainty scans.
pub fn best_fit(spectrum: &Spectrum, guess: [f64; 3], options: &FitOptions) -> Result<[f64; 3], FitError> {
    validate_inputs(spectrum, guess)?;
    let chi = ChiSquare::new(spectrum.bins(), options.window());
    let (best, _) = minimize_chi2(&chi, guess, options);
    Ok(best)
}

/// Fit `G(E) = A / (sqrt(2 pi) sigma) exp(-(E - mu)^2 / 2 sigma^2)` to the
/// spectrum starting from `guess = [A, mu, sigma]`.
pub fn fit(spectrum: &Spectrum, guess: [f64; 3], options: &FitOptions) -> Result<GaussFit, FitError> {
    validate_inputs(spectrum, guess)?;

    let chi = ChiSquare::new(spectrum.bins(), options.window());
    let (best, outcome) = minimize_chi2(&chi, guess, options);
    if !outcome.converged {
        tracing::warn!(
            iterations = outcome.iterations,
            chi2 = outcome.value,
            "Gaussian fit hit the iteration cap, keeping best vertex"
        );
    }
    tracing::debug!(
        amplitude = best[0],
        mean = best[1],
        sigma = best[2],
        chi2 = outcome.value,
        iterations = outcome.iterations,
        "Gaussian fit finished"
    );

    let profile_options = options.simplex_options(PROFILE_MAX_ITERATIONS);
    let asymmetric_errors = uncertainty::asymmetric_errors(&chi, best, outcome.value, profile_options);
    let parabolic_errors = if options.parabolic_errors {
        uncertainty::parabolic_errors(&chi, best)
    } else {
        None
    };

    Ok(GaussFit {
        amplitude: best[0],
        mean: best[1],
        sigma: best[2],
        chi2: chi.total_value(best),
        bins_used: chi.usable_bins(),
        window_bins: chi.window_bins(best),
        asymmetric_errors,
        parabolic_errors,
        converged: outcome.converged,
        iterations: outcome.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::{FitError, FitOptions, best_fit, estimate_guess, fit, gaussian};
    use crate::domain::{Spectrum, SpectrumBin};

    const AMPLITUDE: f64 = 1.0e5;
    const MEAN: f64 = 11.03;
    const SIGMA: f64 = 0.5;

    /// Noise of exactly one standard deviation with alternating sign, so
    /// chi2 at the true parameters equals the bin count.
    fn synthetic_spectrum() -> Spectrum {
        let bins = (0..61)
            .map(|index| {
                let energy = 8.0 + 0.1 * index as f64;
                let expected = gaussian(energy, AMPLITUDE, MEAN, SIGMA);
                let error = (expected + 25.0).sqrt();
                let sign = if index % 2 == 0 { 1.0 } else { -1.0 };
                SpectrumBin::new(energy, expected + sign * error, error)
            })
            .collect();
        Spectrum::new(bins).expect("synthetic spectrum should be valid")
    }

    #[test]
    fn recovers_synthetic_gaussian_with_unit_reduced_chi2() {
        let spectrum = synthetic_spectrum();
        let options = FitOptions {
            restrict_chi2: false,
            ..FitOptions::default()
        };
        let result = fit(&spectrum, [8.0e4, 10.8, 0.7], &options).expect("fit should succeed");

        assert!(result.converged());
        assert!((result.mean() - MEAN).abs() < 0.01, "mean {}", result.mean());
        assert!((result.sigma() - SIGMA).abs() / SIGMA < 0.02);
        assert!((result.amplitude() - AMPLITUDE).abs() / AMPLITUDE < 0.02);
        assert_eq!(result.bins_used(), 61);
        let reduced = result.reduced_chi2();
        assert!(reduced > 0.7 && reduced < 1.3, "reduced chi2 {reduced}");
    }

    #[test]
    fn asymmetric_and_parabolic_mean_errors_agree() {
        let spectrum = synthetic_spectrum();
        let options = FitOptions {
            restrict_chi2: false,
            ..FitOptions::default()
        };
        let result = fit(&spectrum, [8.0e4, 10.8, 0.7], &options).expect("fit should succeed");

        let (minus, plus) = result.mean_error();
        assert!(minus > 0.0 && minus < SIGMA);
        assert!(plus > 0.0 && plus < SIGMA);
        assert!((minus - plus).abs() / plus < 0.2);

        let parabolic = result.parabolic_errors().expect("Hessian should invert");
        let symmetric = 0.5 * (minus + plus);
        assert!((parabolic[1] - symmetric).abs() / symmetric < 0.2);
        for (index, (low, high)) in result.asymmetric_errors().into_iter().enumerate() {
            assert!(low.is_finite() && high.is_finite(), "parameter {index}");
        }
    }

    #[test]
    fn restricted_fit_uses_window_around_mean() {
        let spectrum = synthetic_spectrum();
        let result = fit(&spectrum, [8.0e4, 10.8, 0.7], &FitOptions::default())
            .expect("fit should succeed");
        assert!((result.mean() - MEAN).abs() < 0.01);
        assert_eq!(result.bins_used(), spectrum.len());
        assert!(result.window_bins() < spectrum.len());
        assert!(result.window_bins() >= 45);

        let [_, mean, _] = best_fit(&spectrum, [8.0e4, 10.8, 0.7], &FitOptions::default())
            .expect("best fit should succeed");
        assert!((mean - result.mean()).abs() < 1.0e-6);
    }

    #[test]
    fn estimate_guess_uses_moments() {
        let spectrum = synthetic_spectrum();
        let [amplitude, mean, sigma] = estimate_guess(&spectrum).expect("guess should exist");
        assert!((mean - MEAN).abs() < 0.05);
        assert!((sigma - SIGMA).abs() < 0.1);
        assert!((amplitude - AMPLITUDE).abs() / AMPLITUDE < 0.05);

        let empty = Spectrum::from_triplets(&[(1.0, 0.0, 1.0), (2.0, 0.0, 1.0)])
            .expect("spectrum should be valid");
        assert_eq!(estimate_guess(&empty), Err(FitError::NoSignal));
    }

    /// One count per bin, so every bin the Gaussian misses adds one to chi2.
    fn flat_spectrum() -> Spectrum {
        let triplets: Vec<(f64, f64, f64)> = (0..41)
            .map(|index| (5.0 + 0.25 * index as f64, 1.0, 1.0))
            .collect();
        Spectrum::from_triplets(&triplets).expect("flat spectrum should be valid")
    }

    #[test]
    fn flat_spectrum_collapses_to_a_bin_wide_gaussian() {
        let spectrum = flat_spectrum();
        let guess = estimate_guess(&spectrum).expect("flat spectrum has signal");
        assert_eq!(guess[2], spectrum.half_width(0));

        let result = fit(&spectrum, guess, &FitOptions::default()).expect("flat fit should not error");
        let half_width = spectrum.half_width(0);
        assert!(result.converged());
        assert!((5.0..=15.0).contains(&result.mean()), "mean {}", result.mean());
        assert!(
            result.sigma() > 0.5 * half_width && result.sigma() < 2.0 * half_width,
            "sigma {}",
            result.sigma()
        );
        let expected = (spectrum.len() - 3) as f64;
        assert!((result.chi2() - expected).abs() < 3.0, "chi2 {}", result.chi2());
        assert!((result.reduced_chi2() - 1.0).abs() < 0.1);
    }

    #[test]
    fn rejects_bad_guesses_and_sparse_spectra() {
        let spectrum = synthetic_spectrum();
        let error = fit(&spectrum, [1.0, 10.0, 0.0], &FitOptions::default()).expect_err("sigma 0");
        assert!(matches!(error, FitError::InvalidGuess { .. }));

        let sparse = Spectrum::from_triplets(&[(1.0, 1.0, 1.0), (2.0, 1.0, 0.0), (3.0, 1.0, 1.0)])
            .expect("spectrum should be valid");
        let error = fit(&sparse, [1.0, 2.0, 1.0], &FitOptions::default()).expect_err("two bins");
        assert_eq!(error, FitError::TooFewBins { usable: 2 });
    }
}
