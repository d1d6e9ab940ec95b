use crate::common::constants::PI;
use crate::domain::SpectrumBin;
use crate::numerics::{MinimizeOutcome, NelderMeadOptions, nelder_mead_minimize, stable_sum};

pub(super) const PARAMETER_COUNT: usize = 3;
pub(super) type Parameters = [f64; PARAMETER_COUNT];

/// Normalised Gaussian with integrated yield `amplitude`.
pub fn gaussian(x: f64, amplitude: f64, mean: f64, sigma: f64) -> f64 {
    let z = (x - mean) / sigma;
    amplitude / ((2.0 * PI).sqrt() * sigma) * (-0.5 * z * z).exp()
}

/// Weighted least-squares objective over the usable bins of a spectrum.
///
/// Candidates whose mean leaves the measured energy span, or whose sigma is
/// wider than that span, are rejected so a featureless spectrum cannot drag
/// the simplex off to an arbitrarily broad Gaussian.
#[derive(Debug, Clone)]
pub(super) struct ChiSquare<'a> {
    bins: &'a [SpectrumBin],
    window_sigma: Option<f64>,
    span: (f64, f64),
}

impl<'a> ChiSquare<'a> {
    pub(super) fn new(bins: &'a [SpectrumBin], window_sigma: Option<f64>) -> Self {
        let span = match (bins.first(), bins.last()) {
            (Some(first), Some(last)) => (first.energy, last.energy),
            _ => (f64::NAN, f64::NAN),
        };
        Self {
            bins,
            window_sigma,
            span,
        }
    }

    fn within_span(&self, params: Parameters) -> bool {
        let [_, mean, sigma] = params;
        let (low, high) = self.span;
        mean >= low && mean <= high && sigma <= high - low
    }

    fn included(&self, bin: &SpectrumBin, mean: f64, sigma: f64) -> bool {
        if bin.stat_error <= 0.0 {
            return false;
        }
        match self.window_sigma {
            Some(window) => (bin.energy - mean).abs() <= window * sigma,
            None => true,
        }
    }

    /// Bin mask at `params`; the Hessian is evaluated on a frozen mask.
    pub(super) fn mask(&self, params: Parameters) -> Vec<bool> {
        let [_, mean, sigma] = params;
        self.bins
            .iter()
            .map(|bin| self.included(bin, mean, sigma))
            .collect()
    }

    /// Bins inside the fit window at `params`.
    pub(super) fn window_bins(&self, params: Parameters) -> usize {
        self.mask(params).into_iter().filter(|used| *used).count()
    }

    /// Bins with a positive error, whatever the window.
    pub(super) fn usable_bins(&self) -> usize {
        self.bins.iter().filter(|bin| bin.stat_error > 0.0).count()
    }

    /// Goodness of fit over every usable bin, ignoring the window.
    pub(super) fn total_value(&self, params: Parameters) -> f64 {
        let mask: Vec<bool> = self.bins.iter().map(|bin| bin.stat_error > 0.0).collect();
        self.value_on_mask(params, &mask)
    }

    pub(super) fn value(&self, params: Parameters) -> f64 {
        let [_, mean, sigma] = params;
        if !is_physical(params) || !self.within_span(params) {
            return f64::INFINITY;
        }
        let mask: Vec<bool> = self
            .bins
            .iter()
            .map(|bin| self.included(bin, mean, sigma))
            .collect();
        if mask.iter().filter(|used| **used).count() < PARAMETER_COUNT {
            return f64::INFINITY;
        }
        self.value_on_mask(params, &mask)
    }

    pub(super) fn value_on_mask(&self, params: Parameters, mask: &[bool]) -> f64 {
        if !is_physical(params) {
            return f64::INFINITY;
        }
        let [amplitude, mean, sigma] = params;
        let terms: Vec<f64> = self
            .bins
            .iter()
            .zip(mask)
            .filter(|(_, used)| **used)
            .map(|(bin, _)| {
                let residual =
                    (gaussian(bin.energy, amplitude, mean, sigma) - bin.yield_per_mev) / bin.stat_error;
                residual * residual
            })
            .collect();
        let total = stable_sum(&terms);
        if total.is_finite() { total } else { f64::INFINITY }
    }
}

fn is_physical(params: Parameters) -> bool {
    params.iter().all(|value| value.is_finite()) && params[2] > 0.0
}

/// Per-coordinate scale so the simplex works on order-one numbers.
pub(super) fn coordinate_scale(params: &[f64]) -> Vec<f64> {
    params
        .iter()
        .map(|value| if *value != 0.0 { value.abs() } else { 1.0 })
        .collect()
}

/// Minimise `objective` over the coordinates listed in `free`, holding the
/// rest of `start` fixed. The search runs in coordinates scaled by the
/// magnitude of the starting point.
pub(super) fn minimize_free<F>(
    mut objective: F,
    start: Parameters,
    free: &[usize],
    options: NelderMeadOptions,
) -> (Parameters, MinimizeOutcome)
where
    F: FnMut(Parameters) -> f64,
{
    let scale = coordinate_scale(&free.iter().map(|&index| start[index]).collect::<Vec<_>>());
    let assemble = |scaled: &[f64]| -> Parameters {
        let mut params = start;
        for ((&index, value), factor) in free.iter().zip(scaled).zip(&scale) {
            params[index] = value * factor;
        }
        params
    };

    let initial: Vec<f64> = free
        .iter()
        .zip(&scale)
        .map(|(&index, factor)| start[index] / factor)
        .collect();
    let outcome = nelder_mead_minimize(|scaled| objective(assemble(scaled)), &initial, options);
    (assemble(&outcome.point), outcome)
}

#[cfg(test)]
mod tests {
    use super::{ChiSquare, gaussian, minimize_free};
    use crate::domain::SpectrumBin;
    use crate::numerics::NelderMeadOptions;

    #[test]
    fn gaussian_integrates_to_amplitude() {
        let step = 0.001;
        let total: f64 = (0..20_000)
            .map(|index| gaussian(index as f64 * step, 500.0, 10.0, 0.7) * step)
            .sum();
        assert!((total - 500.0).abs() < 1.0e-6);
    }

    #[test]
    fn chi_square_skips_bins_without_error_and_rejects_bad_sigma() {
        let bins = [
            SpectrumBin::new(9.0, 1.0, 0.0),
            SpectrumBin::new(10.0, 2.0, 1.0),
            SpectrumBin::new(11.0, 1.0, 1.0),
        ];
        let chi = ChiSquare::new(&bins, None);
        assert_eq!(chi.window_bins([1.0, 10.0, 1.0]), 2);
        assert_eq!(chi.usable_bins(), 2);
        assert_eq!(chi.value([1.0, 10.0, 0.0]), f64::INFINITY);
        assert_eq!(chi.value([1.0, 10.0, -1.0]), f64::INFINITY);
        assert!(chi.value([1.0, 10.0, 1.0]).is_finite());

        let windowed = ChiSquare::new(&bins, Some(0.5));
        assert_eq!(windowed.window_bins([1.0, 10.0, 1.0]), 1);
        assert_eq!(windowed.value([1.0, 50.0, 1.0]), f64::INFINITY);
    }

    #[test]
    fn chi_square_rejects_candidates_outside_the_energy_span() {
        let bins: Vec<SpectrumBin> = (0..5)
            .map(|index| SpectrumBin::new(10.0 + index as f64, 1.0, 1.0))
            .collect();
        let chi = ChiSquare::new(&bins, None);
        assert!(chi.value([1.0, 12.0, 1.0]).is_finite());
        assert_eq!(chi.value([1.0, 9.5, 1.0]), f64::INFINITY);
        assert_eq!(chi.value([1.0, 14.5, 1.0]), f64::INFINITY);
        assert!(chi.value([1.0, 12.0, 4.0]).is_finite());
        assert_eq!(chi.value([1.0, 12.0, 4.5]), f64::INFINITY);
        assert!(chi.total_value([1.0, 12.0, 4.5]).is_finite());
    }

    #[test]
    fn minimize_free_holds_fixed_coordinates() {
        let (params, outcome) = minimize_free(
            |p| (p[0] - 2.0).powi(2) + (p[1] - 3.0).powi(2) + (p[2] - 4.0).powi(2),
            [1.0, 1.0, 1.0],
            &[0, 2],
            NelderMeadOptions::default(),
        );
        assert!(outcome.converged);
        assert_eq!(params[1], 1.0);
        assert!((params[0] - 2.0).abs() < 1.0e-3);
        assert!((params[2] - 4.0).abs() < 1.0e-3);
    }
}
