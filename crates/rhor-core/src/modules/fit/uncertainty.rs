use super::model::{ChiSquare, PARAMETER_COUNT, Parameters, minimize_free};
use crate::numerics::{DenseMatrix, NelderMeadOptions, bracketed_root, invert_matrix};

const DELTA_CHI2_TARGET: f64 = 1.0;
/// Profile values above this are clipped so the root finder only sees finite numbers.
const DELTA_CHI2_CEILING: f64 = 1.0e6;
const ROOT_RELATIVE_TOLERANCE: f64 = 1.0e-6;
const ROOT_MAX_ITERATIONS: usize = 100;
const HESSIAN_RELATIVE_STEP: f64 = 1.0e-4;

/// Search interval `[0, bound]` for the offset of each parameter.
fn scan_bound(best: Parameters, index: usize) -> f64 {
    match index {
        0 => best[0].abs(),
        _ => best[2],
    }
}

/// `chi2` minimised over the other parameters with `params[index]` held
/// at `value`, relative to the global minimum.
fn profile_delta_chi2(
    chi: &ChiSquare<'_>,
    best: Parameters,
    best_chi2: f64,
    index: usize,
    value: f64,
    options: NelderMeadOptions,
) -> f64 {
    let mut start = best;
    start[index] = value;
    let free: Vec<usize> = (0..PARAMETER_COUNT).filter(|&other| other != index).collect();
    let (_, outcome) = minimize_free(|params| chi.value(params), start, &free, options);
    (outcome.value - best_chi2).min(DELTA_CHI2_CEILING)
}

/// Asymmetric `(minus, plus)` uncertainties from `delta chi2 = 1` on the
/// profile likelihood. Without a sign change inside the search interval
/// the interval bound is reported.
pub(super) fn asymmetric_errors(
    chi: &ChiSquare<'_>,
    best: Parameters,
    best_chi2: f64,
    options: NelderMeadOptions,
) -> [(f64, f64); PARAMETER_COUNT] {
    let mut errors = [(f64::NAN, f64::NAN); PARAMETER_COUNT];
    for (index, error) in errors.iter_mut().enumerate() {
        let bound = scan_bound(best, index);
        if !(bound > 0.0 && bound.is_finite()) {
            continue;
        }

        let solve = |direction: f64| -> f64 {
            let offset = |delta: f64| {
                profile_delta_chi2(
                    chi,
                    best,
                    best_chi2,
                    index,
                    best[index] + direction * delta,
                    options,
                ) - DELTA_CHI2_TARGET
            };
            bracketed_root(
                offset,
                0.0,
                bound,
                ROOT_RELATIVE_TOLERANCE * bound,
                ROOT_MAX_ITERATIONS,
            )
            .unwrap_or(bound)
        };
        *error = (solve(-1.0), solve(1.0));
    }
    errors
}

/// Symmetric uncertainties `sqrt(2 (H^-1)_ii)` from a central-difference
/// Hessian of chi2 on the bins used at the minimum. `None` when the Hessian
/// is singular or not positive on the diagonal of its inverse.
pub(super) fn parabolic_errors(chi: &ChiSquare<'_>, best: Parameters) -> Option<[f64; PARAMETER_COUNT]> {
    let mask = chi.mask(best);
    let evaluate = |params: Parameters| chi.value_on_mask(params, &mask);
    let steps: Vec<f64> = best
        .iter()
        .map(|value| {
            let magnitude = if *value != 0.0 { value.abs() } else { 1.0 };
            HESSIAN_RELATIVE_STEP * magnitude
        })
        .collect();
    let shifted = |offsets: &[(usize, f64)]| {
        let mut params = best;
        for &(index, sign) in offsets {
            params[index] += sign * steps[index];
        }
        evaluate(params)
    };

    let center = evaluate(best);
    let mut hessian = DenseMatrix::zeros(PARAMETER_COUNT, PARAMETER_COUNT);
    for row in 0..PARAMETER_COUNT {
        let plus = shifted(&[(row, 1.0)]);
        let minus = shifted(&[(row, -1.0)]);
        hessian[(row, row)] = (plus - 2.0 * center + minus) / (steps[row] * steps[row]);
        for col in (row + 1)..PARAMETER_COUNT {
            let mixed = (shifted(&[(row, 1.0), (col, 1.0)]) - shifted(&[(row, 1.0), (col, -1.0)])
                - shifted(&[(row, -1.0), (col, 1.0)])
                + shifted(&[(row, -1.0), (col, -1.0)]))
                / (4.0 * steps[row] * steps[col]);
            hessian[(row, col)] = mixed;
            hessian[(col, row)] = mixed;
        }
    }
    for row in 0..PARAMETER_COUNT {
        for col in 0..PARAMETER_COUNT {
            if !hessian[(row, col)].is_finite() {
                return None;
            }
        }
    }

    let inverse = match invert_matrix(&hessian) {
        Ok(inverse) => inverse,
        Err(error) => {
            tracing::debug!(%error, "chi2 Hessian is not invertible");
            return None;
        }
    };
    let mut errors = [0.0; PARAMETER_COUNT];
    for (index, error) in errors.iter_mut().enumerate() {
        let variance = 2.0 * inverse[(index, index)];
        if !(variance > 0.0 && variance.is_finite()) {
            return None;
        }
        *error = variance.sqrt();
    }
    Some(errors)
}
