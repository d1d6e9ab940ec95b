//! Derivative-free minimizers and a bracketed root finder.

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;
const ZERO_COORDINATE_STEP: f64 = 2.5e-4;
const INV_GOLDEN_RATIO: f64 = 0.618_033_988_749_894_9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NelderMeadOptions {
    pub max_iterations: usize,
    /// Absolute simplex-size tolerance on the coordinates.
    pub x_tolerance: f64,
    /// Absolute spread tolerance on the objective values.
    pub f_tolerance: f64,
    /// Initial simplex edge as a fraction of each non-zero coordinate.
    pub initial_step_fraction: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2_000,
            x_tolerance: 1.0e-7,
            f_tolerance: 1.0e-7,
            initial_step_fraction: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeOutcome {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

fn sanitized(value: f64) -> f64 {
    if value.is_nan() { f64::INFINITY } else { value }
}

/// Nelder-Mead downhill simplex. NaN objective values are treated as +inf.
/// Hitting the iteration cap returns the best vertex with `converged = false`.
pub fn nelder_mead_minimize<F>(
    mut objective: F,
    start: &[f64],
    options: NelderMeadOptions,
) -> MinimizeOutcome
where
    F: FnMut(&[f64]) -> f64,
{
    let dimension = start.len();
    if dimension == 0 {
        return MinimizeOutcome {
            point: Vec::new(),
            value: sanitized(objective(start)),
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dimension + 1);
    simplex.push(start.to_vec());
    for axis in 0..dimension {
        let mut vertex = start.to_vec();
        vertex[axis] = if vertex[axis] != 0.0 {
            vertex[axis] * (1.0 + options.initial_step_fraction)
        } else {
            ZERO_COORDINATE_STEP
        };
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex
        .iter()
        .map(|vertex| sanitized(objective(vertex)))
        .collect();

    let mut iterations = 0;
    let mut converged = false;
    while iterations < options.max_iterations {
        let mut order: Vec<usize> = (0..=dimension).collect();
        order.sort_by(|lhs, rhs| values[*lhs].total_cmp(&values[*rhs]));
        simplex = order.iter().map(|&index| simplex[index].clone()).collect();
        values = order.iter().map(|&index| values[index]).collect();

        let x_spread = simplex[1..]
            .iter()
            .flat_map(|vertex| {
                vertex
                    .iter()
                    .zip(&simplex[0])
                    .map(|(coordinate, best)| (coordinate - best).abs())
            })
            .fold(0.0_f64, f64::max);
        let f_spread = values[1..]
            .iter()
            .map(|value| (value - values[0]).abs())
            .fold(0.0_f64, f64::max);
        if x_spread <= options.x_tolerance && f_spread <= options.f_tolerance {
            converged = true;
            break;
        }
        iterations += 1;

        let worst = dimension;
        let centroid: Vec<f64> = (0..dimension)
            .map(|axis| simplex[..worst].iter().map(|v| v[axis]).sum::<f64>() / dimension as f64)
            .collect();
        let worst_vertex = simplex[worst].clone();
        let along = |scale: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst_vertex)
                .map(|(c, w)| c + scale * (c - w))
                .collect()
        };

        let reflected = along(REFLECTION);
        let reflected_value = sanitized(objective(&reflected));
        if reflected_value < values[0] {
            let expanded = along(REFLECTION * EXPANSION);
            let expanded_value = sanitized(objective(&expanded));
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }
        if reflected_value < values[worst - 1] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < values[worst] {
            let outside = along(REFLECTION * CONTRACTION);
            let value = sanitized(objective(&outside));
            (outside, value)
        } else {
            let inside = along(-CONTRACTION);
            let value = sanitized(objective(&inside));
            (inside, value)
        };
        if contracted_value < values[worst].min(reflected_value) {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        for index in 1..=dimension {
            let shrunk: Vec<f64> = simplex[0]
                .iter()
                .zip(&simplex[index])
                .map(|(best, vertex)| best + SHRINK * (vertex - best))
                .collect();
            values[index] = sanitized(objective(&shrunk));
            simplex[index] = shrunk;
        }
    }

    let best = (0..=dimension)
        .min_by(|lhs, rhs| values[*lhs].total_cmp(&values[*rhs]))
        .unwrap_or(0);
    MinimizeOutcome {
        point: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    }
}

/// Bounded golden-section search for the minimum of a unimodal function on
/// `[low, high]`. Returns `(x_min, f(x_min))`.
pub fn golden_section_minimize<F>(
    mut objective: F,
    low: f64,
    high: f64,
    tolerance: f64,
    max_iterations: usize,
) -> (f64, f64)
where
    F: FnMut(f64) -> f64,
{
    let (mut a, mut b) = if low <= high { (low, high) } else { (high, low) };
    let mut c = b - INV_GOLDEN_RATIO * (b - a);
    let mut d = a + INV_GOLDEN_RATIO * (b - a);
    let mut fc = sanitized(objective(c));
    let mut fd = sanitized(objective(d));

    for _ in 0..max_iterations {
        if (b - a).abs() <= tolerance {
            break;
        }
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - INV_GOLDEN_RATIO * (b - a);
            fc = sanitized(objective(c));
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + INV_GOLDEN_RATIO * (b - a);
            fd = sanitized(objective(d));
        }
    }

    let x = 0.5 * (a + b);
    let fx = sanitized(objective(x));
    [(x, fx), (c, fc), (d, fd)]
        .into_iter()
        .min_by(|lhs, rhs| lhs.1.total_cmp(&rhs.1))
        .unwrap_or((x, fx))
}

/// Brent's method on a sign-changing bracket. Returns `None` when
/// `f(low)` and `f(high)` have the same sign (no bracketed root).
pub fn bracketed_root<F>(
    mut function: F,
    low: f64,
    high: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Option<f64>
where
    F: FnMut(f64) -> f64,
{
    let mut a = low;
    let mut b = high;
    let mut fa = function(a);
    let mut fb = function(b);
    if fa.is_nan() || fb.is_nan() {
        return None;
    }
    if fa == 0.0 {
        return Some(a);
    }
    if fb == 0.0 {
        return Some(b);
    }
    if fa.signum() == fb.signum() {
        return None;
    }

    let mut c = b;
    let mut fc = fb;
    let mut d = b - a;
    let mut e = d;

    for _ in 0..max_iterations {
        if fb.signum() == fc.signum() {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * tolerance;
        let xm = 0.5 * (c - b);
        if xm.abs() <= tol1 || fb == 0.0 {
            return Some(b);
        }

        if e.abs() >= tol1 && fa.abs() > fb.abs() {
            let s = fb / fa;
            let (mut p, mut q) = if a == c {
                (2.0 * xm * s, 1.0 - s)
            } else {
                let q = fa / fc;
                let r = fb / fc;
                (
                    s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0)),
                    (q - 1.0) * (r - 1.0) * (s - 1.0),
                )
            };
            if p > 0.0 {
                q = -q;
            }
            p = p.abs();
            let min1 = 3.0 * xm * q - (tol1 * q).abs();
            let min2 = (e * q).abs();
            if 2.0 * p < min1.min(min2) {
                e = d;
                d = p / q;
            } else {
                d = xm;
                e = d;
            }
        } else {
            d = xm;
            e = d;
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol1 { d } else { tol1.copysign(xm) };
        fb = function(b);
        if fb.is_nan() {
            return None;
        }
    }

    Some(b)
}

#[cfg(test)]
mod tests {
    use super::{
        NelderMeadOptions, bracketed_root, golden_section_minimize, nelder_mead_minimize,
    };

    #[test]
    fn nelder_mead_finds_rosenbrock_minimum() {
        let outcome = nelder_mead_minimize(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2),
            &[-1.2, 1.0],
            NelderMeadOptions {
                max_iterations: 5_000,
                x_tolerance: 1.0e-10,
                f_tolerance: 1.0e-12,
                ..NelderMeadOptions::default()
            },
        );
        assert!(outcome.converged);
        assert!((outcome.point[0] - 1.0).abs() < 1.0e-4);
        assert!((outcome.point[1] - 1.0).abs() < 1.0e-4);
    }

    #[test]
    fn nelder_mead_reports_non_convergence_at_iteration_cap() {
        let outcome = nelder_mead_minimize(
            |x| (x[0] - 3.0).powi(2) + (x[1] + 2.0).powi(2),
            &[0.0, 0.0],
            NelderMeadOptions {
                max_iterations: 3,
                ..NelderMeadOptions::default()
            },
        );
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 3);
        assert!(outcome.value.is_finite());
    }

    #[test]
    fn nelder_mead_treats_nan_as_infinite() {
        let outcome = nelder_mead_minimize(
            |x| if x[0] < 0.0 { f64::NAN } else { (x[0] - 2.0).powi(2) },
            &[1.0],
            NelderMeadOptions::default(),
        );
        assert!((outcome.point[0] - 2.0).abs() < 1.0e-3);
    }

    #[test]
    fn golden_section_locates_bounded_minimum() {
        let (x, fx) = golden_section_minimize(|x| (x - 0.3).powi(2) + 1.0, 0.0, 1.0, 1.0e-9, 200);
        assert!((x - 0.3).abs() < 1.0e-6);
        assert!((fx - 1.0).abs() < 1.0e-10);

        let (x, _) = golden_section_minimize(|x| x, 2.0, 5.0, 1.0e-9, 200);
        assert!((x - 2.0).abs() < 1.0e-6);
    }

    #[test]
    fn bracketed_root_solves_and_rejects_unbracketed_intervals() {
        let root = bracketed_root(|x| x * x - 2.0, 0.0, 2.0, 1.0e-12, 100).expect("root");
        assert!((root - 2.0_f64.sqrt()).abs() < 1.0e-10);

        assert_eq!(bracketed_root(|x| x * x + 1.0, -1.0, 1.0, 1.0e-12, 100), None);
        assert_eq!(bracketed_root(|x| x - 1.0, 1.0, 3.0, 1.0e-12, 100), Some(1.0));
    }
}
