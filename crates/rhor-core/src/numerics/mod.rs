pub mod linalg;
pub mod optimize;
pub mod special;

pub use linalg::{DenseMatrix, InversionError, invert_matrix};
pub use optimize::{
    MinimizeOutcome, NelderMeadOptions, bracketed_root, golden_section_minimize,
    nelder_mead_minimize,
};
pub use special::{chandrasekhar_mu, chandrasekhar_mu_derivative, erf};

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for &value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}

/// Root-sum-square of the finite entries; non-finite entries are skipped.
pub fn quadrature_sum(values: &[f64]) -> f64 {
    let squares: Vec<f64> = values
        .iter()
        .filter(|value| value.is_finite())
        .map(|value| value * value)
        .collect();
    stable_sum(&squares).sqrt()
}

/// Mean and sample standard deviation (`n - 1` denominator) of the finite
/// entries. The deviation is zero for a single value, both are NaN when no
/// finite value is present.
pub fn mean_and_sample_std(values: &[f64]) -> (f64, f64) {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return (f64::NAN, f64::NAN);
    }

    let count = finite.len() as f64;
    let mean = stable_sum(&finite) / count;
    if finite.len() == 1 {
        return (mean, 0.0);
    }

    let deviations: Vec<f64> = finite.iter().map(|v| (v - mean) * (v - mean)).collect();
    (mean, (stable_sum(&deviations) / (count - 1.0)).sqrt())
}

pub fn linear_grid(start: f64, end: f64, count: usize) -> Option<Vec<f64>> {
    if count < 2 {
        return None;
    }

    let step = (end - start) / ((count - 1) as f64);
    let mut grid = Vec::with_capacity(count);
    for index in 0..count {
        grid.push(start + step * (index as f64));
    }

    if let Some(last) = grid.last_mut() {
        *last = end;
    }

    Some(grid)
}

/// Clamping linear interpolation on a non-decreasing grid.
pub fn interpolate_linear(x: f64, x_grid: &[f64], y_grid: &[f64]) -> Option<f64> {
    if x_grid.len() < 2 || x_grid.len() != y_grid.len() {
        return None;
    }

    if !x_grid.windows(2).all(|window| window[0] <= window[1]) {
        return None;
    }

    if x <= x_grid[0] {
        return Some(y_grid[0]);
    }

    let last_index = x_grid.len() - 1;
    if x >= x_grid[last_index] {
        return Some(y_grid[last_index]);
    }

    let upper = x_grid
        .windows(2)
        .position(|window| x <= window[1])
        .map(|index| index + 1)?;
    let lower = upper - 1;
    let x0 = x_grid[lower];
    let x1 = x_grid[upper];
    if x1 == x0 {
        return Some(y_grid[upper]);
    }

    let interpolation = (x - x0) / (x1 - x0);
    Some(y_grid[lower] + interpolation * (y_grid[upper] - y_grid[lower]))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolantError {
    #[error("interpolant requires at least 2 points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("interpolant length mismatch: x={x}, y={y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("interpolant abscissa must be finite and strictly increasing at index {index}")]
    NonIncreasing { index: usize },
}

/// Bounds-checked piecewise-linear interpolant. Queries outside the tabulated
/// domain evaluate to NaN instead of clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearInterpolant {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LinearInterpolant {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, InterpolantError> {
        if x.len() != y.len() {
            return Err(InterpolantError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(InterpolantError::InsufficientPoints { actual: x.len() });
        }
        for index in 0..x.len() {
            let finite = x[index].is_finite();
            let increasing = index == 0 || x[index] > x[index - 1];
            if !finite || !increasing {
                return Err(InterpolantError::NonIncreasing { index });
            }
        }

        Ok(Self { x, y })
    }

    /// Build from samples in any monotonic order (ascending or descending).
    pub fn from_monotonic(x: &[f64], y: &[f64]) -> Result<Self, InterpolantError> {
        let descending = x.len() >= 2 && x[0] > x[x.len() - 1];
        if descending {
            Self::new(
                x.iter().rev().copied().collect(),
                y.iter().rev().copied().collect(),
            )
        } else {
            Self::new(x.to_vec(), y.to_vec())
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn contains(&self, x: f64) -> bool {
        let (low, high) = self.domain();
        x >= low && x <= high
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        if !self.contains(x) {
            return f64::NAN;
        }

        match self.x.binary_search_by(|knot| knot.total_cmp(&x)) {
            Ok(index) => self.y[index],
            Err(upper) => {
                let lower = upper - 1;
                let fraction = (x - self.x[lower]) / (self.x[upper] - self.x[lower]);
                self.y[lower] + fraction * (self.y[upper] - self.y[lower])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        InterpolantError, LinearInterpolant, interpolate_linear, linear_grid, mean_and_sample_std,
        quadrature_sum, stable_sum,
    };

    #[test]
    fn stable_sum_reduces_order_loss_for_large_and_small_values() {
        let input = [1.0e16, 1.0, -1.0e16];
        assert_eq!(stable_sum(&input), 0.0);
    }

    #[test]
    fn quadrature_sum_skips_non_finite_terms() {
        assert_eq!(quadrature_sum(&[3.0, 4.0]), 5.0);
        assert_eq!(quadrature_sum(&[3.0, f64::NAN, 4.0, f64::INFINITY]), 5.0);
        assert_eq!(quadrature_sum(&[]), 0.0);
    }

    #[test]
    fn mean_and_sample_std_uses_bessel_correction() {
        let (mean, std) = mean_and_sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1.0e-12);
        assert!((std - (32.0_f64 / 7.0).sqrt()).abs() < 1.0e-12);

        assert_eq!(mean_and_sample_std(&[3.0]), (3.0, 0.0));
        let (mean, std) = mean_and_sample_std(&[f64::NAN]);
        assert!(mean.is_nan() && std.is_nan());
    }

    #[test]
    fn linear_grid_is_inclusive_and_rejects_invalid_counts() {
        assert_eq!(linear_grid(0.0, 1.0, 1), None);
        let grid = linear_grid(0.0, 2.0, 5).expect("grid");
        assert_eq!(grid, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn interpolate_linear_clamps_and_interpolates() {
        let x_grid = [0.0, 1.0, 2.0];
        let y_grid = [10.0, 20.0, 30.0];

        assert_eq!(interpolate_linear(-1.0, &x_grid, &y_grid), Some(10.0));
        assert_eq!(interpolate_linear(3.0, &x_grid, &y_grid), Some(30.0));
        assert_eq!(interpolate_linear(0.5, &x_grid, &y_grid), Some(15.0));
    }

    #[test]
    fn linear_interpolant_returns_nan_outside_domain() {
        let interpolant =
            LinearInterpolant::new(vec![1.0, 2.0, 4.0], vec![10.0, 20.0, 0.0]).expect("table");
        assert_eq!(interpolant.evaluate(1.0), 10.0);
        assert_eq!(interpolant.evaluate(3.0), 10.0);
        assert_eq!(interpolant.evaluate(4.0), 0.0);
        assert!(interpolant.evaluate(0.999).is_nan());
        assert!(interpolant.evaluate(4.001).is_nan());
        assert!(interpolant.evaluate(f64::NAN).is_nan());
    }

    #[test]
    fn linear_interpolant_accepts_descending_samples() {
        let interpolant =
            LinearInterpolant::from_monotonic(&[3.0, 2.0, 1.0], &[30.0, 20.0, 10.0])
                .expect("descending table");
        assert_eq!(interpolant.domain(), (1.0, 3.0));
        assert!((interpolant.evaluate(2.5) - 25.0).abs() < 1.0e-12);
    }

    #[test]
    fn linear_interpolant_rejects_invalid_tables() {
        assert_eq!(
            LinearInterpolant::new(vec![1.0], vec![1.0]),
            Err(InterpolantError::InsufficientPoints { actual: 1 })
        );
        assert_eq!(
            LinearInterpolant::new(vec![1.0, 1.0], vec![1.0, 2.0]),
            Err(InterpolantError::NonIncreasing { index: 1 })
        );
        assert_eq!(
            LinearInterpolant::new(vec![1.0, 2.0], vec![1.0]),
            Err(InterpolantError::LengthMismatch { x: 2, y: 1 })
        );
    }
}
