use faer::Mat;

pub type DenseMatrix = Mat<f64>;

/// Pivots smaller than this fraction of the largest row sum count as zero.
const RELATIVE_PIVOT_EPSILON: f64 = 1.0e-13;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InversionError {
    #[error("matrix inversion requires a non-empty square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("matrix is singular or ill-conditioned at column {column}")]
    Singular { column: usize },
}

/// Gauss-Jordan inverse with partial pivoting.
pub fn invert_matrix(matrix: &DenseMatrix) -> Result<DenseMatrix, InversionError> {
    let rows = matrix.nrows();
    let cols = matrix.ncols();
    if rows == 0 || rows != cols {
        return Err(InversionError::NotSquare { rows, cols });
    }

    let scale = (0..rows)
        .map(|row| (0..cols).map(|col| matrix[(row, col)].abs()).sum::<f64>())
        .fold(0.0_f64, f64::max);
    let threshold = scale * RELATIVE_PIVOT_EPSILON;

    let mut work = matrix.clone();
    let mut inverse = DenseMatrix::identity(rows, rows);
    for column in 0..rows {
        let pivot_row = (column..rows)
            .max_by(|&lhs, &rhs| work[(lhs, column)].abs().total_cmp(&work[(rhs, column)].abs()))
            .unwrap_or(column);
        let pivot = work[(pivot_row, column)];
        if !(pivot.abs() > threshold) {
            return Err(InversionError::Singular { column });
        }
        if pivot_row != column {
            swap_rows(&mut work, pivot_row, column);
            swap_rows(&mut inverse, pivot_row, column);
        }

        for col in 0..rows {
            work[(column, col)] /= pivot;
            inverse[(column, col)] /= pivot;
        }
        for row in (0..rows).filter(|&row| row != column) {
            let factor = work[(row, column)];
            if factor == 0.0 {
                continue;
            }
            for col in 0..rows {
                work[(row, col)] -= factor * work[(column, col)];
                inverse[(row, col)] -= factor * inverse[(column, col)];
            }
        }
    }
    Ok(inverse)
}

fn swap_rows(matrix: &mut DenseMatrix, first: usize, second: usize) {
    for col in 0..matrix.ncols() {
        let value = matrix[(first, col)];
        matrix[(first, col)] = matrix[(second, col)];
        matrix[(second, col)] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::{DenseMatrix, InversionError, invert_matrix};

    fn matrix(rows: &[[f64; 3]]) -> DenseMatrix {
        DenseMatrix::from_fn(rows.len(), 3, |row, col| rows[row][col])
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        let hessian = matrix(&[[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]]);
        let inverse = invert_matrix(&hessian).expect("matrix should invert");
        for row in 0..3 {
            for col in 0..3 {
                let value: f64 = (0..3).map(|k| hessian[(row, k)] * inverse[(k, col)]).sum();
                let expected = if row == col { 1.0 } else { 0.0 };
                assert!((value - expected).abs() < 1.0e-12, "({row}, {col}) = {value}");
            }
        }
    }

    #[test]
    fn zero_leading_pivot_needs_row_swap() {
        let permuted = matrix(&[[0.0, 2.0, 1.0], [1.0, 1.0, 0.0], [3.0, 0.0, 1.0]]);
        let inverse = invert_matrix(&permuted).expect("matrix should invert");
        let x: Vec<f64> = (0..3)
            .map(|row| (0..3).map(|col| inverse[(row, col)] * [-1.0, -1.0, 6.0][col]).sum())
            .collect();
        for (actual, wanted) in x.iter().zip([1.0, -2.0, 3.0]) {
            assert!((actual - wanted).abs() < 1.0e-12);
        }
    }

    #[test]
    fn singular_and_non_square_inputs_are_rejected() {
        let singular = matrix(&[[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 1.0]]);
        assert!(matches!(
            invert_matrix(&singular),
            Err(InversionError::Singular { .. })
        ));
        assert_eq!(
            invert_matrix(&DenseMatrix::zeros(2, 3)).expect_err("non-square"),
            InversionError::NotSquare { rows: 2, cols: 3 }
        );
        assert!(invert_matrix(&DenseMatrix::zeros(0, 0)).is_err());
    }
}
