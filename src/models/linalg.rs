//! Small dense linear algebra shared by the smile fitters

use ndarray::{Array1, Array2};

/// Solve a small dense system by Gaussian elimination with partial pivoting.
/// Returns `None` for a singular or non-finite system.
pub(crate) fn solve_dense(mut a: Array2<f64>, mut rhs: Array1<f64>) -> Option<Array1<f64>> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < 1e-300 {
            return None;
        }
        if pivot != col {
            for c in 0..n {
                a.swap([col, c], [pivot, c]);
            }
            rhs.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for c in col..n {
                a[[row, c]] -= factor * a[[col, c]];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|c| a[[row, c]] * x[c]).sum();
        x[row] = (rhs[row] - tail) / a[[row, row]];
    }
    x.iter().all(|v: &f64| v.is_finite()).then_some(x)
}
