//! # Covariance Matrix Calculations
//!
//! Covariance of fitted parameters from the Jacobian of the weighted residuals
//! at the optimum.

use ndarray::{Array1, Array2};

use crate::utils::matrix_convert::{nalgebra_to_ndarray, ndarray_to_nalgebra};

/// Calculate the covariance matrix from the Jacobian of the weighted residuals.
///
/// The estimate is `redchi · pinv(JᵀJ)`, where the pseudo-inverse is built
/// from the singular value decomposition of `J` with singular values below
/// `ε · max(m, n) · s_max` discarded, and `redchi = Σr² / (m − n)`.
///
/// When there are no more residuals than parameters the reduced chi-square is
/// undefined and every entry of the returned matrix is `+∞`.
pub fn calculate_covariance(jacobian: &Array2<f64>, residuals: &Array1<f64>) -> Array2<f64> {
    let (m, n) = jacobian.dim();
    if m <= n {
        return Array2::from_elem((n, n), f64::INFINITY);
    }

    let svd = ndarray_to_nalgebra(jacobian).svd(false, true);
    let v_t = match svd.v_t {
        Some(v_t) => v_t,
        None => return Array2::from_elem((n, n), f64::INFINITY),
    };

    let s_max = svd.singular_values.max();
    let threshold = f64::EPSILON * m.max(n) as f64 * s_max;

    // pinv(JᵀJ) = V · diag(1/s²) · Vᵀ over the retained singular values
    let mut scaled = v_t.clone();
    for (row, &s) in svd.singular_values.iter().enumerate() {
        let factor = if s > threshold { 1.0 / (s * s) } else { 0.0 };
        for col in 0..n {
            scaled[(row, col)] *= factor;
        }
    }
    let pinv = v_t.transpose() * scaled;

    let redchi = residuals.iter().map(|r| r * r).sum::<f64>() / (m - n) as f64;
    nalgebra_to_ndarray(&pinv) * redchi
}

/// Calculate correlation matrix from covariance matrix.
///
/// `correl[i, j] = covar[i, j] / sqrt(covar[i, i] · covar[j, j])`, with unit
/// diagonal and zero where the denominator vanishes or is not finite.
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    let mut correl = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..n {
            if i == j {
                correl[[i, j]] = 1.0;
            } else {
                let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
                if denom > 0.0 && denom.is_finite() {
                    correl[[i, j]] = covar[[i, j]] / denom;
                }
            }
        }
    }

    correl
}

/// Extract standard errors from the covariance matrix.
///
/// Square roots of the diagonal; negative diagonal entries map to zero.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar.diag().mapv(|v| if v > 0.0 { v.sqrt() } else { 0.0 })
}
