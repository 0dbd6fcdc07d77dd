//! Covariance of fitted parameters

use approx::assert_relative_eq;
use mre_rs::uncertainty::{
    calculate_correlation, calculate_covariance, standard_errors_from_covariance,
};
use mre_rs::{correlation_fit, FitConfig};
use ndarray::{arr2, array, Array1};

/// Mock jacobian for a linear fit y = m·x + b at x = 1..4
fn linear_jacobian() -> ndarray::Array2<f64> {
    arr2(&[[1.0, 1.0], [2.0, 1.0], [3.0, 1.0], [4.0, 1.0]])
}

#[test]
fn test_linear_fit_covariance() {
    // Points (1,1), (2,2), (3,2), (4,3): best line y = 0.6x + 0.5
    let residuals = array![0.1, -0.3, 0.3, -0.1];
    let covar = calculate_covariance(&linear_jacobian(), &residuals);

    // redchi · (JᵀJ)⁻¹ with JᵀJ = [[30, 10], [10, 4]], det = 20
    let redchi = residuals.mapv(|r| r * r).sum() / 2.0;
    assert_relative_eq!(covar[[0, 0]], redchi * 4.0 / 20.0, epsilon = 1e-12);
    assert_relative_eq!(covar[[0, 1]], -redchi * 10.0 / 20.0, epsilon = 1e-12);
    assert_relative_eq!(covar[[1, 1]], redchi * 30.0 / 20.0, epsilon = 1e-12);

    let errors = standard_errors_from_covariance(&covar);
    assert_relative_eq!(errors[0], (redchi * 0.2).sqrt(), epsilon = 1e-12);

    let correl = calculate_correlation(&covar);
    assert_relative_eq!(correl[[0, 1]], -10.0 / (4.0f64 * 30.0).sqrt(), epsilon = 1e-12);
}

#[test]
fn test_fit_errors_scale_with_noise() {
    let steps = Array1::from_iter((1..=100).map(|k| k as f64));
    let wiggle = steps.mapv(|k| (k * 2.1).sin());
    let clean = steps.mapv(|k| 0.9 * (-k / 20.0).exp());

    let quiet = &clean + &(&wiggle * 1e-3);
    let loud = &clean + &(&wiggle * 1e-2);

    let quiet_fit = correlation_fit((steps.clone(), quiet), &FitConfig::default()).unwrap();
    let loud_fit = correlation_fit((steps, loud), &FitConfig::default()).unwrap();

    let quiet_err = quiet_fit.parameter_errors();
    let loud_err = loud_fit.parameter_errors();
    assert!(loud_err[0] > 3.0 * quiet_err[0]);
    assert!(loud_fit.ssres > quiet_fit.ssres);
}
