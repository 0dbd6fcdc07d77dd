//! Exponential and exponential-with-offset fits

use approx::assert_relative_eq;
use mre_rs::{correlation_fit, FitConfig, FitFunction};
use ndarray::{array, Array1};

use crate::test_helpers::exponential_coefficients;

#[test]
fn test_round_trip_recovers_tau() {
    for &tau in &[3.0, 35.0, 120.0] {
        let coefficients = exponential_coefficients(tau, 1.0, 200);
        let result = correlation_fit(coefficients, &FitConfig::default()).unwrap();

        assert_relative_eq!(result.tau, tau, max_relative = 1e-3);
        assert!(result.ssres < 1e-8, "ssres {} for tau {}", result.ssres, tau);
        assert_eq!(result.mre, (-1.0 / result.tau).exp());
        assert_eq!(result.fitfunc, "A e^(-k/tau)");
    }
}

#[test]
fn test_offset_model_recovers_baseline() {
    let steps = Array1::from_iter((1..=150).map(|k| k as f64));
    let coefficients = steps.mapv(|k| 0.6 * (-k / 18.0).exp() + 0.05);

    let config = FitConfig::new(FitFunction::ExponentialOffset);
    let result = correlation_fit((steps, coefficients), &config).unwrap();

    assert_eq!(result.model, "exponential_offset");
    assert_eq!(result.popt.len(), 3);
    assert_relative_eq!(result.tau, 18.0, max_relative = 1e-3);
    assert_relative_eq!(result.popt[1], 0.6, max_relative = 1e-3);
    assert_relative_eq!(result.popt[2], 0.05, epsilon = 1e-4);
}

#[test]
fn test_weights_follow_standard_errors() {
    // One corrupted point: a tiny error pins the fit to it, a huge error
    // lets the fit ignore it
    let steps = Array1::from_iter((1..=40).map(|k| k as f64));
    let mut coefficients = steps.mapv(|k| (-k / 10.0).exp());
    coefficients[5] += 0.2;

    let mut ignored = Array1::from_elem(40, 0.01);
    ignored[5] = 1e3;
    let result = correlation_fit(
        (steps.clone(), coefficients.clone(), ignored),
        &FitConfig::default(),
    )
    .unwrap();
    assert_relative_eq!(result.tau, 10.0, max_relative = 1e-3);

    let uniform = Array1::from_elem(40, 0.01);
    let result = correlation_fit((steps, coefficients, uniform), &FitConfig::default()).unwrap();
    assert!((result.tau - 10.0).abs() > 1e-3);
}

#[test]
fn test_covariance_and_errors() {
    let steps = Array1::from_iter((1..=80).map(|k| k as f64));
    // Deterministic wiggle as measurement noise
    let coefficients = steps.mapv(|k| 0.9 * (-k / 25.0).exp() + 0.002 * (k * 1.3).sin());
    let stderrs = Array1::from_elem(80, 0.002);

    let result = correlation_fit((steps, coefficients, stderrs), &FitConfig::default()).unwrap();
    let errors = result.parameter_errors();

    assert_eq!(result.pcov.dim(), (2, 2));
    assert!(errors.iter().all(|e| e.is_finite() && *e > 0.0));
    assert!(errors[0] < 0.1 * result.tau);
    assert_relative_eq!(result.pcov[[0, 1]], result.pcov[[1, 0]], epsilon = 1e-12);

    let correl = result.correlation_matrix();
    assert_eq!(correl[[0, 0]], 1.0);
    assert!(correl[[0, 1]].abs() <= 1.0);
}

#[test]
fn test_string_aliases_select_models() {
    let coefficients = exponential_coefficients(12.0, 1.0, 50);
    let function: FitFunction = "f_exponential_offset".parse().unwrap();
    let result = correlation_fit(coefficients, &FitConfig::new(function)).unwrap();

    assert_eq!(result.model, "exponential_offset");
    assert_relative_eq!(result.tau, 12.0, max_relative = 1e-3);
    assert!(result.popt[2].abs() < 1e-4);
}

#[test]
fn test_mnaive_only_for_lag_one() {
    let from_one = correlation_fit(
        (array![1.0, 2.0, 3.0, 4.0], array![0.8, 0.64, 0.512, 0.4096]),
        &FitConfig::default(),
    )
    .unwrap();
    assert_eq!(from_one.mnaive, Some(0.8));

    let from_two = correlation_fit(
        (array![2.0, 3.0, 4.0, 5.0], array![0.64, 0.512, 0.4096, 0.32768]),
        &FitConfig::default(),
    )
    .unwrap();
    assert_eq!(from_two.mnaive, None);
    assert_relative_eq!(from_two.mre, 0.8, max_relative = 1e-4);
}
