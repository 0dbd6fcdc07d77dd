//! Best-of-N selection over starting points

use approx::assert_relative_eq;
use mre_rs::{correlation_fit, CustomFunction, FitConfig, FitFunction, LmConfig, MreError};
use ndarray::array;

use crate::test_helpers::exponential_coefficients;

#[test]
fn test_good_row_is_never_beaten_by_adding_bad_rows() {
    let coefficients = exponential_coefficients(40.0, 0.7, 120);

    let good_only = FitConfig::default().with_fitpars(array![[38.0, 0.7]]);
    let mixed = FitConfig::default().with_fitpars(array![[0.5, 50.0], [38.0, 0.7], [1e4, 1e-3]]);

    let good = correlation_fit(coefficients.clone(), &good_only).unwrap();
    let best = correlation_fit(coefficients, &mixed).unwrap();

    assert_eq!(best.attempts, 3);
    assert!(best.successes >= 1);
    assert!(best.ssres <= good.ssres);
    assert_relative_eq!(best.tau, 40.0, max_relative = 1e-3);
}

#[test]
fn test_all_rows_failing_is_an_error() {
    let coefficients = exponential_coefficients(40.0, 0.7, 120);
    // One iteration is never enough from these starts
    let config = FitConfig::default()
        .with_fitpars(array![[2.0, 5.0], [900.0, 0.01]])
        .with_lm_config(LmConfig::default().with_max_iterations(1));

    assert!(matches!(
        correlation_fit(coefficients, &config),
        Err(MreError::NoSuccessfulFit { attempts: 2 })
    ));
}

#[test]
fn test_custom_function_fit() {
    let power_law = CustomFunction::new("power_law", &["tau", "A"], |k, p| {
        p[1] * (-k / p[0]).exp() / k.sqrt()
    })
    .with_description("A e^(-k/tau) / sqrt(k)");
    let function = FitFunction::Custom(power_law);

    let coefficients = ndarray::Array1::from_iter((1..=60).map(|k| {
        let k = k as f64;
        0.4 * (-k / 15.0).exp() / k.sqrt()
    }));

    assert!(matches!(
        correlation_fit(coefficients.clone(), &FitConfig::new(function.clone())),
        Err(MreError::MissingStartingParameters(_))
    ));

    let config = FitConfig::new(function).with_fitpars(array![[10.0, 1.0], [30.0, 0.1]]);
    let result = correlation_fit(coefficients, &config).unwrap();
    assert_eq!(result.fitfunc, "A e^(-k/tau) / sqrt(k)");
    assert_relative_eq!(result.tau, 15.0, max_relative = 1e-3);
    assert_relative_eq!(result.popt[1], 0.4, max_relative = 1e-3);
}

#[test]
fn test_parallel_and_sequential_agree() {
    let coefficients = exponential_coefficients(22.0, 0.8, 90);
    let rows = array![[1.0, 1.0], [20.0, 1.0], [80.0, 0.3], [300.0, 2.0], [22.0, 0.8]];

    let sequential = FitConfig::default().with_fitpars(rows);
    let parallel = sequential.clone().with_parallel(true);

    let a = correlation_fit(coefficients.clone(), &sequential).unwrap();
    let b = correlation_fit(coefficients, &parallel).unwrap();
    assert_eq!(a, b);
}
