//! Stationary-mean coefficient estimation

use approx::assert_relative_eq;
use mre_rs::{correlation_coefficients, CoefficientConfig, CoefficientMethod};
use ndarray::s;

use crate::test_helpers::branching_process;

fn stationary_config(maxstep: usize) -> CoefficientConfig {
    CoefficientConfig::default()
        .with_steps(1, maxstep)
        .with_method(CoefficientMethod::StationaryMean)
}

#[test]
fn test_single_trial_matches_trial_separated() {
    let data = branching_process(0.8, 40.0, 2000, 1, 11);

    let separated =
        correlation_coefficients(&data, &CoefficientConfig::default().with_steps(1, 25)).unwrap();
    let pooled = correlation_coefficients(&data, &stationary_config(25)).unwrap();

    for (a, b) in pooled.coefficients.iter().zip(separated.coefficients.iter()) {
        assert_relative_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn test_pooled_regression_of_centred_trials() {
    let data = branching_process(0.8, 40.0, 500, 3, 12);
    let config = stationary_config(4).with_bootstrap(false);
    let result = correlation_coefficients(&data, &config).unwrap();

    // Regression over the concatenation of centred pairs for k = 3
    let step = 3;
    let len = data.ncols() - step;
    let (mut x, mut y) = (Vec::new(), Vec::new());
    for trial in data.outer_iter() {
        let mean = trial.sum() / trial.len() as f64;
        x.extend(trial.slice(s![..len]).iter().map(|v| v - mean));
        y.extend(trial.slice(s![step..]).iter().map(|v| v - mean));
    }
    let n = x.len() as f64;
    let (xm, ym) = (x.iter().sum::<f64>() / n, y.iter().sum::<f64>() / n);
    let sxy: f64 = x.iter().zip(&y).map(|(a, b)| (a - xm) * (b - ym)).sum();
    let sxx: f64 = x.iter().map(|a| (a - xm).powi(2)).sum();
    let slope = sxy / sxx;

    assert_relative_eq!(result.coefficients[step - 1], slope, epsilon = 1e-10);
    assert_relative_eq!(result.offsets[step - 1], ym - slope * xm, epsilon = 1e-10);
    assert!(result.stderrs.iter().all(|e| *e > 0.0));
}

#[test]
fn test_bootstrap_samples() {
    let data = branching_process(0.8, 40.0, 800, 4, 13);
    let config = stationary_config(10).with_numboot(25).with_seed(99);
    let result = correlation_coefficients(&data, &config).unwrap();

    let samples = result.samples.as_ref().unwrap();
    assert_eq!(samples.coefficients.dim(), (25, 10));
    assert_eq!(samples.stderrs.dim(), (25, 10));
    assert_eq!(samples.trialactivities.len(), 25);
    assert_eq!(result.trialactivities.len(), 4);

    // Resample activities are means of original trial activities
    let lo = result.trialactivities.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = result.trialactivities.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(samples.trialactivities.iter().all(|a| *a >= lo - 1e-9 && *a <= hi + 1e-9));

    let spread = result.sample_spread().unwrap();
    assert_eq!(spread.len(), 10);
    assert!(spread.iter().all(|s| s.is_finite() && *s >= 0.0));
}

#[test]
fn test_bootstrap_is_reproducible_with_seed() {
    let data = branching_process(0.8, 40.0, 600, 3, 14);
    let config = stationary_config(6).with_numboot(10).with_seed(2024);

    let a = correlation_coefficients(&data, &config).unwrap();
    let b = correlation_coefficients(&data, &config).unwrap();
    assert_eq!(a.samples, b.samples);

    let c = correlation_coefficients(&data, &config.clone().with_seed(2025)).unwrap();
    // Top-level estimate never depends on the resampling
    assert_eq!(a.coefficients, c.coefficients);
}

#[test]
fn test_without_bootstrap_samples_are_trial_separated() {
    let data = branching_process(0.8, 40.0, 600, 3, 15);
    let pooled =
        correlation_coefficients(&data, &stationary_config(6).with_bootstrap(false)).unwrap();
    let separated =
        correlation_coefficients(&data, &CoefficientConfig::default().with_steps(1, 6)).unwrap();

    assert_eq!(pooled.samples, separated.samples);
}
