//! Complex model with its default starting grid and bounds

use mre_rs::{correlation_fit, DecayModel, FitConfig, FitFunction};
use ndarray::{array, Array1};

#[test]
fn test_complex_fit_respects_default_bounds() {
    let truth = array![56.0, 0.029, 0.010, 116.0, 0.010, 2.0, 1.0 / 466.0, 5.0, 0.03];
    let steps = Array1::from_iter((1..=150).map(|k| k as f64));
    let coefficients = FitFunction::Complex.eval_steps(&steps, truth.view());

    let config = FitConfig::new(FitFunction::Complex).with_parallel(true);
    let result = correlation_fit((steps, coefficients), &config).unwrap();

    let bounds = FitFunction::Complex.default_fitbnds().unwrap();
    assert_eq!(result.attempts, 22);
    assert!(result.successes >= 1);
    assert_eq!(result.popt.len(), 9);
    assert_eq!(result.model, "complex");
    for (i, value) in result.popt.iter().enumerate() {
        assert!(value.is_finite());
        assert!(
            *value >= bounds.lower()[i] && *value <= bounds.upper()[i],
            "parameter {} = {} outside bounds",
            i,
            value
        );
    }
    // One default row starts on the generating parameters
    assert!(result.ssres < 1e-10);
    assert!(result.mre > 0.0 && result.mre < 1.0);
}

#[test]
fn test_custom_bounds_override_defaults() {
    let steps = Array1::from_iter((1..=60).map(|k| k as f64));
    let coefficients = steps.mapv(|k| 0.5 * (-k / 30.0).exp());
    let bounds = mre_rs::FitBounds::from_rows(&array![[1.0, 0.0], [10.0, 1.0]]).unwrap();

    let config = FitConfig::default().with_fitbnds(bounds);
    let result = correlation_fit((steps, coefficients), &config).unwrap_err();
    // The default start tau = 20 lies outside [1, 10]
    assert!(result.to_string().contains("No successful fit"));
}
