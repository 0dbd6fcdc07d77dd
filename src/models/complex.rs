//! Exponential decay superposed with a damped oscillation, a Gaussian-like
//! short-lag term and an offset.
//!
//! ```text
//! A e^(-k/tau) + B e^(-(k/tosc)^gamma) cos(2 pi nu k) + C e^(-(k/tgs)^2) + O
//! ```
//!
//! The fitting landscape is multi-modal, so the model ships with a grid of
//! starting points covering short and long timescales and a set of bounds
//! that keep every parameter in a physiologically plausible range.

use ndarray::{Array1, Array2, ArrayView1};
use std::f64::consts::PI;

use super::DecayModel;

/// Parameter order: `(tau, A, O, tosc, B, gamma, nu, tgs, C)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Complex;

pub(crate) const COMPLEX_PARAMETER_NAMES: [&str; 9] =
    ["tau", "A", "O", "tosc", "B", "gamma", "nu", "tgs", "C"];

/// Default starting points, one row per fit attempt.
#[rustfmt::skip]
pub(crate) const COMPLEX_FITPARS: [[f64; 9]; 22] = [
    //  tau      A      O   tosc      B  gamma          nu   tgs     C
    [  10.0, 0.1  , 0.0  , 300.0, 0.03 , 1.0, 1.0 / 200.0, 10.0, 0.03],
    [ 400.0, 0.1  , 0.0  , 200.0, 0.03 , 2.5, 1.0 / 250.0, 25.0, 0.03],
    [  20.0, 0.1  , 0.03 , 100.0, 0.03 , 1.5, 1.0 /  50.0, 10.0, 0.03],
    [ 300.0, 0.1  , 0.03 , 100.0, 0.03 , 1.5, 1.0 /  50.0, 10.0, 0.03],
    [  20.0, 0.03 , 0.01 , 100.0, 0.03 , 1.0, 1.0 / 150.0,  5.0, 0.03],
    [  20.0, 0.03 , 0.01 , 100.0, 0.03 , 1.0, 1.0 / 150.0,  5.0, 0.03],
    [  10.0, 0.05 , 0.03 , 300.0, 0.03 , 1.5, 1.0 / 100.0,  5.0, 0.1 ],
    [ 300.0, 0.05 , 0.03 , 300.0, 0.03 , 1.5, 1.0 / 100.0, 10.0, 0.1 ],
    [  56.0, 0.029, 0.010, 116.0, 0.010, 2.0, 1.0 / 466.0,  5.0, 0.03],
    [  56.0, 0.029, 0.010, 116.0, 0.010, 2.0, 1.0 / 466.0,  5.0, 0.03],
    [  56.0, 0.029, 0.010, 116.0, 0.010, 2.0, 1.0 / 466.0,  5.0, 0.03],
    [  19.0, 0.078, 0.044, 107.0, 0.017, 1.0, 1.0 / 478.0,  5.0, 0.1 ],
    [  19.0, 0.078, 0.044, 107.0, 0.017, 1.0, 1.0 / 478.0,  5.0, 0.1 ],
    [  10.0, 0.029, 0.045, 300.0, 0.067, 2.0, 1.0 / 127.0, 10.0, 0.03],
    [ 210.0, 0.029, 0.012,  50.0, 0.03 , 1.0, 1.0 / 150.0, 10.0, 0.1 ],
    [ 210.0, 0.029, 0.012,  50.0, 0.03 , 1.0, 1.0 / 150.0, 10.0, 0.1 ],
    [ 210.0, 0.029, 0.012,  50.0, 0.03 , 1.0, 1.0 / 150.0, 10.0, 0.03],
    [ 210.0, 0.029, 0.012,  50.0, 0.03 , 1.0, 1.0 / 150.0, 10.0, 0.03],
    [ 310.0, 0.029, 0.002,  50.0, 0.08 , 1.0, 1.0 /  34.0,  5.0, 0.03],
    [ 310.0, 0.029, 0.002,  50.0, 0.08 , 1.0, 1.0 /  34.0,  5.0, 0.03],
    [ 310.0, 0.029, 0.002,  50.0, 0.08 , 1.0, 1.0 /  64.0,  5.0, 0.03],
    [ 310.0, 0.029, 0.002,  50.0, 0.08 , 1.0, 1.0 /  64.0,  5.0, 0.03],
];

/// Default `(lower, upper)` bounds, one pair per parameter.
#[rustfmt::skip]
pub(crate) const COMPLEX_FITBNDS: [(f64, f64); 9] = [
    (5.0,         5000.0),        // tau
    (0.0,         1.0),           // A
    (-1.0,        1.0),           // O
    (5.0,         5000.0),        // tosc
    (-5.0,        5.0),           // B
    (1.0 / 3.0,   3.0),           // gamma
    (2.0 / 1000.0, 50.0 / 1000.0), // nu
    (0.0,         30.0),          // tgs
    (-5.0,        5.0),           // C
];

impl DecayModel for Complex {
    fn name(&self) -> &str {
        "complex"
    }

    fn description(&self) -> &str {
        "A e^(-k/tau) + B e^-(k/tosc)^gamma cos(2 pi nu k) + C e^-(k/tgs)^2 + O"
    }

    fn parameter_names(&self) -> Vec<String> {
        COMPLEX_PARAMETER_NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn eval(&self, k: f64, p: ArrayView1<f64>) -> f64 {
        let (tau, a, o, tosc, b, gamma, nu, tgs, c) =
            (p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7], p[8]);

        a * (-k / tau).exp()
            + b * (-(k / tosc).powf(gamma)).exp() * (2.0 * PI * nu * k).cos()
            + c * (-(k / tgs).powi(2)).exp()
            + o
    }

    fn jacobian(&self, steps: &Array1<f64>, p: ArrayView1<f64>) -> Option<Array2<f64>> {
        let (tau, a, tosc, b, gamma, nu, tgs, c) = (p[0], p[1], p[3], p[4], p[5], p[6], p[7], p[8]);
        let mut jac = Array2::zeros((steps.len(), 9));

        for (i, &k) in steps.iter().enumerate() {
            let exp_term = (-k / tau).exp();

            let ratio = k / tosc;
            let u = ratio.powf(gamma);
            let damping = (-u).exp();
            let phase = 2.0 * PI * nu * k;
            let (sin, cos) = phase.sin_cos();
            // u·ln(k/tosc) vanishes as k -> 0
            let log_term = if ratio > 0.0 { u * ratio.ln() } else { 0.0 };

            let g = (k / tgs).powi(2);
            let gauss = (-g).exp();

            jac[[i, 0]] = a * exp_term * k / (tau * tau);
            jac[[i, 1]] = exp_term;
            jac[[i, 2]] = 1.0;
            jac[[i, 3]] = b * cos * damping * gamma * u / tosc;
            jac[[i, 4]] = damping * cos;
            jac[[i, 5]] = -b * cos * damping * log_term;
            jac[[i, 6]] = -b * damping * sin * 2.0 * PI * k;
            jac[[i, 7]] = if g > 0.0 { c * gauss * 2.0 * g / tgs } else { 0.0 };
            jac[[i, 8]] = gauss;
        }

        Some(jac)
    }
}
