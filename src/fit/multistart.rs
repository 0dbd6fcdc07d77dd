//! Best-of-N fitting from a grid of starting points.

use ndarray::{Array1, Array2, ArrayView1};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{MreError, Result};
use crate::lm::{LevenbergMarquardt, LmResult};
use crate::models::DecayModel;
use crate::parameters::FitBounds;
use crate::problem::Problem;
use crate::uncertainty::calculate_covariance;

use super::input::{FitInput, LagData};
use super::problem::{BoundedProblem, WeightedDecayProblem};
use super::result::CorrelationResult;
use super::FitConfig;

/// Outcome of one starting point.
#[derive(Debug, Clone)]
struct RowFit {
    popt: Array1<f64>,
    pcov: Array2<f64>,
    ssres: f64,
}

/// Fit a decay model to lag coefficients from every starting point and keep
/// the fit with the smallest residual sum of squares.
///
/// Starting points come from `config.fitpars`, or from the model defaults.
/// Bounds come from `config.fitbnds`, or from the model defaults; without
/// either the fit is unbounded. A starting point that fails contributes no
/// candidate. Ties in `ssres` keep the earliest row.
///
/// # Errors
///
/// * input errors from [`FitInput::resolve`]
/// * `MissingStartingParameters` if there is no starting row
/// * `DimensionMismatch` if starting points or bounds do not match the model
/// * `NoSuccessfulFit` if every starting point failed
///
/// # Examples
///
/// ```
/// use mre_rs::fit::{correlation_fit, FitConfig};
/// use ndarray::Array1;
///
/// let coefficients = Array1::from_iter((1..=40).map(|k| 0.8 * (-(k as f64) / 12.0).exp()));
/// let result = correlation_fit(coefficients, &FitConfig::default()).unwrap();
///
/// assert!((result.tau - 12.0).abs() < 1e-3);
/// assert_eq!(result.mre, (-1.0 / result.tau).exp());
/// ```
pub fn correlation_fit(
    input: impl Into<FitInput>,
    config: &FitConfig,
) -> Result<CorrelationResult> {
    let data = input.into().resolve()?;
    let model = config.fitfunc.model();
    let n_params = model.parameter_count();

    let fitpars = starting_parameters(config, n_params)?;
    let fitbnds = parameter_bounds(config, n_params)?;

    info!(
        model = model.name(),
        points = data.len(),
        starts = fitpars.nrows(),
        bounded = fitbnds.is_some(),
        "Fitting lag coefficients"
    );

    let solver = LevenbergMarquardt::with_config(config.lm.clone());
    let outcomes = run_rows(model, &data, &fitpars, fitbnds.as_ref(), &solver, config.parallel);

    let attempts = outcomes.len();
    let (best, successes) = select_best(outcomes);
    let best = best.ok_or(MreError::NoSuccessfulFit { attempts })?;
    let tau = best.popt[0];
    let mre = (-1.0 / tau).exp();

    info!(tau, mre, ssres = best.ssres, successes, attempts, "Fit finished");

    Ok(CorrelationResult {
        tau,
        mre,
        fitfunc: model.description().to_string(),
        model: model.name().to_string(),
        popt: best.popt,
        pcov: best.pcov,
        ssres: best.ssres,
        mnaive: data.mnaive,
        attempts,
        successes,
    })
}

/// Keep the successful row with the smallest `ssres`, the earliest one on
/// ties. Also returns the number of successful rows.
fn select_best(outcomes: Vec<Result<RowFit>>) -> (Option<RowFit>, usize) {
    let mut successes = 0;
    let mut best: Option<RowFit> = None;
    for (row, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(fit) => {
                successes += 1;
                debug!(row, ssres = fit.ssres, popt = %fit.popt, "Starting point converged");
                let improves = best.as_ref().map_or(true, |current| fit.ssres < current.ssres);
                if improves {
                    best = Some(fit);
                }
            }
            Err(err) => warn!(row, error = %err, "Fit from starting point failed"),
        }
    }
    (best, successes)
}

fn starting_parameters(config: &FitConfig, n_params: usize) -> Result<Array2<f64>> {
    if n_params == 0 {
        return Err(MreError::DimensionMismatch(format!(
            "'{}' takes no parameters, a decay model needs at least tau",
            config.fitfunc.name()
        )));
    }

    let fitpars = match &config.fitpars {
        Some(fitpars) => fitpars.clone(),
        None => config.fitfunc.default_fitpars().ok_or_else(|| {
            MreError::MissingStartingParameters(format!(
                "'{}' has no default starting points, supply fitpars",
                config.fitfunc.name()
            ))
        })?,
    };

    if fitpars.nrows() == 0 {
        return Err(MreError::MissingStartingParameters(
            "fitpars has no rows".to_string(),
        ));
    }
    if fitpars.ncols() != n_params {
        return Err(MreError::DimensionMismatch(format!(
            "fitpars has {} columns, '{}' takes {} parameters",
            fitpars.ncols(),
            config.fitfunc.name(),
            n_params
        )));
    }
    Ok(fitpars)
}

fn parameter_bounds(config: &FitConfig, n_params: usize) -> Result<Option<FitBounds>> {
    let fitbnds = match &config.fitbnds {
        Some(fitbnds) => Some(fitbnds.clone()),
        None => config.fitfunc.default_fitbnds(),
    };

    if let Some(bounds) = &fitbnds {
        if bounds.len() != n_params {
            return Err(MreError::DimensionMismatch(format!(
                "fitbnds covers {} parameters, '{}' takes {}",
                bounds.len(),
                config.fitfunc.name(),
                n_params
            )));
        }
    }
    Ok(fitbnds)
}

/// Fit every row, returning the outcomes in row order.
fn run_rows(
    model: &dyn DecayModel,
    data: &LagData,
    fitpars: &Array2<f64>,
    bounds: Option<&FitBounds>,
    solver: &LevenbergMarquardt,
    parallel: bool,
) -> Vec<Result<RowFit>> {
    if parallel {
        return run_rows_parallel(model, data, fitpars, bounds, solver);
    }

    fitpars
        .outer_iter()
        .map(|start| fit_row(model, data, start, bounds, solver))
        .collect()
}

#[cfg(feature = "parallel")]
fn run_rows_parallel(
    model: &dyn DecayModel,
    data: &LagData,
    fitpars: &Array2<f64>,
    bounds: Option<&FitBounds>,
    solver: &LevenbergMarquardt,
) -> Vec<Result<RowFit>> {
    (0..fitpars.nrows())
        .into_par_iter()
        .map(|row| fit_row(model, data, fitpars.row(row), bounds, solver))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn run_rows_parallel(
    model: &dyn DecayModel,
    data: &LagData,
    fitpars: &Array2<f64>,
    bounds: Option<&FitBounds>,
    solver: &LevenbergMarquardt,
) -> Vec<Result<RowFit>> {
    debug!("Built without the parallel feature, fitting starting points sequentially");
    fitpars
        .outer_iter()
        .map(|start| fit_row(model, data, start, bounds, solver))
        .collect()
}

fn fit_row(
    model: &dyn DecayModel,
    data: &LagData,
    start: ArrayView1<f64>,
    bounds: Option<&FitBounds>,
    solver: &LevenbergMarquardt,
) -> Result<RowFit> {
    let problem = WeightedDecayProblem::new(model, data);
    let start = start.to_owned();

    let (popt, lm_result) = match bounds {
        Some(bounds) => {
            debug!(
                start = %start,
                lower = %bounds.lower(),
                upper = %bounds.upper(),
                "Fitting bounded"
            );
            bounds.check(start.view())?;
            let bounded = BoundedProblem::new(&problem, bounds.transforms())?;
            let internal = bounded.to_internal(&start)?;
            let lm_result = solver.minimize(&bounded, internal)?;
            (bounded.to_external(&lm_result.params), lm_result)
        }
        None => {
            debug!(start = %start, "Fitting unbounded");
            let lm_result = solver.minimize(&problem, start)?;
            (lm_result.params.clone(), lm_result)
        }
    };

    check_converged(&lm_result)?;

    let ssres = problem.ssres(&popt);
    if !ssres.is_finite() || popt.iter().any(|p| !p.is_finite()) {
        return Err(MreError::FunctionEvaluation(
            "fit ended on non-finite parameters or residuals".to_string(),
        ));
    }

    let jacobian = problem.jacobian(&popt)?;
    let residuals = problem.eval(&popt)?;
    let pcov = calculate_covariance(&jacobian, &residuals);

    Ok(RowFit { popt, pcov, ssres })
}

fn check_converged(lm_result: &LmResult) -> Result<()> {
    if lm_result.success {
        Ok(())
    } else {
        Err(MreError::ConvergenceFailure(format!(
            "{} after {} iterations",
            lm_result.termination, lm_result.iterations
        )))
    }
}
