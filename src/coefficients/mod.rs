//! # Lag coefficients
//!
//! Estimation of the coefficients `r_k` that relate the activity at time `t`
//! to the activity at time `t + k`. For every lag `k` the shifted series is
//! regressed on the unshifted one, and the per-lag slopes are the
//! coefficients the fitter later turns into a timescale.
//!
//! Two aggregation strategies are available:
//!
//! * [`CoefficientMethod::TrialSeparated`] regresses every trial on its own
//!   and averages the slopes. The error of a step is the spread of the
//!   per-trial slopes.
//! * [`CoefficientMethod::StationaryMean`] centres every trial on its own
//!   mean activity and pools all trials into one regression per step.
//!   Optionally the trials are bootstrapped to obtain a spread.
//!
//! ```
//! use mre_rs::coefficients::{correlation_coefficients, CoefficientConfig};
//! use ndarray::Array1;
//!
//! let activity = Array1::from_iter((0..200).map(|t| ((t * 7919) % 13) as f64));
//! let config = CoefficientConfig::default().with_steps(1, 10);
//! let result = correlation_coefficients(&activity, &config).unwrap();
//!
//! assert_eq!(result.steps.len(), 10);
//! assert_eq!(result.coefficients.len(), 10);
//! ```

use ndarray::{
    s, Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Dimension, Ix1, Ix2,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{MreError, Result};

pub mod regression;

pub use regression::LinearRegression;

/// Trial counts below this make the cross-trial error estimate unreliable.
const MIN_RELIABLE_TRIALS: usize = 10;

/// How per-trial regressions are combined into one coefficient per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoefficientMethod {
    /// Regress each trial separately, then average.
    #[default]
    TrialSeparated,
    /// Pool mean-centred trials into a single regression per step.
    StationaryMean,
}

impl FromStr for CoefficientMethod {
    type Err = MreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trialseparated" | "trial_separated" | "ts" => Ok(CoefficientMethod::TrialSeparated),
            "stationarymean" | "stationary_mean" | "sm" => Ok(CoefficientMethod::StationaryMean),
            _ => Err(MreError::InvalidInput(format!(
                "unknown coefficient method '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for CoefficientMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoefficientMethod::TrialSeparated => f.write_str("trialseparated"),
            CoefficientMethod::StationaryMean => f.write_str("stationarymean"),
        }
    }
}

/// Configuration for [`correlation_coefficients`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoefficientConfig {
    /// Smallest lag, inclusive.
    pub minstep: usize,

    /// Largest lag, inclusive. Clamped to `datalength - 2`.
    pub maxstep: usize,

    /// Aggregation strategy.
    pub method: CoefficientMethod,

    /// Resample trials with replacement. Only used by the stationary-mean method.
    pub bootstrap: bool,

    /// Number of bootstrap resamples.
    pub numboot: usize,

    /// Seed for the bootstrap generator; `None` seeds from system entropy.
    pub seed: Option<u64>,
}

impl Default for CoefficientConfig {
    fn default() -> Self {
        Self {
            minstep: 1,
            maxstep: 1000,
            method: CoefficientMethod::TrialSeparated,
            bootstrap: true,
            numboot: 100,
            seed: None,
        }
    }
}

impl CoefficientConfig {
    /// Set the inclusive step range.
    pub fn with_steps(mut self, minstep: usize, maxstep: usize) -> Self {
        self.minstep = minstep;
        self.maxstep = maxstep;
        self
    }

    pub fn with_method(mut self, method: CoefficientMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_numboot(mut self, numboot: usize) -> Self {
        self.numboot = numboot;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Coefficients before aggregation, one row per trial or per bootstrap
/// resample and one column per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSamples {
    pub coefficients: Array2<f64>,
    pub offsets: Array2<f64>,
    pub stderrs: Array2<f64>,
    /// Mean activity of each row's trial (or resample).
    pub trialactivities: Array1<f64>,
}

impl CoefficientSamples {
    fn zeros(rows: usize, numsteps: usize) -> Self {
        Self {
            coefficients: Array2::zeros((rows, numsteps)),
            offsets: Array2::zeros((rows, numsteps)),
            stderrs: Array2::zeros((rows, numsteps)),
            trialactivities: Array1::zeros(rows),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.coefficients.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.nrows() == 0
    }
}

/// Lag coefficients of an activity ensemble.
///
/// `coefficients`, `offsets` and `stderrs` are indexed like `steps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientResult {
    /// Ascending, contiguous lags.
    pub steps: Array1<usize>,
    /// Regression slope `r_k` per step.
    pub coefficients: Array1<f64>,
    /// Regression intercept per step.
    pub offsets: Array1<f64>,
    /// Standard error per step; see [`CoefficientMethod`] for its meaning.
    pub stderrs: Array1<f64>,
    /// Mean activity of every input trial.
    pub trialactivities: Array1<f64>,
    /// Per-trial (or per-resample) coefficients.
    pub samples: Option<CoefficientSamples>,
    /// Strategy that produced this result.
    pub method: CoefficientMethod,
}

impl CoefficientResult {
    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Bessel-corrected standard deviation of the sample coefficients per
    /// step, e.g. the bootstrap error of a stationary-mean estimate.
    ///
    /// `None` without samples or with fewer than two sample rows.
    pub fn sample_spread(&self) -> Option<Array1<f64>> {
        let samples = self.samples.as_ref()?;
        if samples.len() < 2 {
            return None;
        }
        Some(samples.coefficients.std_axis(Axis(0), 1.0))
    }

    /// Steps as floating point lags, the abscissa of a fit.
    pub fn steps_f64(&self) -> Array1<f64> {
        self.steps.mapv(|k| k as f64)
    }
}

impl fmt::Display for CoefficientResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Coefficient Result ({}):", self.method)?;
        if self.is_empty() {
            writeln!(f, "  Steps: none")?;
        } else {
            writeln!(
                f,
                "  Steps: {}..={} ({})",
                self.steps[0],
                self.steps[self.len() - 1],
                self.len()
            )?;
        }
        writeln!(f, "  Trials: {}", self.trialactivities.len())?;
        if let Some(mean) = self.trialactivities.mean() {
            writeln!(f, "  Mean activity: {:.4}", mean)?;
        }
        if let Some(&first) = self.coefficients.get(0) {
            writeln!(f, "  First coefficient: {:.6}", first)?;
        }
        if let Some(samples) = &self.samples {
            writeln!(f, "  Samples: {}", samples.len())?;
        }
        Ok(())
    }
}

/// Estimate lag coefficients of an activity ensemble.
///
/// `data` holds one trial per row. A one-dimensional array is treated as a
/// single trial. Step bounds that do not fit the data are corrected with a
/// warning: `minstep < 1` or `minstep > maxstep` resets `minstep` to 1 and
/// `maxstep` is clamped to `datalength - 2`.
///
/// # Errors
///
/// * `Shape` if `data` has more than two dimensions
/// * `InvalidInput` if there is no trial or fewer than three time points
/// * `DegenerateData` if no step has a defined regression, e.g. a trial
///   without any activity
///
/// A step whose regressor is constant, typically one of the last few lags of
/// integer-valued activity, is reported with NaN coefficient, offset and
/// error instead of failing the whole estimation.
pub fn correlation_coefficients<S, D>(
    data: &ArrayBase<S, D>,
    config: &CoefficientConfig,
) -> Result<CoefficientResult>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let data = as_trials(data)?;
    let (numtrials, datalength) = data.dim();
    if numtrials == 0 || datalength == 0 {
        return Err(MreError::InvalidInput(format!(
            "activity must contain at least one trial with data, got shape ({}, {})",
            numtrials, datalength
        )));
    }
    if datalength < 3 {
        return Err(MreError::InvalidInput(format!(
            "activity needs at least 3 time points for any lag, got {}",
            datalength
        )));
    }

    let (minstep, maxstep) = resolve_steps(config.minstep, config.maxstep, datalength);
    let steps: Array1<usize> = (minstep..=maxstep).collect();

    info!(
        method = %config.method,
        numtrials,
        datalength,
        minstep,
        maxstep,
        "Estimating lag coefficients"
    );

    let trialactivities = data.map_axis(Axis(1), |trial| trial.sum() / datalength as f64);

    let result = match config.method {
        CoefficientMethod::TrialSeparated => {
            trial_separated(data, &steps, trialactivities)?
        }
        CoefficientMethod::StationaryMean => {
            stationary_mean(data, &steps, trialactivities, config)?
        }
    };

    if result.coefficients.iter().all(|c| c.is_nan()) {
        return Err(MreError::DegenerateData(
            "no step has a defined regression, the activity is constant".to_string(),
        ));
    }

    info!(
        numsteps = result.len(),
        first = result.coefficients.get(0).copied().unwrap_or(f64::NAN),
        "Lag coefficients estimated"
    );

    Ok(result)
}

/// View the input as `trials x time`.
fn as_trials<S, D>(data: &ArrayBase<S, D>) -> Result<ArrayView2<'_, f64>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let view = data.view().into_dyn();
    match view.ndim() {
        1 => {
            warn!("One-dimensional activity given, treating it as a single trial");
            Ok(view.into_dimensionality::<Ix1>()?.insert_axis(Axis(0)))
        }
        2 => Ok(view.into_dimensionality::<Ix2>()?),
        n => Err(MreError::Shape(format!(
            "activity must be one- or two-dimensional, got {} dimensions",
            n
        ))),
    }
}

/// Correct the requested step range so that every lag leaves a non-empty
/// pair of slices. Requires `datalength >= 3`.
pub(crate) fn resolve_steps(minstep: usize, maxstep: usize, datalength: usize) -> (usize, usize) {
    let mut minstep = minstep;
    let mut maxstep = maxstep;

    if minstep < 1 {
        warn!(minstep, "minstep < 1, resetting it to 1");
        minstep = 1;
    }
    if minstep > maxstep {
        warn!(minstep, maxstep, "minstep > maxstep, resetting minstep to 1");
        minstep = 1;
    }
    let limit = datalength - 2;
    if maxstep > limit {
        warn!(maxstep, limit, "maxstep exceeds data length, clamping it");
        maxstep = limit;
    }
    if minstep > maxstep {
        warn!(minstep, maxstep, "minstep > maxstep after clamping, resetting minstep to 1");
        minstep = 1;
    }

    (minstep, maxstep)
}

/// Regression of a single lag. `None` when the regressor is constant, which
/// happens at the short tail lags of integer-valued activity.
fn regress_lag(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<Option<LinearRegression>> {
    match LinearRegression::fit(x, y) {
        Ok(lr) => Ok(Some(lr)),
        Err(MreError::DegenerateData(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Regress `trial[k..]` on `trial[..len-k]` for every step.
///
/// Returns the steps whose regression is undefined; their entries are NaN.
fn regress_trial(
    trial: ArrayView1<f64>,
    steps: &Array1<usize>,
    samples: &mut CoefficientSamples,
    row: usize,
) -> Result<Vec<usize>> {
    let len = trial.len();
    let mut undefined = Vec::new();
    for (idx, &step) in steps.iter().enumerate() {
        let lr = match regress_lag(trial.slice(s![..len - step]), trial.slice(s![step..]))? {
            Some(lr) => lr,
            None => {
                undefined.push(step);
                LinearRegression::UNDEFINED
            }
        };
        samples.coefficients[[row, idx]] = lr.slope;
        samples.offsets[[row, idx]] = lr.intercept;
        samples.stderrs[[row, idx]] = lr.stderr;
    }
    Ok(undefined)
}

fn warn_undefined(undefined: &[usize], context: &str) {
    if let Some(&first) = undefined.first() {
        warn!(
            count = undefined.len(),
            first,
            context,
            "Constant regressor, leaving the coefficients of these steps undefined"
        );
    }
}

fn separate_trials(
    data: ArrayView2<f64>,
    steps: &Array1<usize>,
    trialactivities: &Array1<f64>,
) -> Result<CoefficientSamples> {
    let numtrials = data.nrows();
    let mut samples = CoefficientSamples::zeros(numtrials, steps.len());
    samples.trialactivities.assign(trialactivities);

    for (tdx, trial) in data.outer_iter().enumerate() {
        debug!(
            trial = tdx + 1,
            numtrials,
            activity = trialactivities[tdx],
            "Regressing trial"
        );
        let undefined = regress_trial(trial, steps, &mut samples, tdx)?;
        warn_undefined(&undefined, &format!("trial {}", tdx + 1));
    }

    Ok(samples)
}

fn trial_separated(
    data: ArrayView2<f64>,
    steps: &Array1<usize>,
    trialactivities: Array1<f64>,
) -> Result<CoefficientResult> {
    let numtrials = data.nrows();
    let samples = separate_trials(data, steps, &trialactivities)?;

    let stderrs = if numtrials == 1 {
        warn!("Only one trial given, using the regression errors of that trial");
        samples.stderrs.row(0).to_owned()
    } else {
        if numtrials < MIN_RELIABLE_TRIALS {
            warn!(
                numtrials,
                "Few trials given, the error estimate from the spread of trials is weak; \
                 per-trial regression errors are available in the samples"
            );
        }
        samples.coefficients.std_axis(Axis(0), 1.0)
    };

    let coefficients = mean_over_rows(&samples.coefficients)?;
    let offsets = mean_over_rows(&samples.offsets)?;

    Ok(CoefficientResult {
        steps: steps.clone(),
        coefficients,
        offsets,
        stderrs,
        trialactivities,
        samples: Some(samples),
        method: CoefficientMethod::TrialSeparated,
    })
}

fn stationary_mean(
    data: ArrayView2<f64>,
    steps: &Array1<usize>,
    trialactivities: Array1<f64>,
    config: &CoefficientConfig,
) -> Result<CoefficientResult> {
    let numtrials = data.nrows();
    let numsteps = steps.len();
    let originals: Vec<usize> = (0..numtrials).collect();

    let mut coefficients = Array1::zeros(numsteps);
    let mut offsets = Array1::zeros(numsteps);
    let mut stderrs = Array1::zeros(numsteps);
    let mut undefined = Vec::new();
    for (idx, &step) in steps.iter().enumerate() {
        let lr = match pooled_regression(data, &trialactivities, &originals, step)? {
            Some(lr) => lr,
            None => {
                undefined.push(step);
                LinearRegression::UNDEFINED
            }
        };
        coefficients[idx] = lr.slope;
        offsets[idx] = lr.intercept;
        stderrs[idx] = lr.stderr;
    }
    warn_undefined(&undefined, "pooled trials");

    let resample = config.bootstrap && numtrials > 1 && config.numboot > 0;
    if config.bootstrap && !resample {
        warn!(
            numtrials,
            numboot = config.numboot,
            "Bootstrapping needs more than one trial and at least one resample, \
             keeping trial-separated samples instead"
        );
    }

    let samples = if resample {
        bootstrap(data, steps, &trialactivities, config)?
    } else {
        separate_trials(data, steps, &trialactivities)?
    };

    Ok(CoefficientResult {
        steps: steps.clone(),
        coefficients,
        offsets,
        stderrs,
        trialactivities,
        samples: Some(samples),
        method: CoefficientMethod::StationaryMean,
    })
}

/// One regression per step over all listed trials, each centred on its own
/// mean activity. Trials may be listed more than once.
fn pooled_regression(
    data: ArrayView2<f64>,
    trialactivities: &Array1<f64>,
    trials: &[usize],
    step: usize,
) -> Result<Option<LinearRegression>> {
    let len = data.ncols() - step;
    let mut x = Array1::zeros(trials.len() * len);
    let mut y = Array1::zeros(trials.len() * len);

    for (n, &tdx) in trials.iter().enumerate() {
        let trial = data.row(tdx);
        let mean = trialactivities[tdx];
        let block = s![n * len..(n + 1) * len];
        x.slice_mut(block)
            .assign(&trial.slice(s![..len]).mapv(|v| v - mean));
        y.slice_mut(block)
            .assign(&trial.slice(s![step..]).mapv(|v| v - mean));
    }

    regress_lag(x.view(), y.view())
}

fn bootstrap(
    data: ArrayView2<f64>,
    steps: &Array1<usize>,
    trialactivities: &Array1<f64>,
    config: &CoefficientConfig,
) -> Result<CoefficientSamples> {
    let numtrials = data.nrows();
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    debug!(numboot = config.numboot, seed = ?config.seed, "Bootstrapping trials");

    let mut samples = CoefficientSamples::zeros(config.numboot, steps.len());
    let mut undefined = Vec::new();
    for b in 0..config.numboot {
        let chosen: Vec<usize> = (0..numtrials).map(|_| rng.gen_range(0..numtrials)).collect();
        samples.trialactivities[b] =
            chosen.iter().map(|&tdx| trialactivities[tdx]).sum::<f64>() / numtrials as f64;

        for (idx, &step) in steps.iter().enumerate() {
            let lr = match pooled_regression(data, trialactivities, &chosen, step)? {
                Some(lr) => lr,
                None => {
                    undefined.push(step);
                    LinearRegression::UNDEFINED
                }
            };
            samples.coefficients[[b, idx]] = lr.slope;
            samples.offsets[[b, idx]] = lr.intercept;
            samples.stderrs[[b, idx]] = lr.stderr;
        }
    }
    warn_undefined(&undefined, "bootstrap resamples");

    Ok(samples)
}

fn mean_over_rows(values: &Array2<f64>) -> Result<Array1<f64>> {
    values
        .mean_axis(Axis(0))
        .ok_or_else(|| MreError::InvalidInput("cannot average over zero trials".to_string()))
}
