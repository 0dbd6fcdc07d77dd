//! Ordinary least-squares regression of one series on another.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::error::{MreError, Result};

/// Result of a simple linear regression `y = slope·x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient, clipped to `[-1, 1]`.
    pub rvalue: f64,
    /// Standard error of the slope.
    pub stderr: f64,
}

impl LinearRegression {
    /// Entry for a lag whose regression is undefined.
    pub const UNDEFINED: Self = Self {
        slope: f64::NAN,
        intercept: f64::NAN,
        rvalue: f64::NAN,
        stderr: f64::NAN,
    };

    /// Fit `y` against `x`.
    ///
    /// Deviations are taken around the sample means in a second pass so large
    /// activity levels do not cancel out the variance. The slope standard error
    /// is `sqrt((1 − r²)·s_yy / s_xx / (n − 2))`, and exactly zero for two
    /// points.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` if `x` and `y` differ in length
    /// * `InvalidInput` for fewer than two points
    /// * `DegenerateData` if all `x` values are identical
    pub fn fit(x: ArrayView1<f64>, y: ArrayView1<f64>) -> Result<Self> {
        let n = x.len();
        if n != y.len() {
            return Err(MreError::DimensionMismatch(format!(
                "regression inputs differ in length ({} vs {})",
                n,
                y.len()
            )));
        }
        if n < 2 {
            return Err(MreError::InvalidInput(format!(
                "regression needs at least 2 points, got {}",
                n
            )));
        }

        let nf = n as f64;
        let xmean = x.sum() / nf;
        let ymean = y.sum() / nf;

        let (mut ssxm, mut ssym, mut ssxym) = (0.0, 0.0, 0.0);
        for (&xi, &yi) in x.iter().zip(y.iter()) {
            let dx = xi - xmean;
            let dy = yi - ymean;
            ssxm += dx * dx;
            ssym += dy * dy;
            ssxym += dx * dy;
        }
        ssxm /= nf;
        ssym /= nf;
        ssxym /= nf;

        if ssxm == 0.0 {
            return Err(MreError::DegenerateData(
                "cannot regress on a series whose values are all identical".to_string(),
            ));
        }

        let denom = (ssxm * ssym).sqrt();
        let rvalue = if denom == 0.0 {
            0.0
        } else {
            (ssxym / denom).clamp(-1.0, 1.0)
        };

        let slope = ssxym / ssxm;
        let intercept = ymean - slope * xmean;

        let stderr = if n == 2 {
            0.0
        } else {
            let df = nf - 2.0;
            ((1.0 - rvalue * rvalue) * ssym / ssxm / df).sqrt()
        };

        Ok(Self {
            slope,
            intercept,
            rvalue,
            stderr,
        })
    }
}
