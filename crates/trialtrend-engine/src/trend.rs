//! Linear and log-linear growth trends over yearly totals.
//!
//! Both fits are ordinary least squares with the year as the independent
//! variable. The linear fit reports studies per year; the log-linear fit
//! regresses `ln(count)` and converts its slope into an annual percentage
//! change (APC).
//!
//! Series with fewer than two distinct years yield
//! [`TrendFit::InsufficientData`] rather than a line. Years with a zero count
//! have no logarithm: they stay in the linear fit and are left out of the
//! log-linear fit only, listed in [`LogLinearFit::excluded_years`].

use std::collections::BTreeMap;

use tracing::debug;
use trialtrend_core::IntegrityError;

use crate::special::student_t_two_sided;

/// Guards the t statistic against division by zero when |r| = 1.
const TINY: f64 = 1.0e-20;

/// Outcome of a trend fit.
#[derive(Debug, Clone, PartialEq)]
pub enum TrendFit<T> {
    Fitted(T),
    /// Fewer than two distinct years were available. `points` is how many
    /// distinct years there were.
    InsufficientData { points: usize },
}

impl<T> TrendFit<T> {
    pub fn fitted(&self) -> Option<&T> {
        match self {
            Self::Fitted(fit) => Some(fit),
            Self::InsufficientData { .. } => None,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

/// Least-squares line `y = slope * year + intercept`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient.
    pub r: f64,
    /// Two-sided p-value for a zero slope (Student's t, n - 2 df).
    pub p_value: f64,
    /// Standard error of the slope.
    pub std_err: f64,
    /// Number of points fitted.
    pub n: usize,
}

impl LinearFit {
    pub fn predict(&self, year: f64) -> f64 {
        self.slope * year + self.intercept
    }

    /// Fitted values at each year, for overlaying on the counts.
    pub fn trend_line(&self, years: &[i32]) -> Vec<(i32, f64)> {
        years
            .iter()
            .map(|&year| (year, self.predict(f64::from(year))))
            .collect()
    }
}

/// Least-squares line on `ln(count)`, with its growth rate.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLinearFit {
    /// Statistics on the log scale.
    pub fit: LinearFit,
    /// Annual percentage change: `(exp(slope) - 1) * 100`.
    pub apc: f64,
    /// Years left out because their count was not positive.
    pub excluded_years: Vec<i32>,
}

impl LogLinearFit {
    /// Fitted count at `year` back on the count scale.
    pub fn predict(&self, year: f64) -> f64 {
        self.fit.predict(year).exp()
    }
}

/// Linear and log-linear fits of one yearly series.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendResult {
    pub linear: TrendFit<LinearFit>,
    pub log_linear: TrendFit<LogLinearFit>,
}

/// `(year, count)` points from per-year totals, in year order.
pub fn series_points(totals: &BTreeMap<i32, u64>) -> Vec<(f64, f64)> {
    totals
        .iter()
        .map(|(&year, &count)| (f64::from(year), count as f64))
        .collect()
}

/// Fit both trends to per-year totals.
pub fn fit_trend(totals: &BTreeMap<i32, u64>) -> Result<TrendResult, IntegrityError> {
    let points = series_points(totals);
    Ok(TrendResult {
        linear: fit_linear(&points)?,
        log_linear: fit_log_linear(&points)?,
    })
}

/// Ordinary least squares of count against year.
pub fn fit_linear(points: &[(f64, f64)]) -> Result<TrendFit<LinearFit>, IntegrityError> {
    validate(points)?;
    let distinct = distinct_years(points);
    if distinct < 2 {
        debug!(points = distinct, "linear fit: insufficient data");
        return Ok(TrendFit::InsufficientData { points: distinct });
    }
    let fit = least_squares(points);
    debug!(n = fit.n, slope = fit.slope, r = fit.r, "linear fit");
    Ok(TrendFit::Fitted(fit))
}

/// Ordinary least squares of `ln(count)` against year, over positive counts.
pub fn fit_log_linear(points: &[(f64, f64)]) -> Result<TrendFit<LogLinearFit>, IntegrityError> {
    validate(points)?;

    let (positive, excluded): (Vec<(f64, f64)>, Vec<(f64, f64)>) =
        points.iter().partition(|&&(_, count)| count > 0.0);
    // Finite after validation; years are whole numbers.
    let excluded_years: Vec<i32> = excluded.into_iter().map(|(year, _)| year as i32).collect();
    if !excluded_years.is_empty() {
        debug!(
            excluded = ?excluded_years,
            "log-linear fit: leaving out years without a positive count"
        );
    }

    let distinct = distinct_years(&positive);
    if distinct < 2 {
        debug!(points = distinct, "log-linear fit: insufficient data");
        return Ok(TrendFit::InsufficientData { points: distinct });
    }

    let logged: Vec<(f64, f64)> = positive
        .into_iter()
        .map(|(year, count)| (year, count.ln()))
        .collect();
    let fit = least_squares(&logged);
    let apc = (fit.slope.exp() - 1.0) * 100.0;
    debug!(n = fit.n, slope = fit.slope, apc, "log-linear fit");

    Ok(TrendFit::Fitted(LogLinearFit {
        fit,
        apc,
        excluded_years,
    }))
}

/// Reject non-finite years or counts; a NaN would poison every statistic.
fn validate(points: &[(f64, f64)]) -> Result<(), IntegrityError> {
    for (index, &(year, count)) in points.iter().enumerate() {
        if !year.is_finite() {
            return Err(IntegrityError::NonFiniteYear { index, value: year });
        }
        if !count.is_finite() {
            return Err(IntegrityError::NonFiniteCount { year, value: count });
        }
    }
    Ok(())
}

fn distinct_years(points: &[(f64, f64)]) -> usize {
    let mut years: Vec<f64> = points.iter().map(|&(year, _)| year).collect();
    years.sort_by(f64::total_cmp);
    years.dedup();
    years.len()
}

/// Requires at least two distinct x values.
fn least_squares(points: &[(f64, f64)]) -> LinearFit {
    let n = points.len() as f64;
    let x_mean = points.iter().map(|p| p.0).sum::<f64>() / n;
    let y_mean = points.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for &(x, y) in points {
        let (dx, dy) = (x - x_mean, y - y_mean);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r = if sxx == 0.0 || syy == 0.0 {
        0.0
    } else {
        (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
    };

    let (p_value, std_err) = if points.len() == 2 {
        // Two points always lie on the line: no residual spread to test against.
        let p = if points[0].1 == points[1].1 { 1.0 } else { 0.0 };
        (p, 0.0)
    } else {
        let df = n - 2.0;
        let t = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();
        let p = student_t_two_sided(t, df);
        let se = ((1.0 - r * r) * syy / sxx / df).sqrt();
        (p, se)
    };

    LinearFit {
        slope,
        intercept,
        r,
        p_value,
        std_err,
        n: points.len(),
    }
}
