//! Performance metrics calculator.
//!
//! Derives return, risk, drawdown, and benchmark-relative statistics from a
//! portfolio value series. Metrics that are undefined under degenerate but
//! valid input (zero variance, short history) report `None` rather than
//! failing, so a report is always producible for any valid simulation run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{DEFAULT_ROLLING_WINDOW, RISK_FREE_RATE, TRADING_DAYS_PER_YEAR};
use crate::data::ValueSeries;

use super::rolling::rolling_return;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("need at least 2 value points, got {points}")]
    InsufficientHistory { points: usize },

    #[error("growth rate undefined for negative value ratio {ratio}")]
    NegativeValueRatio { ratio: f64 },

    #[error("portfolio and benchmark share only {overlap} dates")]
    BenchmarkOverlap { overlap: usize },
}

/// Tunables for the calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Annual risk-free rate for Sharpe and alpha.
    pub risk_free_rate: f64,

    /// Trading days per year used for annualization.
    pub trading_days_per_year: usize,

    /// Window for rolling statistics, in trading days.
    pub rolling_window: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: RISK_FREE_RATE,
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
            rolling_window: DEFAULT_ROLLING_WINDOW,
        }
    }
}

/// Flat statistics report over a value series.
///
/// Undefined metrics serialize as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    // Return metrics
    pub total_return: f64,
    pub cagr: f64,
    pub annualized_return: f64,
    pub best_year: Option<f64>,
    pub worst_year: Option<f64>,
    pub total_days: usize,
    pub years: f64,

    // Risk metrics
    pub volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,

    // Drawdown metrics
    pub max_drawdown: f64,
    pub max_drawdown_date: Option<NaiveDate>,
    pub drawdown_days: usize,
    pub drawdown_start: Option<NaiveDate>,
    pub drawdown_end: Option<NaiveDate>,

    // Benchmark-relative metrics (absent without a benchmark)
    pub beta: Option<f64>,
    pub alpha: Option<f64>,
    pub tracking_error: Option<f64>,
    pub information_ratio: Option<f64>,
}

/// Metrics calculator. Never mutates its input series.
pub struct MetricsCalculator {
    config: MetricsConfig,
}

impl MetricsCalculator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Compute the full report, optionally relative to a benchmark series.
    pub fn analyze(
        &self,
        values: &ValueSeries,
        benchmark: Option<&ValueSeries>,
    ) -> Result<MetricsReport, MetricsError> {
        if values.len() < 2 {
            return Err(MetricsError::InsufficientHistory {
                points: values.len(),
            });
        }

        let vals = values.values_f64();
        let returns = daily_returns(&vals);
        let tdpy = self.config.trading_days_per_year as f64;

        // Return metrics
        let ratio = vals[vals.len() - 1] / vals[0];
        if ratio < 0.0 {
            return Err(MetricsError::NegativeValueRatio { ratio });
        }
        let total_return = ratio - 1.0;
        let years = vals.len() as f64 / tdpy;
        let cagr = ratio.powf(1.0 / years) - 1.0;
        let annualized_return = mean(&returns) * tdpy;
        let (best_year, worst_year) =
            rolling_extrema(values, self.config.trading_days_per_year);

        // Risk metrics
        let std = sample_std(&returns);
        let volatility = std.map(|s| s * tdpy.sqrt());
        let sharpe_ratio = match std {
            Some(s) if s > 0.0 => {
                let daily_rf = self.config.risk_free_rate / tdpy;
                Some((mean(&returns) - daily_rf) / s * tdpy.sqrt())
            }
            _ => None,
        };

        // Drawdown metrics
        let drawdown = drawdown_stats(values);

        // Benchmark-relative metrics
        let relative = match benchmark {
            Some(bench) => self.relative_stats(values, bench)?,
            None => RelativeStats::default(),
        };

        Ok(MetricsReport {
            total_return,
            cagr,
            annualized_return,
            best_year,
            worst_year,
            total_days: values.len(),
            years,
            volatility,
            sharpe_ratio,
            max_drawdown: drawdown.max_drawdown,
            max_drawdown_date: drawdown.max_drawdown_date,
            drawdown_days: drawdown.drawdown_days,
            drawdown_start: drawdown.drawdown_start,
            drawdown_end: drawdown.drawdown_end,
            beta: relative.beta,
            alpha: relative.alpha,
            tracking_error: relative.tracking_error,
            information_ratio: relative.information_ratio,
        })
    }

    /// Rolling return over the configured window.
    pub fn rolling_return<'a>(
        &self,
        values: &'a ValueSeries,
    ) -> impl Iterator<Item = (NaiveDate, f64)> + 'a {
        rolling_return(values, self.config.rolling_window)
    }

    /// Rolling annualized volatility over the configured window.
    pub fn rolling_volatility<'a>(
        &self,
        values: &'a ValueSeries,
    ) -> impl Iterator<Item = (NaiveDate, f64)> + 'a {
        super::rolling::rolling_volatility(
            values,
            self.config.rolling_window,
            self.config.trading_days_per_year,
        )
    }

    /// Benchmark-relative statistics over the date intersection of the two
    /// series.
    fn relative_stats(
        &self,
        values: &ValueSeries,
        benchmark: &ValueSeries,
    ) -> Result<RelativeStats, MetricsError> {
        let (portfolio, bench) = align_by_date(values, benchmark);
        if portfolio.len() < 3 {
            return Err(MetricsError::BenchmarkOverlap {
                overlap: portfolio.len(),
            });
        }

        let tdpy = self.config.trading_days_per_year as f64;
        let rf = self.config.risk_free_rate;
        let portfolio_returns = daily_returns(&portfolio);
        let bench_returns = daily_returns(&bench);

        let beta = match (sample_var(&bench_returns), sample_cov(&portfolio_returns, &bench_returns))
        {
            (Some(var), Some(cov)) if var > 0.0 => Some(cov / var),
            _ => None,
        };

        let portfolio_annual = mean(&portfolio_returns) * tdpy;
        let bench_annual = mean(&bench_returns) * tdpy;
        let alpha = beta.map(|b| portfolio_annual - (rf + b * (bench_annual - rf)));

        let excess: Vec<f64> = portfolio_returns
            .iter()
            .zip(&bench_returns)
            .map(|(p, b)| p - b)
            .collect();
        let excess_std = sample_std(&excess);
        let tracking_error = excess_std.map(|s| s * tdpy.sqrt());
        let information_ratio = match excess_std {
            Some(s) if s > 0.0 => Some(mean(&excess) / s * tdpy.sqrt()),
            _ => None,
        };

        Ok(RelativeStats {
            beta,
            alpha,
            tracking_error,
            information_ratio,
        })
    }
}

#[derive(Debug, Default)]
struct RelativeStats {
    beta: Option<f64>,
    alpha: Option<f64>,
    tracking_error: Option<f64>,
    information_ratio: Option<f64>,
}

#[derive(Debug)]
struct DrawdownStats {
    max_drawdown: f64,
    max_drawdown_date: Option<NaiveDate>,
    drawdown_days: usize,
    drawdown_start: Option<NaiveDate>,
    drawdown_end: Option<NaiveDate>,
}

/// Daily simple returns: `value[t] / value[t-1] - 1`.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| {
            if pair[0] == 0.0 {
                0.0
            } else {
                pair[1] / pair[0] - 1.0
            }
        })
        .collect()
}

pub(crate) fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample variance (ddof = 1). `None` for fewer than two observations.
pub(crate) fn sample_var(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs);
    let sum_sq: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    Some(sum_sq / (xs.len() - 1) as f64)
}

/// Sample standard deviation (ddof = 1).
pub(crate) fn sample_std(xs: &[f64]) -> Option<f64> {
    sample_var(xs).map(f64::sqrt)
}

/// Sample covariance (ddof = 1) of two equal-length slices.
pub(crate) fn sample_cov(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let sum: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - mx) * (y - my))
        .sum();
    Some(sum / (xs.len() - 1) as f64)
}

/// Extrema of the trailing one-year return series. `None` until more than a
/// year of history exists.
fn rolling_extrema(values: &ValueSeries, window: usize) -> (Option<f64>, Option<f64>) {
    let mut best: Option<f64> = None;
    let mut worst: Option<f64> = None;
    for (_, ret) in rolling_return(values, window) {
        best = Some(best.map_or(ret, |b: f64| b.max(ret)));
        worst = Some(worst.map_or(ret, |w: f64| w.min(ret)));
    }
    (best, worst)
}

/// Running-peak drawdown scan: depth and date of the deepest drawdown, plus
/// the longest contiguous run of negative-drawdown days.
fn drawdown_stats(values: &ValueSeries) -> DrawdownStats {
    let points = values.points();
    let vals = values.values_f64();

    let mut peak = vals[0];
    let mut max_drawdown = 0.0;
    let mut max_drawdown_date = None;
    let mut run_start: Option<usize> = None;
    let mut longest_run: Option<(usize, usize)> = None;

    for (i, &value) in vals.iter().enumerate() {
        if value > peak {
            peak = value;
        }
        let drawdown = if peak > 0.0 { value / peak - 1.0 } else { 0.0 };

        if drawdown < max_drawdown {
            max_drawdown = drawdown;
            max_drawdown_date = Some(points[i].date);
        }

        if drawdown < 0.0 {
            let start = match run_start {
                Some(start) => start,
                None => {
                    run_start = Some(i);
                    i
                }
            };
            let length = i - start + 1;
            let longest = longest_run.map_or(0, |(s, e)| e - s + 1);
            if length > longest {
                longest_run = Some((start, i));
            }
        } else {
            run_start = None;
        }
    }

    let (drawdown_days, drawdown_start, drawdown_end) = match longest_run {
        Some((start, end)) => (
            end - start + 1,
            Some(points[start].date),
            Some(points[end].date),
        ),
        None => (0, None, None),
    };

    DrawdownStats {
        max_drawdown,
        max_drawdown_date,
        drawdown_days,
        drawdown_start,
        drawdown_end,
    }
}

/// Intersect two series by date, returning parallel f64 value vectors.
fn align_by_date(a: &ValueSeries, b: &ValueSeries) -> (Vec<f64>, Vec<f64>) {
    let a_points = a.points();
    let b_points = b.points();
    let mut av = Vec::new();
    let mut bv = Vec::new();

    let (mut i, mut j) = (0, 0);
    while i < a_points.len() && j < b_points.len() {
        match a_points[i].date.cmp(&b_points[j].date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                av.push(a_points[i].value.try_into().unwrap_or(0.0));
                bv.push(b_points[j].value.try_into().unwrap_or(0.0));
                i += 1;
                j += 1;
            }
        }
    }
    (av, bv)
}
