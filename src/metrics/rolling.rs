//! Rolling-window statistics over a value series.
//!
//! Windows are aligned to the later date of each window; early days produce
//! no value until a full window of history exists. Both functions are lazy
//! and never materialize more than the window they are inspecting.

use chrono::NaiveDate;

use crate::data::ValueSeries;

use super::calculator::{daily_returns, sample_std};

/// Trailing `window`-day simple return at each date.
///
/// Yields `(date[t], value[t] / value[t - window] - 1)` for every `t` with a
/// full window behind it; empty when the series is no longer than the window.
pub fn rolling_return(
    series: &ValueSeries,
    window: usize,
) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
    let points = series.points();
    (0..points.len()).filter_map(move |t| {
        if window == 0 || t < window {
            return None;
        }
        let earlier: f64 = points[t - window].value.try_into().unwrap_or(0.0);
        let later: f64 = points[t].value.try_into().unwrap_or(0.0);
        if earlier == 0.0 {
            return None;
        }
        Some((points[t].date, later / earlier - 1.0))
    })
}

/// Annualized volatility of daily returns over a trailing `window` at each
/// date.
///
/// The window counts daily returns, so the first value appears once
/// `window + 1` value points exist.
pub fn rolling_volatility(
    series: &ValueSeries,
    window: usize,
    trading_days_per_year: usize,
) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
    let points = series.points();
    let returns = daily_returns(&series.values_f64());
    let annualize = (trading_days_per_year as f64).sqrt();
    (0..points.len()).filter_map(move |t| {
        if window < 2 || t < window {
            return None;
        }
        let slice = &returns[t - window..t];
        sample_std(slice).map(|s| (points[t].date, s * annualize))
    })
}
