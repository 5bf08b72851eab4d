//! Performance metrics.
//!
//! Provides the statistics suite over a portfolio value series:
//! - Return metrics (total return, CAGR, annualized return, best/worst year)
//! - Risk metrics (volatility, Sharpe ratio)
//! - Drawdown depth, date, and duration
//! - Rolling-window return and volatility
//! - Benchmark-relative metrics (beta, alpha, tracking error)

pub mod calculator;
pub mod rolling;

pub use calculator::{daily_returns, MetricsCalculator, MetricsConfig, MetricsError, MetricsReport};
pub use rolling::{rolling_return, rolling_volatility};
