//! Configuration constants and defaults.
//!
//! Central place for the tunables shared by the simulation and metrics
//! engines, plus the supported ETF universe.

use chrono::NaiveDate;

/// Trading days per calendar year used for annualization.
pub const TRADING_DAYS_PER_YEAR: usize = 252;

/// Annual risk-free rate used by Sharpe and alpha calculations.
pub const RISK_FREE_RATE: f64 = 0.02;

/// Default initial investment in dollars.
pub const DEFAULT_INITIAL_INVESTMENT: i64 = 10_000;

/// Default periodic contribution in dollars.
pub const DEFAULT_CONTRIBUTION: i64 = 500;

/// Default rolling-statistics window in trading days.
pub const DEFAULT_ROLLING_WINDOW: usize = 252;

/// Supported ETF universe with display names.
pub const SUPPORTED_ETFS: &[(&str, &str)] = &[
    ("AGG", "iShares Core US Aggregate Bond ETF"),
    ("BND", "Vanguard Total Bond Market ETF"),
    ("BNDX", "Vanguard Total International Bond ETF"),
    ("EEM", "iShares MSCI Emerging Markets ETF"),
    ("GLD", "SPDR Gold Trust"),
    ("IWM", "iShares Russell 2000 ETF"),
    ("QQQ", "Invesco QQQ Trust"),
    ("SLV", "iShares Silver Trust"),
    ("SPY", "SPDR S&P 500 ETF Trust"),
    ("TLT", "iShares 20+ Year Treasury Bond ETF"),
    ("VEA", "Vanguard FTSE Developed Markets ETF"),
    ("VGT", "Vanguard Information Technology ETF"),
    ("VIG", "Vanguard Dividend Appreciation ETF"),
    ("VNQ", "Vanguard Real Estate ETF"),
    ("VOO", "Vanguard S&P 500 ETF"),
    ("VTI", "Vanguard Total Stock Market ETF"),
    ("VWO", "Vanguard FTSE Emerging Markets ETF"),
    ("VXUS", "Vanguard Total International Stock ETF"),
    ("XLE", "SPDR S&P Energy ETF"),
    ("XLF", "SPDR S&P Financials ETF"),
];

/// Get an ETF's display name from its symbol (case-insensitive).
pub fn etf_name(symbol: &str) -> Option<&'static str> {
    let upper = symbol.to_uppercase();
    SUPPORTED_ETFS
        .iter()
        .find(|(sym, _)| *sym == upper)
        .map(|(_, name)| *name)
}

/// Earliest date the simulator accepts.
pub fn earliest_start_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1990, 1, 1)
}

/// Check that a requested simulation range is usable.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> bool {
    if start >= end {
        return false;
    }
    match earliest_start_date() {
        Some(floor) => start >= floor,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_etf_name_lookup() {
        assert_eq!(etf_name("SPY"), Some("SPDR S&P 500 ETF Trust"));
        assert_eq!(etf_name("spy"), Some("SPDR S&P 500 ETF Trust"));
        assert_eq!(etf_name("NOPE"), None);
    }

    #[test]
    fn test_date_range_validation() {
        assert!(validate_date_range(date(2000, 1, 1), date(2020, 1, 1)));
        assert!(!validate_date_range(date(2020, 1, 1), date(2020, 1, 1)));
        assert!(!validate_date_range(date(2020, 1, 2), date(2020, 1, 1)));
        assert!(!validate_date_range(date(1989, 12, 29), date(2020, 1, 1)));
    }
}
