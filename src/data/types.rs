//! Core data types for portfolio simulation.
//!
//! A [`PriceTable`] holds validated daily close prices for a set of symbols;
//! a [`ValueSeries`] is the dated portfolio-value curve a simulation run
//! produces. Both are immutable once constructed.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("table has no rows")]
    Empty,

    #[error("dates must be strictly ascending (violation at row {row})")]
    UnsortedDates { row: usize },

    #[error("column {symbol} has {len} prices for {expected} dates")]
    ColumnLength {
        symbol: String,
        len: usize,
        expected: usize,
    },

    #[error("non-positive price {price} for {symbol} on {date}")]
    NonPositivePrice {
        symbol: String,
        date: NaiveDate,
        price: Decimal,
    },

    #[error("no price column for {0}")]
    UnknownSymbol(String),

    #[error("no price for {symbol} on {date}")]
    IncompleteGrid { symbol: String, date: NaiveDate },
}

/// A single close-price observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub symbol: String,
    pub price: Decimal,
}

/// Daily close prices for a set of symbols over a contiguous date range.
///
/// Construction enforces the supplier contract: strictly ascending unique
/// dates, one price per symbol per date, all prices strictly positive.
#[derive(Debug, Clone)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<Decimal>>,
}

impl PriceTable {
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: BTreeMap<String, Vec<Decimal>>,
    ) -> Result<Self, DataError> {
        if dates.is_empty() {
            return Err(DataError::Empty);
        }
        for (row, pair) in dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(DataError::UnsortedDates { row: row + 1 });
            }
        }
        for (symbol, prices) in &columns {
            if prices.len() != dates.len() {
                return Err(DataError::ColumnLength {
                    symbol: symbol.clone(),
                    len: prices.len(),
                    expected: dates.len(),
                });
            }
            for (row, price) in prices.iter().enumerate() {
                if *price <= Decimal::ZERO {
                    return Err(DataError::NonPositivePrice {
                        symbol: symbol.clone(),
                        date: dates[row],
                        price: *price,
                    });
                }
            }
        }
        Ok(Self { dates, columns })
    }

    /// Build a table from individual price points.
    ///
    /// Every symbol must have a price on every observed date; a sparse grid
    /// is rejected rather than patched.
    pub fn from_points(points: Vec<PricePoint>) -> Result<Self, DataError> {
        let mut dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        dates.sort();
        dates.dedup();

        let mut by_key: BTreeMap<(String, NaiveDate), Decimal> = BTreeMap::new();
        for point in points {
            by_key.insert((point.symbol, point.date), point.price);
        }

        let mut symbols: Vec<String> = by_key.keys().map(|(symbol, _)| symbol.clone()).collect();
        symbols.dedup();

        let mut columns = BTreeMap::new();
        for symbol in symbols {
            let mut prices = Vec::with_capacity(dates.len());
            for date in &dates {
                match by_key.get(&(symbol.clone(), *date)) {
                    Some(price) => prices.push(*price),
                    None => {
                        return Err(DataError::IncompleteGrid {
                            symbol,
                            date: *date,
                        })
                    }
                }
            }
            columns.insert(symbol, prices);
        }

        Self::new(dates, columns)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|s| s.as_str())
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.columns.contains_key(symbol)
    }

    /// Close price for a symbol at a row index.
    pub fn close(&self, symbol: &str, row: usize) -> Option<Decimal> {
        self.columns.get(symbol)?.get(row).copied()
    }

    /// Row indices whose dates fall inside `[start, end]` inclusive.
    pub fn rows_in_range(&self, start: NaiveDate, end: NaiveDate) -> Range<usize> {
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end);
        lo..hi.max(lo)
    }

    /// Number of trading days in the table.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// A symbol's prices over `[start, end]` as a value series.
    ///
    /// This is the buy-and-hold curve used as a benchmark input.
    pub fn value_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ValueSeries, DataError> {
        let prices = self
            .columns
            .get(symbol)
            .ok_or_else(|| DataError::UnknownSymbol(symbol.to_string()))?;
        let points = self
            .rows_in_range(start, end)
            .map(|row| ValuePoint {
                date: self.dates[row],
                value: prices[row],
            })
            .collect();
        ValueSeries::new(points)
    }
}

/// One (date, total portfolio value) observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: Decimal,
}

/// Ordered portfolio-value curve, one entry per trading day.
///
/// Dates are strictly ascending; the series is created once per simulation
/// run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueSeries {
    points: Vec<ValuePoint>,
}

impl ValueSeries {
    pub fn new(points: Vec<ValuePoint>) -> Result<Self, DataError> {
        if points.is_empty() {
            return Err(DataError::Empty);
        }
        for (row, pair) in points.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(DataError::UnsortedDates { row: row + 1 });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ValuePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &ValuePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &ValuePoint {
        &self.points[self.points.len() - 1]
    }

    /// Values as f64 for statistical work.
    pub fn values_f64(&self) -> Vec<f64> {
        self.points
            .iter()
            .map(|p| p.value.try_into().unwrap_or(0.0))
            .collect()
    }
}
