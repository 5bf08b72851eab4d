//! CSV price loader.
//!
//! Loads a close-price table into the type system for simulation. The file
//! has a `date` column (YYYY-MM-DD) plus one numeric close-price column per
//! symbol — the shape the external price supplier caches to disk. Missing
//! cells are an error; this layer never patches data.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use super::types::{DataError, PriceTable};

/// Name of the date column.
pub const DATE_COLUMN: &str = "date";

/// Expected date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unparseable date {value:?} at row {row}")]
    InvalidDate { row: usize, value: String },

    #[error("Missing value for {symbol} at row {row}")]
    MissingValue { symbol: String, row: usize },

    #[error("Unrepresentable price {value} for {symbol} at row {row}")]
    InvalidPrice {
        symbol: String,
        row: usize,
        value: f64,
    },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads close-price CSV files into validated [`PriceTable`]s.
pub struct PriceCsvLoader {
    path: PathBuf,
}

impl PriceCsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the requested symbol columns into a price table.
    pub fn load(&self, symbols: &[String]) -> Result<PriceTable, LoaderError> {
        if !Path::new(&self.path).exists() {
            return Err(LoaderError::FileNotFound(
                self.path.display().to_string(),
            ));
        }

        let df = CsvReader::from_path(&self.path)?
            .has_header(true)
            .finish()?;

        let dates = parse_dates(&df)?;
        let mut columns = BTreeMap::new();
        for symbol in symbols {
            columns.insert(symbol.clone(), parse_prices(&df, symbol)?);
        }

        info!(
            path = %self.path.display(),
            rows = dates.len(),
            symbols = symbols.len(),
            "loaded price table"
        );

        Ok(PriceTable::new(dates, columns)?)
    }
}

fn parse_dates(df: &DataFrame) -> Result<Vec<NaiveDate>, LoaderError> {
    let column = df
        .column(DATE_COLUMN)
        .map_err(|_| LoaderError::MissingColumn(DATE_COLUMN.to_string()))?;
    let strings = column.str().map_err(|_| {
        LoaderError::InvalidData(format!("{} column has unexpected type", DATE_COLUMN))
    })?;

    let mut dates = Vec::with_capacity(strings.len());
    for (row, value) in strings.into_iter().enumerate() {
        let raw = value.ok_or_else(|| LoaderError::InvalidDate {
            row,
            value: String::new(),
        })?;
        let date =
            NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| LoaderError::InvalidDate {
                row,
                value: raw.to_string(),
            })?;
        dates.push(date);
    }
    Ok(dates)
}

fn parse_prices(df: &DataFrame, symbol: &str) -> Result<Vec<Decimal>, LoaderError> {
    let column = df
        .column(symbol)
        .map_err(|_| LoaderError::MissingColumn(symbol.to_string()))?;
    let casted = column.cast(&DataType::Float64)?;
    let floats = casted.f64()?;

    let mut prices = Vec::with_capacity(floats.len());
    for (row, value) in floats.into_iter().enumerate() {
        let raw = value.ok_or_else(|| LoaderError::MissingValue {
            symbol: symbol.to_string(),
            row,
        })?;
        let price = Decimal::try_from(raw).map_err(|_| LoaderError::InvalidPrice {
            symbol: symbol.to_string(),
            row,
            value: raw,
        })?;
        prices.push(price);
    }
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_csv(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("folio-backtest-{}-{}.csv", std::process::id(), name));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_basic_table() {
        let path = write_csv(
            "basic",
            "date,SPY,AGG\n2020-01-02,300.5,110.0\n2020-01-03,301.25,109.5\n",
        );
        let loader = PriceCsvLoader::new(&path);
        let table = loader
            .load(&["SPY".to_string(), "AGG".to_string()])
            .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.close("SPY", 0), Some(dec!(300.5)));
        assert_eq!(table.close("AGG", 1), Some(dec!(109.5)));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_missing_symbol_column() {
        let path = write_csv("missing-col", "date,SPY\n2020-01-02,300.5\n");
        let loader = PriceCsvLoader::new(&path);
        let err = loader.load(&["QQQ".to_string()]).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn(s) if s == "QQQ"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_rejects_null_cell() {
        let path = write_csv(
            "null-cell",
            "date,SPY\n2020-01-02,300.5\n2020-01-03,\n",
        );
        let loader = PriceCsvLoader::new(&path);
        let err = loader.load(&["SPY".to_string()]).unwrap_err();
        assert!(matches!(err, LoaderError::MissingValue { row: 1, .. }));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let loader = PriceCsvLoader::new("/nonexistent/prices.csv");
        assert!(matches!(
            loader.load(&["SPY".to_string()]),
            Err(LoaderError::FileNotFound(_))
        ));
    }
}
