//! Contribution and rebalance scheduling policies.
//!
//! Both policies are pure decision functions: given a date and the date a
//! policy last fired, they decide whether a new calendar period has started.
//! Driven with `last_fired` seeded to the first trading day, a policy fires
//! on the first trading day on/after each new period boundary.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance for the target-weight sum check.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("allocation has no symbols")]
    EmptyAllocation,

    #[error("weight for {symbol} must be positive and finite, got {weight}")]
    InvalidWeight { symbol: String, weight: f64 },

    #[error("weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },

    #[error("{field} must be non-negative, got {amount}")]
    NegativeAmount {
        field: &'static str,
        amount: Decimal,
    },

    #[error("unknown frequency {0:?}, expected monthly, quarterly, yearly or none")]
    UnknownFrequency(String),
}

/// How often a schedule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Quarterly,
    Yearly,
    None,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::None => "none",
        }
    }

    /// Ordinal of the calendar period containing `date`.
    fn period_index(&self, date: NaiveDate) -> Option<i32> {
        match self {
            Self::Monthly => Some(date.year() * 12 + date.month0() as i32),
            Self::Quarterly => Some(date.year() * 4 + (date.month0() / 3) as i32),
            Self::Yearly => Some(date.year()),
            Self::None => None,
        }
    }

    /// Whether `date` falls in a later calendar period than `last_fired`.
    pub fn should_fire(&self, date: NaiveDate, last_fired: NaiveDate) -> bool {
        match (self.period_index(date), self.period_index(last_fired)) {
            (Some(current), Some(previous)) => current > previous,
            _ => false,
        }
    }
}

impl FromStr for Frequency {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            "none" => Ok(Self::None),
            _ => Err(PolicyError::UnknownFrequency(s.to_string())),
        }
    }
}

/// Target weights per symbol plus the rebalance schedule.
///
/// Weights must be finite, positive, and sum to 1.0 within
/// [`WEIGHT_SUM_TOLERANCE`]. Immutable after construction.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationPolicy {
    weights: BTreeMap<String, f64>,
    rebalance: Frequency,
}

impl AllocationPolicy {
    pub fn new(weights: BTreeMap<String, f64>, rebalance: Frequency) -> Result<Self, PolicyError> {
        if weights.is_empty() {
            return Err(PolicyError::EmptyAllocation);
        }
        for (symbol, &weight) in &weights {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(PolicyError::InvalidWeight {
                    symbol: symbol.clone(),
                    weight,
                });
            }
        }
        let sum: f64 = weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PolicyError::WeightSum { sum });
        }
        Ok(Self { weights, rebalance })
    }

    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(|s| s.as_str())
    }

    pub fn weight(&self, symbol: &str) -> Option<f64> {
        self.weights.get(symbol).copied()
    }

    pub fn rebalance_frequency(&self) -> Frequency {
        self.rebalance
    }

    /// Whether a rebalance fires on `date` given when one last fired.
    pub fn should_fire(&self, date: NaiveDate, last_fired: NaiveDate) -> bool {
        self.rebalance.should_fire(date, last_fired)
    }
}

/// Initial investment plus the periodic contribution schedule.
#[derive(Debug, Clone, Serialize)]
pub struct ContributionPolicy {
    initial: Decimal,
    amount: Decimal,
    frequency: Frequency,
}

impl ContributionPolicy {
    pub fn new(
        initial: Decimal,
        amount: Decimal,
        frequency: Frequency,
    ) -> Result<Self, PolicyError> {
        if initial < Decimal::ZERO {
            return Err(PolicyError::NegativeAmount {
                field: "initial investment",
                amount: initial,
            });
        }
        if amount < Decimal::ZERO {
            return Err(PolicyError::NegativeAmount {
                field: "contribution amount",
                amount,
            });
        }
        Ok(Self {
            initial,
            amount,
            frequency,
        })
    }

    pub fn initial(&self) -> Decimal {
        self.initial
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Whether a contribution fires on `date` given when one last fired.
    ///
    /// A zero periodic amount never fires.
    pub fn should_fire(&self, date: NaiveDate, last_fired: NaiveDate) -> bool {
        self.amount > Decimal::ZERO && self.frequency.should_fire(date, last_fired)
    }
}
