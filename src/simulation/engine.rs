//! Portfolio simulation engine.
//!
//! Runs the daily loop:
//! 1. Mark held positions to the day's close prices
//! 2. Apply a scheduled contribution (proportional to current weights)
//! 3. Apply a scheduled rebalance back to target weights
//! 4. Record the end-of-day portfolio value
//!
//! Day one instead invests the initial amount at target weights. The engine
//! is a pure function of its inputs: identical inputs yield bit-identical
//! value series and event logs.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::data::{DataError, PriceTable, ValuePoint, ValueSeries};

use super::policy::{AllocationPolicy, ContributionPolicy};

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("no trading days between {start} and {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    #[error("no price column for {0}")]
    UnknownSymbol(String),

    #[error("missing price for {symbol} on {date}")]
    MissingPrice { symbol: String, date: NaiveDate },

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Kind of cash-flow event recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Contribution,
    Rebalance,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contribution => "contribution",
            Self::Rebalance => "rebalance",
        }
    }
}

/// One entry in the date-ordered audit log of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub date: NaiveDate,
    pub kind: EventKind,
    pub details: String,
}

/// Completed simulation output: the daily value curve plus the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRun {
    pub values: ValueSeries,
    pub events: Vec<SimulationEvent>,
}

/// The simulation engine. Holds the injected policies; each [`run`] call is
/// independent and shares no state with other calls.
///
/// [`run`]: SimulationEngine::run
pub struct SimulationEngine {
    allocation: AllocationPolicy,
    contribution: ContributionPolicy,
}

impl SimulationEngine {
    pub fn new(allocation: AllocationPolicy, contribution: ContributionPolicy) -> Self {
        Self {
            allocation,
            contribution,
        }
    }

    /// Simulate the portfolio over every trading day in `[start, end]`.
    pub fn run(
        &self,
        prices: &PriceTable,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SimulationRun, SimulationError> {
        for symbol in self.allocation.symbols() {
            if !prices.has_symbol(symbol) {
                return Err(SimulationError::UnknownSymbol(symbol.to_string()));
            }
        }

        let rows = prices.rows_in_range(start, end);
        if rows.is_empty() {
            return Err(SimulationError::EmptyRange { start, end });
        }

        let first_row = rows.start;
        let first_date = prices.dates()[first_row];
        let mut last_contribution = first_date;
        let mut last_rebalance = first_date;

        let mut holdings: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut points = Vec::with_capacity(rows.len());
        let mut events = Vec::new();

        for row in rows {
            let date = prices.dates()[row];
            let closes = self.closes_at(prices, row, date)?;

            if row == first_row {
                let initial = self.contribution.initial();
                holdings = allocate_to_targets(initial, self.allocation.weights(), &closes);
                let total = market_value(&holdings, &closes);
                debug!(%date, %initial, "initial investment");
                events.push(SimulationEvent {
                    date,
                    kind: EventKind::Contribution,
                    details: format!(
                        "initial investment of {} across {} symbols",
                        initial,
                        holdings.len()
                    ),
                });
                points.push(ValuePoint { date, value: total });
                continue;
            }

            let mut total = market_value(&holdings, &closes);

            let contributes = self.contribution.should_fire(date, last_contribution);
            let rebalances = self.allocation.should_fire(date, last_rebalance);

            if contributes {
                let cash = self.contribution.amount();
                if rebalances {
                    // folded into the rebalance base below
                    total += cash;
                } else {
                    apply_proportional(
                        &mut holdings,
                        cash,
                        total,
                        self.allocation.weights(),
                        &closes,
                    );
                    total = market_value(&holdings, &closes);
                }
                last_contribution = date;
                debug!(%date, %cash, "contribution");
                events.push(SimulationEvent {
                    date,
                    kind: EventKind::Contribution,
                    details: format!("contributed {}", cash),
                });
            }

            if rebalances {
                holdings = allocate_to_targets(total, self.allocation.weights(), &closes);
                total = market_value(&holdings, &closes);
                last_rebalance = date;
                debug!(%date, %total, "rebalance");
                events.push(SimulationEvent {
                    date,
                    kind: EventKind::Rebalance,
                    details: format!("rebalanced to target weights at value {}", total),
                });
            }

            points.push(ValuePoint { date, value: total });
        }

        Ok(SimulationRun {
            values: ValueSeries::new(points)?,
            events,
        })
    }

    /// Close prices for every allocated symbol on one day.
    fn closes_at(
        &self,
        prices: &PriceTable,
        row: usize,
        date: NaiveDate,
    ) -> Result<BTreeMap<String, Decimal>, SimulationError> {
        let mut closes = BTreeMap::new();
        for symbol in self.allocation.symbols() {
            let price =
                prices
                    .close(symbol, row)
                    .ok_or_else(|| SimulationError::MissingPrice {
                        symbol: symbol.to_string(),
                        date,
                    })?;
            closes.insert(symbol.to_string(), price);
        }
        Ok(closes)
    }
}

/// Convert `cash` into share counts so each symbol's market value equals its
/// target weight times `cash`.
fn allocate_to_targets(
    cash: Decimal,
    weights: &BTreeMap<String, f64>,
    closes: &BTreeMap<String, Decimal>,
) -> BTreeMap<String, Decimal> {
    let mut holdings = BTreeMap::new();
    for (symbol, &weight) in weights {
        let price = closes[symbol];
        let weight = Decimal::try_from(weight).unwrap_or(Decimal::ZERO);
        holdings.insert(symbol.clone(), cash * weight / price);
    }
    holdings
}

/// Buy into existing holdings in proportion to their current value share.
///
/// A zero-value portfolio has no drifted weights to follow; the cash is
/// allocated at target weights instead.
fn apply_proportional(
    holdings: &mut BTreeMap<String, Decimal>,
    cash: Decimal,
    total: Decimal,
    targets: &BTreeMap<String, f64>,
    closes: &BTreeMap<String, Decimal>,
) {
    if total <= Decimal::ZERO {
        let bought = allocate_to_targets(cash, targets, closes);
        for (symbol, shares) in bought {
            *holdings.entry(symbol).or_insert(Decimal::ZERO) += shares;
        }
        return;
    }

    // snapshot current values first so purchases don't skew the weights
    let current: Vec<(String, Decimal)> = holdings
        .iter()
        .map(|(symbol, shares)| (symbol.clone(), *shares * closes[symbol]))
        .collect();
    for (symbol, value) in current {
        let price = closes[&symbol];
        let share_of_cash = cash * value / total;
        if let Some(shares) = holdings.get_mut(&symbol) {
            *shares += share_of_cash / price;
        }
    }
}

fn market_value(
    holdings: &BTreeMap<String, Decimal>,
    closes: &BTreeMap<String, Decimal>,
) -> Decimal {
    holdings
        .iter()
        .map(|(symbol, shares)| *shares * closes[symbol])
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::policy::Frequency;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table(dates: Vec<NaiveDate>, columns: Vec<(&str, Vec<Decimal>)>) -> PriceTable {
        let columns = columns
            .into_iter()
            .map(|(symbol, prices)| (symbol.to_string(), prices))
            .collect();
        PriceTable::new(dates, columns).unwrap()
    }

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(s, w)| (s.to_string(), *w)).collect()
    }

    fn engine(
        alloc: &[(&str, f64)],
        rebalance: Frequency,
        initial: Decimal,
        amount: Decimal,
        contribution: Frequency,
    ) -> SimulationEngine {
        SimulationEngine::new(
            AllocationPolicy::new(weights(alloc), rebalance).unwrap(),
            ContributionPolicy::new(initial, amount, contribution).unwrap(),
        )
    }

    /// Three months of flat prices, spanning two month boundaries.
    fn flat_two_symbol_table() -> PriceTable {
        table(
            vec![
                date(2020, 1, 2),
                date(2020, 1, 15),
                date(2020, 2, 3),
                date(2020, 3, 2),
            ],
            vec![
                ("A", vec![dec!(100), dec!(100), dec!(100), dec!(100)]),
                ("B", vec![dec!(100), dec!(100), dec!(100), dec!(100)]),
            ],
        )
    }

    #[test]
    fn test_flat_prices_no_policies_constant_value() {
        let prices = table(
            vec![date(2020, 1, 2), date(2020, 1, 3), date(2020, 2, 14)],
            vec![("A", vec![dec!(100), dec!(100), dec!(100)])],
        );
        let engine = engine(
            &[("A", 1.0)],
            Frequency::None,
            dec!(10000),
            dec!(0),
            Frequency::None,
        );
        let run = engine
            .run(&prices, date(2020, 1, 1), date(2020, 12, 31))
            .unwrap();

        assert_eq!(run.values.len(), 3);
        assert!(run.values.points().iter().all(|p| p.value == dec!(10000)));
        // only the initial investment is logged
        assert_eq!(run.events.len(), 1);
        assert_eq!(run.events[0].kind, EventKind::Contribution);
    }

    #[test]
    fn test_monthly_contributions_accumulate_at_flat_prices() {
        let engine = engine(
            &[("A", 0.5), ("B", 0.5)],
            Frequency::Monthly,
            dec!(10000),
            dec!(500),
            Frequency::Monthly,
        );
        let run = engine
            .run(&flat_two_symbol_table(), date(2020, 1, 1), date(2020, 3, 31))
            .unwrap();

        let values: Vec<Decimal> = run.values.points().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![dec!(10000), dec!(10000), dec!(10500), dec!(11000)]);

        // contribution and rebalance both fire on each month boundary,
        // contribution first
        let kinds: Vec<EventKind> = run.events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Contribution,
                EventKind::Contribution,
                EventKind::Rebalance,
                EventKind::Contribution,
                EventKind::Rebalance,
            ]
        );
        assert!(run
            .events
            .windows(2)
            .all(|pair| pair[0].date <= pair[1].date));
    }

    #[test]
    fn test_rebalance_preserves_value_after_shock() {
        // B halves mid-January; the February rebalance must neither create
        // nor destroy value
        let prices = table(
            vec![date(2020, 1, 2), date(2020, 1, 15), date(2020, 2, 3)],
            vec![
                ("A", vec![dec!(100), dec!(100), dec!(100)]),
                ("B", vec![dec!(100), dec!(50), dec!(50)]),
            ],
        );
        let engine = engine(
            &[("A", 0.5), ("B", 0.5)],
            Frequency::Monthly,
            dec!(10000),
            dec!(0),
            Frequency::None,
        );
        let run = engine
            .run(&prices, date(2020, 1, 1), date(2020, 2, 28))
            .unwrap();

        let values: Vec<Decimal> = run.values.points().iter().map(|p| p.value).collect();
        // day 1: 50 shares of each; day 2: 50*100 + 50*50
        assert_eq!(values[0], dec!(10000));
        assert_eq!(values[1], dec!(7500));
        // rebalance day: same prices as the shock day, value unchanged
        assert_eq!(values[2], dec!(7500));
        assert_eq!(run.events.last().map(|e| e.kind), Some(EventKind::Rebalance));
    }

    #[test]
    fn test_allocate_to_targets_hits_weights_exactly() {
        let mut closes = BTreeMap::new();
        closes.insert("A".to_string(), dec!(100));
        closes.insert("B".to_string(), dec!(50));
        let holdings = allocate_to_targets(dec!(11000), &weights(&[("A", 0.5), ("B", 0.5)]), &closes);

        assert_eq!(holdings["A"], dec!(55));
        assert_eq!(holdings["B"], dec!(110));
        let value_a = holdings["A"] * closes["A"];
        let value_b = holdings["B"] * closes["B"];
        assert_eq!(value_a, value_b);
        assert_eq!(value_a + value_b, dec!(11000));
    }

    #[test]
    fn test_proportional_contribution_follows_drifted_weights() {
        // A drifts to 2/3 of the portfolio; contribution must follow the
        // drift, not the 50/50 target
        let prices = table(
            vec![date(2020, 1, 2), date(2020, 2, 3)],
            vec![
                ("A", vec![dec!(100), dec!(200)]),
                ("B", vec![dec!(100), dec!(100)]),
            ],
        );
        let engine = engine(
            &[("A", 0.5), ("B", 0.5)],
            Frequency::None,
            dec!(10000),
            dec!(300),
            Frequency::Monthly,
        );
        let run = engine
            .run(&prices, date(2020, 1, 1), date(2020, 2, 28))
            .unwrap();

        // pre-contribution: A = 50*200 = 10000, B = 50*100 = 5000
        // contribution splits 200 to A (1 share), 100 to B (1 share)
        assert_eq!(run.values.last().value, dec!(15300));
        let kinds: Vec<EventKind> = run.events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Contribution, EventKind::Contribution]);
    }

    #[test]
    fn test_zero_initial_contribution_uses_target_weights() {
        let engine = engine(
            &[("A", 0.5), ("B", 0.5)],
            Frequency::None,
            dec!(0),
            dec!(500),
            Frequency::Monthly,
        );
        let run = engine
            .run(&flat_two_symbol_table(), date(2020, 1, 1), date(2020, 3, 31))
            .unwrap();

        let values: Vec<Decimal> = run.values.points().iter().map(|p| p.value).collect();
        assert_eq!(values, vec![dec!(0), dec!(0), dec!(500), dec!(1000)]);
    }

    #[test]
    fn test_reruns_are_identical() {
        let prices = table(
            vec![date(2020, 1, 2), date(2020, 1, 15), date(2020, 2, 3)],
            vec![
                ("A", vec![dec!(103.17), dec!(99.42), dec!(104.06)]),
                ("B", vec![dec!(51.8), dec!(52.33), dec!(50.01)]),
            ],
        );
        let engine = engine(
            &[("A", 0.7), ("B", 0.3)],
            Frequency::Monthly,
            dec!(10000),
            dec!(500),
            Frequency::Monthly,
        );
        let first = engine
            .run(&prices, date(2020, 1, 1), date(2020, 2, 28))
            .unwrap();
        let second = engine
            .run(&prices, date(2020, 1, 1), date(2020, 2, 28))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_symbol_fails() {
        let prices = table(
            vec![date(2020, 1, 2)],
            vec![("A", vec![dec!(100)])],
        );
        let engine = engine(
            &[("A", 0.5), ("Z", 0.5)],
            Frequency::None,
            dec!(10000),
            dec!(0),
            Frequency::None,
        );
        assert!(matches!(
            engine.run(&prices, date(2020, 1, 1), date(2020, 1, 31)),
            Err(SimulationError::UnknownSymbol(s)) if s == "Z"
        ));
    }

    #[test]
    fn test_empty_range_fails() {
        let prices = table(
            vec![date(2020, 1, 2)],
            vec![("A", vec![dec!(100)])],
        );
        let engine = engine(
            &[("A", 1.0)],
            Frequency::None,
            dec!(10000),
            dec!(0),
            Frequency::None,
        );
        assert!(matches!(
            engine.run(&prices, date(2021, 1, 1), date(2021, 12, 31)),
            Err(SimulationError::EmptyRange { .. })
        ));
    }
}
