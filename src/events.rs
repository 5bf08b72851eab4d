//! Static market-event annotations.
//!
//! A fixed table of notable market dates (crashes, bottoms, policy shifts)
//! used to annotate reports. This is a pure label source keyed by date; the
//! simulation and metrics engines never consume it.

use chrono::NaiveDate;
use serde::Serialize;

/// Broad classification of a market event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Crisis,
    Recovery,
    Volatility,
    Policy,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crisis => "crisis",
            Self::Recovery => "recovery",
            Self::Volatility => "volatility",
            Self::Policy => "policy",
        }
    }
}

/// A labeled market event on a specific date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketEvent {
    pub date: NaiveDate,
    pub label: &'static str,
    pub category: EventCategory,
}

const EVENT_TABLE: &[(i32, u32, u32, &str, EventCategory)] = &[
    (2008, 9, 15, "Lehman Brothers bankruptcy", EventCategory::Crisis),
    (2009, 3, 9, "S&P 500 bottom (Great Recession)", EventCategory::Recovery),
    (2020, 3, 23, "COVID-19 market bottom", EventCategory::Crisis),
    (2021, 1, 6, "GameStop short squeeze", EventCategory::Volatility),
    (2022, 1, 3, "Fed rate hike cycle begins", EventCategory::Policy),
];

/// All known events, date-ascending.
pub fn all_events() -> Vec<MarketEvent> {
    EVENT_TABLE
        .iter()
        .filter_map(|&(year, month, day, label, category)| {
            NaiveDate::from_ymd_opt(year, month, day).map(|date| MarketEvent {
                date,
                label,
                category,
            })
        })
        .collect()
}

/// Events falling inside `[start, end]` inclusive.
pub fn events_in_range(start: NaiveDate, end: NaiveDate) -> Vec<MarketEvent> {
    all_events()
        .into_iter()
        .filter(|event| event.date >= start && event.date <= end)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_all_events_sorted() {
        let events = all_events();
        assert!(!events.is_empty());
        assert!(events.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_events_in_range() {
        let hits = events_in_range(date(2020, 1, 1), date(2021, 12, 31));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].category, EventCategory::Crisis);
        assert_eq!(hits[1].category, EventCategory::Volatility);

        let none = events_in_range(date(1995, 1, 1), date(1999, 12, 31));
        assert!(none.is_empty());
    }
}
