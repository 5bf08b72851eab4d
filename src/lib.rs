pub mod config;
pub mod data;
pub mod events;
pub mod metrics;
pub mod simulation;

// Re-export commonly used types
pub use data::{DataError, LoaderError, PriceCsvLoader, PricePoint, PriceTable, ValuePoint, ValueSeries};
pub use events::{EventCategory, MarketEvent};
pub use metrics::{MetricsCalculator, MetricsConfig, MetricsError, MetricsReport};
pub use simulation::{
    AllocationPolicy, ContributionPolicy, EventKind, Frequency, PolicyError, SimulationEngine,
    SimulationError, SimulationEvent, SimulationRun,
};
