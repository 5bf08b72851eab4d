//! Portfolio simulation.
//!
//! This module provides the daily simulation loop and its injected policies:
//! - Scheduling policies (contribution and rebalance frequencies)
//! - Target-weight allocation and proportional contribution math
//! - The engine producing a daily value series plus an audit event log

pub mod engine;
pub mod policy;

pub use engine::{
    EventKind, SimulationEngine, SimulationError, SimulationEvent, SimulationRun,
};
pub use policy::{AllocationPolicy, ContributionPolicy, Frequency, PolicyError};
