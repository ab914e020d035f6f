//! Percentage Provider Module
//!
//! The unreliable external source and the resilient provider that keeps a
//! percentage available in front of it.

mod resilient;
mod source;

pub use resilient::{PercentageProvider, ResilientProvider};
pub use source::{FailurePlan, PercentageSource, RandomFailures, ScriptedFailures, SimulatedSource};
