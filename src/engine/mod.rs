//! Orchestration of declared Runscope resources
//!
//! 1. Graph - references between resources, and the order they imply
//! 2. Executor - plan against stored state, then apply, refresh or destroy
//! 3. Differ - render plans and results

pub mod differ;
pub mod executor;
pub mod graph;

pub use executor::{Engine, RefreshOutcome, UNKNOWN};
