//! Result types and the ordered aggregate built by the orchestrator

mod container;
mod types;

pub use container::AggregateResultSet;
pub use types::*;
