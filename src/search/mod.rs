//! Search orchestration module
//!
//! Fans generated queries out to a backend concurrently and collects
//! an ordered, failure-tolerant aggregate.

mod orchestrator;

pub use orchestrator::{SearchOrchestrator, DEFAULT_CONCURRENCY, DEFAULT_QUERY_TIMEOUT};
