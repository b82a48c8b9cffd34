//! Search backend module
//!
//! Defines the [`SearchBackend`] capability and its concrete adapters.

mod loader;
mod multi;
mod traits;

pub mod duckduckgo;
pub mod searxng;

pub use duckduckgo::DuckDuckGoBackend;
pub use loader::BackendLoader;
pub use multi::MultiBackend;
pub use searxng::SearxngBackend;
pub use traits::*;
