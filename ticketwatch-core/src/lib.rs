//! Core types and the polling cycle for the ticketwatch bus ticket monitor.

/// Persisted dedup state and the new-since-last-seen diff.
pub mod cache;
/// Operator allow-list.
pub mod filter;
/// HTTP helpers shared by source adapters.
pub mod http;
/// Serde helpers for loosely typed upstream payloads.
pub mod lenient;
/// Domain models and identifiers shared by all sources.
pub mod model;
/// Push message formatting and delivery.
pub mod notifier;
/// Registry for plugging source adapters into the monitor.
pub mod plugin;
/// Traits describing source, push, and cache interfaces.
pub mod ports;
/// Polling cycle orchestration.
pub mod service;
/// Canned HTTP replies for adapter tests.
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use cache::*;
pub use filter::AllowList;
pub use model::*;
pub use notifier::*;
pub use plugin::*;
pub use ports::*;
pub use service::*;
