//! Traits describing source, push, and cache capabilities plus their error types.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde_json::Error as JsonError;
use tokio::sync::OwnedMutexGuard;

use crate::cache::{PartitionKey, SeenSet};
use crate::model::{Query, RouteDescriptor, SourceId, TicketRecord};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while querying an upstream ticket API.
pub enum FetchError {
    /// Transport failure, timeout, or undecodable body.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Upstream answered with a non-success status.
    #[error("Upstream returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body as sent by the upstream.
        body: String,
    },
    /// The query carries a route descriptor this source cannot search.
    #[error("Unsupported route descriptor: {0}")]
    UnsupportedRoute(RouteDescriptor),
}

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while delivering a push notification.
pub enum NotifyError {
    /// Transport failure or timeout.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Push service refused the message.
    #[error("Push rejected with {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body as sent by the push service.
        body: String,
    },
}

#[derive(thiserror::Error, Debug)]
/// Errors raised while reading or writing persisted cache state.
pub enum CacheError {
    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Cache document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),
}

#[async_trait]
/// Trait for upstream-specific ticket search backends.
pub trait SourcePort: Send + Sync {
    /// Run one search against the upstream and normalize its listings.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the request fails, the upstream rejects it, or the query's
    /// route descriptor does not belong to this source.
    async fn search(&self, query: &Query) -> Result<Vec<TicketRecord>, FetchError>;
}

#[async_trait]
/// Trait for push notification transports.
pub trait PushPort: Send + Sync {
    /// Deliver a single titled message.
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] when the message could not be delivered.
    async fn send(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

#[async_trait]
/// Trait for persisted dedup state.
pub trait CacheStore: Send + Sync {
    /// Acquire exclusive access to every partition of a source.
    ///
    /// The guard must be held across a load/save pair so concurrent runs cannot lose updates.
    async fn lock(&self, source: &SourceId) -> OwnedMutexGuard<()>;

    /// Load the coach ids seen for a partition.
    ///
    /// Missing or unreadable state yields an empty set.
    async fn load(&self, key: &PartitionKey) -> SeenSet;

    /// Replace a partition with the coach ids of `current`.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] when the new state cannot be written.
    async fn save(&self, key: &PartitionKey, current: &[TicketRecord]) -> Result<(), CacheError>;
}
