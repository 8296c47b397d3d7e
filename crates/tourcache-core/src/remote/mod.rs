//! Remote store module.
//!
//! The remote document store is the source of truth for every synced
//! collection. This module defines the `RemoteStore` seam consumed by the
//! sync orchestrator and an HTTP implementation, `HttpRemoteStore`.
//!
//! Collections are fetched whole; there is no pagination or delta sync.

pub mod client;
pub mod error;

use async_trait::async_trait;

use crate::models::{EntityKind, RemoteDocument};

pub use client::HttpRemoteStore;
pub use error::RemoteError;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Every document of a global collection
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<RemoteDocument>, RemoteError>;

    /// Every document of a user-scoped collection owned by `user_id`
    async fn fetch_for_user(
        &self,
        kind: EntityKind,
        user_id: &str,
    ) -> Result<Vec<RemoteDocument>, RemoteError>;
}
