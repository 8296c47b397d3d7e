//! Offline cache for tourism data.
//!
//! Mirrors the remote tourist-spot, event and blog-post collections (plus the
//! signed-in user's favorites and check-ins) into an on-device SQLite
//! database, so the app can browse without a network connection.
//!
//! The usual wiring:
//! - open a [`CacheDatabase`] and wrap it in a [`CacheStore`]
//! - build a [`SyncOrchestrator`] from the store, a [`RemoteStore`], an
//!   [`IdentityProvider`] and [`SyncSettings`]
//! - optionally attach a [`ConnectivityMonitor`] and call
//!   [`SyncOrchestrator::spawn_auto_sync`]

pub mod auth;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod mapper;
pub mod models;
pub mod remote;
pub mod settings;
pub mod sync;

pub use auth::{IdentityProvider, Session, SessionData, StaticIdentity};
pub use cache::{CacheDatabase, CacheStore};
pub use config::Config;
pub use connectivity::{
    ConnectivityMonitor, ConnectivitySink, ConnectivityStream, NetworkCallbackRegistry,
    NetworkCapabilities,
};
pub use error::{StorageError, StorageResult};
pub use mapper::{MappingError, SyncedEntity};
pub use models::{
    BlogPost, CheckIn, EntityKind, Event, Favorite, GeoPoint, RemoteDocument, TouristSpot,
};
pub use remote::{HttpRemoteStore, RemoteError, RemoteStore};
pub use settings::{LastSyncTime, SyncSettings, NEVER_SYNCED};
pub use sync::{
    KindOutcome, OfflineStats, SkipReason, SyncOrchestrator, SyncOutcome, SyncPhase, SyncReport,
};
