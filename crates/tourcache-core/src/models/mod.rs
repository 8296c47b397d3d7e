//! Data models for the synced remote collections.
//!
//! - `RemoteDocument`: the loosely-typed shape returned by the remote store
//! - `TouristSpot`, `Event`, `BlogPost`: collections shared by every user
//! - `Favorite`, `CheckIn`: collections scoped to one user identity
//! - `EntityKind`: the tag naming each collection

pub mod document;
pub mod event;
pub mod kind;
pub mod post;
pub mod spot;
pub mod user_data;

pub use document::RemoteDocument;
pub use event::Event;
pub use kind::EntityKind;
pub use post::BlogPost;
pub use spot::{GeoPoint, TouristSpot};
pub use user_data::{CheckIn, Favorite};
