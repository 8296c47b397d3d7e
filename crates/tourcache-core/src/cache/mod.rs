//! Local cache module for offline data access.
//!
//! This module provides the `CacheStore` for the on-device SQLite mirror of
//! the remote collections. Each entity kind has its own table, written only
//! by sync passes with insert-or-replace semantics, plus a generic
//! `offline_metadata` key/value table for bookkeeping.
//!
//! Tables:
//! - `tourist_spots`, `events`, `blog_posts` (shared by every user)
//! - `favorites`, `check_ins` (rows carry the owning `user_id`)
//! - `offline_metadata`

pub mod database;
pub mod rows;
pub mod store;

pub use database::CacheDatabase;
pub use rows::{
    CacheRow, CheckInRow, EventRow, FavoriteRow, MetadataRow, PostRow, SpotRow, UserScopedRow,
};
pub use store::{CacheStore, Table};
