//! Row shapes of the offline cache tables.
//!
//! Every row carries `last_synced_at` (epoch millis), stamped when the sync
//! pass wrote it. Composite values are stored through the codecs in
//! [`crate::mapper::codecs`].

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite};

use crate::models::EntityKind;

pub type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A row type backed by one cache table.
pub trait CacheRow: for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + Sized {
    const KIND: EntityKind;

    /// `INSERT OR REPLACE` with one placeholder per column, in `bind_to` order
    const UPSERT: &'static str;

    /// `ORDER BY` clause used by `get_all`
    const ORDER_BY: &'static str;

    fn bind_to<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

    /// Owning user for user-scoped rows, `None` for shared ones
    fn owner(&self) -> Option<&str> {
        None
    }
}

/// A row logically owned by one user identity; its table has a `user_id` column.
pub trait UserScopedRow: CacheRow {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SpotRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub rating: f64,
    pub review_count: i64,
    pub address: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub hours: Option<String>,
    pub image_url: Option<String>,
    pub visit_count: i64,
    /// JSON-encoded string list
    pub tags: String,
    pub last_synced_at: i64,
}

impl CacheRow for SpotRow {
    const KIND: EntityKind = EntityKind::Spots;
    const UPSERT: &'static str = "INSERT OR REPLACE INTO tourist_spots \
        (id, name, description, category, latitude, longitude, rating, review_count, address, \
         phone, website, hours, image_url, visit_count, tags, last_synced_at) \
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
    const ORDER_BY: &'static str = "name COLLATE NOCASE, id";

    fn bind_to<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.name.as_str())
            .bind(self.description.as_str())
            .bind(self.category.as_str())
            .bind(self.latitude)
            .bind(self.longitude)
            .bind(self.rating)
            .bind(self.review_count)
            .bind(self.address.as_str())
            .bind(self.phone.as_deref())
            .bind(self.website.as_deref())
            .bind(self.hours.as_deref())
            .bind(self.image_url.as_deref())
            .bind(self.visit_count)
            .bind(self.tags.as_str())
            .bind(self.last_synced_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub place_id: String,
    pub start_date_ts: i64,
    pub end_date_ts: Option<i64>,
    pub is_featured: bool,
    pub image_url: Option<String>,
    pub organizer_name: String,
    /// "lat,lon"
    pub coordinates: Option<String>,
    pub last_synced_at: i64,
}

impl CacheRow for EventRow {
    const KIND: EntityKind = EntityKind::Events;
    const UPSERT: &'static str = "INSERT OR REPLACE INTO events \
        (id, title, description, category, location, place_id, start_date_ts, end_date_ts, \
         is_featured, image_url, organizer_name, coordinates, last_synced_at) \
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
    const ORDER_BY: &'static str = "start_date_ts, id";

    fn bind_to<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.title.as_str())
            .bind(self.description.as_str())
            .bind(self.category.as_str())
            .bind(self.location.as_str())
            .bind(self.place_id.as_str())
            .bind(self.start_date_ts)
            .bind(self.end_date_ts)
            .bind(self.is_featured)
            .bind(self.image_url.as_deref())
            .bind(self.organizer_name.as_str())
            .bind(self.coordinates.as_deref())
            .bind(self.last_synced_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PostRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub author_name: String,
    pub author_id: String,
    pub image_url: Option<String>,
    pub likes: i64,
    pub view_count: i64,
    pub is_featured: bool,
    pub published_at_ts: i64,
    /// JSON-encoded string list
    pub tags: String,
    pub last_synced_at: i64,
}

impl CacheRow for PostRow {
    const KIND: EntityKind = EntityKind::Posts;
    const UPSERT: &'static str = "INSERT OR REPLACE INTO blog_posts \
        (id, title, content, category, author_name, author_id, image_url, likes, view_count, \
         is_featured, published_at_ts, tags, last_synced_at) \
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";
    const ORDER_BY: &'static str = "published_at_ts DESC, id";

    fn bind_to<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.title.as_str())
            .bind(self.content.as_str())
            .bind(self.category.as_str())
            .bind(self.author_name.as_str())
            .bind(self.author_id.as_str())
            .bind(self.image_url.as_deref())
            .bind(self.likes)
            .bind(self.view_count)
            .bind(self.is_featured)
            .bind(self.published_at_ts)
            .bind(self.tags.as_str())
            .bind(self.last_synced_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FavoriteRow {
    pub id: String,
    pub user_id: String,
    pub place_id: String,
    pub place_name: String,
    pub category: String,
    pub created_at_ts: i64,
    pub last_synced_at: i64,
}

impl CacheRow for FavoriteRow {
    const KIND: EntityKind = EntityKind::Favorites;
    const UPSERT: &'static str = "INSERT OR REPLACE INTO favorites \
        (id, user_id, place_id, place_name, category, created_at_ts, last_synced_at) \
        VALUES (?, ?, ?, ?, ?, ?, ?)";
    const ORDER_BY: &'static str = "created_at_ts DESC, id";

    fn bind_to<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.user_id.as_str())
            .bind(self.place_id.as_str())
            .bind(self.place_name.as_str())
            .bind(self.category.as_str())
            .bind(self.created_at_ts)
            .bind(self.last_synced_at)
    }

    fn owner(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl UserScopedRow for FavoriteRow {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CheckInRow {
    pub id: String,
    pub user_id: String,
    pub place_id: String,
    pub place_name: String,
    pub category: String,
    pub timestamp: i64,
    pub last_synced_at: i64,
}

impl CacheRow for CheckInRow {
    const KIND: EntityKind = EntityKind::CheckIns;
    const UPSERT: &'static str = "INSERT OR REPLACE INTO check_ins \
        (id, user_id, place_id, place_name, category, timestamp, last_synced_at) \
        VALUES (?, ?, ?, ?, ?, ?, ?)";
    const ORDER_BY: &'static str = "timestamp DESC, id";

    fn bind_to<'q>(&'q self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.as_str())
            .bind(self.user_id.as_str())
            .bind(self.place_id.as_str())
            .bind(self.place_name.as_str())
            .bind(self.category.as_str())
            .bind(self.timestamp)
            .bind(self.last_synced_at)
    }

    fn owner(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl UserScopedRow for CheckInRow {}

/// A `(key, value, updated_at)` bookkeeping entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MetadataRow {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}
