use std::marker::PhantomData;

use chrono::Utc;
use tracing::debug;

use crate::error::StorageResult;
use crate::models::EntityKind;

use super::database::CacheDatabase;
use super::rows::{
    CacheRow, CheckInRow, EventRow, FavoriteRow, MetadataRow, PostRow, SpotRow, UserScopedRow,
};

/// The local relational cache: one table per entity kind plus the
/// `offline_metadata` key/value table.
///
/// Constructed once at startup and shared by reference; every method is a
/// single statement or a single transaction, and errors are always returned.
#[derive(Clone)]
pub struct CacheStore {
    db: CacheDatabase,
}

impl CacheStore {
    pub fn new(db: CacheDatabase) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &CacheDatabase {
        &self.db
    }

    /// Typed handle to the table holding `R` rows
    pub fn table<R: CacheRow>(&self) -> Table<'_, R> {
        Table {
            db: &self.db,
            _row: PhantomData,
        }
    }

    pub fn spots(&self) -> Table<'_, SpotRow> {
        self.table()
    }

    pub fn events(&self) -> Table<'_, EventRow> {
        self.table()
    }

    pub fn posts(&self) -> Table<'_, PostRow> {
        self.table()
    }

    pub fn favorites(&self) -> Table<'_, FavoriteRow> {
        self.table()
    }

    pub fn check_ins(&self) -> Table<'_, CheckInRow> {
        self.table()
    }

    /// Row count of the table for `kind`
    pub async fn count(&self, kind: EntityKind) -> StorageResult<i64> {
        match kind {
            EntityKind::Spots => self.spots().count().await,
            EntityKind::Events => self.events().count().await,
            EntityKind::Posts => self.posts().count().await,
            EntityKind::Favorites => self.favorites().count().await,
            EntityKind::CheckIns => self.check_ins().count().await,
        }
    }

    // ===== Offline Metadata =====

    pub async fn get_metadata(&self, key: &str) -> StorageResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM offline_metadata WHERE key = ?")
                .bind(key)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(value)
    }

    pub async fn get_metadata_entry(&self, key: &str) -> StorageResult<Option<MetadataRow>> {
        let row = sqlx::query_as::<_, MetadataRow>(
            "SELECT key, value, updated_at FROM offline_metadata WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row)
    }

    pub async fn set_metadata(&self, key: &str, value: &str) -> StorageResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO offline_metadata (key, value, updated_at) VALUES (?, ?, ?)",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp_millis())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_metadata(&self, key: &str) -> StorageResult<()> {
        sqlx::query("DELETE FROM offline_metadata WHERE key = ?")
            .bind(key)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Delete every metadata entry whose key starts with `prefix`
    pub async fn delete_metadata_prefix(&self, prefix: &str) -> StorageResult<u64> {
        let pattern = format!("{}%", escape_like(prefix));
        let result = sqlx::query("DELETE FROM offline_metadata WHERE key LIKE ? ESCAPE '\\'")
            .bind(pattern)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

/// Operations on one cache table.
pub struct Table<'a, R: CacheRow> {
    db: &'a CacheDatabase,
    _row: PhantomData<R>,
}

impl<R: CacheRow> Table<'_, R> {
    fn name(&self) -> &'static str {
        R::KIND.table()
    }

    pub async fn insert_or_replace(&self, row: &R) -> StorageResult<()> {
        row.bind_to(sqlx::query(R::UPSERT))
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Write all rows in one transaction: either every row lands or none do.
    pub async fn insert_or_replace_batch(&self, rows: &[R]) -> StorageResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.db.pool().begin().await?;
        for row in rows {
            row.bind_to(sqlx::query(R::UPSERT)).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        debug!(table = self.name(), count = rows.len(), "Batch written");
        Ok(rows.len())
    }

    pub async fn get_by_id(&self, id: &str) -> StorageResult<Option<R>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", self.name());
        let row = sqlx::query_as::<_, R>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row)
    }

    pub async fn get_all(&self) -> StorageResult<Vec<R>> {
        let sql = format!("SELECT * FROM {} ORDER BY {}", self.name(), R::ORDER_BY);
        let rows = sqlx::query_as::<_, R>(&sql).fetch_all(self.db.pool()).await?;
        Ok(rows)
    }

    pub async fn count(&self) -> StorageResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.name());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(self.db.pool()).await?;
        Ok(count)
    }

    pub async fn delete_all(&self) -> StorageResult<u64> {
        let sql = format!("DELETE FROM {}", self.name());
        let result = sqlx::query(&sql).execute(self.db.pool()).await?;
        Ok(result.rows_affected())
    }

    /// Rows matching a `WHERE` clause with a single text parameter
    async fn select_where(&self, clause: &str, param: &str) -> StorageResult<Vec<R>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} ORDER BY {}",
            self.name(),
            clause,
            R::ORDER_BY
        );
        let rows = sqlx::query_as::<_, R>(&sql)
            .bind(param)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows)
    }
}

impl<R: UserScopedRow> Table<'_, R> {
    pub async fn get_all_for_user(&self, user_id: &str) -> StorageResult<Vec<R>> {
        self.select_where("user_id = ?", user_id).await
    }

    pub async fn count_for_user(&self, user_id: &str) -> StorageResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE user_id = ?", self.name());
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Delete only the rows owned by `user_id`
    pub async fn delete_all_for_user(&self, user_id: &str) -> StorageResult<u64> {
        let sql = format!("DELETE FROM {} WHERE user_id = ?", self.name());
        let result = sqlx::query(&sql)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

// ===== Read-path queries =====

impl Table<'_, SpotRow> {
    pub async fn by_category(&self, category: &str) -> StorageResult<Vec<SpotRow>> {
        self.select_where("category = ? COLLATE NOCASE", category).await
    }

    /// Case-insensitive substring match on the spot name
    pub async fn search_by_name(&self, query: &str) -> StorageResult<Vec<SpotRow>> {
        let pattern = format!("%{}%", escape_like(query.trim()));
        self.select_where("name LIKE ? ESCAPE '\\'", &pattern).await
    }
}

impl Table<'_, EventRow> {
    pub async fn featured(&self) -> StorageResult<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT * FROM events WHERE is_featured = 1 ORDER BY start_date_ts, id",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }

    /// Events still running or starting at or after `now_millis`
    pub async fn upcoming(&self, now_millis: i64) -> StorageResult<Vec<EventRow>> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT * FROM events WHERE COALESCE(end_date_ts, start_date_ts) >= ? \
             ORDER BY start_date_ts, id",
        )
        .bind(now_millis)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }
}

impl Table<'_, PostRow> {
    pub async fn featured(&self) -> StorageResult<Vec<PostRow>> {
        let rows = sqlx::query_as::<_, PostRow>(
            "SELECT * FROM blog_posts WHERE is_featured = 1 ORDER BY published_at_ts DESC, id",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }
}

impl Table<'_, FavoriteRow> {
    pub async fn is_favorite(&self, user_id: &str, place_id: &str) -> StorageResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM favorites WHERE user_id = ? AND place_id = ? LIMIT 1")
                .bind(user_id)
                .bind(place_id)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(found.is_some())
    }
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'` pattern
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_store() -> CacheStore {
        let db = CacheDatabase::in_memory()
            .await
            .expect("failed to open in-memory cache");
        CacheStore::new(db)
    }

    fn spot(id: &str, name: &str, category: &str) -> SpotRow {
        SpotRow {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            category: category.to_string(),
            latitude: 19.43,
            longitude: -99.13,
            rating: 4.0,
            review_count: 3,
            address: String::new(),
            phone: None,
            website: None,
            hours: None,
            image_url: None,
            visit_count: 0,
            tags: "[]".to_string(),
            last_synced_at: 1,
        }
    }

    fn favorite(id: &str, user_id: &str, place_id: &str) -> FavoriteRow {
        FavoriteRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            place_id: place_id.to_string(),
            place_name: "Place".to_string(),
            category: "museum".to_string(),
            created_at_ts: 1_700_000_000_000,
            last_synced_at: 1,
        }
    }

    fn event(id: &str, start: i64, end: Option<i64>, featured: bool) -> EventRow {
        EventRow {
            id: id.to_string(),
            title: format!("Event {}", id),
            description: String::new(),
            category: String::new(),
            location: String::new(),
            place_id: String::new(),
            start_date_ts: start,
            end_date_ts: end,
            is_featured: featured,
            image_url: None,
            organizer_name: String::new(),
            coordinates: Some("19.5,-99.25".to_string()),
            last_synced_at: 1,
        }
    }

    fn post(id: &str, published_at_ts: i64, featured: bool) -> PostRow {
        PostRow {
            id: id.to_string(),
            title: format!("Post {}", id),
            content: String::new(),
            category: "travel".to_string(),
            author_name: "Ana".to_string(),
            author_id: "a1".to_string(),
            image_url: None,
            likes: 0,
            view_count: 0,
            is_featured: featured,
            published_at_ts,
            tags: "[]".to_string(),
            last_synced_at: 1,
        }
    }

    fn check_in(id: &str, user_id: &str, timestamp: i64) -> CheckInRow {
        CheckInRow {
            id: id.to_string(),
            user_id: user_id.to_string(),
            place_id: "p1".to_string(),
            place_name: "Place".to_string(),
            category: "museum".to_string(),
            timestamp,
            last_synced_at: 1,
        }
    }

    #[tokio::test]
    async fn insert_and_get_by_id() {
        let store = setup_store().await;
        let row = spot("s1", "Zócalo", "plaza");

        store.spots().insert_or_replace(&row).await.expect("insert");

        let loaded = store.spots().get_by_id("s1").await.expect("get");
        assert_eq!(loaded, Some(row));
        assert_eq!(store.spots().get_by_id("missing").await.expect("get"), None);
    }

    #[tokio::test]
    async fn insert_or_replace_overwrites_whole_row() {
        let store = setup_store().await;
        let mut row = spot("s1", "Old name", "plaza");
        row.phone = Some("555".to_string());
        store.spots().insert_or_replace(&row).await.expect("insert");

        let replacement = spot("s1", "New name", "park");
        store.spots().insert_or_replace(&replacement).await.expect("replace");

        let loaded = store.spots().get_by_id("s1").await.expect("get").expect("row");
        assert_eq!(loaded.name, "New name");
        assert_eq!(loaded.phone, None);
        assert_eq!(store.spots().count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn batch_insert_and_ordered_get_all() {
        let store = setup_store().await;
        let rows = vec![
            spot("s2", "bosque", "park"),
            spot("s1", "Alameda", "park"),
            spot("s3", "Castillo", "museum"),
        ];

        let written = store.spots().insert_or_replace_batch(&rows).await.expect("batch");
        assert_eq!(written, 3);

        let names: Vec<String> = store
            .spots()
            .get_all()
            .await
            .expect("all")
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Alameda", "bosque", "Castillo"]);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let store = setup_store().await;
        let written = store
            .spots()
            .insert_or_replace_batch(&[])
            .await
            .expect("batch");
        assert_eq!(written, 0);
    }

    #[tokio::test]
    async fn delete_all_truncates_only_that_table() {
        let store = setup_store().await;
        store.spots().insert_or_replace(&spot("s1", "A", "x")).await.expect("spot");
        store
            .events()
            .insert_or_replace(&event("e1", 10, None, false))
            .await
            .expect("event");

        assert_eq!(store.spots().delete_all().await.expect("delete"), 1);
        assert_eq!(store.count(EntityKind::Spots).await.expect("count"), 0);
        assert_eq!(store.count(EntityKind::Events).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn delete_all_for_user_keeps_other_users() {
        let store = setup_store().await;
        let rows = vec![
            favorite("f1", "alice", "p1"),
            favorite("f2", "alice", "p2"),
            favorite("f3", "bob", "p1"),
        ];
        store.favorites().insert_or_replace_batch(&rows).await.expect("batch");

        let deleted = store
            .favorites()
            .delete_all_for_user("alice")
            .await
            .expect("delete");

        assert_eq!(deleted, 2);
        assert_eq!(store.favorites().count_for_user("alice").await.expect("count"), 0);
        assert_eq!(store.favorites().count_for_user("bob").await.expect("count"), 1);
    }

    #[tokio::test]
    async fn get_all_for_user_filters_and_orders_newest_first() {
        let store = setup_store().await;
        let mut older = favorite("f1", "alice", "p1");
        older.created_at_ts = 1_000;
        let mut newer = favorite("f2", "alice", "p2");
        newer.created_at_ts = 2_000;
        let foreign = favorite("f3", "bob", "p1");
        store
            .favorites()
            .insert_or_replace_batch(&[older.clone(), foreign, newer.clone()])
            .await
            .expect("batch");

        let alice = store.favorites().get_all_for_user("alice").await.expect("list");
        assert_eq!(alice, vec![newer, older]);
        assert!(store.favorites().get_all_for_user("carol").await.expect("list").is_empty());

        store
            .check_ins()
            .insert_or_replace_batch(&[
                check_in("c1", "alice", 10),
                check_in("c2", "bob", 20),
                check_in("c3", "alice", 30),
            ])
            .await
            .expect("batch");
        let ids: Vec<String> = store
            .check_ins()
            .get_all_for_user("alice")
            .await
            .expect("list")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["c3", "c1"]);
    }

    #[tokio::test]
    async fn featured_posts_newest_first() {
        let store = setup_store().await;
        store
            .posts()
            .insert_or_replace_batch(&[
                post("p1", 1_000, true),
                post("p2", 3_000, false),
                post("p3", 2_000, true),
                post("p4", 2_000, true),
            ])
            .await
            .expect("batch");

        let ids: Vec<String> = store
            .posts()
            .featured()
            .await
            .expect("featured")
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["p3", "p4", "p1"]);
    }

    #[tokio::test]
    async fn is_favorite_lookup() {
        let store = setup_store().await;
        store
            .favorites()
            .insert_or_replace(&favorite("f1", "alice", "p1"))
            .await
            .expect("insert");

        assert!(store.favorites().is_favorite("alice", "p1").await.expect("lookup"));
        assert!(!store.favorites().is_favorite("bob", "p1").await.expect("lookup"));
    }

    #[tokio::test]
    async fn spot_read_queries() {
        let store = setup_store().await;
        let rows = vec![
            spot("s1", "Museo Frida Kahlo", "Museum"),
            spot("s2", "Bosque de Chapultepec", "park"),
            spot("s3", "100% Mexicano", "food"),
        ];
        store.spots().insert_or_replace_batch(&rows).await.expect("batch");

        let museums = store.spots().by_category("museum").await.expect("category");
        assert_eq!(museums.len(), 1);

        let found = store.spots().search_by_name("frida").await.expect("search");
        assert_eq!(found[0].id, "s1");

        let literal = store.spots().search_by_name("100%").await.expect("search");
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].id, "s3");
    }

    #[tokio::test]
    async fn event_read_queries() {
        let store = setup_store().await;
        let rows = vec![
            event("past", 10, Some(20), false),
            event("running", 40, Some(200), true),
            event("future", 150, None, false),
        ];
        store.events().insert_or_replace_batch(&rows).await.expect("batch");

        let upcoming: Vec<String> = store
            .events()
            .upcoming(100)
            .await
            .expect("upcoming")
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(upcoming, vec!["running", "future"]);

        let featured = store.events().featured().await.expect("featured");
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].id, "running");
    }

    #[tokio::test]
    async fn metadata_set_get_delete() {
        let store = setup_store().await;
        assert_eq!(store.get_metadata("k").await.expect("get"), None);

        store.set_metadata("k", "v1").await.expect("set");
        store.set_metadata("k", "v2").await.expect("overwrite");
        assert_eq!(store.get_metadata("k").await.expect("get").as_deref(), Some("v2"));

        let entry = store.get_metadata_entry("k").await.expect("entry").expect("present");
        assert!(entry.updated_at > 0);

        store.delete_metadata("k").await.expect("delete");
        assert_eq!(store.get_metadata("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn metadata_prefix_delete() {
        let store = setup_store().await;
        store.set_metadata("sync.spots.last_success", "1").await.expect("set");
        store.set_metadata("sync.events.last_error", "boom").await.expect("set");
        store.set_metadata("syncXother", "keep").await.expect("set");

        let deleted = store.delete_metadata_prefix("sync.").await.expect("delete");
        assert_eq!(deleted, 2);
        assert_eq!(store.get_metadata("syncXother").await.expect("get").as_deref(), Some("keep"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
