//! Entity mapper: pure conversions between remote documents, domain
//! entities and cache rows.
//!
//! For each synced kind:
//! - `from_document` defensively reads a [`RemoteDocument`], rejecting it
//!   only when a required field is missing or malformed. Missing optional
//!   text defaults to an empty string, never null.
//! - `to_cache_row` / `to_cache_row_at` project the entity onto its table,
//!   stamping `last_synced_at`.
//! - `from_cache_row` rebuilds the entity from a row.
//!
//! `from_cache_row(to_cache_row(e)) == e` holds for every entity.

pub mod codecs;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cache::{CacheRow, CheckInRow, EventRow, FavoriteRow, PostRow, SpotRow};
use crate::models::{
    BlogPost, CheckIn, EntityKind, Event, Favorite, GeoPoint, RemoteDocument, TouristSpot,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("{kind} document {id:?} is missing required field `{field}`")]
    MissingField {
        kind: EntityKind,
        id: String,
        field: &'static str,
    },

    #[error("{kind} document {id:?} has invalid `{field}`: {reason}")]
    InvalidField {
        kind: EntityKind,
        id: String,
        field: &'static str,
        reason: String,
    },
}

/// A domain entity mirrored into one cache table.
pub trait SyncedEntity: Sized + Send {
    type Row: CacheRow;

    const KIND: EntityKind;

    fn from_document(doc: &RemoteDocument) -> Result<Self, MappingError>;

    fn to_cache_row_at(&self, synced_at: DateTime<Utc>) -> Self::Row;

    fn from_cache_row(row: Self::Row) -> Self;

    /// Project onto a cache row stamped with the current time
    fn to_cache_row(&self) -> Self::Row {
        self.to_cache_row_at(Utc::now())
    }
}

/// Field reader that knows which document it is reading, for error messages
struct Fields<'a> {
    kind: EntityKind,
    doc: &'a RemoteDocument,
}

impl<'a> Fields<'a> {
    fn new(kind: EntityKind, doc: &'a RemoteDocument) -> Result<Self, MappingError> {
        let fields = Self { kind, doc };
        if doc.id.trim().is_empty() {
            return Err(fields.missing("id"));
        }
        Ok(fields)
    }

    fn missing(&self, field: &'static str) -> MappingError {
        MappingError::MissingField {
            kind: self.kind,
            id: self.doc.id.clone(),
            field,
        }
    }

    fn id(&self) -> String {
        self.doc.id.clone()
    }

    fn required_text(&self, field: &'static str) -> Result<String, MappingError> {
        self.doc
            .non_empty_str_field(field)
            .ok_or_else(|| self.missing(field))
    }

    fn required_timestamp(&self, field: &'static str) -> Result<DateTime<Utc>, MappingError> {
        match self.doc.get(field) {
            None => Err(self.missing(field)),
            Some(_) => self
                .doc
                .timestamp_field(field)
                .ok_or_else(|| MappingError::InvalidField {
                    kind: self.kind,
                    id: self.doc.id.clone(),
                    field,
                    reason: "not a recognizable timestamp".to_string(),
                }),
        }
    }

    fn text(&self, field: &str) -> String {
        self.doc.str_field(field).unwrap_or_default()
    }

    fn optional_text(&self, field: &str) -> Option<String> {
        self.doc.non_empty_str_field(field)
    }

    fn int(&self, field: &str) -> i64 {
        self.doc.i64_field(field).unwrap_or(0)
    }

    fn float(&self, field: &str) -> f64 {
        self.doc.f64_field(field).filter(|f| f.is_finite()).unwrap_or(0.0)
    }

    fn flag(&self, field: &str) -> bool {
        self.doc.bool_field(field).unwrap_or(false)
    }

    fn tags(&self, field: &str) -> Vec<String> {
        self.doc.string_list_field(field).unwrap_or_default()
    }
}

fn decode_tags(encoded: &str) -> Vec<String> {
    codecs::decode_string_list(encoded).unwrap_or_default()
}

fn millis_or_epoch(millis: i64) -> DateTime<Utc> {
    codecs::timestamp_from_millis(millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

impl SyncedEntity for TouristSpot {
    type Row = SpotRow;
    const KIND: EntityKind = EntityKind::Spots;

    fn from_document(doc: &RemoteDocument) -> Result<Self, MappingError> {
        let f = Fields::new(Self::KIND, doc)?;
        let location = doc
            .geo_point_field("location")
            .or_else(|| doc.geo_point_field("coordinates"))
            .unwrap_or_else(|| GeoPoint::new(f.float("latitude"), f.float("longitude")));

        Ok(TouristSpot {
            id: f.id(),
            name: f.required_text("name")?,
            description: f.text("description"),
            category: f.text("category"),
            location,
            rating: f.float("rating"),
            review_count: f.int("reviewCount"),
            address: f.text("address"),
            phone: f.optional_text("phone"),
            website: f.optional_text("website"),
            hours: f.optional_text("hours"),
            image_url: f.optional_text("imageUrl"),
            visit_count: f.int("visitCount"),
            tags: f.tags("tags"),
        })
    }

    fn to_cache_row_at(&self, synced_at: DateTime<Utc>) -> SpotRow {
        SpotRow {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            rating: self.rating,
            review_count: self.review_count,
            address: self.address.clone(),
            phone: self.phone.clone(),
            website: self.website.clone(),
            hours: self.hours.clone(),
            image_url: self.image_url.clone(),
            visit_count: self.visit_count,
            tags: codecs::encode_string_list(&self.tags),
            last_synced_at: codecs::timestamp_to_millis(synced_at),
        }
    }

    fn from_cache_row(row: SpotRow) -> Self {
        TouristSpot {
            tags: decode_tags(&row.tags),
            location: GeoPoint::new(row.latitude, row.longitude),
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            rating: row.rating,
            review_count: row.review_count,
            address: row.address,
            phone: row.phone,
            website: row.website,
            hours: row.hours,
            image_url: row.image_url,
            visit_count: row.visit_count,
        }
    }
}

impl SyncedEntity for Event {
    type Row = EventRow;
    const KIND: EntityKind = EntityKind::Events;

    fn from_document(doc: &RemoteDocument) -> Result<Self, MappingError> {
        let f = Fields::new(Self::KIND, doc)?;
        Ok(Event {
            id: f.id(),
            title: f.required_text("title")?,
            description: f.text("description"),
            category: f.text("category"),
            location: f.text("location"),
            place_id: f.text("placeId"),
            start_date: f.required_timestamp("startDate")?,
            end_date: doc.timestamp_field("endDate"),
            is_featured: f.flag("isFeatured"),
            image_url: f.optional_text("imageUrl"),
            organizer_name: f.text("organizerName"),
            coordinates: doc.geo_point_field("coordinates"),
        })
    }

    fn to_cache_row_at(&self, synced_at: DateTime<Utc>) -> EventRow {
        EventRow {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            location: self.location.clone(),
            place_id: self.place_id.clone(),
            start_date_ts: codecs::timestamp_to_millis(self.start_date),
            end_date_ts: codecs::optional_timestamp_to_millis(self.end_date),
            is_featured: self.is_featured,
            image_url: self.image_url.clone(),
            organizer_name: self.organizer_name.clone(),
            coordinates: self.coordinates.as_ref().map(codecs::encode_geo_point),
            last_synced_at: codecs::timestamp_to_millis(synced_at),
        }
    }

    fn from_cache_row(row: EventRow) -> Self {
        Event {
            start_date: millis_or_epoch(row.start_date_ts),
            end_date: codecs::optional_timestamp_from_millis(row.end_date_ts),
            coordinates: row.coordinates.as_deref().and_then(codecs::decode_geo_point),
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            location: row.location,
            place_id: row.place_id,
            is_featured: row.is_featured,
            image_url: row.image_url,
            organizer_name: row.organizer_name,
        }
    }
}

impl SyncedEntity for BlogPost {
    type Row = PostRow;
    const KIND: EntityKind = EntityKind::Posts;

    fn from_document(doc: &RemoteDocument) -> Result<Self, MappingError> {
        let f = Fields::new(Self::KIND, doc)?;
        Ok(BlogPost {
            id: f.id(),
            title: f.required_text("title")?,
            content: f.text("content"),
            category: f.text("category"),
            author_name: f.text("authorName"),
            author_id: f.text("authorId"),
            image_url: f.optional_text("imageUrl"),
            likes: f.int("likes"),
            view_count: f.int("viewCount"),
            is_featured: f.flag("isFeatured"),
            published_at: f.required_timestamp("publishedAt")?,
            tags: f.tags("tags"),
        })
    }

    fn to_cache_row_at(&self, synced_at: DateTime<Utc>) -> PostRow {
        PostRow {
            id: self.id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
            author_name: self.author_name.clone(),
            author_id: self.author_id.clone(),
            image_url: self.image_url.clone(),
            likes: self.likes,
            view_count: self.view_count,
            is_featured: self.is_featured,
            published_at_ts: codecs::timestamp_to_millis(self.published_at),
            tags: codecs::encode_string_list(&self.tags),
            last_synced_at: codecs::timestamp_to_millis(synced_at),
        }
    }

    fn from_cache_row(row: PostRow) -> Self {
        BlogPost {
            published_at: millis_or_epoch(row.published_at_ts),
            tags: decode_tags(&row.tags),
            id: row.id,
            title: row.title,
            content: row.content,
            category: row.category,
            author_name: row.author_name,
            author_id: row.author_id,
            image_url: row.image_url,
            likes: row.likes,
            view_count: row.view_count,
            is_featured: row.is_featured,
        }
    }
}

impl SyncedEntity for Favorite {
    type Row = FavoriteRow;
    const KIND: EntityKind = EntityKind::Favorites;

    fn from_document(doc: &RemoteDocument) -> Result<Self, MappingError> {
        let f = Fields::new(Self::KIND, doc)?;
        Ok(Favorite {
            id: f.id(),
            user_id: f.required_text("userId")?,
            place_id: f.required_text("placeId")?,
            place_name: f.text("placeName"),
            category: f.text("category"),
            created_at: f.required_timestamp("createdAt")?,
        })
    }

    fn to_cache_row_at(&self, synced_at: DateTime<Utc>) -> FavoriteRow {
        FavoriteRow {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            place_id: self.place_id.clone(),
            place_name: self.place_name.clone(),
            category: self.category.clone(),
            created_at_ts: codecs::timestamp_to_millis(self.created_at),
            last_synced_at: codecs::timestamp_to_millis(synced_at),
        }
    }

    fn from_cache_row(row: FavoriteRow) -> Self {
        Favorite {
            created_at: millis_or_epoch(row.created_at_ts),
            id: row.id,
            user_id: row.user_id,
            place_id: row.place_id,
            place_name: row.place_name,
            category: row.category,
        }
    }
}

impl SyncedEntity for CheckIn {
    type Row = CheckInRow;
    const KIND: EntityKind = EntityKind::CheckIns;

    fn from_document(doc: &RemoteDocument) -> Result<Self, MappingError> {
        let f = Fields::new(Self::KIND, doc)?;
        Ok(CheckIn {
            id: f.id(),
            user_id: f.required_text("userId")?,
            place_id: f.required_text("placeId")?,
            place_name: f.text("placeName"),
            category: f.text("category"),
            timestamp: f.required_timestamp("timestamp")?,
        })
    }

    fn to_cache_row_at(&self, synced_at: DateTime<Utc>) -> CheckInRow {
        CheckInRow {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            place_id: self.place_id.clone(),
            place_name: self.place_name.clone(),
            category: self.category.clone(),
            timestamp: codecs::timestamp_to_millis(self.timestamp),
            last_synced_at: codecs::timestamp_to_millis(synced_at),
        }
    }

    fn from_cache_row(row: CheckInRow) -> Self {
        CheckIn {
            timestamp: millis_or_epoch(row.timestamp),
            id: row.id,
            user_id: row.user_id,
            place_id: row.place_id,
            place_name: row.place_name,
            category: row.category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(millis: i64) -> DateTime<Utc> {
        codecs::timestamp_from_millis(millis).unwrap()
    }

    fn round_trip<E: SyncedEntity + Clone + PartialEq + std::fmt::Debug>(entity: &E) {
        let row = entity.to_cache_row();
        assert_eq!(E::from_cache_row(row), *entity);
    }

    fn full_spot_doc() -> RemoteDocument {
        RemoteDocument::new("spot-1")
            .with("name", "Chichén Itzá")
            .with("description", "Mayan city")
            .with("category", "archaeology")
            .with("location", json!({"latitude": 20.6843, "longitude": -88.5678}))
            .with("rating", 4.8)
            .with("reviewCount", 1200)
            .with("address", "Yucatán")
            .with("phone", "+52 985 851 0137")
            .with("website", "https://example.org")
            .with("hours", "8-17")
            .with("imageUrl", "https://example.org/img.jpg")
            .with("visitCount", 42)
            .with("tags", json!(["unesco", "ruins"]))
    }

    #[test]
    fn test_spot_round_trip_full() {
        let spot = TouristSpot::from_document(&full_spot_doc()).unwrap();
        assert_eq!(spot.location, GeoPoint::new(20.6843, -88.5678));
        assert_eq!(spot.tags, vec!["unesco", "ruins"]);
        round_trip(&spot);
    }

    #[test]
    fn test_spot_missing_optionals_default() {
        let spot =
            TouristSpot::from_document(&RemoteDocument::new("s").with("name", "Cenote")).unwrap();
        assert_eq!(spot.description, "");
        assert_eq!(spot.category, "");
        assert_eq!(spot.address, "");
        assert_eq!(spot.phone, None);
        assert_eq!(spot.rating, 0.0);
        assert!(spot.tags.is_empty());

        let row = spot.to_cache_row();
        assert_eq!(row.tags, "[]");
        round_trip(&spot);
    }

    #[test]
    fn test_spot_requires_name() {
        let err =
            TouristSpot::from_document(&RemoteDocument::new("s").with("name", "  ")).unwrap_err();
        assert!(matches!(err, MappingError::MissingField { field: "name", .. }));
    }

    #[test]
    fn test_document_requires_id() {
        let err =
            TouristSpot::from_document(&RemoteDocument::new("").with("name", "x")).unwrap_err();
        assert!(matches!(err, MappingError::MissingField { field: "id", .. }));
    }

    #[test]
    fn test_spot_location_from_separate_fields_or_string() {
        let split = RemoteDocument::new("s")
            .with("name", "x")
            .with("latitude", 19.5)
            .with("longitude", -99.25);
        let encoded = RemoteDocument::new("s")
            .with("name", "x")
            .with("coordinates", "19.5,-99.25");

        let expected = GeoPoint::new(19.5, -99.25);
        assert_eq!(TouristSpot::from_document(&split).unwrap().location, expected);
        assert_eq!(TouristSpot::from_document(&encoded).unwrap().location, expected);
    }

    #[test]
    fn test_event_round_trip_with_and_without_end() {
        let doc = RemoteDocument::new("e1")
            .with("title", "Guelaguetza")
            .with("startDate", 1_753_000_000_000_i64)
            .with("endDate", "2025-07-28T20:00:00Z")
            .with("isFeatured", true)
            .with("coordinates", "17.0654,-96.7236");
        let event = Event::from_document(&doc).unwrap();
        assert!(event.end_date.is_some());
        assert_eq!(event.coordinates, Some(GeoPoint::new(17.0654, -96.7236)));
        round_trip(&event);

        let open_ended = Event::from_document(
            &RemoteDocument::new("e2")
                .with("title", "Market")
                .with("startDate", 1_753_000_000_000_i64),
        )
        .unwrap();
        let row = open_ended.to_cache_row();
        assert_eq!(row.end_date_ts, None);
        assert_eq!(row.coordinates, None);
        round_trip(&open_ended);
    }

    #[test]
    fn test_event_invalid_start_date() {
        let doc = RemoteDocument::new("e1")
            .with("title", "x")
            .with("startDate", "next tuesday");
        let err = Event::from_document(&doc).unwrap_err();
        assert!(matches!(err, MappingError::InvalidField { field: "startDate", .. }));
    }

    #[test]
    fn test_post_round_trip() {
        let post = BlogPost {
            id: "p1".to_string(),
            title: "Tacos al pastor".to_string(),
            content: "A guide".to_string(),
            category: "food".to_string(),
            author_name: "Ana".to_string(),
            author_id: "u1".to_string(),
            image_url: None,
            likes: 7,
            view_count: 99,
            is_featured: true,
            published_at: ts(1_700_000_000_000),
            tags: vec!["food".to_string(), String::new()],
        };
        round_trip(&post);
    }

    #[test]
    fn test_user_scoped_round_trips() {
        let favorite = Favorite::from_document(
            &RemoteDocument::new("f1")
                .with("userId", "u1")
                .with("placeId", "spot-1")
                .with("placeName", "Chichén Itzá")
                .with("createdAt", json!({"seconds": 1_700_000_000_i64, "nanoseconds": 0})),
        )
        .unwrap();
        round_trip(&favorite);

        let check_in = CheckIn::from_document(
            &RemoteDocument::new("c1")
                .with("userId", "u1")
                .with("placeId", "spot-1")
                .with("timestamp", 1_700_000_000_500_i64),
        )
        .unwrap();
        assert_eq!(check_in.place_name, "");
        round_trip(&check_in);
    }

    #[test]
    fn test_check_in_requires_timestamp() {
        let err = CheckIn::from_document(
            &RemoteDocument::new("c1").with("userId", "u1").with("placeId", "p"),
        )
        .unwrap_err();
        assert!(matches!(err, MappingError::MissingField { field: "timestamp", .. }));
    }

    #[test]
    fn test_to_cache_row_stamps_sync_time() {
        let before = Utc::now().timestamp_millis();
        let spot = TouristSpot::from_document(&full_spot_doc()).unwrap();
        let row = spot.to_cache_row();
        let after = Utc::now().timestamp_millis();
        assert!(row.last_synced_at >= before && row.last_synced_at <= after);

        let fixed = spot.to_cache_row_at(ts(5_000));
        assert_eq!(fixed.last_synced_at, 5_000);
    }
}
