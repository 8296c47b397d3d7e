//! Loosely-typed documents as returned by the remote store.
//!
//! Remote collections are schemaless: any field can be missing and numeric
//! fields are not always encoded the same way. The accessors here never
//! fail; they return `None` and leave the policy (default or reject) to the
//! entity mapper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::mapper::codecs;

use super::GeoPoint;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteDocument {
    /// Server-assigned identifier
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RemoteDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style setter, mostly useful when assembling fixtures
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    pub fn str_field(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Like [`str_field`](Self::str_field) but treats blank strings as missing
    pub fn non_empty_str_field(&self, field: &str) -> Option<String> {
        self.str_field(field).filter(|s| !s.trim().is_empty())
    }

    pub fn f64_field(&self, field: &str) -> Option<f64> {
        match self.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn i64_field(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn bool_field(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Accepts epoch millis, RFC 3339 strings and `{seconds, nanoseconds}`
    /// objects. The result is truncated to millisecond precision, which is
    /// what the cache stores.
    pub fn timestamp_field(&self, field: &str) -> Option<DateTime<Utc>> {
        let parsed = match self.get(field)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(codecs::timestamp_from_millis),
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|| s.trim().parse().ok().and_then(codecs::timestamp_from_millis)),
            Value::Object(obj) => {
                let seconds = obj
                    .get("seconds")
                    .or_else(|| obj.get("_seconds"))
                    .and_then(Value::as_i64)?;
                let nanos = obj
                    .get("nanoseconds")
                    .or_else(|| obj.get("_nanoseconds"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                // Out-of-range values read as absent
                seconds
                    .checked_mul(1000)
                    .and_then(|ms| ms.checked_add(nanos / 1_000_000))
                    .and_then(codecs::timestamp_from_millis)
            }
            _ => None,
        }?;
        codecs::timestamp_from_millis(codecs::timestamp_to_millis(parsed))
    }

    /// Accepts a JSON array of strings or a JSON-encoded array in a string.
    /// Non-string array members are skipped.
    pub fn string_list_field(&self, field: &str) -> Option<Vec<String>> {
        match self.get(field)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            Value::String(s) => codecs::decode_string_list(s),
            _ => None,
        }
    }

    /// Accepts `{latitude, longitude}` objects and "lat,lon" strings.
    pub fn geo_point_field(&self, field: &str) -> Option<GeoPoint> {
        match self.get(field)? {
            Value::Object(obj) => {
                let latitude = obj
                    .get("latitude")
                    .or_else(|| obj.get("_latitude"))
                    .and_then(Value::as_f64)?;
                let longitude = obj
                    .get("longitude")
                    .or_else(|| obj.get("_longitude"))
                    .and_then(Value::as_f64)?;
                Some(GeoPoint::new(latitude, longitude))
            }
            Value::String(s) => codecs::decode_geo_point(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_flat_json_object() {
        let doc: RemoteDocument = serde_json::from_value(json!({
            "id": "abc",
            "name": "Museo",
            "rating": 4.5
        }))
        .unwrap();
        assert_eq!(doc.id, "abc");
        assert_eq!(doc.str_field("name").as_deref(), Some("Museo"));
        assert_eq!(doc.f64_field("rating"), Some(4.5));
    }

    #[test]
    fn test_numeric_fields_tolerate_strings() {
        let doc = RemoteDocument::new("x")
            .with("reviews", "12")
            .with("rating", " 3.25 ")
            .with("featured", "yes");
        assert_eq!(doc.i64_field("reviews"), Some(12));
        assert_eq!(doc.f64_field("rating"), Some(3.25));
        assert_eq!(doc.bool_field("featured"), Some(true));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let doc = RemoteDocument::new("x").with("phone", Value::Null);
        assert_eq!(doc.str_field("phone"), None);
    }

    #[test]
    fn test_timestamp_formats() {
        let millis = RemoteDocument::new("x").with("t", 1_700_000_000_123_i64);
        let rfc = RemoteDocument::new("x").with("t", "2023-11-14T22:13:20.123456Z");
        let object = RemoteDocument::new("x").with(
            "t",
            json!({"seconds": 1_700_000_000_i64, "nanoseconds": 123_456_789}),
        );

        let expected = codecs::timestamp_from_millis(1_700_000_000_123).unwrap();
        assert_eq!(millis.timestamp_field("t"), Some(expected));
        assert_eq!(rfc.timestamp_field("t"), Some(expected));
        assert_eq!(object.timestamp_field("t"), Some(expected));
    }

    #[test]
    fn test_out_of_range_timestamp_object_is_absent() {
        let huge = RemoteDocument::new("x")
            .with("t", json!({"seconds": 92_233_720_368_547_750_i64}));
        let near_max = RemoteDocument::new("x").with(
            "t",
            json!({"seconds": i64::MAX / 1000, "nanoseconds": 999_999_999}),
        );
        let negative = RemoteDocument::new("x").with("t", json!({"seconds": i64::MIN}));

        assert_eq!(huge.timestamp_field("t"), None);
        assert_eq!(near_max.timestamp_field("t"), None);
        assert_eq!(negative.timestamp_field("t"), None);
    }

    #[test]
    fn test_geo_point_formats() {
        let object = RemoteDocument::new("x")
            .with("loc", json!({"latitude": 19.5, "longitude": -99.25}));
        let string = RemoteDocument::new("x").with("loc", "19.5,-99.25");
        let broken = RemoteDocument::new("x").with("loc", "19.5");

        assert_eq!(object.geo_point_field("loc"), Some(GeoPoint::new(19.5, -99.25)));
        assert_eq!(string.geo_point_field("loc"), Some(GeoPoint::new(19.5, -99.25)));
        assert_eq!(broken.geo_point_field("loc"), None);
    }

    #[test]
    fn test_string_list_skips_non_strings() {
        let doc = RemoteDocument::new("x").with("tags", json!(["a", 1, "b"]));
        assert_eq!(
            doc.string_list_field("tags"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }
}
