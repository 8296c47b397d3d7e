//! Scalar codecs for composite values stored in single cache columns.

use chrono::{DateTime, TimeZone, Utc};

use crate::models::GeoPoint;

/// Separator between latitude and longitude in an encoded point
const GEO_SEPARATOR: char = ',';

/// Encode a point as "lat,lon".
///
/// Rust's float formatting is shortest-round-trip, so decoding the result
/// yields the exact same `f64` values.
pub fn encode_geo_point(point: &GeoPoint) -> String {
    format!("{}{}{}", point.latitude, GEO_SEPARATOR, point.longitude)
}

/// Decode "lat,lon". Returns `None` unless there are exactly two finite
/// numeric components.
pub fn decode_geo_point(encoded: &str) -> Option<GeoPoint> {
    let mut parts = encoded.split(GEO_SEPARATOR);
    let latitude: f64 = parts.next()?.trim().parse().ok()?;
    let longitude: f64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || !latitude.is_finite() || !longitude.is_finite() {
        return None;
    }
    Some(GeoPoint::new(latitude, longitude))
}

pub fn encode_string_list(items: &[String]) -> String {
    // Serializing a slice of strings cannot fail.
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a JSON array of strings. Returns `None` for anything else.
pub fn decode_string_list(encoded: &str) -> Option<Vec<String>> {
    serde_json::from_str(encoded).ok()
}

pub fn timestamp_to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub fn timestamp_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Absent timestamps stay absent; they never become epoch zero.
pub fn optional_timestamp_to_millis(ts: Option<DateTime<Utc>>) -> Option<i64> {
    ts.map(timestamp_to_millis)
}

pub fn optional_timestamp_from_millis(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(timestamp_from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_round_trip() {
        let point = GeoPoint::new(19.5, -99.25);
        let encoded = encode_geo_point(&point);
        assert_eq!(encoded, "19.5,-99.25");
        assert_eq!(decode_geo_point(&encoded), Some(point));
    }

    #[test]
    fn test_geo_point_round_trip_is_exact() {
        let point = GeoPoint::new(20.967_370_123_456_78, -89.592_586_987_654_32);
        assert_eq!(decode_geo_point(&encode_geo_point(&point)), Some(point));
    }

    #[test]
    fn test_geo_point_rejects_malformed() {
        assert_eq!(decode_geo_point(""), None);
        assert_eq!(decode_geo_point("19.5"), None);
        assert_eq!(decode_geo_point("19.5,"), None);
        assert_eq!(decode_geo_point("a,b"), None);
        assert_eq!(decode_geo_point("1,2,3"), None);
        assert_eq!(decode_geo_point("NaN,2"), None);
    }

    #[test]
    fn test_string_list_round_trip() {
        let items = vec!["beach".to_string(), "with, comma".to_string(), "\"quoted\"".to_string()];
        let encoded = encode_string_list(&items);
        assert_eq!(decode_string_list(&encoded), Some(items));
    }

    #[test]
    fn test_empty_string_list() {
        assert_eq!(encode_string_list(&[]), "[]");
        assert_eq!(decode_string_list("[]"), Some(vec![]));
        assert_eq!(decode_string_list("not json"), None);
    }

    #[test]
    fn test_absent_timestamp_is_not_zero() {
        assert_eq!(optional_timestamp_to_millis(None), None);
        assert_eq!(optional_timestamp_from_millis(None), None);

        let ts = timestamp_from_millis(1_700_000_000_123).unwrap();
        assert_eq!(optional_timestamp_to_millis(Some(ts)), Some(1_700_000_000_123));
    }
}
