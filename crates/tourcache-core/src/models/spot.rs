use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TouristSpot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: GeoPoint,
    pub rating: f64,
    pub review_count: i64,
    pub address: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub hours: Option<String>,
    pub image_url: Option<String>,
    pub visit_count: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TouristSpot {
    /// Rating rendered with one decimal, or "New" when nobody reviewed it yet
    pub fn rating_display(&self) -> String {
        if self.review_count == 0 {
            "New".to_string()
        } else {
            format!("{:.1} ({})", self.rating, self.review_count)
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
