use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A place the user bookmarked. Scoped to `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub place_id: String,
    pub place_name: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

/// A recorded visit to a place. Scoped to `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    pub id: String,
    pub user_id: String,
    pub place_id: String,
    pub place_name: String,
    pub category: String,
    pub timestamp: DateTime<Utc>,
}
