use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
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
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl BlogPost {
    /// First `max_chars` characters of the content, cut on a word boundary
    pub fn excerpt(&self, max_chars: usize) -> String {
        if self.content.chars().count() <= max_chars {
            return self.content.clone();
        }
        let cut: String = self.content.chars().take(max_chars).collect();
        match cut.rfind(char::is_whitespace) {
            Some(idx) if idx > 0 => format!("{}...", cut[..idx].trim_end()),
            _ => format!("{}...", cut),
        }
    }
}
