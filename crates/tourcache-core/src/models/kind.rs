use serde::{Deserialize, Serialize};

/// One of the five collections mirrored into the offline cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Spots,
    Events,
    Posts,
    Favorites,
    CheckIns,
}

impl EntityKind {
    /// Kinds shared by every user, in sync order.
    pub const GLOBAL: [EntityKind; 3] = [EntityKind::Spots, EntityKind::Events, EntityKind::Posts];

    /// Kinds scoped to the active identity, in sync order.
    pub const USER_SCOPED: [EntityKind; 2] = [EntityKind::Favorites, EntityKind::CheckIns];

    /// Name of the collection on the remote store
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Spots => "touristSpots",
            EntityKind::Events => "events",
            EntityKind::Posts => "blogPosts",
            EntityKind::Favorites => "favorites",
            EntityKind::CheckIns => "checkIns",
        }
    }

    /// Name of the local cache table
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Spots => "tourist_spots",
            EntityKind::Events => "events",
            EntityKind::Posts => "blog_posts",
            EntityKind::Favorites => "favorites",
            EntityKind::CheckIns => "check_ins",
        }
    }

    pub fn is_user_scoped(&self) -> bool {
        matches!(self, EntityKind::Favorites | EntityKind::CheckIns)
    }

    /// Rough on-disk weight of one cached row, in bytes.
    ///
    /// Only feeds the size estimate shown to users; it is not measured.
    pub fn estimated_row_bytes(&self) -> u64 {
        match self {
            EntityKind::Spots => 2048,
            EntityKind::Events => 1536,
            EntityKind::Posts => 4096,
            EntityKind::Favorites | EntityKind::CheckIns => 256,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Spots => write!(f, "spots"),
            EntityKind::Events => write!(f, "events"),
            EntityKind::Posts => write!(f, "posts"),
            EntityKind::Favorites => write!(f, "favorites"),
            EntityKind::CheckIns => write!(f, "check_ins"),
        }
    }
}
