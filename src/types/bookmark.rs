use serde::{Deserialize, Serialize};

/// A saved bookmark as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    pub user_id: String,
    /// Unix milliseconds. Lists are ordered newest first on this field.
    pub created_at: i64,
}

/// Fields the client supplies when inserting a bookmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub user_id: String,
}
