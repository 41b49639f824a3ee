use serde::{Deserialize, Serialize};

/// Kind of row mutation carried by a change notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Delete,
}

/// A push event from the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    pub record_id: String,
    pub user_id: String,
}

/// Subscription filter: rows of `table` whose owner equals `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub table: String,
    pub user_id: String,
}

impl ChangeFilter {
    pub fn owned_by(table: &str, user_id: &str) -> Self {
        Self {
            table: table.to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.table == self.table && event.user_id == self.user_id
    }
}
