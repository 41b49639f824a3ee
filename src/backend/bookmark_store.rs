//! Bookmark persistence.
//!
//! Every query is scoped to an owner: listing filters on `user_id` and delete
//! requires the caller's `user_id` to match, so one user can never see or
//! remove another user's rows regardless of what the client sends.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tracing::debug;
use uuid::Uuid;

use super::{now_millis, Backend};
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::change::{ChangeEvent, ChangeKind};
use crate::types::errors::StoreError;

/// Name of the bookmark collection, as seen by change-feed filters.
pub const BOOKMARKS_TABLE: &str = "bookmarks";

/// Persistence operations the client consumes.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// All bookmarks owned by `user_id`, newest first.
    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<Bookmark>, StoreError>;

    /// Inserts a bookmark and returns it with its backend-assigned fields.
    async fn insert(&self, new: NewBookmark) -> Result<Bookmark, StoreError>;

    /// Deletes bookmark `id` if and only if it is owned by `user_id`.
    async fn delete(&self, id: &str, user_id: &str) -> Result<(), StoreError>;
}

/// Maps a row to a `Bookmark` by column name.
fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
    Ok(Bookmark {
        id: row.get("id")?,
        title: row.get("title")?,
        url: row.get("url")?,
        user_id: row.get("user_id")?,
        created_at: row.get("created_at")?,
    })
}

/// Next creation timestamp: the wall clock, bumped past the newest row so
/// ordering by `created_at` matches insertion order.
fn next_created_at(conn: &Connection) -> Result<i64, rusqlite::Error> {
    let newest: i64 = conn.query_row(
        "SELECT COALESCE(MAX(created_at), 0) FROM bookmarks",
        [],
        |row| row.get(0),
    )?;
    Ok(now_millis().max(newest + 1))
}

#[async_trait]
impl BookmarkStore for Backend {
    async fn list_for_owner(&self, user_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, url, user_id, created_at FROM bookmarks \
                 WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt.query_map(params![user_id], row_to_bookmark)?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row?);
            }
            Ok(results)
        })
    }

    async fn insert(&self, new: NewBookmark) -> Result<Bookmark, StoreError> {
        let bookmark = self.with_conn(|conn| {
            let bookmark = Bookmark {
                id: Uuid::new_v4().to_string(),
                title: new.title,
                url: new.url,
                user_id: new.user_id,
                created_at: next_created_at(conn)?,
            };
            conn.execute(
                "INSERT INTO bookmarks (id, title, url, user_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    bookmark.id,
                    bookmark.title,
                    bookmark.url,
                    bookmark.user_id,
                    bookmark.created_at
                ],
            )?;
            Ok::<_, StoreError>(bookmark)
        })?;

        debug!(id = %bookmark.id, user_id = %bookmark.user_id, "bookmark inserted");
        self.publish(ChangeEvent {
            table: BOOKMARKS_TABLE.to_string(),
            kind: ChangeKind::Insert,
            record_id: bookmark.id.clone(),
            user_id: bookmark.user_id.clone(),
        });
        Ok(bookmark)
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<(), StoreError> {
        let affected = self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM bookmarks WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )
            .map_err(StoreError::from)
        })?;

        if affected == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        debug!(id, user_id, "bookmark deleted");
        self.publish(ChangeEvent {
            table: BOOKMARKS_TABLE.to_string(),
            kind: ChangeKind::Delete,
            record_id: id.to_string(),
            user_id: user_id.to_string(),
        });
        Ok(())
    }
}
