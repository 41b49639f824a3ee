//! Client application state and its reducer.
//!
//! All client state lives in one [`AppState`] value. It changes only through
//! [`reduce`], which the [`Store`](super::store::Store) applies atomically for
//! every dispatched [`Action`].

use serde::Serialize;

use crate::types::bookmark::Bookmark;
use crate::types::session::Session;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppState {
    pub session: Option<Session>,
    /// Bumped whenever the signed-in identity changes. Work started under an
    /// older generation must not touch the state.
    pub session_generation: u64,
    /// Point-in-time snapshot of the user's bookmarks, newest first.
    pub bookmarks: Vec<Bookmark>,
    /// Number of snapshots applied so far.
    pub snapshot_version: u64,
    pub title_input: String,
    pub url_input: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SessionChanged(Option<Session>),
    BookmarksLoaded {
        generation: u64,
        bookmarks: Vec<Bookmark>,
    },
    SetTitle(String),
    SetUrl(String),
    ClearInputs,
}

/// Applies `action` to `state`. Returns whether anything changed.
pub fn reduce(state: &mut AppState, action: Action) -> bool {
    match action {
        Action::SessionChanged(next) => {
            let same_identity = match (&state.session, &next) {
                (Some(a), Some(b)) => a.user_id == b.user_id,
                (None, None) => true,
                _ => false,
            };

            if same_identity {
                // Token refresh or a repeated event: keep the cache.
                if state.session == next {
                    return false;
                }
                state.session = next;
                return true;
            }

            state.session = next;
            state.session_generation += 1;
            state.bookmarks.clear();
            true
        }
        Action::BookmarksLoaded {
            generation,
            bookmarks,
        } => {
            if generation != state.session_generation || state.session.is_none() {
                return false;
            }
            state.bookmarks = bookmarks;
            state.snapshot_version += 1;
            true
        }
        Action::SetTitle(title) => replace_if_changed(&mut state.title_input, title),
        Action::SetUrl(url) => replace_if_changed(&mut state.url_input, url),
        Action::ClearInputs => {
            let changed = !state.title_input.is_empty() || !state.url_input.is_empty();
            state.title_input.clear();
            state.url_input.clear();
            changed
        }
    }
}

fn replace_if_changed(slot: &mut String, value: String) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}
