//! Sync Controller: keeps the bookmark cache in step with the backend.
//!
//! Policy: full-snapshot refresh. For each signed-in generation the
//! controller opens one change subscription scoped to the user's rows and
//! refetches the whole list on every notification. Incremental patching is
//! deliberately absent; lists are small.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::state::Action;
use super::store::Store;
use crate::backend::bookmark_store::BOOKMARKS_TABLE;
use crate::backend::{BookmarkStore, ChangeFeed, Notification};
use crate::types::change::ChangeFilter;
use crate::types::errors::StoreError;
use crate::types::session::Session;

/// Fetches the user's bookmarks and replaces the cache with them.
///
/// The load is tagged with `generation`, so it is discarded if the session
/// changed while the fetch was in flight.
pub async fn refresh(
    store: &Store,
    bookmarks: &dyn BookmarkStore,
    session: &Session,
    generation: u64,
) -> Result<usize, StoreError> {
    let items = bookmarks.list_for_owner(&session.user_id).await?;
    let count = items.len();
    store.dispatch(Action::BookmarksLoaded {
        generation,
        bookmarks: items,
    });
    debug!(user_id = %session.user_id, generation, count, "bookmarks refreshed");
    Ok(count)
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct SyncController {
    task: JoinHandle<()>,
}

impl SyncController {
    pub fn mount(store: Store, bookmarks: Arc<dyn BookmarkStore>, feed: Arc<dyn ChangeFeed>) -> Self {
        let mut states = store.subscribe();

        let task = tokio::spawn(async move {
            let mut active: Option<u64> = None;
            let mut worker: Option<AbortOnDrop> = None;

            loop {
                let (generation, session) = {
                    let state = states.borrow_and_update();
                    (state.session_generation, state.session.clone())
                };

                if active != Some(generation) {
                    active = Some(generation);
                    // Dropping the old worker closes its subscription.
                    worker = session.map(|session| {
                        AbortOnDrop(tokio::spawn(run_session(
                            store.clone(),
                            bookmarks.clone(),
                            feed.clone(),
                            session,
                            generation,
                        )))
                    });
                }

                if states.changed().await.is_err() {
                    break;
                }
            }
            drop(worker);
        });

        Self { task }
    }

    /// Closes the subscription and stops refreshing.
    pub fn teardown(&self) {
        self.task.abort();
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_session(
    store: Store,
    bookmarks: Arc<dyn BookmarkStore>,
    feed: Arc<dyn ChangeFeed>,
    session: Session,
    generation: u64,
) {
    // Subscribe before the first fetch so no change falls between them.
    let mut subscription = feed.subscribe(ChangeFilter::owned_by(BOOKMARKS_TABLE, &session.user_id));

    if let Err(e) = refresh(&store, bookmarks.as_ref(), &session, generation).await {
        warn!(error = %e, user_id = %session.user_id, "initial bookmark fetch failed");
    }

    while let Some(notification) = subscription.next().await {
        if let Notification::Changed(event) = &notification {
            debug!(kind = ?event.kind, record_id = %event.record_id, "remote change");
        }
        if let Err(e) = refresh(&store, bookmarks.as_ref(), &session, generation).await {
            warn!(error = %e, user_id = %session.user_id, "bookmark refresh failed");
        }
    }
}
