//! Change notifications.
//!
//! Subscribers receive only the events matching their [`ChangeFilter`].
//! Payloads carry no guarantee beyond "something matching changed"; the
//! client treats every delivery as a signal to refetch.

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use super::Backend;
use crate::types::change::{ChangeEvent, ChangeFilter};

/// Push channel the client consumes.
pub trait ChangeFeed: Send + Sync {
    /// Opens a filtered subscription. Dropping it releases the channel.
    fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription;
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A matching row changed.
    Changed(ChangeEvent),
    /// The subscriber fell behind and `n` events were dropped unseen; some of
    /// them may have matched.
    Missed(u64),
}

/// A live, filtered view of the change broadcast.
pub struct ChangeSubscription {
    filter: ChangeFilter,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub fn new(filter: ChangeFilter, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { filter, rx }
    }

    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    /// Waits for the next matching notification. `None` once the feed closes.
    pub async fn next(&mut self) -> Option<Notification> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(Notification::Changed(event));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => {
                    warn!(missed = n, user_id = %self.filter.user_id, "change subscription lagged");
                    return Some(Notification::Missed(n));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        debug!(table = %self.filter.table, user_id = %self.filter.user_id, "change subscription closed");
    }
}

impl ChangeFeed for Backend {
    fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription {
        debug!(table = %filter.table, user_id = %filter.user_id, "change subscription opened");
        ChangeSubscription::new(filter, self.change_receiver())
    }
}
