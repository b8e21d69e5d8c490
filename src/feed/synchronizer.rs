use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::db::mention_repository::MentionRepository;
use crate::db::models::Mention;

const RESUBSCRIBE_INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const RESUBSCRIBE_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Lifecycle of a viewer's mention feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// No subscription is running.
    Idle,
    /// A standing subscription is delivering snapshots, or reconnecting.
    Subscribed,
}

/// Messages surfaced to one viewer during one session.
///
/// The list only grows. Identity tracking guarantees a message is appended
/// at most once, even when consecutive snapshots still show it as unseen
/// because its acknowledgment has not landed yet.
#[derive(Debug, Default)]
pub struct DisplayList {
    items: Vec<Mention>,
    seen_ids: HashSet<String>,
    unacknowledged: Vec<String>,
}

impl DisplayList {
    /// Scan a full snapshot and append every message that is unseen by
    /// `viewer` and not yet displayed. Returns the newly appended messages.
    pub fn absorb(&mut self, snapshot: &[Mention], viewer: &str) -> Vec<Mention> {
        let fresh: Vec<Mention> = snapshot
            .iter()
            .filter(|m| m.is_unseen_by(viewer) && !self.seen_ids.contains(&m.id))
            .cloned()
            .collect();

        for mention in &fresh {
            self.seen_ids.insert(mention.id.clone());
            self.unacknowledged.push(mention.id.clone());
            self.items.push(mention.clone());
        }
        fresh
    }

    /// Ids appended since the last call, in surfacing order.
    pub fn take_unacknowledged(&mut self) -> Vec<String> {
        std::mem::take(&mut self.unacknowledged)
    }

    pub fn items(&self) -> &[Mention] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Owns the background subscription task. Dropping the handle cancels it,
/// so every exit path of the owning session tears the subscription down.
struct FeedHandle {
    task: JoinHandle<()>,
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Per-viewer mention feed.
///
/// `start` opens a subscription on the mentions collection and folds every
/// snapshot into the display list. A failed or finished subscription is
/// reopened with exponential backoff until the feed is stopped. Messages are
/// acknowledged only once `deliver` hands them to the viewer.
pub struct MentionFeed {
    viewer: String,
    repo: Arc<dyn MentionRepository>,
    display: Arc<Mutex<DisplayList>>,
    handle: Mutex<Option<FeedHandle>>,
}

impl MentionFeed {
    pub fn new(viewer: impl Into<String>, repo: Arc<dyn MentionRepository>) -> Self {
        Self {
            viewer: viewer.into(),
            repo,
            display: Arc::new(Mutex::new(DisplayList::default())),
            handle: Mutex::new(None),
        }
    }

    pub fn viewer(&self) -> &str {
        &self.viewer
    }

    pub fn state(&self) -> FeedState {
        match self.handle.lock() {
            Ok(handle) if handle.is_some() => FeedState::Subscribed,
            _ => FeedState::Idle,
        }
    }

    /// Open the subscription. Calling it on a subscribed feed is a no-op.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let Ok(mut handle) = self.handle.lock() else {
            tracing::error!("Mention feed lock poisoned for {}", self.viewer);
            return;
        };
        if handle.is_some() {
            return;
        }

        let task = tokio::spawn(run_subscription(
            self.viewer.clone(),
            self.repo.clone(),
            self.display.clone(),
        ));

        *handle = Some(FeedHandle { task });
        tracing::info!("Mention feed subscribed for {}", self.viewer);
    }

    /// Cancel the subscription. The display list is kept.
    pub fn stop(&self) {
        if let Ok(mut handle) = self.handle.lock() {
            if handle.take().is_some() {
                tracing::info!("Mention feed unsubscribed for {}", self.viewer);
            }
        }
    }

    /// Everything surfaced so far, in the order it was surfaced.
    pub fn displayed(&self) -> Vec<Mention> {
        self.display
            .lock()
            .map(|list| list.items().to_vec())
            .unwrap_or_default()
    }

    /// Hand the display list to the viewer and acknowledge every message
    /// that had not been delivered before.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn deliver(&self) -> Vec<Mention> {
        let (items, unacknowledged) = match self.display.lock() {
            Ok(mut list) => (list.items().to_vec(), list.take_unacknowledged()),
            Err(_) => {
                tracing::error!("Mention display list poisoned for {}", self.viewer);
                return Vec::new();
            }
        };

        for id in unacknowledged {
            acknowledge(self.repo.clone(), id, self.viewer.clone());
        }
        items
    }
}

async fn run_subscription(
    viewer: String,
    repo: Arc<dyn MentionRepository>,
    display: Arc<Mutex<DisplayList>>,
) {
    let mut backoff = RESUBSCRIBE_INITIAL_BACKOFF;
    loop {
        match repo.subscribe().await {
            Ok(mut snapshots) => {
                while let Some(snapshot) = snapshots.next().await {
                    let snapshot = match snapshot {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            tracing::warn!("Mention feed update failed for {viewer}: {e}");
                            break;
                        }
                    };
                    backoff = RESUBSCRIBE_INITIAL_BACKOFF;

                    match display.lock() {
                        Ok(mut list) => {
                            for mention in list.absorb(&snapshot, &viewer) {
                                tracing::debug!("Surfacing mention {} to {viewer}", mention.id);
                            }
                        }
                        Err(_) => {
                            tracing::error!("Mention display list poisoned for {viewer}");
                            return;
                        }
                    }
                }
            }
            Err(e) => tracing::warn!("Failed to subscribe mention feed for {viewer}: {e}"),
        }

        tracing::info!("Mention subscription for {viewer} ended, retrying in {backoff:?}");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(RESUBSCRIBE_MAX_BACKOFF);
    }
}

/// Fire-and-forget acknowledgment. Failures are logged and not retried.
fn acknowledge(repo: Arc<dyn MentionRepository>, id: String, viewer: String) {
    tokio::spawn(async move {
        if let Err(e) = repo.mark_seen(&id, &viewer).await {
            tracing::warn!("Failed to mark mention {id} seen by {viewer}: {e}");
        }
    });
}
