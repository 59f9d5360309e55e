use crate::error::SyncError;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

pub const STAR_FILLED: &str = "images/star-filled-19.png";
pub const STAR_EMPTY: &str = "images/star-empty-19.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkAction {
    Update,
    Toggle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkRequest {
    pub word: String,
    pub url: String,
    pub action: BookmarkAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkTarget {
    pub word: String,
    pub url: String,
}

impl BookmarkTarget {
    pub fn request(&self, action: BookmarkAction) -> BookmarkRequest {
        BookmarkRequest {
            word: self.word.clone(),
            url: self.url.clone(),
            action,
        }
    }
}

/// The process that durably stores bookmarks.
///
/// Responds with the bookmark state after handling the request; `None` when the word
/// has never been bookmarked.
pub trait PersistenceOwner {
    fn send(
        &self,
        request: BookmarkRequest,
    ) -> impl Future<Output = Result<Option<bool>, SyncError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookmarkState {
    Bookmarked,
    NotBookmarked,
    Pending,
}

impl BookmarkState {
    fn from_response(value: Option<bool>) -> Self {
        match value {
            Some(true) => BookmarkState::Bookmarked,
            Some(false) | None => BookmarkState::NotBookmarked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkIcon {
    state: BookmarkState,
    shown: Option<BookmarkState>,
    issued: u64,
    awaiting: Option<Ticket>,
}

impl Default for BookmarkIcon {
    fn default() -> Self {
        Self {
            state: BookmarkState::Pending,
            shown: None,
            issued: 0,
            awaiting: None,
        }
    }
}

impl BookmarkIcon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the cached state unknown and hands out the ticket of a new request.
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        let ticket = Ticket(self.issued);
        self.awaiting = Some(ticket);
        self.state = BookmarkState::Pending;
        ticket
    }

    /// Applies a response; returns false when a newer request superseded `ticket`.
    pub fn settle(&mut self, ticket: Ticket, value: Option<bool>) -> bool {
        if self.awaiting != Some(ticket) {
            return false;
        }
        self.awaiting = None;
        let state = BookmarkState::from_response(value);
        self.state = state;
        self.shown = Some(state);
        true
    }

    /// Gives up on `ticket`; the rendered icon stays as it was.
    pub fn abandon(&mut self, ticket: Ticket) {
        if self.awaiting == Some(ticket) {
            self.awaiting = None;
        }
    }

    pub fn state(&self) -> BookmarkState {
        self.state
    }

    pub fn image(&self) -> Option<&'static str> {
        self.shown.map(|state| match state {
            BookmarkState::Bookmarked => STAR_FILLED,
            BookmarkState::NotBookmarked | BookmarkState::Pending => STAR_EMPTY,
        })
    }
}

pub struct BookmarkSync<P> {
    owner: Arc<P>,
    target: BookmarkTarget,
    icon: Arc<Mutex<BookmarkIcon>>,
}

impl<P> Clone for BookmarkSync<P> {
    fn clone(&self) -> Self {
        Self {
            owner: Arc::clone(&self.owner),
            target: self.target.clone(),
            icon: Arc::clone(&self.icon),
        }
    }
}

impl<P: PersistenceOwner> BookmarkSync<P> {
    pub fn new(owner: Arc<P>, target: BookmarkTarget) -> Self {
        Self {
            owner,
            target,
            icon: Arc::new(Mutex::new(BookmarkIcon::new())),
        }
    }

    pub fn target(&self) -> &BookmarkTarget {
        &self.target
    }

    pub fn icon(&self) -> BookmarkIcon {
        self.icon.lock().clone()
    }

    /// Asks for the current state. `Some` when the response was applied to the icon.
    pub async fn refresh(&self) -> Option<BookmarkState> {
        self.exchange(BookmarkAction::Update).await
    }

    /// Asks the owner to flip the bookmark. `Some` when the response was applied.
    pub async fn toggle(&self) -> Option<BookmarkState> {
        self.exchange(BookmarkAction::Toggle).await
    }

    async fn exchange(&self, action: BookmarkAction) -> Option<BookmarkState> {
        let ticket = self.icon.lock().issue();
        let request = self.target.request(action);
        match self.owner.send(request).await {
            Ok(value) => {
                let mut icon = self.icon.lock();
                if icon.settle(ticket, value) {
                    Some(icon.state())
                } else {
                    debug!(
                        word = %self.target.word,
                        ?action,
                        "discarding superseded bookmark response"
                    );
                    None
                }
            }
            Err(_) => {
                self.icon.lock().abandon(ticket);
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBookmarkStore {
    entries: RwLock<HashMap<String, BookmarkRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkRecord {
    pub word: String,
    pub bookmarked: bool,
}

impl MemoryBookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self, request: &BookmarkRequest) -> Option<bool> {
        match request.action {
            BookmarkAction::Update => self
                .entries
                .read()
                .get(&request.url)
                .map(|record| record.bookmarked),
            BookmarkAction::Toggle => {
                let mut guard = self.entries.write();
                let record = guard
                    .entry(request.url.clone())
                    .or_insert_with(|| BookmarkRecord {
                        word: request.word.clone(),
                        bookmarked: false,
                    });
                record.bookmarked = !record.bookmarked;
                Some(record.bookmarked)
            }
        }
    }

    pub fn bookmarked_words(&self) -> Vec<String> {
        let mut words: Vec<String> = self
            .entries
            .read()
            .values()
            .filter(|record| record.bookmarked)
            .map(|record| record.word.clone())
            .collect();
        words.sort();
        words
    }
}

impl PersistenceOwner for MemoryBookmarkStore {
    async fn send(&self, request: BookmarkRequest) -> Result<Option<bool>, SyncError> {
        Ok(self.handle(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use tokio::sync::oneshot;

    fn target() -> BookmarkTarget {
        BookmarkTarget {
            word: "cat".to_string(),
            url: "http://learnersdictionary.com/definition/cat".to_string(),
        }
    }

    #[test]
    fn requests_serialize_to_wire_shape() {
        let value = serde_json::to_value(target().request(BookmarkAction::Toggle)).unwrap();
        assert_eq!(
            value,
            json!({
                "word": "cat",
                "url": "http://learnersdictionary.com/definition/cat",
                "action": "toggle",
            })
        );
        let response: Option<bool> = serde_json::from_str("null").unwrap();
        assert_eq!(response, None);
    }

    #[tokio::test]
    async fn update_toggle_update_sequence() {
        for initially in [None, Some(false), Some(true)] {
            let store = Arc::new(MemoryBookmarkStore::new());
            if initially.is_some() {
                store.handle(&target().request(BookmarkAction::Toggle));
            }
            if initially == Some(false) {
                store.handle(&target().request(BookmarkAction::Toggle));
            }
            let sync = BookmarkSync::new(Arc::clone(&store), target());
            let s0 = sync.refresh().await.expect("applied");
            let flipped = sync.toggle().await.expect("applied");
            let again = sync.refresh().await.expect("applied");
            let expected_flip = if s0 == BookmarkState::Bookmarked {
                BookmarkState::NotBookmarked
            } else {
                BookmarkState::Bookmarked
            };
            assert_eq!(s0, BookmarkState::from_response(initially));
            assert_eq!(flipped, expected_flip);
            assert_eq!(again, expected_flip);
        }
    }

    #[test]
    fn icon_is_pending_until_first_response() {
        let mut icon = BookmarkIcon::new();
        assert_eq!(icon.state(), BookmarkState::Pending);
        assert_eq!(icon.image(), None);
        let ticket = icon.issue();
        assert!(icon.settle(ticket, None));
        assert_eq!(icon.state(), BookmarkState::NotBookmarked);
        assert_eq!(icon.image(), Some(STAR_EMPTY));
    }

    #[test]
    fn toggle_invalidates_cache_without_changing_image() {
        let mut icon = BookmarkIcon::new();
        let first = icon.issue();
        icon.settle(first, Some(true));
        let second = icon.issue();
        assert_eq!(icon.state(), BookmarkState::Pending);
        assert_eq!(icon.image(), Some(STAR_FILLED));
        icon.abandon(second);
        assert_eq!(icon.image(), Some(STAR_FILLED));
    }

    #[test]
    fn superseded_ticket_is_ignored() {
        let mut icon = BookmarkIcon::new();
        let update = icon.issue();
        let toggle = icon.issue();
        assert!(icon.settle(toggle, Some(true)));
        assert!(!icon.settle(update, Some(false)));
        assert_eq!(icon.state(), BookmarkState::Bookmarked);
    }

    struct ScriptedOwner {
        replies: Mutex<VecDeque<oneshot::Receiver<Option<bool>>>>,
    }

    impl PersistenceOwner for ScriptedOwner {
        async fn send(&self, _request: BookmarkRequest) -> Result<Option<bool>, SyncError> {
            let reply = self
                .replies
                .lock()
                .pop_front()
                .ok_or(SyncError::Disconnected)?;
            reply.await.map_err(|_| SyncError::Disconnected)
        }
    }

    #[tokio::test]
    async fn late_update_response_does_not_clobber_toggle() {
        let (update_tx, update_rx) = oneshot::channel();
        let (toggle_tx, toggle_rx) = oneshot::channel();
        let owner = Arc::new(ScriptedOwner {
            replies: Mutex::new(VecDeque::from([update_rx, toggle_rx])),
        });
        let sync = BookmarkSync::new(owner, target());

        let (update, toggle, ()) = tokio::join!(sync.refresh(), sync.toggle(), async {
            toggle_tx.send(Some(true)).unwrap();
            tokio::task::yield_now().await;
            update_tx.send(Some(false)).unwrap();
        });

        assert_eq!(update, None);
        assert_eq!(toggle, Some(BookmarkState::Bookmarked));
        assert_eq!(sync.icon().image(), Some(STAR_FILLED));
    }

    #[tokio::test]
    async fn transport_failure_leaves_icon_untouched() {
        let (first_tx, first_rx) = oneshot::channel();
        let (second_tx, second_rx) = oneshot::channel::<Option<bool>>();
        let owner = Arc::new(ScriptedOwner {
            replies: Mutex::new(VecDeque::from([first_rx, second_rx])),
        });
        let sync = BookmarkSync::new(owner, target());
        first_tx.send(Some(true)).unwrap();
        assert_eq!(sync.refresh().await, Some(BookmarkState::Bookmarked));

        drop(second_tx);
        assert_eq!(sync.toggle().await, None);
        assert_eq!(sync.icon().image(), Some(STAR_FILLED));
    }

    #[test]
    fn store_lists_bookmarked_words() {
        let store = MemoryBookmarkStore::new();
        store.handle(&target().request(BookmarkAction::Toggle));
        assert_eq!(store.bookmarked_words(), ["cat"]);
        store.handle(&target().request(BookmarkAction::Toggle));
        assert!(store.bookmarked_words().is_empty());
    }
}
