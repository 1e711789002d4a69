//! Mock feed transport for testing
//!
//! A configurable client that serves scripted pages, injects failures, and
//! records calls for verification. Used by the collection engine's unit
//! tests and by integration tests, without network access or credentials.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::client::{FeedClient, FeedRef};
use crate::error::FetchError;
use crate::types::{FeedItem, RateLimitSnapshot, Subject};

type PageResult = Result<Vec<FeedItem>, FetchError>;

/// One recorded `fetch_page` call: the feed and the `max_id` passed.
pub type FetchCall = (String, Option<String>);

/// Scripted [`FeedClient`] implementation.
///
/// Pages are queued per feed and served in order; when a feed's queue runs
/// dry an empty page is returned, matching an exhausted timeline.
#[derive(Default)]
pub struct MockFeed {
    subjects: Vec<Subject>,
    roster_error: Option<FetchError>,
    pages: Mutex<HashMap<FeedRef, VecDeque<PageResult>>>,
    /// Snapshots served by `rate_limit_status`, in order; the last one
    /// repeats once the queue is empty.
    snapshots: Mutex<VecDeque<RateLimitSnapshot>>,
    last_snapshot: Mutex<Option<RateLimitSnapshot>>,
    fetch_calls: Arc<Mutex<Vec<FetchCall>>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subject to the roster (also resolvable by handle).
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subjects.push(subject);
        self
    }

    /// Make `list_subjects` fail.
    pub fn with_roster_error(mut self, error: FetchError) -> Self {
        self.roster_error = Some(error);
        self
    }

    /// Queue a page for a feed.
    pub fn with_page(self, feed: FeedRef, page: Vec<FeedItem>) -> Self {
        self.push_page(feed, Ok(page));
        self
    }

    /// Queue a failing fetch for a feed.
    pub fn with_page_error(self, feed: FeedRef, error: FetchError) -> Self {
        self.push_page(feed, Err(error));
        self
    }

    /// Queue a rate-limit snapshot.
    pub fn with_snapshot(self, snapshot: RateLimitSnapshot) -> Self {
        self.snapshots.lock().unwrap().push_back(snapshot);
        self
    }

    fn push_page(&self, feed: FeedRef, page: PageResult) {
        self.pages.lock().unwrap().entry(feed).or_default().push_back(page);
    }

    /// Handle to the recorded `fetch_page` calls.
    pub fn fetch_calls(&self) -> Arc<Mutex<Vec<FetchCall>>> {
        Arc::clone(&self.fetch_calls)
    }

    /// Number of `fetch_page` calls made so far.
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl FeedClient for MockFeed {
    async fn fetch_page(
        &self,
        feed: &FeedRef,
        _page_size: u32,
        max_id: Option<&str>,
    ) -> Result<Vec<FeedItem>, FetchError> {
        self.fetch_calls
            .lock()
            .unwrap()
            .push((feed.to_string(), max_id.map(str::to_string)));

        let next = self
            .pages
            .lock()
            .unwrap()
            .get_mut(feed)
            .and_then(|queue| queue.pop_front());
        match next {
            Some(result) => result,
            None => Ok(Vec::new()),
        }
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, FetchError> {
        match &self.roster_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.subjects.clone()),
        }
    }

    async fn lookup_subject(&self, handle: &str) -> Result<Subject, FetchError> {
        self.subjects
            .iter()
            .find(|subject| subject.handle == handle)
            .cloned()
            .ok_or_else(|| FetchError::Api(format!("no such account: {}", handle)))
    }

    async fn rate_limit_status(&self) -> Result<RateLimitSnapshot, FetchError> {
        if let Some(snapshot) = self.snapshots.lock().unwrap().pop_front() {
            *self.last_snapshot.lock().unwrap() = Some(snapshot);
            return Ok(snapshot);
        }
        if let Some(snapshot) = *self.last_snapshot.lock().unwrap() {
            return Ok(snapshot);
        }
        Ok(relaxed_snapshot())
    }
}

/// A snapshot with the whole budget still available.
pub fn relaxed_snapshot() -> RateLimitSnapshot {
    RateLimitSnapshot {
        limit: 300,
        remaining: 300,
        reset: Utc::now() + Duration::minutes(5),
    }
}

/// Test subject with predictable fields.
pub fn make_subject(id: &str, handle: &str) -> Subject {
    Subject {
        id: id.to_string(),
        name: format!("{} Example", handle),
        handle: handle.to_string(),
    }
}

/// Test item authored by `author` at `created_at`.
pub fn make_item(id: &str, created_at: DateTime<Utc>, author: &Subject) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        created_at,
        author: author.clone(),
        text: format!("item {}", id),
        entities: Default::default(),
        boosts: 0,
        favourites: 0,
    }
}
