//! Feed transport abstraction and implementations
//!
//! The collection engine only ever talks to a [`FeedClient`]; the megalodon
//! adapter in [`mastodon`] is the production transport and [`mock`] is the
//! scripted one used by tests.

use async_trait::async_trait;
use std::fmt;

use crate::error::FetchError;
use crate::types::{FeedItem, RateLimitSnapshot, Subject, SubjectId};

pub mod mastodon;

// The mock client is available for all builds (not just tests) to support
// integration tests
pub mod mock;

/// Which feed a page is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedRef {
    /// The authenticated user's home timeline.
    Home,
    /// One account's own timeline.
    Account(SubjectId),
}

impl fmt::Display for FeedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedRef::Home => write!(f, "home"),
            FeedRef::Account(id) => write!(f, "account:{}", id),
        }
    }
}

/// Transport seam between the collection engine and the remote API.
///
/// `fetch_page` returns up to `page_size` items newest-first. `max_id` is an
/// exclusive upper bound from the caller's point of view, but the API treats
/// it as inclusive: the boundary item may come back at the head of the next
/// page and consumers must tolerate the duplicate.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch one page of a feed, newest first.
    async fn fetch_page(
        &self,
        feed: &FeedRef,
        page_size: u32,
        max_id: Option<&str>,
    ) -> Result<Vec<FeedItem>, FetchError>;

    /// List the accounts the authenticated user follows.
    async fn list_subjects(&self) -> Result<Vec<Subject>, FetchError>;

    /// Resolve a handle to a subject.
    async fn lookup_subject(&self, handle: &str) -> Result<Subject, FetchError>;

    /// Current rate-limit state. Side-effect-free; callable at any time.
    ///
    /// `remaining` is only valid at the instant it was read; callers that
    /// waited for a reset must query again before acting.
    async fn rate_limit_status(&self) -> Result<RateLimitSnapshot, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_ref_display() {
        assert_eq!(FeedRef::Home.to_string(), "home");
        assert_eq!(FeedRef::Account("42".to_string()).to_string(), "account:42");
    }
}
