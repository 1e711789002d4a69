//! Bounded incremental feed collection
//!
//! [`CursorPager`] walks one feed backward in time, page by page, until the
//! collection window's origin is crossed. Pages overlap at the cursor (the
//! API treats the upper bound as inclusive), so accepted items pass through
//! a [`DedupAccumulator`] indexed by identifier. The shared
//! [`RateLimitGovernor`] is consulted after every page.

use std::collections::HashSet;
use std::time::Duration;

use crate::client::{FeedClient, FeedRef};
use crate::error::FetchError;
use crate::governor::{RateLimitGovernor, Verdict};
use crate::types::{CollectionWindow, FeedItem};

/// Canonical page size requested from the feed endpoint.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Pause between page fetches, staying under burst limits.
pub const DEFAULT_PAGE_PACING: Duration = Duration::from_secs(1);

/// Why a walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The feed returned an empty page.
    Exhausted,
    /// An item older than the window origin was seen.
    BoundaryCrossed,
    /// A non-empty page produced no newly accepted item, or the last
    /// accepted id equaled the previous cursor. Guards against a stuck API.
    NoProgress,
    /// The operator chose to abort at the rate-limit prompt.
    Aborted,
    /// The transport failed mid-walk; items collected so far are kept.
    Failed(FetchError),
}

/// Result of one feed walk: accepted items, newest first.
#[derive(Debug)]
pub struct Walk {
    pub items: Vec<FeedItem>,
    pub stop: StopReason,
}

impl Walk {
    pub fn aborted(&self) -> bool {
        self.stop == StopReason::Aborted
    }
}

/// Append-only item collection that silently rejects duplicate identifiers.
#[derive(Debug, Default)]
pub struct DedupAccumulator {
    seen: HashSet<String>,
    items: Vec<FeedItem>,
}

impl DedupAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless its id was already accepted. Returns whether the
    /// item was accepted.
    pub fn push(&mut self, item: FeedItem) -> bool {
        if !self.seen.insert(item.id.clone()) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<FeedItem> {
        self.items
    }
}

/// Walks one feed backward in time with an exclusive-upper-bound cursor.
pub struct CursorPager<'a> {
    client: &'a dyn FeedClient,
    governor: &'a mut RateLimitGovernor,
    page_size: u32,
    pacing: Duration,
}

impl<'a> CursorPager<'a> {
    pub fn new(client: &'a dyn FeedClient, governor: &'a mut RateLimitGovernor) -> Self {
        Self {
            client,
            governor,
            page_size: DEFAULT_PAGE_SIZE,
            pacing: DEFAULT_PAGE_PACING,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Collect every item of `feed` inside `window`, newest first.
    ///
    /// Pages are assumed sorted by non-increasing timestamp, so the first
    /// item older than the window origin ends the scan of that page and the
    /// whole walk.
    pub async fn collect(&mut self, feed: &FeedRef, window: &CollectionWindow) -> Walk {
        let mut accumulator = DedupAccumulator::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = match self
                .client
                .fetch_page(feed, self.page_size, cursor.as_deref())
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    return Walk {
                        items: accumulator.into_items(),
                        stop: StopReason::Failed(error),
                    }
                }
            };

            let page_total = page.len();
            let mut last_id: Option<String> = None;
            let mut crossed = false;
            for item in page {
                if !window.contains(item.created_at) {
                    crossed = true;
                    break;
                }
                let id = item.id.clone();
                // Cursor bounds are inclusive on the API side, so the
                // previous page's tail item can come back; drop it silently.
                if accumulator.push(item) {
                    last_id = Some(id);
                }
            }

            tracing::debug!(
                feed = %feed,
                page_total,
                accepted_total = accumulator.len(),
                last_id = last_id.as_deref().unwrap_or("-"),
                cursor = cursor.as_deref().unwrap_or("-"),
                "page processed"
            );

            // The governor runs before the termination checks: a wait here
            // also protects whatever walk comes next.
            match self.consult_governor(window.offset_days()).await {
                Verdict::Abort => {
                    return Walk {
                        items: accumulator.into_items(),
                        stop: StopReason::Aborted,
                    }
                }
                Verdict::Continue | Verdict::ContinueQuiet => {}
            }

            if page_total == 0 {
                return Walk {
                    items: accumulator.into_items(),
                    stop: StopReason::Exhausted,
                };
            }
            if crossed {
                return Walk {
                    items: accumulator.into_items(),
                    stop: StopReason::BoundaryCrossed,
                };
            }
            let Some(last) = last_id else {
                return Walk {
                    items: accumulator.into_items(),
                    stop: StopReason::NoProgress,
                };
            };
            if cursor.as_deref() == Some(last.as_str()) {
                return Walk {
                    items: accumulator.into_items(),
                    stop: StopReason::NoProgress,
                };
            }

            cursor = Some(last);
            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }
    }

    /// Feed the freshest snapshot to the governor. The offset is the window
    /// depth in days: deeper history may spend more of the budget.
    async fn consult_governor(&mut self, offset: u32) -> Verdict {
        let snapshot = match self.client.rate_limit_status().await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                // The status query is advisory; a failure should not cost us
                // the walk.
                tracing::warn!(error = %error, "rate limit query failed; continuing");
                return Verdict::Continue;
            }
        };
        tracing::info!(
            limit = snapshot.limit,
            remaining = snapshot.remaining,
            reset = %snapshot.reset,
            "rate limit status"
        );
        self.governor.check(&snapshot, offset).await
    }
}
