//! Multi-subject collection
//!
//! [`SubjectAggregator`] runs one [`CursorPager`] walk per subject,
//! strictly sequentially (the rate-limit budget is shared), and merges the
//! results into a [`PerSubjectArchive`] keyed by the subject's stable id.
//! Handles are only used to find subjects; ids are what reports look up.

use std::collections::HashMap;
use std::time::Duration;

use crate::client::{FeedClient, FeedRef};
use crate::collect::{CursorPager, StopReason, DEFAULT_PAGE_PACING, DEFAULT_PAGE_SIZE};
use crate::governor::RateLimitGovernor;
use crate::types::{CollectionWindow, FeedItem, Subject, SubjectId};

/// Items collected during one run, grouped per subject.
///
/// Subjects that yielded nothing are not present at all. Mutated only while
/// collection runs; read-only afterward.
#[derive(Debug, Default)]
pub struct PerSubjectArchive {
    subjects: Vec<Subject>,
    items: HashMap<SubjectId, Vec<FeedItem>>,
}

impl PerSubjectArchive {
    /// Subjects with at least one collected item, in presentation order.
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// Items collected for a subject, newest first.
    pub fn items_for(&self, id: &str) -> &[FeedItem] {
        self.items.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Total item count across all subjects.
    pub fn item_count(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    fn insert(&mut self, subject: Subject, items: Vec<FeedItem>) {
        if items.is_empty() {
            return;
        }
        self.items.insert(subject.id.clone(), items);
        self.subjects.push(subject);
    }
}

/// Drives one walk per subject and merges the results.
pub struct SubjectAggregator<'a> {
    client: &'a dyn FeedClient,
    governor: &'a mut RateLimitGovernor,
    page_size: u32,
    pacing: Duration,
}

impl<'a> SubjectAggregator<'a> {
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

    /// Collect for every followed account, ordered by handle.
    ///
    /// A roster failure is fatal: with no subjects there is nothing to
    /// collect. Failures past that point degrade per subject.
    pub async fn collect_roster(
        &mut self,
        window: &CollectionWindow,
    ) -> Result<PerSubjectArchive, crate::error::FetchError> {
        let mut subjects = self.client.list_subjects().await?;
        subjects.sort_by(|a, b| a.handle.cmp(&b.handle));
        Ok(self.collect_subjects(subjects, window).await)
    }

    /// Collect for an explicit handle list.
    ///
    /// Handles are deduplicated case-sensitively, first occurrence wins,
    /// input order preserved. A handle that fails to resolve is logged and
    /// skipped; the run continues.
    pub async fn collect_handles(
        &mut self,
        handles: &[String],
        window: &CollectionWindow,
    ) -> PerSubjectArchive {
        let mut seen = std::collections::HashSet::new();
        let mut subjects = Vec::new();
        for handle in handles {
            if !seen.insert(handle.as_str()) {
                continue;
            }
            match self.client.lookup_subject(handle).await {
                Ok(subject) => subjects.push(subject),
                Err(error) => {
                    tracing::warn!(handle = %handle, error = %error, "cannot resolve handle; skipping");
                }
            }
        }
        self.collect_subjects(subjects, window).await
    }

    async fn collect_subjects(
        &mut self,
        subjects: Vec<Subject>,
        window: &CollectionWindow,
    ) -> PerSubjectArchive {
        let mut archive = PerSubjectArchive::default();

        for subject in subjects {
            // Two handles can resolve to the same account; one walk is enough
            if archive.contains(&subject.id) {
                continue;
            }

            tracing::info!(handle = %subject.handle, name = %subject.name, "collecting subject");
            let feed = FeedRef::Account(subject.id.clone());
            let walk = CursorPager::new(self.client, &mut *self.governor)
                .with_page_size(self.page_size)
                .with_pacing(self.pacing)
                .collect(&feed, window)
                .await;

            let aborted = walk.aborted();
            match &walk.stop {
                StopReason::Failed(error) => {
                    tracing::warn!(
                        handle = %subject.handle,
                        error = %error,
                        kept = walk.items.len(),
                        "walk failed; keeping partial results"
                    );
                }
                StopReason::Aborted => {
                    tracing::info!(handle = %subject.handle, "collection aborted by operator");
                }
                _ => {
                    tracing::debug!(handle = %subject.handle, items = walk.items.len(), "walk done");
                }
            }
            archive.insert(subject, walk.items);

            if aborted {
                break;
            }
        }

        archive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::{make_item, make_subject, MockFeed};
    use crate::error::FetchError;
    use crate::governor::{LimitChoice, ScriptedPrompt};
    use crate::types::RateLimitSnapshot;
    use chrono::{Duration as ChronoDuration, Local, TimeZone, Utc};

    fn quiet_governor() -> RateLimitGovernor {
        RateLimitGovernor::new(Box::new(ScriptedPrompt::new([])))
            .with_poll_interval(Duration::from_millis(5))
    }

    fn test_window() -> CollectionWindow {
        let anchor = Utc
            .with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
            .unwrap()
            .with_timezone(&Local);
        CollectionWindow::anchored(anchor, 1).unwrap()
    }

    fn feed(id: &str) -> FeedRef {
        FeedRef::Account(id.to_string())
    }

    #[tokio::test]
    async fn test_roster_collection_sorted_by_handle() {
        let window = test_window();
        let bob = make_subject("2", "bob");
        let alice = make_subject("1", "alice");
        let at = window.origin() + ChronoDuration::hours(1);
        let mock = MockFeed::new()
            .with_subject(bob.clone())
            .with_subject(alice.clone())
            .with_page(feed("2"), vec![make_item("20", at, &bob)])
            .with_page(feed("1"), vec![make_item("10", at, &alice)]);

        let mut governor = quiet_governor();
        let archive = SubjectAggregator::new(&mock, &mut governor)
            .with_pacing(Duration::ZERO)
            .collect_roster(&window)
            .await
            .unwrap();

        let handles: Vec<&str> = archive.subjects().iter().map(|s| s.handle.as_str()).collect();
        assert_eq!(handles, vec!["alice", "bob"]);
        assert_eq!(archive.items_for("1").len(), 1);
        assert_eq!(archive.items_for("2").len(), 1);
    }

    #[tokio::test]
    async fn test_roster_failure_is_fatal() {
        let mock = MockFeed::new().with_roster_error(FetchError::Network("down".into()));
        let mut governor = quiet_governor();
        let result = SubjectAggregator::new(&mock, &mut governor)
            .collect_roster(&test_window())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_subjects_dropped_from_archive() {
        let window = test_window();
        let alice = make_subject("1", "alice");
        let bob = make_subject("2", "bob");
        let at = window.origin() + ChronoDuration::hours(1);
        // bob has no pages queued: his walk yields nothing
        let mock = MockFeed::new()
            .with_subject(alice.clone())
            .with_subject(bob)
            .with_page(feed("1"), vec![make_item("10", at, &alice)]);

        let mut governor = quiet_governor();
        let archive = SubjectAggregator::new(&mock, &mut governor)
            .with_pacing(Duration::ZERO)
            .collect_roster(&window)
            .await
            .unwrap();

        assert_eq!(archive.subjects().len(), 1);
        assert_eq!(archive.subjects()[0].handle, "alice");
        assert!(!archive.contains("2"));
        assert!(archive.items_for("2").is_empty());
    }

    /// Scenario: an explicit list containing "bob" twice collects bob once.
    #[tokio::test]
    async fn test_duplicate_handles_collected_once() {
        let window = test_window();
        let bob = make_subject("2", "bob");
        let at = window.origin() + ChronoDuration::hours(1);
        let mock = MockFeed::new()
            .with_subject(bob.clone())
            .with_page(feed("2"), vec![make_item("20", at, &bob)]);

        let mut governor = quiet_governor();
        let archive = SubjectAggregator::new(&mock, &mut governor)
            .with_pacing(Duration::ZERO)
            .collect_handles(&["bob".to_string(), "bob".to_string()], &window)
            .await;

        assert_eq!(archive.subjects().len(), 1);
        assert_eq!(archive.item_count(), 1);
        // Exactly one walk for bob: one page fetch plus the empty follow-up
        assert_eq!(mock.fetch_call_count(), 2);
    }

    #[tokio::test]
    async fn test_handle_dedup_is_case_sensitive() {
        let window = test_window();
        let bob = make_subject("2", "bob");
        let big_bob = make_subject("3", "Bob");
        let at = window.origin() + ChronoDuration::hours(1);
        let mock = MockFeed::new()
            .with_subject(bob.clone())
            .with_subject(big_bob.clone())
            .with_page(feed("2"), vec![make_item("20", at, &bob)])
            .with_page(feed("3"), vec![make_item("30", at, &big_bob)]);

        let mut governor = quiet_governor();
        let archive = SubjectAggregator::new(&mock, &mut governor)
            .with_pacing(Duration::ZERO)
            .collect_handles(&["bob".to_string(), "Bob".to_string()], &window)
            .await;

        assert_eq!(archive.subjects().len(), 2);
    }

    #[tokio::test]
    async fn test_unresolvable_handle_skipped() {
        let window = test_window();
        let bob = make_subject("2", "bob");
        let at = window.origin() + ChronoDuration::hours(1);
        let mock = MockFeed::new()
            .with_subject(bob.clone())
            .with_page(feed("2"), vec![make_item("20", at, &bob)]);

        let mut governor = quiet_governor();
        let archive = SubjectAggregator::new(&mock, &mut governor)
            .with_pacing(Duration::ZERO)
            .collect_handles(&["ghost".to_string(), "bob".to_string()], &window)
            .await;

        assert_eq!(archive.subjects().len(), 1);
        assert_eq!(archive.subjects()[0].handle, "bob");
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_partials_and_continues() {
        let window = test_window();
        let alice = make_subject("1", "alice");
        let bob = make_subject("2", "bob");
        let at = window.origin() + ChronoDuration::hours(1);
        let mock = MockFeed::new()
            .with_subject(alice.clone())
            .with_subject(bob.clone())
            .with_page(feed("1"), vec![make_item("10", at, &alice)])
            .with_page_error(feed("1"), FetchError::Network("flaky".into()))
            .with_page(feed("2"), vec![make_item("20", at, &bob)]);

        let mut governor = quiet_governor();
        let archive = SubjectAggregator::new(&mock, &mut governor)
            .with_pacing(Duration::ZERO)
            .collect_roster(&window)
            .await
            .unwrap();

        // alice's partial results survive her mid-walk failure, bob follows
        assert_eq!(archive.items_for("1").len(), 1);
        assert_eq!(archive.items_for("2").len(), 1);
    }

    #[tokio::test]
    async fn test_operator_abort_stops_remaining_subjects() {
        let window = test_window();
        let alice = make_subject("1", "alice");
        let bob = make_subject("2", "bob");
        let at = window.origin() + ChronoDuration::hours(1);
        let mock = MockFeed::new()
            .with_subject(alice.clone())
            .with_subject(bob.clone())
            .with_page(feed("1"), vec![make_item("10", at, &alice)])
            .with_snapshot(RateLimitSnapshot {
                limit: 15,
                remaining: 0,
                reset: Utc::now() + ChronoDuration::seconds(60),
            });

        let mut governor = RateLimitGovernor::new(Box::new(ScriptedPrompt::new([
            LimitChoice::Abort,
        ])))
        .with_poll_interval(Duration::from_millis(5));
        let archive = SubjectAggregator::new(&mock, &mut governor)
            .with_pacing(Duration::ZERO)
            .collect_roster(&window)
            .await
            .unwrap();

        // alice's items are kept, bob's walk never starts
        assert_eq!(archive.items_for("1").len(), 1);
        assert!(!archive.contains("2"));
        assert_eq!(mock.fetch_call_count(), 1);
    }
}
