//! Markdown report rendering
//!
//! Renders collected feeds into Markdown files: one per day bucket for the
//! aggregated digests, one per run for single-feed timelines and the
//! roster. Item text arrives as the API's HTML payload and is flattened to
//! plain text lines first.

use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::bucket::DayBucket;
use crate::error::Result;
use crate::types::{CollectionWindow, FeedItem, Subject};

/// Timestamp suffix for report file names, e.g. `20250613-101502-123`.
pub fn file_suffix(now: DateTime<Local>) -> String {
    now.format("%Y%m%d-%H%M%S-%3f").to_string()
}

/// Compact date stamp for day-report file names, e.g. `20250613`.
pub fn day_stamp(bucket: &DayBucket<'_>) -> String {
    bucket.date.format("%Y%m%d").to_string()
}

/// Writes rendered reports into the configured directory.
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `body` as `<stem>.md`, creating the directory if needed.
    /// Returns the path written.
    pub fn write(&self, stem: &str, body: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.md", stem));
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

/// Render one day bucket of an aggregated run.
pub fn render_day_report(title: &str, bucket: &DayBucket<'_>, window: &CollectionWindow) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "====");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} (day {} of {})  ",
        bucket.date,
        bucket.day_index,
        window.offset_days()
    );
    let _ = writeln!(
        out,
        "span: {} .. {}  ",
        bucket.start.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        bucket.end.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
    );
    let _ = writeln!(out);

    for (subject, items) in &bucket.entries {
        let _ = writeln!(out, "--------------------------------------------------");
        let _ = writeln!(out, "# {} @{} ({})", subject.name, subject.handle, subject.id);
        let _ = writeln!(out);
        for item in items {
            render_item(&mut out, item, false);
        }
    }

    out
}

/// Render a single-feed timeline, newest first.
///
/// When `profile` is given, the report opens with that subject's header (the
/// user-timeline form); without it, the author is named on every item (the
/// home-timeline form).
pub fn render_timeline_report(
    title: &str,
    profile: Option<&Subject>,
    items: &[FeedItem],
    window: &CollectionWindow,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "====");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "current: {}  ",
        window.now().with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(
        out,
        "origin: {} ({} days)  ",
        window.origin().with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        window.offset_days()
    );
    let _ = writeln!(out);

    if let Some(subject) = profile {
        let _ = writeln!(out, "## {} @{}  ", subject.name, subject.handle);
        let _ = writeln!(out);
        let _ = writeln!(out, "Id: {}  ", subject.id);
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "# Result");
    let _ = writeln!(out);
    for item in items {
        render_item(&mut out, item, profile.is_none());
    }

    out
}

/// Render the roster of followed accounts.
pub fn render_roster(title: &str, subjects: &[Subject]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "====");
    let _ = writeln!(out);
    for subject in subjects {
        let _ = writeln!(out, "## {} @{}  ", subject.name, subject.handle);
        let _ = writeln!(out);
        let _ = writeln!(out, "Id: {}  ", subject.id);
        let _ = writeln!(out);
    }
    out
}

fn render_item(out: &mut String, item: &FeedItem, name_author: bool) {
    let stamp = item.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    if name_author {
        let _ = writeln!(out, "## {}: {} @{}", stamp, item.author.name, item.author.handle);
    } else {
        let _ = writeln!(out, "## {}", stamp);
    }
    let _ = writeln!(out);
    for line in flatten_html(&item.text).lines() {
        let _ = writeln!(out, "{}  ", line);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Id: {}  ", item.id);
    let _ = writeln!(out, "Boosts: {}  ", item.boosts);
    let _ = writeln!(out, "Favourites: {}  ", item.favourites);
    let _ = writeln!(out);

    let entities = &item.entities;
    if entities.is_empty() {
        return;
    }
    if !entities.links.is_empty() {
        let _ = writeln!(out, "- Links:");
        for link in &entities.links {
            match &link.title {
                Some(link_title) => {
                    let _ = writeln!(out, "  - [{}]({})", link_title, link.url);
                }
                None => {
                    let _ = writeln!(out, "  - <{}>", link.url);
                }
            }
        }
    }
    if !entities.media.is_empty() {
        let _ = writeln!(out, "- Media:");
        for media in &entities.media {
            match &media.description {
                Some(description) => {
                    let _ = writeln!(out, "  - {} <{}> ({})", media.kind, media.url, description);
                }
                None => {
                    let _ = writeln!(out, "  - {} <{}>", media.kind, media.url);
                }
            }
        }
    }
    if !entities.hashtags.is_empty() {
        let _ = writeln!(out, "- Hashtags:");
        for tag in &entities.hashtags {
            let _ = writeln!(out, "  - #{}", tag);
        }
    }
    if !entities.mentions.is_empty() {
        let _ = writeln!(out, "- Mentions:");
        for mention in &entities.mentions {
            let _ = writeln!(out, "  - @{} <{}>", mention.handle, mention.url);
        }
    }
    let _ = writeln!(out);
}

/// Flatten the API's HTML item payload to plain text lines.
///
/// `<br>` and paragraph closings become newlines, remaining tags are
/// stripped and the few entities the API emits are decoded. Plain-text
/// payloads pass through untouched.
pub fn flatten_html(text: &str) -> String {
    let mut with_breaks = text
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("</p>", "\n");

    let mut plain = String::with_capacity(with_breaks.len());
    let mut in_tag = false;
    for c in with_breaks.drain(..) {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => plain.push(c),
            _ => {}
        }
    }

    plain
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .trim_end()
        .to_string()
}

/// Build the canonical report stem `<command>-<suffix>` used by the
/// single-file reports.
pub fn report_stem(command: &str, now: DateTime<Local>) -> String {
    format!("{}-{}", command, file_suffix(now))
}

/// Build the day-report stem `<command>_<day>-<suffix>`.
pub fn day_report_stem(command: &str, bucket: &DayBucket<'_>, now: DateTime<Local>) -> String {
    format!("{}_{}-{}", command, day_stamp(bucket), file_suffix(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::PerSubjectArchive;
    use crate::bucket::bucketize;
    use crate::client::mock::{make_item, make_subject, MockFeed};
    use crate::client::FeedRef;
    use crate::governor::{RateLimitGovernor, ScriptedPrompt};
    use crate::types::{ItemEntities, Link};
    use chrono::{Duration as ChronoDuration, Local, TimeZone, Utc};

    fn test_window(offset_days: u32) -> CollectionWindow {
        let anchor = Utc
            .with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
            .unwrap()
            .with_timezone(&Local);
        CollectionWindow::anchored(anchor, offset_days).unwrap()
    }

    async fn one_subject_archive(items: Vec<FeedItem>, subject: &Subject) -> PerSubjectArchive {
        let mock = MockFeed::new()
            .with_subject(subject.clone())
            .with_page(FeedRef::Account(subject.id.clone()), items);
        let mut governor = RateLimitGovernor::new(Box::new(ScriptedPrompt::new([])));
        crate::aggregate::SubjectAggregator::new(&mock, &mut governor)
            .with_pacing(std::time::Duration::ZERO)
            .collect_handles(&[subject.handle.clone()], &test_window(7))
            .await
    }

    #[test]
    fn test_file_suffix_shape() {
        let at = Utc
            .with_ymd_and_hms(2025, 6, 13, 10, 15, 2)
            .unwrap()
            .with_timezone(&Local);
        let suffix = file_suffix(at);
        assert_eq!(suffix.len(), "YYYYMMDD-HHMMSS-mmm".len());
        assert_eq!(suffix.matches('-').count(), 2);
        assert!(suffix.ends_with("-000"));
    }

    #[test]
    fn test_flatten_html() {
        let html = "<p>first &amp; second</p><p>third <a href=\"x\">link</a></p>";
        assert_eq!(flatten_html(html), "first & second\nthird link");
    }

    #[test]
    fn test_flatten_html_plain_text_unchanged() {
        assert_eq!(flatten_html("no markup here"), "no markup here");
    }

    #[test]
    fn test_flatten_html_br_variants() {
        assert_eq!(flatten_html("a<br>b<br/>c<br />d"), "a\nb\nc\nd");
    }

    #[tokio::test]
    async fn test_day_report_contains_subject_and_items() {
        let window = test_window(0);
        let subject = make_subject("1", "alice");
        let at = window.origin() + ChronoDuration::hours(2);
        let mut item = make_item("10", at, &subject);
        item.text = "hello world".to_string();
        let archive = one_subject_archive(vec![item], &subject).await;

        let buckets = bucketize(&archive, &window).unwrap();
        let report = render_day_report("today", &buckets[0], &window);

        assert!(report.starts_with("today\n====\n"));
        assert!(report.contains("# alice Example @alice (1)"));
        assert!(report.contains("hello world"));
        assert!(report.contains("Id: 10"));
    }

    #[tokio::test]
    async fn test_timeline_report_with_profile_header() {
        let window = test_window(1);
        let subject = make_subject("1", "alice");
        let at = window.origin() + ChronoDuration::hours(2);
        let items = vec![make_item("10", at, &subject)];

        let report = render_timeline_report("user", Some(&subject), &items, &window);

        assert!(report.contains("## alice Example @alice"));
        assert!(report.contains("# Result"));
        // Items do not repeat the author line in profile form
        assert!(report.contains(&format!(
            "## {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        )));
    }

    #[tokio::test]
    async fn test_timeline_report_names_authors_without_profile() {
        let window = test_window(0);
        let subject = make_subject("1", "alice");
        let at = window.origin() + ChronoDuration::hours(2);
        let items = vec![make_item("10", at, &subject)];

        let report = render_timeline_report("home", None, &items, &window);
        assert!(report.contains("alice Example @alice"));
    }

    #[test]
    fn test_entity_appendix_rendered() {
        let subject = make_subject("1", "alice");
        let mut item = make_item("10", Utc::now(), &subject);
        item.entities = ItemEntities {
            links: vec![Link {
                url: "https://example.com".to_string(),
                title: Some("Example".to_string()),
            }],
            media: vec![],
            hashtags: vec!["rust".to_string()],
            mentions: vec![],
        };

        let mut out = String::new();
        render_item(&mut out, &item, false);
        assert!(out.contains("- Links:"));
        assert!(out.contains("[Example](https://example.com)"));
        assert!(out.contains("- Hashtags:"));
        assert!(out.contains("#rust"));
        assert!(!out.contains("- Media:"));
    }

    #[test]
    fn test_roster_report() {
        let subjects = vec![make_subject("1", "alice"), make_subject("2", "bob")];
        let report = render_roster("friends", &subjects);
        assert!(report.starts_with("friends\n====\n"));
        assert!(report.contains("## alice Example @alice"));
        assert!(report.contains("## bob Example @bob"));
    }

    #[test]
    fn test_report_writer_creates_dir_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("reports"));
        let path = writer.write("today_20250613-101502-000", "body\n").unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "body\n");
        assert!(path.to_string_lossy().ends_with("today_20250613-101502-000.md"));
    }

    #[tokio::test]
    async fn test_day_report_stem_includes_day_and_suffix() {
        let window = test_window(0);
        let subject = make_subject("1", "alice");
        let at = window.origin() + ChronoDuration::hours(2);
        let archive = one_subject_archive(vec![make_item("10", at, &subject)], &subject).await;
        let buckets = bucketize(&archive, &window).unwrap();

        let stem = day_report_stem("today", &buckets[0], window.now().with_timezone(&Local));
        assert!(stem.starts_with("today_2025"));
        assert!(stem.contains('-'));
    }
}
