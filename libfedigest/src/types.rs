//! Core types for Fedigest

use chrono::{DateTime, Days, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FedigestError, Result};

/// Opaque stable identifier for a subject, as issued by the API.
pub type SubjectId = String;

/// An account whose feed is being collected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub id: SubjectId,
    /// Display name, may be empty on some instances.
    pub name: String,
    /// Acct-style handle without the leading `@`.
    pub handle: String,
}

/// A link referenced by an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub title: Option<String>,
}

/// A media attachment on an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Media {
    pub url: String,
    pub kind: String,
    pub description: Option<String>,
}

/// A mentioned account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mention {
    pub handle: String,
    pub url: String,
}

/// Structured sub-entities of an item, consumed only by the report renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemEntities {
    pub links: Vec<Link>,
    pub media: Vec<Media>,
    pub hashtags: Vec<String>,
    pub mentions: Vec<Mention>,
}

impl ItemEntities {
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
            && self.media.is_empty()
            && self.hashtags.is_empty()
            && self.mentions.is_empty()
    }
}

/// One retrieved activity record.
///
/// Identifiers are unique within a feed and pages arrive newest-first, so a
/// page is sorted by non-increasing `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub author: Subject,
    pub text: String,
    #[serde(default)]
    pub entities: ItemEntities,
    #[serde(default)]
    pub boosts: u32,
    #[serde(default)]
    pub favourites: u32,
}

/// Rate-limit state as last reported by the API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub limit: u32,
    pub remaining: u32,
    /// When `remaining` resets back to `limit`.
    pub reset: DateTime<Utc>,
}

/// The time span a collection run covers: from the start of a local calendar
/// day (`origin`) up to the moment the run started (`now`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionWindow {
    origin: DateTime<Utc>,
    now: DateTime<Utc>,
    offset_days: u32,
}

impl CollectionWindow {
    /// Window reaching back `offset_days` local calendar days from now.
    ///
    /// `offset_days = 0` means "since local midnight today".
    pub fn days_back(offset_days: u32) -> Result<Self> {
        Self::anchored(Local::now(), offset_days)
    }

    /// Same as [`days_back`](Self::days_back) but anchored at an explicit
    /// instant instead of the wall clock.
    pub fn anchored(now: DateTime<Local>, offset_days: u32) -> Result<Self> {
        let origin_date = now
            .date_naive()
            .checked_sub_days(Days::new(u64::from(offset_days)))
            .ok_or_else(|| {
                FedigestError::InvalidInput(format!("offset of {} days is out of range", offset_days))
            })?;
        Ok(Self {
            origin: local_day_start(origin_date)?,
            now: now.with_timezone(&Utc),
            offset_days,
        })
    }

    pub fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn offset_days(&self) -> u32 {
        self.offset_days
    }

    /// Whether a timestamp lies inside the window.
    ///
    /// The first item in a page that fails this predicate crosses the
    /// boundary: every later item in this and subsequent pages is older, so
    /// the walk stops.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.origin
    }

    /// Local calendar date of the day `day_index` days before `now`.
    pub fn day_date(&self, day_index: u32) -> Result<NaiveDate> {
        self.now
            .with_timezone(&Local)
            .date_naive()
            .checked_sub_days(Days::new(u64::from(day_index)))
            .ok_or_else(|| {
                FedigestError::InvalidInput(format!("day index {} is out of range", day_index))
            })
    }

    /// Half-open span `[start, end)` covering one local calendar day,
    /// `day_index` days before `now`.
    ///
    /// The end bound is the next local midnight, so days shortened or
    /// stretched by DST transitions keep their real length.
    pub fn day_span(&self, day_index: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let date = self.day_date(day_index)?;
        let next = date.checked_add_days(Days::new(1)).ok_or_else(|| {
            FedigestError::InvalidInput(format!("no day after {}", date))
        })?;
        Ok((local_day_start(date)?, local_day_start(next)?))
    }
}

/// UTC instant of local midnight on the given date.
fn local_day_start(date: NaiveDate) -> Result<DateTime<Utc>> {
    // and_hms_opt(0, 0, 0) is always Some for a valid date
    let midnight = date.and_hms_opt(0, 0, 0).unwrap();
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| {
            FedigestError::InvalidInput(format!("no valid local midnight on {}", date))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn anchor() -> DateTime<Local> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 30, 0)
            .unwrap()
            .with_timezone(&Local)
    }

    #[test]
    fn test_origin_not_after_now() {
        for offset in [0, 1, 7, 30] {
            let window = CollectionWindow::anchored(anchor(), offset).unwrap();
            assert!(window.origin() <= window.now(), "offset {}", offset);
        }
    }

    #[test]
    fn test_zero_offset_origin_is_same_day_midnight() {
        let window = CollectionWindow::anchored(anchor(), 0).unwrap();
        let origin_local = window.origin().with_timezone(&Local);
        assert_eq!(origin_local.date_naive(), anchor().date_naive());
        assert_eq!(origin_local.time(), chrono::NaiveTime::MIN);
    }

    #[test]
    fn test_offset_moves_origin_back_whole_days() {
        let window = CollectionWindow::anchored(anchor(), 3).unwrap();
        let origin_local = window.origin().with_timezone(&Local);
        assert_eq!(
            origin_local.date_naive(),
            anchor().date_naive() - Duration::days(3)
        );
    }

    #[test]
    fn test_contains_is_inclusive_at_origin() {
        let window = CollectionWindow::anchored(anchor(), 1).unwrap();
        assert!(window.contains(window.origin()));
        assert!(window.contains(window.origin() + Duration::seconds(1)));
        assert!(!window.contains(window.origin() - Duration::seconds(1)));
    }

    #[test]
    fn test_day_spans_tile_the_window() {
        let window = CollectionWindow::anchored(anchor(), 4).unwrap();
        // Day 0 is today, the last span starts at the window origin.
        let (first_start, _) = window.day_span(4).unwrap();
        assert_eq!(first_start, window.origin());
        // Consecutive spans share a boundary and never overlap.
        for day_index in 0..4 {
            let (start, _) = window.day_span(day_index).unwrap();
            let (_, prev_end) = window.day_span(day_index + 1).unwrap();
            assert_eq!(start, prev_end);
        }
    }

    #[test]
    fn test_day_span_is_half_open() {
        let window = CollectionWindow::anchored(anchor(), 1).unwrap();
        let (start, end) = window.day_span(1).unwrap();
        assert!(start < end);
        let (next_start, _) = window.day_span(0).unwrap();
        assert_eq!(end, next_start);
    }

    #[test]
    fn test_entities_is_empty() {
        let mut entities = ItemEntities::default();
        assert!(entities.is_empty());
        entities.hashtags.push("rust".to_string());
        assert!(!entities.is_empty());
    }
}
