//! Calendar-day bucketing of a collected archive
//!
//! Slices a [`PerSubjectArchive`] into one bucket per local calendar day so
//! the report renderer can emit one file per day. The archive itself is
//! never mutated.

use chrono::{DateTime, NaiveDate, Utc};

use crate::aggregate::PerSubjectArchive;
use crate::error::Result;
use crate::types::{CollectionWindow, FeedItem, Subject};

/// One local calendar day of an archive.
///
/// `day_index` counts back from the run day: 0 is today. Items keep their
/// archive order within each subject.
#[derive(Debug)]
pub struct DayBucket<'a> {
    pub day_index: u32,
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub entries: Vec<(&'a Subject, Vec<&'a FeedItem>)>,
}

impl DayBucket<'_> {
    pub fn item_count(&self) -> usize {
        self.entries.iter().map(|(_, items)| items.len()).sum()
    }
}

/// Partition `archive` into `window.offset_days() + 1` day buckets, today
/// first, each covering the half-open span `[start, end)` of one local
/// calendar day.
pub fn bucketize<'a>(
    archive: &'a PerSubjectArchive,
    window: &CollectionWindow,
) -> Result<Vec<DayBucket<'a>>> {
    let mut buckets = Vec::with_capacity(window.offset_days() as usize + 1);
    for day_index in 0..=window.offset_days() {
        let (start, end) = window.day_span(day_index)?;
        let entries = archive
            .subjects()
            .iter()
            .map(|subject| {
                let items = archive
                    .items_for(&subject.id)
                    .iter()
                    .filter(|item| start <= item.created_at && item.created_at < end)
                    .collect();
                (subject, items)
            })
            .collect();
        buckets.push(DayBucket {
            day_index,
            date: window.day_date(day_index)?,
            start,
            end,
            entries,
        });
    }
    Ok(buckets)
}
