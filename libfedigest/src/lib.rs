//! Fedigest - bounded timeline collection for the Fediverse
//!
//! This library walks rate-limited, cursor-paginated feeds backward in time
//! until a day boundary is crossed, and turns the result into per-day
//! Markdown reports.

pub mod aggregate;
pub mod bucket;
pub mod client;
pub mod collect;
pub mod config;
pub mod error;
pub mod extract;
pub mod governor;
pub mod logging;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use aggregate::{PerSubjectArchive, SubjectAggregator};
pub use client::{FeedClient, FeedRef};
pub use collect::CursorPager;
pub use config::Config;
pub use error::{FedigestError, FetchError, Result};
pub use governor::RateLimitGovernor;
pub use types::{CollectionWindow, FeedItem, RateLimitSnapshot, Subject};
