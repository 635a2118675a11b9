mod engagements;
mod follows;
mod hashtags;
mod media;
mod tweets;
mod users;

pub use tweets::FeedFilter;

use anyhow::Result;
use chrono::Utc;

/// UTC timestamp with millisecond precision. SQLite's `datetime('now')`
/// default only resolves to seconds, which is too coarse for newest-first
/// ordering when writes land in the same second.
pub(crate) fn now_utc() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
