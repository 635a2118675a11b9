use anyhow::Result;

use super::{OptionalExt, now_utc};
use crate::Database;
use crate::models::{MediaRow, TweetMediaRow};

impl Database {
    pub fn insert_media(
        &self,
        id: &str,
        owner_id: &str,
        content_type: &str,
        size: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO media (id, owner_id, content_type, size, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, owner_id, content_type, size, now_utc()],
            )?;
            Ok(())
        })
    }

    pub fn get_media(&self, id: &str) -> Result<Option<MediaRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, owner_id, content_type, size, created_at
                     FROM media WHERE id = ?1",
                    [id],
                    map_media_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Batch-fetch media rows by id; missing ids are absent from the
    /// result (the caller compares lengths to validate references).
    pub fn get_media_many(&self, ids: &[String]) -> Result<Vec<MediaRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, owner_id, content_type, size, created_at
                 FROM media WHERE id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), map_media_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch the ordered attachment lists for a set of tweets.
    pub fn media_for_tweets(&self, ids: &[String]) -> Result<Vec<TweetMediaRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT tweet_id, media_id, position
                 FROM tweet_media WHERE tweet_id IN ({})
                 ORDER BY tweet_id, position",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(TweetMediaRow {
                        tweet_id: row.get(0)?,
                        media_id: row.get(1)?,
                        position: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_media_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MediaRow> {
    Ok(MediaRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        content_type: row.get(2)?,
        size: row.get(3)?,
        created_at: row.get(4)?,
    })
}
