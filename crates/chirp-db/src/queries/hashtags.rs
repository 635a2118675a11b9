use anyhow::Result;

use crate::Database;
use crate::models::{HashtagRow, TrendRow};

/// At most this many example tweet ids are attached to each trend entry.
const TREND_EXAMPLES: usize = 3;

impl Database {
    /// Batch-fetch hashtag rows for a set of tweet ids.
    pub fn hashtags_for_tweets(&self, ids: &[String]) -> Result<Vec<HashtagRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT tweet_id, tag FROM hashtags WHERE tweet_id IN ({}) ORDER BY tag",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(HashtagRow {
                        tweet_id: row.get(0)?,
                        tag: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Tags on tweets created at or after `since`, counted and sorted by
    /// count descending. Equal counts tie-break on lexicographic tag order
    /// so the result is deterministic.
    pub fn trending(&self, since: &str, limit: i64) -> Result<Vec<TrendRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT h.tag, COUNT(*) AS cnt, GROUP_CONCAT(h.tweet_id) AS ids
                 FROM hashtags h
                 JOIN tweets t ON t.id = h.tweet_id
                 WHERE t.created_at >= ?1
                 GROUP BY h.tag
                 ORDER BY cnt DESC, h.tag ASC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![since, limit], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows
                .into_iter()
                .map(|(tag, count, ids)| TrendRow {
                    tag,
                    count,
                    tweet_ids: ids
                        .split(',')
                        .take(TREND_EXAMPLES)
                        .map(str::to_string)
                        .collect(),
                })
                .collect())
        })
    }
}
