use anyhow::Result;

use super::{OptionalExt, now_utc};
use crate::Database;
use crate::models::{EngagementKind, EngagementRow};

impl Database {
    /// Toggle set membership: removes the row if present, inserts it if
    /// not. Returns true when the row was added.
    pub fn toggle_engagement(
        &self,
        tweet_id: &str,
        user_id: &str,
        kind: EngagementKind,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM engagements WHERE tweet_id = ?1 AND user_id = ?2 AND kind = ?3",
                rusqlite::params![tweet_id, user_id, kind.as_str()],
            )?;

            if removed > 0 {
                return Ok(false);
            }

            conn.execute(
                "INSERT INTO engagements (tweet_id, user_id, kind, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![tweet_id, user_id, kind.as_str(), now_utc()],
            )?;
            Ok(true)
        })
    }

    pub fn has_engagement(
        &self,
        tweet_id: &str,
        user_id: &str,
        kind: EngagementKind,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM engagements
                 WHERE tweet_id = ?1 AND user_id = ?2 AND kind = ?3",
                rusqlite::params![tweet_id, user_id, kind.as_str()],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// The retweet toggle mutates two entities — the original's retweet
    /// set and the actor's retweet post — so both run in one transaction:
    /// both land or neither does.
    ///
    /// Toggling on inserts a retweet post (`new_id`, `content`, extracted
    /// `hashtags`) plus the membership row. Toggling off removes the
    /// membership row and the actor's most recently created retweet post
    /// referencing the original. Returns `(added, post_id)` where
    /// `post_id` is the created post on add, the deleted post on remove.
    pub fn toggle_retweet(
        &self,
        tweet_id: &str,
        user_id: &str,
        new_id: &str,
        content: &str,
        hashtags: &[String],
    ) -> Result<(bool, Option<String>)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let removed = tx.execute(
                "DELETE FROM engagements
                 WHERE tweet_id = ?1 AND user_id = ?2 AND kind = 'retweet'",
                rusqlite::params![tweet_id, user_id],
            )?;

            if removed > 0 {
                let victim: Option<String> = tx
                    .query_row(
                        "SELECT id FROM tweets
                         WHERE author_id = ?1 AND retweet_of = ?2 AND is_retweet = 1
                         ORDER BY created_at DESC, id DESC
                         LIMIT 1",
                        rusqlite::params![user_id, tweet_id],
                        |row| row.get(0),
                    )
                    .optional()?;

                if let Some(id) = &victim {
                    tx.execute("DELETE FROM tweets WHERE id = ?1", [id])?;
                }

                tx.commit()?;
                return Ok((false, victim));
            }

            tx.execute(
                "INSERT INTO tweets
                     (id, author_id, content, retweet_of, is_retweet, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                rusqlite::params![new_id, user_id, content, tweet_id, now_utc()],
            )?;

            for tag in hashtags {
                tx.execute(
                    "INSERT OR IGNORE INTO hashtags (tweet_id, tag) VALUES (?1, ?2)",
                    rusqlite::params![new_id, tag],
                )?;
            }

            tx.execute(
                "INSERT INTO engagements (tweet_id, user_id, kind, created_at)
                 VALUES (?1, ?2, 'retweet', ?3)",
                rusqlite::params![tweet_id, user_id, now_utc()],
            )?;

            tx.commit()?;
            Ok((true, Some(new_id.to_string())))
        })
    }

    /// Batch-fetch engagement rows for a set of tweet ids.
    pub fn engagements_for_tweets(&self, ids: &[String]) -> Result<Vec<EngagementRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT tweet_id, user_id, kind FROM engagements
                 WHERE tweet_id IN ({})
                 ORDER BY created_at",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // Unknown kinds can only appear if the CHECK constraint is
            // bypassed; drop them rather than fail the whole listing.
            Ok(rows
                .into_iter()
                .filter_map(|(tweet_id, user_id, kind)| {
                    EngagementKind::parse(&kind).map(|kind| EngagementRow {
                        tweet_id,
                        user_id,
                        kind,
                    })
                })
                .collect())
        })
    }
}
