use anyhow::Result;
use rusqlite::types::Value;

use super::{OptionalExt, now_utc};
use crate::Database;
use crate::models::{ReplyEdgeRow, TweetRow};

/// Author scope for feed listings. Every tweet listing in the system goes
/// through the same composer, so pagination and ordering stay uniform.
pub enum FeedFilter {
    /// All tweets.
    All,
    /// Tweets by one author.
    Author(String),
    /// Tweets by the given user's followed set plus the user itself.
    Network(String),
    /// Tweets carrying the given (lower-cased) hashtag.
    Tag(String),
    /// Tweets bookmarked by the given user.
    Bookmarks(String),
    /// Direct replies to the given tweet.
    RepliesTo(String),
}

const TWEET_COLS: &str = "t.id, t.author_id, t.content, t.reply_to, t.retweet_of,
            t.is_reply, t.is_retweet, t.created_at,
            u.name, u.username, u.profile_picture, u.bio";

const TWEET_FROM: &str = "FROM tweets t LEFT JOIN users u ON u.id = t.author_id";

fn filter_clause(filter: &FeedFilter) -> (&'static str, Vec<Value>) {
    match filter {
        FeedFilter::All => ("", vec![]),
        FeedFilter::Author(id) => ("WHERE t.author_id = ?", vec![id.clone().into()]),
        FeedFilter::Network(id) => (
            "WHERE t.author_id IN
                 (SELECT followee_id FROM follows WHERE follower_id = ? UNION SELECT ?)",
            vec![id.clone().into(), id.clone().into()],
        ),
        FeedFilter::Tag(tag) => (
            "WHERE EXISTS
                 (SELECT 1 FROM hashtags h WHERE h.tweet_id = t.id AND h.tag = ?)",
            vec![tag.clone().into()],
        ),
        FeedFilter::Bookmarks(id) => (
            "WHERE EXISTS
                 (SELECT 1 FROM engagements e
                  WHERE e.tweet_id = t.id AND e.user_id = ? AND e.kind = 'bookmark')",
            vec![id.clone().into()],
        ),
        FeedFilter::RepliesTo(id) => ("WHERE t.reply_to = ?", vec![id.clone().into()]),
    }
}

pub(super) fn map_tweet_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TweetRow> {
    Ok(TweetRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        content: row.get(2)?,
        reply_to: row.get(3)?,
        retweet_of: row.get(4)?,
        is_reply: row.get(5)?,
        is_retweet: row.get(6)?,
        created_at: row.get(7)?,
        author_name: row.get(8)?,
        author_username: row.get(9)?,
        author_profile_picture: row.get(10)?,
        author_bio: row.get(11)?,
    })
}

impl Database {
    /// Insert a tweet together with its derived rows (hashtags, media
    /// links) in one transaction. `is_reply`/`is_retweet` are derived here
    /// from the presence of the references, never taken from the caller.
    pub fn insert_tweet(
        &self,
        id: &str,
        author_id: &str,
        content: &str,
        reply_to: Option<&str>,
        retweet_of: Option<&str>,
        hashtags: &[String],
        media: &[String],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO tweets
                     (id, author_id, content, reply_to, retweet_of, is_reply, is_retweet, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    id,
                    author_id,
                    content,
                    reply_to,
                    retweet_of,
                    reply_to.is_some(),
                    retweet_of.is_some(),
                    now_utc(),
                ],
            )?;

            for tag in hashtags {
                tx.execute(
                    "INSERT OR IGNORE INTO hashtags (tweet_id, tag) VALUES (?1, ?2)",
                    rusqlite::params![id, tag],
                )?;
            }

            for (position, media_id) in media.iter().enumerate() {
                tx.execute(
                    "INSERT INTO tweet_media (tweet_id, media_id, position) VALUES (?1, ?2, ?3)",
                    rusqlite::params![id, media_id, position as i64],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_tweet(&self, id: &str) -> Result<Option<TweetRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} {} WHERE t.id = ?1", TWEET_COLS, TWEET_FROM);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_tweet_row).optional()?;
            Ok(row)
        })
    }

    /// Delete one tweet row. Engagements, hashtags and media links cascade;
    /// replies and retweets OF this tweet are left in place with dangling
    /// references (readers render those as missing).
    pub fn delete_tweet(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM tweets WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Newest-first page of tweets for the given scope. A negative `limit`
    /// means no limit (SQLite semantics), used for unpaginated reply lists.
    pub fn list_feed(&self, filter: &FeedFilter, limit: i64, skip: i64) -> Result<Vec<TweetRow>> {
        self.with_conn(|conn| {
            let (where_sql, mut params) = filter_clause(filter);
            let sql = format!(
                "SELECT {} {} {} ORDER BY t.created_at DESC, t.id DESC LIMIT ? OFFSET ?",
                TWEET_COLS, TWEET_FROM, where_sql
            );
            params.push(limit.into());
            params.push(skip.into());

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), map_tweet_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_feed(&self, filter: &FeedFilter) -> Result<i64> {
        self.with_conn(|conn| {
            let (where_sql, params) = filter_clause(filter);
            let sql = format!("SELECT COUNT(*) FROM tweets t {}", where_sql);
            let total =
                conn.query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))?;
            Ok(total)
        })
    }

    /// Batch-fetch tweets (with author columns) by id, for enriching
    /// reply/retweet references. Missing ids are simply absent from the
    /// result.
    pub fn tweets_by_ids(&self, ids: &[String]) -> Result<Vec<TweetRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT {} {} WHERE t.id IN ({})",
                TWEET_COLS,
                TWEET_FROM,
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), map_tweet_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch the reply id lists for a set of parent tweets.
    pub fn replies_for_tweets(&self, ids: &[String]) -> Result<Vec<ReplyEdgeRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT reply_to, id FROM tweets WHERE reply_to IN ({}) ORDER BY created_at",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(ReplyEdgeRow {
                        parent_id: row.get(0)?,
                        reply_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "alice@example.com", "hash", "Alice").unwrap();
        db
    }

    #[test]
    fn derived_flags_follow_reference_presence() {
        let db = db();
        db.insert_tweet("t1", "u1", "root", None, None, &[], &[]).unwrap();
        db.insert_tweet("t2", "u1", "a reply", Some("t1"), None, &[], &[]).unwrap();

        let root = db.get_tweet("t1").unwrap().unwrap();
        assert!(!root.is_reply && !root.is_retweet);

        let reply = db.get_tweet("t2").unwrap().unwrap();
        assert!(reply.is_reply);
        assert_eq!(reply.reply_to.as_deref(), Some("t1"));
        assert!(!reply.is_retweet);
    }

    #[test]
    fn filter_clause_param_arity_matches_placeholders() {
        let filters = [
            FeedFilter::All,
            FeedFilter::Author("u".into()),
            FeedFilter::Network("u".into()),
            FeedFilter::Tag("tag".into()),
            FeedFilter::Bookmarks("u".into()),
            FeedFilter::RepliesTo("t".into()),
        ];

        for filter in &filters {
            let (sql, params) = filter_clause(filter);
            assert_eq!(sql.matches('?').count(), params.len());
        }
    }

    #[test]
    fn feed_ordering_is_newest_first() {
        let db = db();
        for i in 0..3 {
            db.insert_tweet(&format!("t{}", i), "u1", "x", None, None, &[], &[]).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let rows = db.list_feed(&FeedFilter::All, 10, 0).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["t2", "t1", "t0"]);
    }
}
