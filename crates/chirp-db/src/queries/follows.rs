use anyhow::{Result, bail};

use super::now_utc;
use crate::Database;
use crate::models::UserSummaryRow;

impl Database {
    /// Set the follow edge to the requested state. A no-op when the
    /// requested state already holds; returns whether anything changed.
    /// Self-follows are rejected before touching storage.
    pub fn set_follow(&self, follower_id: &str, followee_id: &str, follow: bool) -> Result<bool> {
        if follower_id == followee_id {
            bail!("a user cannot follow itself");
        }

        self.with_conn(|conn| {
            let changed = if follow {
                conn.execute(
                    "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at)
                     VALUES (?1, ?2, ?3)",
                    rusqlite::params![follower_id, followee_id, now_utc()],
                )?
            } else {
                conn.execute(
                    "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                    rusqlite::params![follower_id, followee_id],
                )?
            };
            Ok(changed > 0)
        })
    }

    pub fn is_following(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                rusqlite::params![follower_id, followee_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn follower_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT follower_id FROM follows WHERE followee_id = ?1 ORDER BY created_at",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn following_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT followee_id FROM follows WHERE follower_id = ?1 ORDER BY created_at",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn followers_of(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.name, u.username, u.profile_picture, u.bio
                 FROM follows f
                 JOIN users u ON u.id = f.follower_id
                 WHERE f.followee_id = ?1
                 ORDER BY f.created_at",
            )?;
            let rows = stmt
                .query_map([user_id], super::users::map_summary_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn following_of(&self, user_id: &str) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.name, u.username, u.profile_picture, u.bio
                 FROM follows f
                 JOIN users u ON u.id = f.followee_id
                 WHERE f.follower_id = ?1
                 ORDER BY f.created_at",
            )?;
            let rows = stmt
                .query_map([user_id], super::users::map_summary_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
