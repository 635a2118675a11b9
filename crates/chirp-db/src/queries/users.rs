use anyhow::Result;
use rusqlite::Connection;

use super::{OptionalExt, now_utc};
use crate::Database;
use crate::models::{ProfilePatch, UserRow, UserSummaryRow};

impl Database {
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, username, email, password_hash, name, now_utc()],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    /// Lookup by contact address; the caller is expected to have
    /// lower-cased the email already (stored normalized).
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    /// Merge only the provided fields; absent fields are left untouched.
    pub fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET
                     name            = COALESCE(?2, name),
                     bio             = COALESCE(?3, bio),
                     location        = COALESCE(?4, location),
                     website         = COALESCE(?5, website),
                     profile_picture = COALESCE(?6, profile_picture),
                     cover_picture   = COALESCE(?7, cover_picture)
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    patch.name,
                    patch.bio,
                    patch.location,
                    patch.website,
                    patch.profile_picture,
                    patch.cover_picture,
                ],
            )?;
            Ok(())
        })
    }

    /// Case-insensitive substring match on name or username.
    pub fn search_users(&self, query: &str, limit: i64) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            let pattern = format!("%{}%", query);
            let mut stmt = conn.prepare(
                "SELECT id, name, username, profile_picture, bio
                 FROM users
                 WHERE username LIKE ?1 OR name LIKE ?1
                 ORDER BY username
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![pattern, limit], map_summary_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

pub(super) fn map_summary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserSummaryRow> {
    Ok(UserSummaryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        profile_picture: row.get(3)?,
        bio: row.get(4)?,
    })
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is one of three literals above, never caller input.
    let sql = format!(
        "SELECT id, username, email, password, name, bio, location, website,
                profile_picture, cover_picture, created_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                name: row.get(4)?,
                bio: row.get(5)?,
                location: row.get(6)?,
                website: row.get(7)?,
                profile_picture: row.get(8)?,
                cover_picture: row.get(9)?,
                created_at: row.get(10)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u1", "alice", "alice@example.com", "hash", "Alice").unwrap();
        db
    }

    #[test]
    fn partial_update_leaves_absent_fields_untouched() {
        let db = db_with_user();

        db.update_profile(
            "u1",
            &ProfilePatch {
                bio: Some("hello".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let user = db.get_user_by_id("u1").unwrap().unwrap();
        assert_eq!(user.bio, "hello");
        assert_eq!(user.name, "Alice");

        // A later patch can clear a field with an explicit empty string.
        db.update_profile(
            "u1",
            &ProfilePatch {
                bio: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(db.get_user_by_id("u1").unwrap().unwrap().bio, "");
    }

    #[test]
    fn search_matches_name_and_username_case_insensitively() {
        let db = db_with_user();
        db.create_user("u2", "bob", "bob@example.com", "hash", "Alice Cooper").unwrap();

        let hits = db.search_users("ALICE", 20).unwrap();
        assert_eq!(hits.len(), 2);

        let hits = db.search_users("bob", 20).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "bob");
    }
}
