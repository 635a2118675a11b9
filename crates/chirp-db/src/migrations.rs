use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id               TEXT PRIMARY KEY,
            username         TEXT NOT NULL UNIQUE,
            email            TEXT NOT NULL UNIQUE,
            password         TEXT NOT NULL,
            name             TEXT NOT NULL,
            bio              TEXT NOT NULL DEFAULT '',
            location         TEXT NOT NULL DEFAULT '',
            website          TEXT NOT NULL DEFAULT '',
            profile_picture  TEXT NOT NULL DEFAULT '',
            cover_picture    TEXT NOT NULL DEFAULT '',
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Follow edge A -> B: A follows B. following(A) and followers(B)
        -- are views over this table, so the two directions can never
        -- disagree.
        CREATE TABLE IF NOT EXISTS follows (
            follower_id  TEXT NOT NULL REFERENCES users(id),
            followee_id  TEXT NOT NULL REFERENCES users(id),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (follower_id, followee_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_followee
            ON follows(followee_id);

        -- reply_to / retweet_of are not FK-enforced: deleting a referenced
        -- tweet leaves a dangling id that readers must tolerate.
        CREATE TABLE IF NOT EXISTS tweets (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            reply_to    TEXT,
            retweet_of  TEXT,
            is_reply    INTEGER NOT NULL DEFAULT 0,
            is_retweet  INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tweets_author
            ON tweets(author_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_tweets_reply_to
            ON tweets(reply_to);

        CREATE TABLE IF NOT EXISTS engagements (
            tweet_id    TEXT NOT NULL REFERENCES tweets(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            kind        TEXT NOT NULL CHECK (kind IN ('like', 'retweet', 'bookmark')),
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (tweet_id, user_id, kind)
        );

        CREATE INDEX IF NOT EXISTS idx_engagements_user
            ON engagements(user_id, kind);

        CREATE TABLE IF NOT EXISTS hashtags (
            tweet_id  TEXT NOT NULL REFERENCES tweets(id) ON DELETE CASCADE,
            tag       TEXT NOT NULL,
            PRIMARY KEY (tweet_id, tag)
        );

        CREATE INDEX IF NOT EXISTS idx_hashtags_tag
            ON hashtags(tag);

        CREATE TABLE IF NOT EXISTS media (
            id            TEXT PRIMARY KEY,
            owner_id      TEXT NOT NULL REFERENCES users(id),
            content_type  TEXT NOT NULL,
            size          INTEGER NOT NULL,
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS tweet_media (
            tweet_id  TEXT NOT NULL REFERENCES tweets(id) ON DELETE CASCADE,
            media_id  TEXT NOT NULL REFERENCES media(id),
            position  INTEGER NOT NULL,
            PRIMARY KEY (tweet_id, position)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
