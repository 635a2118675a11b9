//! Store-level consistency suite: follow mirroring, engagement toggles,
//! retweet duality, reply linkage, pagination and trending, all against an
//! in-memory database.

use chirp_db::Database;
use chirp_db::models::EngagementKind;
use chirp_db::queries::FeedFilter;

fn db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.create_user("alice", "alice", "alice@example.com", "hash", "Alice").unwrap();
    db.create_user("bob", "bob", "bob@example.com", "hash", "Bob").unwrap();
    db
}

fn tweet(db: &Database, id: &str, author: &str, content: &str) {
    db.insert_tweet(id, author, content, None, None, &[], &[]).unwrap();
}

#[test]
fn follow_edges_mirror_in_both_directions() {
    let db = db();

    assert!(db.set_follow("alice", "bob", true).unwrap());
    assert!(db.following_ids("alice").unwrap().contains(&"bob".to_string()));
    assert!(db.follower_ids("bob").unwrap().contains(&"alice".to_string()));

    // Setting the state that already holds is a no-op, not an error.
    assert!(!db.set_follow("alice", "bob", true).unwrap());

    assert!(db.set_follow("alice", "bob", false).unwrap());
    assert!(db.following_ids("alice").unwrap().is_empty());
    assert!(db.follower_ids("bob").unwrap().is_empty());
    assert!(!db.set_follow("alice", "bob", false).unwrap());
}

#[test]
fn self_follow_is_rejected_and_state_unchanged() {
    let db = db();

    assert!(db.set_follow("alice", "alice", true).is_err());
    assert!(db.following_ids("alice").unwrap().is_empty());
    assert!(db.follower_ids("alice").unwrap().is_empty());
}

#[test]
fn like_toggle_is_idempotent_per_call() {
    let db = db();
    tweet(&db, "t1", "alice", "hello");

    assert!(db.toggle_engagement("t1", "bob", EngagementKind::Like).unwrap());
    assert!(db.has_engagement("t1", "bob", EngagementKind::Like).unwrap());

    assert!(!db.toggle_engagement("t1", "bob", EngagementKind::Like).unwrap());
    assert!(!db.has_engagement("t1", "bob", EngagementKind::Like).unwrap());
}

#[test]
fn bookmark_toggle_feeds_the_bookmarks_listing() {
    let db = db();
    tweet(&db, "t1", "alice", "hello");
    tweet(&db, "t2", "alice", "world");

    db.toggle_engagement("t1", "bob", EngagementKind::Bookmark).unwrap();

    let filter = FeedFilter::Bookmarks("bob".into());
    let rows = db.list_feed(&filter, 20, 0).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "t1");
    assert_eq!(db.count_feed(&filter).unwrap(), 1);

    db.toggle_engagement("t1", "bob", EngagementKind::Bookmark).unwrap();
    assert!(db.list_feed(&filter, 20, 0).unwrap().is_empty());
}

#[test]
fn retweet_toggle_mutates_both_entities_together() {
    let db = db();
    tweet(&db, "orig", "alice", "original #topic");

    let (added, post) = db.toggle_retweet("orig", "bob", "rt1", "original #topic", &[]).unwrap();
    assert!(added);
    assert_eq!(post.as_deref(), Some("rt1"));

    assert!(db.has_engagement("orig", "bob", EngagementKind::Retweet).unwrap());
    let rt = db.get_tweet("rt1").unwrap().unwrap();
    assert!(rt.is_retweet);
    assert_eq!(rt.retweet_of.as_deref(), Some("orig"));
    assert_eq!(rt.author_id, "bob");

    let (added, post) = db.toggle_retweet("orig", "bob", "rt-unused", "x", &[]).unwrap();
    assert!(!added);
    assert_eq!(post.as_deref(), Some("rt1"));
    assert!(!db.has_engagement("orig", "bob", EngagementKind::Retweet).unwrap());
    assert!(db.get_tweet("rt1").unwrap().is_none());
}

#[test]
fn retweet_on_off_on_leaves_exactly_one_post_and_membership() {
    let db = db();
    tweet(&db, "orig", "alice", "original");

    db.toggle_retweet("orig", "bob", "rt1", "original", &[]).unwrap();
    db.toggle_retweet("orig", "bob", "rt2", "original", &[]).unwrap();
    db.toggle_retweet("orig", "bob", "rt3", "original", &[]).unwrap();

    assert!(db.has_engagement("orig", "bob", EngagementKind::Retweet).unwrap());
    assert!(db.get_tweet("rt1").unwrap().is_none());
    assert!(db.get_tweet("rt2").unwrap().is_none());
    assert!(db.get_tweet("rt3").unwrap().is_some());

    let engagements = db.engagements_for_tweets(&["orig".to_string()]).unwrap();
    assert_eq!(engagements.len(), 1);
}

#[test]
fn reply_linkage_appends_and_removes() {
    let db = db();
    tweet(&db, "parent", "alice", "root");
    db.insert_tweet("child", "bob", "a reply", Some("parent"), None, &[], &[]).unwrap();

    let edges = db.replies_for_tweets(&["parent".to_string()]).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].reply_id, "child");

    db.delete_tweet("child").unwrap();
    assert!(db.replies_for_tweets(&["parent".to_string()]).unwrap().is_empty());
}

#[test]
fn deleting_a_parent_with_replies_leaves_tolerable_orphans() {
    let db = db();
    tweet(&db, "parent", "alice", "root");
    db.insert_tweet("child", "bob", "a reply", Some("parent"), None, &[], &[]).unwrap();

    db.delete_tweet("parent").unwrap();

    // The reply survives with a dangling reference; readers resolve it to
    // nothing rather than failing.
    let child = db.get_tweet("child").unwrap().unwrap();
    assert_eq!(child.reply_to.as_deref(), Some("parent"));
    assert!(db.tweets_by_ids(&["parent".to_string()]).unwrap().is_empty());
}

#[test]
fn pagination_has_more_boundary() {
    let db = db();
    for i in 0..25 {
        tweet(&db, &format!("t{:02}", i), "alice", "post");
    }

    let filter = FeedFilter::Author("alice".into());
    let total = db.count_feed(&filter).unwrap();
    assert_eq!(total, 25);

    let page = db.list_feed(&filter, 20, 20).unwrap();
    assert_eq!(page.len(), 5);
    assert!(total <= 20 + page.len() as i64, "hasMore must be false here");

    let page = db.list_feed(&filter, 20, 0).unwrap();
    assert_eq!(page.len(), 20);
    assert!(total > 0 + page.len() as i64, "hasMore must be true here");
}

#[test]
fn network_feed_covers_followed_set_plus_self() {
    let db = db();
    db.create_user("carol", "carol", "carol@example.com", "hash", "Carol").unwrap();
    tweet(&db, "ta", "alice", "from alice");
    tweet(&db, "tb", "bob", "from bob");
    tweet(&db, "tc", "carol", "from carol");

    db.set_follow("alice", "bob", true).unwrap();

    let filter = FeedFilter::Network("alice".into());
    let mut ids: Vec<String> =
        db.list_feed(&filter, 20, 0).unwrap().into_iter().map(|r| r.id).collect();
    ids.sort();
    assert_eq!(ids, ["ta", "tb"]);
    assert_eq!(db.count_feed(&filter).unwrap(), 2);
}

#[test]
fn tag_filter_matches_stored_lowercase_tags() {
    let db = db();
    db.insert_tweet("t1", "alice", "#Rust is nice", None, None, &["rust".into()], &[]).unwrap();
    db.insert_tweet("t2", "alice", "no tags here", None, None, &[], &[]).unwrap();

    let filter = FeedFilter::Tag("rust".into());
    let rows = db.list_feed(&filter, 20, 0).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "t1");
}

#[test]
fn trending_counts_window_and_breaks_ties_deterministically() {
    let db = db();
    db.insert_tweet("a1", "alice", "#a", None, None, &["a".into()], &[]).unwrap();
    db.insert_tweet("a2", "alice", "#a", None, None, &["a".into()], &[]).unwrap();
    db.insert_tweet("a3", "alice", "#a", None, None, &["a".into()], &[]).unwrap();
    db.insert_tweet("b1", "alice", "#b", None, None, &["b".into()], &[]).unwrap();
    db.insert_tweet("stale", "alice", "#a", None, None, &["a".into()], &[]).unwrap();

    // Push one #a post outside the 1-day window.
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE tweets SET created_at = '2000-01-01 00:00:00.000' WHERE id = 'stale'",
            [],
        )?;
        Ok(())
    })
    .unwrap();

    let since = (chrono::Utc::now() - chrono::Duration::days(1))
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string();

    let trends = db.trending(&since, 10).unwrap();
    assert_eq!(trends.len(), 2);
    assert_eq!((trends[0].tag.as_str(), trends[0].count), ("a", 3));
    assert_eq!((trends[1].tag.as_str(), trends[1].count), ("b", 1));
    assert!(trends[0].tweet_ids.len() <= 3);

    // Equal counts fall back to lexicographic tag order.
    db.insert_tweet("b2", "alice", "#b", None, None, &["b".into()], &[]).unwrap();
    db.insert_tweet("b3", "alice", "#b", None, None, &["b".into()], &[]).unwrap();
    let trends = db.trending(&since, 10).unwrap();
    assert_eq!(trends[0].tag, "a");
    assert_eq!(trends[1].tag, "b");
    assert_eq!(trends[0].count, trends[1].count);
}

#[test]
fn deleting_a_tweet_cascades_its_own_derived_rows() {
    let db = db();
    db.insert_tweet("t1", "alice", "#x hello", None, None, &["x".into()], &[]).unwrap();
    db.toggle_engagement("t1", "bob", EngagementKind::Like).unwrap();

    db.delete_tweet("t1").unwrap();

    assert!(db.engagements_for_tweets(&["t1".to_string()]).unwrap().is_empty());
    assert!(db.hashtags_for_tweets(&["t1".to_string()]).unwrap().is_empty());
}
