/// Database row types — these map directly to SQLite rows.
/// Distinct from chirp-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub profile_picture: String,
    pub cover_picture: String,
    pub created_at: String,
}

/// Public author columns joined onto listings.
pub struct UserSummaryRow {
    pub id: String,
    pub name: String,
    pub username: String,
    pub profile_picture: String,
    pub bio: String,
}

pub struct TweetRow {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub reply_to: Option<String>,
    pub retweet_of: Option<String>,
    pub is_reply: bool,
    pub is_retweet: bool,
    pub created_at: String,
    // Joined author columns; None when the author row is missing.
    pub author_name: Option<String>,
    pub author_username: Option<String>,
    pub author_profile_picture: Option<String>,
    pub author_bio: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EngagementKind {
    Like,
    Retweet,
    Bookmark,
}

impl EngagementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EngagementKind::Like => "like",
            EngagementKind::Retweet => "retweet",
            EngagementKind::Bookmark => "bookmark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "like" => Some(EngagementKind::Like),
            "retweet" => Some(EngagementKind::Retweet),
            "bookmark" => Some(EngagementKind::Bookmark),
            _ => None,
        }
    }
}

pub struct EngagementRow {
    pub tweet_id: String,
    pub user_id: String,
    pub kind: EngagementKind,
}

/// A (parent, reply) edge from the derived replies listing.
pub struct ReplyEdgeRow {
    pub parent_id: String,
    pub reply_id: String,
}

pub struct HashtagRow {
    pub tweet_id: String,
    pub tag: String,
}

pub struct MediaRow {
    pub id: String,
    pub owner_id: String,
    pub content_type: String,
    pub size: i64,
    pub created_at: String,
}

pub struct TweetMediaRow {
    pub tweet_id: String,
    pub media_id: String,
    pub position: i64,
}

pub struct TrendRow {
    pub tag: String,
    pub count: i64,
    pub tweet_ids: Vec<String>,
}

/// Partial profile update: `None` leaves the column untouched.
#[derive(Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub profile_picture: Option<String>,
    pub cover_picture: Option<String>,
}
