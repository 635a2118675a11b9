use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PrivateProfile,
}

// -- Users --

/// Public author fields attached to tweets and follow listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub profile_picture: String,
    pub bio: String,
}

/// The caller's own record: follow sets as raw id lists, never the
/// password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub profile_picture: String,
    pub cover_picture: String,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Profile page view: follow sets populated with user summaries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub bio: String,
    pub location: String,
    pub website: String,
    pub profile_picture: String,
    pub cover_picture: String,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user: PublicProfile,
    pub tweet_count: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub profile_picture: Option<String>,
    pub cover_picture: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub following: bool,
}

#[derive(Debug, Serialize)]
pub struct FollowersResponse {
    pub followers: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct FollowingResponse {
    pub following: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct UserSearchResponse {
    pub users: Vec<UserSummary>,
}

// -- Tweets --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateTweetRequest {
    pub content: String,
    #[serde(default)]
    pub media: Vec<Uuid>,
    pub reply_to: Option<Uuid>,
    pub retweet_of: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RetweetRequest {
    pub quote_content: Option<String>,
}

/// Minimal view of a referenced tweet (reply target or retweet original).
#[derive(Debug, Clone, Serialize)]
pub struct TweetRef {
    pub id: Uuid,
    pub content: String,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetResponse {
    pub id: Uuid,
    pub content: String,
    pub user: Option<UserSummary>,
    pub images: Vec<Uuid>,
    pub likes: Vec<Uuid>,
    pub retweets: Vec<Uuid>,
    pub bookmarks: Vec<Uuid>,
    pub replies: Vec<Uuid>,
    pub reply_to: Option<TweetRef>,
    pub retweet_data: Option<TweetRef>,
    pub is_reply: bool,
    pub is_retweet: bool,
    pub hashtags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetPage {
    pub tweets: Vec<TweetResponse>,
    pub total: i64,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct TweetDetail {
    pub tweet: TweetResponse,
    pub replies: Vec<TweetResponse>,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub added: bool,
}

#[derive(Debug, Serialize)]
pub struct RetweetResponse {
    pub added: bool,
    pub tweet: Option<TweetResponse>,
}

// -- Hashtags --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSearchResponse {
    pub tag: String,
    pub tweets: Vec<TweetResponse>,
    pub total: i64,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct TrendEntry {
    pub tag: String,
    pub count: i64,
    pub tweets: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub trends: Vec<TrendEntry>,
}

// -- Media --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub media_id: Uuid,
    pub size: u64,
}
