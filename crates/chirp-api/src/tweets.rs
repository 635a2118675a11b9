use std::collections::HashMap;

use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use chirp_db::Database;
use chirp_db::models::{
    EngagementKind, EngagementRow, HashtagRow, ReplyEdgeRow, TweetMediaRow, TweetRow,
};
use chirp_db::queries::FeedFilter;
use chirp_types::api::{
    CreateTweetRequest, RetweetRequest, RetweetResponse, ToggleResponse, TweetDetail, TweetPage,
    TweetRef, TweetResponse, UserSummary,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::hashtags::extract_hashtags;
use crate::middleware::Claims;

const MAX_CONTENT_CHARS: usize = 280;
const MAX_TWEET_IMAGES: usize = 4;
pub(crate) const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
}

#[derive(Debug, Deserialize)]
pub struct TweetQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
    pub following: Option<bool>,
}

pub(crate) fn default_limit() -> u32 {
    20
}

// -- Row -> response helpers --

pub(crate) fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str, id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Stored as naive UTC text; millisecond precision since this
            // schema, second precision for rows written by SQLite defaults.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.3f").map(|ndt| ndt.and_utc())
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on '{}': {}", raw, id, e);
            DateTime::default()
        })
}

fn author_summary(row: &TweetRow) -> Option<UserSummary> {
    let username = row.author_username.clone()?;
    Some(UserSummary {
        id: parse_id(&row.author_id, "author id"),
        name: row.author_name.clone().unwrap_or_default(),
        username,
        profile_picture: row.author_profile_picture.clone().unwrap_or_default(),
        bio: row.author_bio.clone().unwrap_or_default(),
    })
}

/// Everything needed to render a page of tweets, fetched in one blocking
/// round so the listing stays at a fixed number of queries.
struct TweetBundle {
    rows: Vec<TweetRow>,
    engagements: Vec<EngagementRow>,
    reply_edges: Vec<ReplyEdgeRow>,
    media: Vec<TweetMediaRow>,
    hashtags: Vec<HashtagRow>,
    refs: Vec<TweetRow>,
}

fn load_bundle(db: &Database, rows: Vec<TweetRow>) -> anyhow::Result<TweetBundle> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

    let engagements = db.engagements_for_tweets(&ids)?;
    let reply_edges = db.replies_for_tweets(&ids)?;
    let media = db.media_for_tweets(&ids)?;
    let hashtags = db.hashtags_for_tweets(&ids)?;

    let mut ref_ids: Vec<String> = rows
        .iter()
        .flat_map(|r| [r.reply_to.clone(), r.retweet_of.clone()])
        .flatten()
        .collect();
    ref_ids.sort();
    ref_ids.dedup();
    let refs = db.tweets_by_ids(&ref_ids)?;

    Ok(TweetBundle {
        rows,
        engagements,
        reply_edges,
        media,
        hashtags,
        refs,
    })
}

/// Group the batched rows by tweet id and assemble the response list.
/// References to deleted tweets resolve to `None` rather than failing.
fn compose_tweets(bundle: TweetBundle) -> Vec<TweetResponse> {
    let TweetBundle {
        rows,
        engagements,
        reply_edges,
        media,
        hashtags,
        refs,
    } = bundle;

    let mut engagement_map: HashMap<String, HashMap<EngagementKind, Vec<Uuid>>> = HashMap::new();
    for e in engagements {
        engagement_map
            .entry(e.tweet_id)
            .or_default()
            .entry(e.kind)
            .or_default()
            .push(parse_id(&e.user_id, "engagement user id"));
    }

    let mut reply_map: HashMap<String, Vec<Uuid>> = HashMap::new();
    for edge in reply_edges {
        reply_map
            .entry(edge.parent_id)
            .or_default()
            .push(parse_id(&edge.reply_id, "reply id"));
    }

    let mut media_map: HashMap<String, Vec<Uuid>> = HashMap::new();
    for m in media {
        media_map
            .entry(m.tweet_id)
            .or_default()
            .push(parse_id(&m.media_id, "media id"));
    }

    let mut tag_map: HashMap<String, Vec<String>> = HashMap::new();
    for h in hashtags {
        tag_map.entry(h.tweet_id).or_default().push(h.tag);
    }

    let ref_map: HashMap<String, TweetRef> = refs
        .into_iter()
        .map(|r| {
            let tweet_ref = TweetRef {
                id: parse_id(&r.id, "tweet id"),
                content: r.content.clone(),
                user: author_summary(&r),
            };
            (r.id, tweet_ref)
        })
        .collect();

    rows.into_iter()
        .map(|row| {
            let mut kinds = engagement_map.remove(&row.id).unwrap_or_default();
            TweetResponse {
                id: parse_id(&row.id, "tweet id"),
                content: row.content.clone(),
                user: author_summary(&row),
                images: media_map.remove(&row.id).unwrap_or_default(),
                likes: kinds.remove(&EngagementKind::Like).unwrap_or_default(),
                retweets: kinds.remove(&EngagementKind::Retweet).unwrap_or_default(),
                bookmarks: kinds.remove(&EngagementKind::Bookmark).unwrap_or_default(),
                replies: reply_map.remove(&row.id).unwrap_or_default(),
                reply_to: row.reply_to.as_ref().and_then(|id| ref_map.get(id).cloned()),
                retweet_data: row.retweet_of.as_ref().and_then(|id| ref_map.get(id).cloned()),
                is_reply: row.is_reply,
                is_retweet: row.is_retweet,
                hashtags: tag_map.remove(&row.id).unwrap_or_default(),
                created_at: parse_timestamp(&row.created_at, &row.id),
            }
        })
        .collect()
}

/// One page of tweets for the given scope: newest-first rows, enriched,
/// with the source's pagination envelope.
pub(crate) async fn load_page(
    state: &AppState,
    filter: FeedFilter,
    limit: i64,
    skip: i64,
) -> Result<(Vec<TweetResponse>, i64, bool), ApiError> {
    let db = state.clone();
    let (bundle, total) = blocking(move || {
        let rows = db.db.list_feed(&filter, limit, skip)?;
        let total = db.db.count_feed(&filter)?;
        let bundle = load_bundle(&db.db, rows)?;
        Ok((bundle, total))
    })
    .await?;

    let tweets = compose_tweets(bundle);
    let has_more = total > skip + tweets.len() as i64;
    Ok((tweets, total, has_more))
}

async fn load_single(state: &AppState, id: &str) -> Result<Option<TweetResponse>, ApiError> {
    let db = state.clone();
    let tid = id.to_string();
    let bundle = blocking(move || {
        let rows = match db.db.get_tweet(&tid)? {
            Some(row) => vec![row],
            None => vec![],
        };
        load_bundle(&db.db, rows)
    })
    .await?;

    Ok(compose_tweets(bundle).into_iter().next())
}

pub(crate) fn validate_content(raw: &str) -> Result<String, ApiError> {
    let content = raw.trim();
    let count = content.chars().count();

    if count == 0 {
        return Err(ApiError::Validation("content is required".into()));
    }
    if count > MAX_CONTENT_CHARS {
        return Err(ApiError::Validation("content must be at most 280 characters".into()));
    }

    Ok(content.to_string())
}

// -- Handlers --

pub async fn create_tweet(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<CreateTweetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validate_content(&req.content)?;

    if req.media.len() > MAX_TWEET_IMAGES {
        return Err(ApiError::Validation("a tweet can carry at most 4 images".into()));
    }

    // Reply and retweet references are independent paths; either, both or
    // neither may be present.
    if let Some(parent) = req.reply_to {
        let db = state.clone();
        let pid = parent.to_string();
        if blocking(move || db.db.get_tweet(&pid)).await?.is_none() {
            return Err(ApiError::NotFound("the tweet you are replying to was not found".into()));
        }
    }

    if let Some(original) = req.retweet_of {
        let db = state.clone();
        let oid = original.to_string();
        if blocking(move || db.db.get_tweet(&oid)).await?.is_none() {
            return Err(ApiError::NotFound("the tweet you are retweeting was not found".into()));
        }
    }

    let media: Vec<String> = req.media.iter().map(Uuid::to_string).collect();
    if !media.is_empty() {
        let db = state.clone();
        let ids = media.clone();
        let owner = claims.sub.to_string();
        let found = blocking(move || db.db.get_media_many(&ids)).await?;
        if found.len() != media.len() || found.iter().any(|m| m.owner_id != owner) {
            return Err(ApiError::Validation("unknown media reference".into()));
        }
    }

    let tags = extract_hashtags(&content);
    let id = Uuid::new_v4();

    let db = state.clone();
    {
        let tid = id.to_string();
        let author = claims.sub.to_string();
        let content = content.clone();
        let reply_to = req.reply_to.map(|u| u.to_string());
        let retweet_of = req.retweet_of.map(|u| u.to_string());
        blocking(move || {
            db.db.insert_tweet(
                &tid,
                &author,
                &content,
                reply_to.as_deref(),
                retweet_of.as_deref(),
                &tags,
                &media,
            )
        })
        .await?;
    }

    let tweet = load_single(&state, &id.to_string())
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow!("tweet vanished after insert")))?;

    Ok((StatusCode::CREATED, Json(tweet)))
}

pub async fn delete_tweet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    claims: Claims,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let tid = id.to_string();
    let tweet = blocking(move || db.db.get_tweet(&tid))
        .await?
        .ok_or_else(|| ApiError::NotFound("tweet not found".into()))?;

    if tweet.author_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("you cannot delete someone else's tweet".into()));
    }

    let db = state.clone();
    let tid = id.to_string();
    blocking(move || db.db.delete_tweet(&tid)).await?;

    Ok(Json(json!({ "deleted": true })))
}

pub async fn list_tweets(
    State(state): State<AppState>,
    Query(query): Query<TweetQuery>,
    claims: Option<Claims>,
) -> Result<Json<TweetPage>, ApiError> {
    let filter = if query.following.unwrap_or(false) {
        // Following mode needs an identity to resolve the followed set.
        let claims = claims.ok_or(ApiError::Unauthenticated)?;
        FeedFilter::Network(claims.sub.to_string())
    } else if let Some(user_id) = query.user_id {
        FeedFilter::Author(user_id.to_string())
    } else {
        FeedFilter::All
    };

    let limit = i64::from(query.limit.min(MAX_PAGE_SIZE));
    let (tweets, total, has_more) = load_page(&state, filter, limit, query.skip.into()).await?;

    Ok(Json(TweetPage {
        tweets,
        total,
        has_more,
    }))
}

pub async fn get_tweet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TweetDetail>, ApiError> {
    let tid = id.to_string();
    let tweet = load_single(&state, &tid)
        .await?
        .ok_or_else(|| ApiError::NotFound("tweet not found".into()))?;

    // Full reply list, newest first; -1 is SQLite for "no limit".
    let (replies, _, _) = load_page(&state, FeedFilter::RepliesTo(tid), -1, 0).await?;

    Ok(Json(TweetDetail { tweet, replies }))
}

pub async fn like_tweet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    claims: Claims,
) -> Result<Json<ToggleResponse>, ApiError> {
    toggle(state, id, claims, EngagementKind::Like).await
}

pub async fn bookmark_tweet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    claims: Claims,
) -> Result<Json<ToggleResponse>, ApiError> {
    toggle(state, id, claims, EngagementKind::Bookmark).await
}

async fn toggle(
    state: AppState,
    id: Uuid,
    claims: Claims,
    kind: EngagementKind,
) -> Result<Json<ToggleResponse>, ApiError> {
    let db = state.clone();
    let tid = id.to_string();
    blocking(move || db.db.get_tweet(&tid))
        .await?
        .ok_or_else(|| ApiError::NotFound("tweet not found".into()))?;

    let db = state.clone();
    let tid = id.to_string();
    let uid = claims.sub.to_string();
    let added = blocking(move || db.db.toggle_engagement(&tid, &uid, kind)).await?;

    Ok(Json(ToggleResponse { added }))
}

pub async fn retweet_tweet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    claims: Claims,
    body: Option<Json<RetweetRequest>>,
) -> Result<Json<RetweetResponse>, ApiError> {
    let Json(req) = body.unwrap_or_default();

    let db = state.clone();
    let tid = id.to_string();
    let original = blocking(move || db.db.get_tweet(&tid))
        .await?
        .ok_or_else(|| ApiError::NotFound("tweet not found".into()))?;

    // A quote retweet carries its own text; a plain retweet copies the
    // original's content.
    let content = match &req.quote_content {
        Some(quote) => validate_content(quote)?,
        None => original.content,
    };
    let tags = extract_hashtags(&content);
    let new_id = Uuid::new_v4();

    let db = state.clone();
    let (added, post_id) = {
        let tid = id.to_string();
        let uid = claims.sub.to_string();
        let nid = new_id.to_string();
        blocking(move || db.db.toggle_retweet(&tid, &uid, &nid, &content, &tags)).await?
    };

    let tweet = match (added, post_id) {
        (true, Some(post_id)) => load_single(&state, &post_id).await?,
        _ => None,
    };

    Ok(Json(RetweetResponse { added, tweet }))
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    claims: Claims,
) -> Result<Json<TweetPage>, ApiError> {
    let filter = FeedFilter::Bookmarks(claims.sub.to_string());
    let limit = i64::from(query.limit.min(MAX_PAGE_SIZE));
    let (tweets, total, has_more) = load_page(&state, filter, limit, query.skip.into()).await?;

    Ok(Json(TweetPage {
        tweets,
        total,
        has_more,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, author: &str) -> TweetRow {
        TweetRow {
            id: id.into(),
            author_id: author.into(),
            content: "hello".into(),
            reply_to: None,
            retweet_of: None,
            is_reply: false,
            is_retweet: false,
            created_at: "2026-08-07 12:00:00.000".into(),
            author_name: Some("Alice".into()),
            author_username: Some("alice".into()),
            author_profile_picture: Some(String::new()),
            author_bio: Some(String::new()),
        }
    }

    #[test]
    fn content_is_trimmed_and_bounded_by_code_points() {
        assert_eq!(validate_content("  hello  ").unwrap(), "hello");
        assert!(validate_content("   ").is_err());

        let exactly = "ü".repeat(280);
        assert_eq!(validate_content(&exactly).unwrap().chars().count(), 280);
        assert!(validate_content(&"ü".repeat(281)).is_err());
    }

    #[test]
    fn compose_groups_engagements_by_kind() {
        let uid = Uuid::new_v4();
        let tweet_id = Uuid::new_v4().to_string();

        let bundle = TweetBundle {
            rows: vec![row(&tweet_id, &Uuid::new_v4().to_string())],
            engagements: vec![
                EngagementRow {
                    tweet_id: tweet_id.clone(),
                    user_id: uid.to_string(),
                    kind: EngagementKind::Like,
                },
                EngagementRow {
                    tweet_id: tweet_id.clone(),
                    user_id: uid.to_string(),
                    kind: EngagementKind::Bookmark,
                },
            ],
            reply_edges: vec![],
            media: vec![],
            hashtags: vec![],
            refs: vec![],
        };

        let tweets = compose_tweets(bundle);
        assert_eq!(tweets.len(), 1);
        assert_eq!(tweets[0].likes, vec![uid]);
        assert_eq!(tweets[0].bookmarks, vec![uid]);
        assert!(tweets[0].retweets.is_empty());
    }

    #[test]
    fn compose_tolerates_dangling_references() {
        let tweet_id = Uuid::new_v4().to_string();
        let mut orphan = row(&tweet_id, &Uuid::new_v4().to_string());
        orphan.reply_to = Some(Uuid::new_v4().to_string());
        orphan.is_reply = true;

        let bundle = TweetBundle {
            rows: vec![orphan],
            engagements: vec![],
            reply_edges: vec![],
            media: vec![],
            hashtags: vec![],
            refs: vec![],
        };

        let tweets = compose_tweets(bundle);
        assert!(tweets[0].is_reply);
        assert!(tweets[0].reply_to.is_none());
    }

    #[test]
    fn compose_renders_missing_author_as_none() {
        let mut anonymous = row(&Uuid::new_v4().to_string(), "gone");
        anonymous.author_username = None;
        anonymous.author_name = None;

        let bundle = TweetBundle {
            rows: vec![anonymous],
            engagements: vec![],
            reply_edges: vec![],
            media: vec![],
            hashtags: vec![],
            refs: vec![],
        };

        assert!(compose_tweets(bundle)[0].user.is_none());
    }
}
