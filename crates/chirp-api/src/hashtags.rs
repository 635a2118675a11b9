use std::collections::HashSet;
use std::sync::OnceLock;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use regex::Regex;
use serde::Deserialize;

use chirp_db::queries::FeedFilter;
use chirp_types::api::{TagSearchResponse, TrendEntry, TrendsResponse};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::tweets::{MAX_PAGE_SIZE, PageQuery, load_page, parse_id};

fn hashtag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"#(\w+)").expect("regex should compile"))
}

/// Distinct, lower-cased hashtags from tweet content, in first-seen order.
/// Runs at the single write path (tweet creation); tags are never taken
/// from the caller.
pub(crate) fn extract_hashtags(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for caps in hashtag_regex().captures_iter(content) {
        let tag = caps[1].to_lowercase();
        if seen.insert(tag.clone()) {
            tags.push(tag);
        }
    }

    tags
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_trend_limit")]
    pub limit: u32,
}

fn default_days() -> u32 {
    1
}

fn default_trend_limit() -> u32 {
    10
}

pub async fn search_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<TagSearchResponse>, ApiError> {
    let tag = tag.to_lowercase();
    let limit = i64::from(query.limit.min(MAX_PAGE_SIZE));

    let (tweets, total, has_more) = load_page(
        &state,
        FeedFilter::Tag(tag.clone()),
        limit,
        query.skip.into(),
    )
    .await?;

    Ok(Json(TagSearchResponse {
        tag,
        tweets,
        total,
        has_more,
    }))
}

pub async fn trending(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> Result<Json<TrendsResponse>, ApiError> {
    let since = (chrono::Utc::now() - chrono::Duration::days(i64::from(query.days)))
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string();
    let limit = i64::from(query.limit.min(MAX_PAGE_SIZE));

    let db = state.clone();
    let rows = blocking(move || db.db.trending(&since, limit)).await?;

    let trends = rows
        .into_iter()
        .map(|row| TrendEntry {
            tag: row.tag,
            count: row.count,
            tweets: row
                .tweet_ids
                .iter()
                .map(|id| parse_id(id, "tweet id"))
                .collect(),
        })
        .collect();

    Ok(Json(TrendsResponse { trends }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_case_folds_and_deduplicates() {
        let tags = extract_hashtags("hello #World and #world again #Test_1");
        assert_eq!(tags, ["world", "test_1"]);
    }

    #[test]
    fn extraction_handles_adjacent_and_missing_tags() {
        assert!(extract_hashtags("no tags at all").is_empty());
        assert!(extract_hashtags("a bare # is not a tag").is_empty());
        assert_eq!(extract_hashtags("#a#b"), ["a", "b"]);
        assert_eq!(extract_hashtags("punctuation #rust! stops the tag"), ["rust"]);
    }
}
