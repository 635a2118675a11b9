use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use chirp_db::models::{ProfilePatch, UserSummaryRow};
use chirp_db::queries::FeedFilter;
use chirp_types::api::{
    FollowResponse, FollowersResponse, FollowingResponse, PrivateProfile, ProfileResponse,
    PublicProfile, UpdateProfileRequest, UserSearchResponse, UserSummary,
};

use crate::auth::AppState;
use crate::error::{ApiError, blocking};
use crate::middleware::Claims;
use crate::tweets::{parse_id, parse_timestamp};

/// Search results are capped the way the source capped them.
const SEARCH_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

fn summary_from_row(row: UserSummaryRow) -> UserSummary {
    UserSummary {
        id: parse_id(&row.id, "user id"),
        name: row.name,
        username: row.username,
        profile_picture: row.profile_picture,
        bio: row.bio,
    }
}

/// The caller's own record with raw follower/following id sets; shared by
/// the auth responses and `GET /auth/me`.
pub(crate) async fn load_private_profile(
    state: &AppState,
    user_id: &str,
) -> Result<PrivateProfile, ApiError> {
    let db = state.clone();
    let uid = user_id.to_string();
    let (user, followers, following) = blocking(move || {
        let user = db.db.get_user_by_id(&uid)?;
        let followers = db.db.follower_ids(&uid)?;
        let following = db.db.following_ids(&uid)?;
        Ok((user, followers, following))
    })
    .await?;

    let user = user.ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    Ok(PrivateProfile {
        id: parse_id(&user.id, "user id"),
        username: user.username,
        email: user.email,
        name: user.name,
        bio: user.bio,
        location: user.location,
        website: user.website,
        profile_picture: user.profile_picture,
        cover_picture: user.cover_picture,
        followers: followers.iter().map(|id| parse_id(id, "follower id")).collect(),
        following: following.iter().map(|id| parse_id(id, "following id")).collect(),
        created_at: parse_timestamp(&user.created_at, &user.id),
    })
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let bundle = blocking(move || {
        let Some(user) = db.db.get_user_by_username(&username)? else {
            return Ok(None);
        };
        let followers = db.db.followers_of(&user.id)?;
        let following = db.db.following_of(&user.id)?;
        let tweet_count = db.db.count_feed(&FeedFilter::Author(user.id.clone()))?;
        Ok(Some((user, followers, following, tweet_count)))
    })
    .await?;

    let Some((user, followers, following, tweet_count)) = bundle else {
        return Err(ApiError::NotFound("user not found".into()));
    };

    Ok(Json(ProfileResponse {
        user: PublicProfile {
            id: parse_id(&user.id, "user id"),
            username: user.username,
            email: user.email,
            name: user.name,
            bio: user.bio,
            location: user.location,
            website: user.website,
            profile_picture: user.profile_picture,
            cover_picture: user.cover_picture,
            followers: followers.into_iter().map(summary_from_row).collect(),
            following: following.into_iter().map(summary_from_row).collect(),
            created_at: parse_timestamp(&user.created_at, &user.id),
        },
        tweet_count,
    }))
}

/// Toggle the caller's follow edge towards `id`.
pub async fn follow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    claims: Claims,
) -> Result<Json<FollowResponse>, ApiError> {
    if id == claims.sub {
        return Err(ApiError::Validation("you cannot follow yourself".into()));
    }

    let db = state.clone();
    let actor = claims.sub.to_string();
    let target = id.to_string();
    let following = blocking(move || {
        if db.db.get_user_by_id(&target)?.is_none() {
            return Ok(None);
        }
        let currently = db.db.is_following(&actor, &target)?;
        db.db.set_follow(&actor, &target, !currently)?;
        Ok(Some(!currently))
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    Ok(Json(FollowResponse { following }))
}

fn validate_patch(req: UpdateProfileRequest) -> Result<ProfilePatch, ApiError> {
    if let Some(name) = &req.name {
        let len = name.trim().chars().count();
        if !(2..=50).contains(&len) {
            return Err(ApiError::Validation("name must be 2-50 characters".into()));
        }
    }
    if req.bio.as_ref().is_some_and(|s| s.chars().count() > 160) {
        return Err(ApiError::Validation("bio must be at most 160 characters".into()));
    }
    if req.location.as_ref().is_some_and(|s| s.chars().count() > 30) {
        return Err(ApiError::Validation("location must be at most 30 characters".into()));
    }
    if req.website.as_ref().is_some_and(|s| s.chars().count() > 100) {
        return Err(ApiError::Validation("website must be at most 100 characters".into()));
    }

    Ok(ProfilePatch {
        name: req.name.map(|s| s.trim().to_string()),
        bio: req.bio,
        location: req.location,
        website: req.website,
        profile_picture: req.profile_picture,
        cover_picture: req.cover_picture,
    })
}

/// Partial update: only the provided fields are touched.
pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let patch = validate_patch(req)?;

    let db = state.clone();
    let uid = claims.sub.to_string();
    blocking(move || db.db.update_profile(&uid, &patch)).await?;

    let profile = load_private_profile(&state, &claims.sub.to_string()).await?;
    Ok(Json(profile))
}

pub async fn get_followers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FollowersResponse>, ApiError> {
    let rows = follow_listing(&state, id, true).await?;
    Ok(Json(FollowersResponse {
        followers: rows.into_iter().map(summary_from_row).collect(),
    }))
}

pub async fn get_following(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FollowingResponse>, ApiError> {
    let rows = follow_listing(&state, id, false).await?;
    Ok(Json(FollowingResponse {
        following: rows.into_iter().map(summary_from_row).collect(),
    }))
}

async fn follow_listing(
    state: &AppState,
    id: Uuid,
    followers: bool,
) -> Result<Vec<UserSummaryRow>, ApiError> {
    let db = state.clone();
    let uid = id.to_string();
    blocking(move || {
        if db.db.get_user_by_id(&uid)?.is_none() {
            return Ok(None);
        }
        let rows = if followers {
            db.db.followers_of(&uid)?
        } else {
            db.db.following_of(&uid)?
        };
        Ok(Some(rows))
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("user not found".into()))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<UserSearchResponse>, ApiError> {
    let needle = query.query.unwrap_or_default();
    if needle.trim().is_empty() {
        return Err(ApiError::Validation("a search query is required".into()));
    }

    let db = state.clone();
    let rows = blocking(move || db.db.search_users(needle.trim(), SEARCH_LIMIT)).await?;

    Ok(Json(UserSearchResponse {
        users: rows.into_iter().map(summary_from_row).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_keeps_only_provided_fields() {
        let patch = validate_patch(UpdateProfileRequest {
            bio: Some("hello".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(patch.bio.as_deref(), Some("hello"));
        assert!(patch.name.is_none());
        assert!(patch.website.is_none());
    }

    #[test]
    fn patch_enforces_field_bounds() {
        assert!(
            validate_patch(UpdateProfileRequest {
                name: Some("A".into()),
                ..Default::default()
            })
            .is_err()
        );
        assert!(
            validate_patch(UpdateProfileRequest {
                bio: Some("x".repeat(161)),
                ..Default::default()
            })
            .is_err()
        );
        assert!(
            validate_patch(UpdateProfileRequest {
                location: Some("x".repeat(31)),
                ..Default::default()
            })
            .is_err()
        );
    }

    #[test]
    fn patch_trims_the_display_name() {
        let patch = validate_patch(UpdateProfileRequest {
            name: Some("  Alice  ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(patch.name.as_deref(), Some("Alice"));
    }
}
