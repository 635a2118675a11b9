use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use regex::Regex;
use uuid::Uuid;

use chirp_db::Database;
use chirp_types::api::{AuthResponse, LoginRequest, RegisterRequest};

use crate::error::{ApiError, blocking};
use crate::middleware::Claims;
use crate::users::load_private_profile;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
}

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{3,20}$").expect("regex should compile"))
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("regex should compile"))
}

/// Normalized (username, email, name) or the first validation failure.
fn validate_registration(req: &RegisterRequest) -> Result<(String, String, String), ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim().to_string();

    if !username_regex().is_match(&username) {
        return Err(ApiError::Validation(
            "username must be 3-20 letters, digits or underscores".into(),
        ));
    }
    if !email_regex().is_match(&email) {
        return Err(ApiError::Validation("a valid email address is required".into()));
    }
    if req.password.len() < 6 {
        return Err(ApiError::Validation("password must be at least 6 characters".into()));
    }
    let name_len = name.chars().count();
    if !(2..=50).contains(&name_len) {
        return Err(ApiError::Validation("name must be 2-50 characters".into()));
    }

    Ok((username, email, name))
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (username, email, name) = validate_registration(&req)?;

    // Check both unique fields up front; the UNIQUE constraints back this
    // up under races.
    let db = state.clone();
    let (email_taken, username_taken) = {
        let email = email.clone();
        let username = username.clone();
        blocking(move || {
            Ok((
                db.db.get_user_by_email(&email)?.is_some(),
                db.db.get_user_by_username(&username)?.is_some(),
            ))
        })
        .await?
    };
    if email_taken {
        return Err(ApiError::Conflict("this email address is already in use".into()));
    }
    if username_taken {
        return Err(ApiError::Conflict("this username is already in use".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();

    let db = state.clone();
    {
        let id = user_id.to_string();
        let username = username.clone();
        blocking(move || db.db.create_user(&id, &username, &email, &password_hash, &name)).await?;
    }

    let token = create_token(&state.jwt_secret, user_id, &username).map_err(ApiError::Internal)?;
    let user = load_private_profile(&state, &user_id.to_string()).await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();

    let db = state.clone();
    let user = blocking(move || db.db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow!("stored password hash unparsable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username).map_err(ApiError::Internal)?;
    let profile = load_private_profile(&state, &user.id).await?;

    Ok(Json(AuthResponse { token, user: profile }))
}

pub async fn me(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<impl IntoResponse, ApiError> {
    let profile = load_private_profile(&state, &claims.sub.to_string()).await?;
    Ok(Json(profile))
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str, password: &str, name: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            name: name.into(),
        }
    }

    #[test]
    fn registration_normalizes_and_accepts_valid_input() {
        let (username, email, name) =
            validate_registration(&request("alice_1", " Alice@Example.COM ", "secret", " Alice "))
                .unwrap();
        assert_eq!(username, "alice_1");
        assert_eq!(email, "alice@example.com");
        assert_eq!(name, "Alice");
    }

    #[test]
    fn registration_rejects_bad_usernames() {
        assert!(validate_registration(&request("ab", "a@b.com", "secret", "Alice")).is_err());
        assert!(validate_registration(&request("has space", "a@b.com", "secret", "Alice")).is_err());
        assert!(
            validate_registration(&request("way_too_long_username_x", "a@b.com", "secret", "Al"))
                .is_err()
        );
    }

    #[test]
    fn registration_rejects_bad_email_password_name() {
        assert!(validate_registration(&request("alice", "not-an-email", "secret", "Alice")).is_err());
        assert!(validate_registration(&request("alice", "a@b.com", "short", "Alice")).is_err());
        assert!(validate_registration(&request("alice", "a@b.com", "secret", "A")).is_err());
    }
}
