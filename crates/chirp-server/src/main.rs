use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use chirp_api::auth::{self, AppState, AppStateInner};
use chirp_api::hashtags;
use chirp_api::media;
use chirp_api::tweets;
use chirp_api::users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("CHIRP_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("CHIRP_DB_PATH").unwrap_or_else(|_| "chirp.db".into());
    let upload_dir = std::env::var("CHIRP_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into());
    let host = std::env::var("CHIRP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CHIRP_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = chirp_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        upload_dir: PathBuf::from(upload_dir),
    });

    // Routes; handlers taking `Claims` require a bearer token, handlers
    // taking `Option<Claims>` accept anonymous callers.
    let app = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/users/profile/{username}", get(users::get_profile))
        .route("/users/follow/{id}", post(users::follow))
        .route("/users/update", put(users::update_profile))
        .route("/users/followers/{id}", get(users::get_followers))
        .route("/users/following/{id}", get(users::get_following))
        .route("/users/search", get(users::search))
        .route("/tweets", get(tweets::list_tweets).post(tweets::create_tweet))
        .route("/tweets/bookmarks/all", get(tweets::list_bookmarks))
        .route("/tweets/like/{id}", post(tweets::like_tweet))
        .route("/tweets/retweet/{id}", post(tweets::retweet_tweet))
        .route("/tweets/bookmark/{id}", post(tweets::bookmark_tweet))
        .route("/tweets/{id}", get(tweets::get_tweet).delete(tweets::delete_tweet))
        .route("/hashtags/tag/{tag}", get(hashtags::search_by_tag))
        .route("/hashtags/trends", get(hashtags::trending))
        .route("/media", post(media::upload_media))
        .route("/media/{id}", get(media::download_media))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Chirp server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "UP",
        "timestamp": chrono::Utc::now(),
    }))
}
