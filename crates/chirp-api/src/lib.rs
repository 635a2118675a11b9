pub mod auth;
pub mod error;
pub mod hashtags;
pub mod media;
pub mod middleware;
pub mod tweets;
pub mod users;
