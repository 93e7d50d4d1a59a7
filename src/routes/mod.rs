pub mod admin;
pub mod announcements;
pub mod auth;
pub mod comments;
pub mod experiences;
pub mod health;
pub mod insights;
pub mod reports;
pub mod users;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Every JSON endpoint, to be nested under `/api`.
pub fn api() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .merge(auth::router())
        .merge(experiences::router())
        .merge(comments::router())
        .merge(reports::router())
        .merge(insights::router())
        .merge(announcements::router())
        .merge(users::router())
        .merge(admin::router())
}
