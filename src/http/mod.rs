use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{AdminUser, AuthUser};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::users())
        .merge(routes::recipes())
        .merge(routes::categories())
        .merge(routes::ingredients())
        .merge(routes::reports());

    Router::new()
        .merge(routes::health())
        .nest("/api", api)
        .with_state(state)
}
