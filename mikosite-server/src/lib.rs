use std::sync::Arc;

use axum::{middleware, Router};
use mikosite_core::{ActivityScore, LinkedAccount, Post, PostImage, Reminder, Seminar, SeminarGroup, User};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod cache;
pub mod cli;
pub mod clock;
pub mod error;
pub mod pages;
pub mod pagination;
pub mod probe;
pub mod resources;
pub mod state;
pub mod store;
pub mod throttle;

use resources::routes;
pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::<SeminarGroup>())
        .merge(routes::<Seminar>())
        .merge(routes::<Reminder>())
        .merge(routes::<Post>())
        .merge(routes::<PostImage>())
        .merge(routes::<User>())
        .merge(routes::<LinkedAccount>())
        .merge(routes::<ActivityScore>())
        .merge(resources::accounts::activity_routes())
        .merge(pages::routes())
        .fallback(|| async { error::AppError::NotFound })
        .layer(middleware::from_fn_with_state(state.clone(), throttle::limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
