//! Ready-made data for the public pages, cached between writes.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use mikosite_core::{
    display::{group_cards, PostCard, SeminarCard},
    seminar_calendar, select_upcoming, Planned, Scheduled, Seminar,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::{
    cache::{self, HOMEPAGE_POSTS_MAX_TTL, SEMINAR_GROUPS_MAX_TTL, UPCOMING_SEMINARS_MAX_TTL},
    error::AppError,
    state::AppState,
    store::Tables,
};

const CALENDAR_NAME: &str = "mikosite";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/home", get(home))
        .route("/api/kolo", get(kolo))
        .route("/kolo/calendar.ics", get(calendar))
        .route("/health", get(|| async { "ok" }))
}

async fn home(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let events = upcoming_seminars(&state).await?;
    let posts = homepage_posts(&state).await?;

    Ok(Json(json!({ "events": *events, "posts": *posts })))
}

async fn kolo(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let groups = seminar_groups(&state).await?;

    let tables = state.store.read().await;
    let mut planned = tables
        .seminars
        .iter()
        .filter_map(Seminar::planned)
        .collect::<Vec<_>>();
    planned.sort_by_key(|planned| planned.starts_at());
    let seminars = seminar_cards(&tables, &planned);

    Ok(Json(json!({ "groups": *groups, "seminars": seminars })))
}

async fn calendar(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tables = state.store.read().await;
    let mut planned = tables
        .seminars
        .iter()
        .filter_map(Seminar::planned)
        .collect::<Vec<_>>();
    planned.sort_by_key(|planned| planned.starts_at());

    let stamp = Utc::now().naive_utc();
    let body = seminar_calendar(CALENDAR_NAME, &planned, stamp, |id| tables.users.get(id)).to_string();

    ([(CONTENT_TYPE, "text/calendar")], body)
}

fn seminar_cards(tables: &Tables, planned: &[Planned<'_>]) -> Vec<SeminarCard> {
    planned
        .iter()
        .map(|planned| {
            let seminar = planned.seminar;
            let group = seminar.group.and_then(|group| tables.seminar_groups.get(group));
            let tutors = tables.users.pick(&seminar.tutors);
            SeminarCard::new(seminar, group, &tutors)
        })
        .collect()
}

/// Cached until the first listed seminar starts, and never longer than a day.
async fn upcoming_seminars(state: &AppState) -> Result<Arc<Value>, AppError> {
    if let Some(cached) = state.cache.get(&cache::UPCOMING_SEMINARS) {
        return Ok(cached);
    }

    let now = state.clock.now();
    let tables = state.store.read().await;
    let upcoming = select_upcoming(tables.seminars.iter().filter_map(Seminar::planned), now);

    let ttl = match upcoming.first() {
        Some(first) => (first.starts_at() - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(UPCOMING_SEMINARS_MAX_TTL),
        None => UPCOMING_SEMINARS_MAX_TTL,
    };

    let cards = serde_json::to_value(seminar_cards(&tables, &upcoming))?;
    debug!(count = upcoming.len(), ?ttl, "rebuilt upcoming seminars");

    Ok(state.cache.insert(cache::UPCOMING_SEMINARS, cards, ttl))
}

/// Newest first.
async fn homepage_posts(state: &AppState) -> Result<Arc<Value>, AppError> {
    if let Some(cached) = state.cache.get(&cache::HOMEPAGE_POSTS) {
        return Ok(cached);
    }

    let tables = state.store.read().await;
    let mut posts = tables.posts.iter().collect::<Vec<_>>();
    posts.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));

    let cards = posts
        .into_iter()
        .map(|post| {
            let authors = tables.users.pick(&post.authors);
            let images = tables.post_images.pick(&post.images);
            PostCard::new(post, &authors, &images)
        })
        .collect::<Vec<_>>();
    let cards = serde_json::to_value(cards)?;
    debug!("rebuilt homepage posts");

    Ok(state.cache.insert(cache::HOMEPAGE_POSTS, cards, HOMEPAGE_POSTS_MAX_TTL))
}

async fn seminar_groups(state: &AppState) -> Result<Arc<Value>, AppError> {
    if let Some(cached) = state.cache.get(&cache::SEMINAR_GROUPS) {
        return Ok(cached);
    }

    let tables = state.store.read().await;
    let cards = serde_json::to_value(group_cards(tables.seminar_groups.iter()))?;

    Ok(state.cache.insert(cache::SEMINAR_GROUPS, cards, SEMINAR_GROUPS_MAX_TTL))
}
