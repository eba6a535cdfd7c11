//! Web endpoints for Ovation.
//!
//! Attendee routes take `Authorization: Bearer <token>`; the admin surface
//! takes HTTP Basic credentials. Mutations answer `{ "ok": bool,
//! "message": string }` so clients can surface the message verbatim.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tally::{recover_from_log, LedgerError, RecoveryError};

use crate::auth;
use crate::models::{Comment, ModelError, Speaker, Talk, User};
use crate::state::AppState;

type ApiError = (StatusCode, Json<Value>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_root))
        .route("/health", get(health))
        .route("/talks", get(list_talks))
        .route("/talks/{id}", get(talk_detail))
        .route("/talks/{id}/rate", post(rate_talk))
        .route("/talks/{id}/comments", post(add_comment))
        .route("/admin/summary", get(admin_summary))
        .route("/admin/users", get(admin_list_users).post(admin_create_user))
        .route("/admin/users/{id}/token", post(admin_regenerate_token))
        .route("/admin/users/{id}", delete(admin_delete_user))
        .route("/admin/matrix", get(admin_matrix))
        .route("/admin/export.csv", get(admin_export_csv))
        .route("/admin/recover-ratings", post(admin_recover_ratings))
        .with_state(state)
}

fn fail(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "ok": false, "message": message.into() })))
}

/// Resolve the bearer token or answer 401.
fn require_user(state: &AppState, headers: &HeaderMap) -> Result<(String, User), ApiError> {
    auth::authenticate(&state.store, headers)
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "authentication required"))
}

/// Check admin credentials or answer 401.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if auth::is_admin(&state.config, headers) {
        Ok(())
    } else {
        Err(fail(StatusCode::UNAUTHORIZED, "admin credentials required"))
    }
}

fn model_error(e: ModelError) -> ApiError {
    let status = match e {
        ModelError::UserNotFound => StatusCode::NOT_FOUND,
        ModelError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    fail(status, e.to_string())
}

/// Serve root discovery endpoint
async fn serve_root() -> impl IntoResponse {
    Json(json!({
        "name": "Ovation",
        "version": env!("CARGO_PKG_VERSION"),
        "links": {
            "talks": "/talks",
            "health": "/health",
        }
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct TalkQuery {
    topic: Option<String>,
    keyword: Option<String>,
}

/// List talks with optional topic filter and keyword search. The caller's
/// own ratings are attached when a valid token is presented.
async fn list_talks(
    State(state): State<AppState>,
    Query(query): Query<TalkQuery>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let all = Talk::all(&state.store);
    let topics = Talk::topic_counts(&all);

    let talks: Vec<Value> = all
        .iter()
        .filter(|(_, talk)| match &query.topic {
            Some(topic) => talk.topic_id.as_deref() == Some(topic.as_str()),
            None => true,
        })
        .filter(|(_, talk)| match &query.keyword {
            Some(keyword) => talk.matches_keyword(keyword),
            None => true,
        })
        .map(|(talk_id, talk)| json!({ "talk_id": talk_id, "talk": talk }))
        .collect();

    let my_ratings = match auth::authenticate(&state.store, &headers) {
        Some((user_id, _)) => state.ledger.ratings_for_user(&user_id),
        None => Default::default(),
    };

    Json(json!({
        "talks": talks,
        "topics": topics,
        "my_ratings": my_ratings,
    }))
}

/// Talk detail: sanitized speakers, comments, per-user ratings, and the
/// caller's own rating (0 when unrated or unauthenticated).
async fn talk_detail(
    State(state): State<AppState>,
    Path(talk_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let talk = Talk::by_id(&state.store, &talk_id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, "talk not found"))?;

    let speaker = talk.speaker_id.and_then(|id| Speaker::sanitized(&state.store, id));
    let co_speakers: Vec<Speaker> = [talk.co_speaker_id1, talk.co_speaker_id2]
        .into_iter()
        .flatten()
        .filter_map(|id| Speaker::sanitized(&state.store, id))
        .collect();

    let users = User::all(&state.store);
    let ratings: Vec<Value> = state
        .ledger
        .ratings_for_talk(&talk_id)
        .into_iter()
        .map(|(user_id, rating)| {
            let name = users.get(&user_id).map(|u| u.name.clone());
            json!({ "user_id": user_id, "user_name": name, "rating": rating })
        })
        .collect();

    let my_rating = match auth::authenticate(&state.store, &headers) {
        Some((user_id, _)) => state.ledger.user_rating_for_talk(&user_id, &talk_id),
        None => 0,
    };

    Ok(Json(json!({
        "talk_id": talk_id,
        "talk": talk,
        "speaker": speaker,
        "co_speakers": co_speakers,
        "comments": Comment::for_talk(&state.store, &talk_id),
        "ratings": ratings,
        "my_rating": my_rating,
        "max_rating": state.ledger.max_rating(),
    })))
}

#[derive(Deserialize)]
struct RateBody {
    rating: u32,
}

async fn rate_talk(
    State(state): State<AppState>,
    Path(talk_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<RateBody>,
) -> Result<Json<Value>, ApiError> {
    let (user_id, _) = require_user(&state, &headers)?;

    if Talk::by_id(&state.store, &talk_id).is_none() {
        return Err(fail(StatusCode::NOT_FOUND, "talk not found"));
    }

    state
        .ledger
        .set_rating(&user_id, &talk_id, body.rating)
        .map_err(|e| match e {
            LedgerError::InvalidRating { .. } => fail(StatusCode::BAD_REQUEST, e.to_string()),
            LedgerError::Store(_) => fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })?;

    Ok(Json(json!({ "ok": true, "message": "Rating saved" })))
}

#[derive(Deserialize)]
struct CommentBody {
    text: String,
}

async fn add_comment(
    State(state): State<AppState>,
    Path(talk_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<CommentBody>,
) -> Result<Json<Value>, ApiError> {
    let (user_id, user) = require_user(&state, &headers)?;

    if Talk::by_id(&state.store, &talk_id).is_none() {
        return Err(fail(StatusCode::NOT_FOUND, "talk not found"));
    }

    Comment::add(&state.store, &talk_id, &user_id, &user.name, &body.text)
        .map_err(model_error)?;

    Ok(Json(json!({ "ok": true, "message": "Comment added" })))
}

/// Per-talk aggregates, every talk present (0 average when nobody rated).
fn talk_aggregates(state: &AppState) -> Vec<(String, Talk, f64, usize)> {
    let averages = state.ledger.average_ratings();
    let mut rows: Vec<(String, Talk, f64, usize)> = Talk::all(&state.store)
        .into_iter()
        .map(|(talk_id, talk)| {
            let average = averages.get(&talk_id).copied().unwrap_or(0.0);
            let count = state.ledger.rating_count_for_talk(&talk_id);
            (talk_id, talk, average, count)
        })
        .collect();

    rows.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    rows
}

async fn admin_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;

    let rows: Vec<Value> = talk_aggregates(&state)
        .into_iter()
        .map(|(talk_id, talk, average, count)| {
            json!({
                "talk_id": talk_id,
                "title": talk.title,
                "average_rating": average,
                "rating_count": count,
            })
        })
        .collect();

    Ok(Json(json!({
        "user_count": User::all(&state.store).len(),
        "talk_count": rows.len(),
        "talks": rows,
    })))
}

async fn admin_list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    Ok(Json(json!({ "users": User::all(&state.store) })))
}

#[derive(Deserialize)]
struct CreateUserBody {
    name: String,
    email: String,
}

async fn admin_create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    require_admin(&state, &headers)?;

    let (user_id, user) =
        User::create(&state.store, &body.name, &body.email).map_err(model_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "ok": true,
            "message": "User created",
            "user_id": user_id,
            "token": user.token,
        })),
    ))
}

async fn admin_regenerate_token(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;

    let token = User::regenerate_token(&state.store, &user_id).map_err(model_error)?;

    Ok(Json(json!({
        "ok": true,
        "message": "Token regenerated",
        "token": token,
    })))
}

/// Delete a user and their stored ratings. The audit log is left alone, so
/// a later recovery run brings the ratings back.
async fn admin_delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;

    User::delete(&state.store, &user_id).map_err(model_error)?;
    state
        .ledger
        .delete_for_user(&user_id)
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "ok": true, "message": "User deleted" })))
}

/// Talks x users rating matrix, with speaker names for context.
async fn admin_matrix(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;

    let users = User::all(&state.store);
    let speakers = Speaker::all(&state.store);

    let rows: Vec<Value> = Talk::all(&state.store)
        .into_iter()
        .map(|(talk_id, talk)| {
            let speaker_name = talk
                .speaker_id
                .and_then(|id| speakers.get(&id.to_string()))
                .map(Speaker::display_name);

            let ratings: Value = state
                .ledger
                .ratings_for_talk(&talk_id)
                .into_iter()
                .map(|(user_id, rating)| (user_id, json!(rating)))
                .collect::<serde_json::Map<String, Value>>()
                .into();

            json!({
                "talk_id": talk_id,
                "title": talk.title,
                "speaker": speaker_name,
                "ratings": ratings,
            })
        })
        .collect();

    let user_list: Vec<Value> = users
        .into_iter()
        .map(|(user_id, user)| json!({ "user_id": user_id, "name": user.name }))
        .collect();

    Ok(Json(json!({ "users": user_list, "talks": rows })))
}

/// Quote a CSV field per RFC 4180 when it needs it.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

async fn admin_export_csv(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    require_admin(&state, &headers)?;

    let mut csv = String::from("Talk ID,Booking Number,Title,Topic,Average Rating,Number of Ratings\n");
    for (talk_id, talk, average, count) in talk_aggregates(&state) {
        csv.push_str(&format!(
            "{},{},{},{},{:.2},{}\n",
            csv_field(&talk_id),
            csv_field(talk.booking_number.as_deref().unwrap_or("")),
            csv_field(&talk.title),
            csv_field(talk.topic_id.as_deref().unwrap_or("")),
            average,
            count,
        ));
    }

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"ratings.csv\"",
        )
        .body(csv.into())
        .map_err(|e| fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(response)
}

async fn admin_recover_ratings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;

    let report = recover_from_log(&state.config.rating_log_file(), &state.store).map_err(
        |e| match e {
            RecoveryError::LogNotFound => fail(StatusCode::NOT_FOUND, e.to_string()),
            _ => fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        },
    )?;

    Ok(Json(json!({
        "ok": true,
        "message": report.message(),
        "entries": report.entries,
    })))
}
