use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use stride_db::Database;
use stride_engine::{ChallengeEngine, EngineError};
use stride_types::api::{
    ChallengeSummary, ChallengeView, Claims, CreateChallengeRequest, RespondAction, RespondRequest,
};
use stride_types::models::{Challenge, ChallengeKind, ChallengeStatus};

use crate::notify::notify;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChallengeEngine<Database>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn internal_error() -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal error".to_string(),
        }),
    )
}

/// Engine errors map 1:1 onto HTTP statuses; the reason travels in the body.
fn engine_error(err: EngineError) -> ApiError {
    let status = match &err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::Storage(e) => {
            error!("storage failure: {:#}", e);
            return internal_error();
        }
    };
    (status, Json(ErrorBody { error: err.to_string() }))
}

fn join_error(e: tokio::task::JoinError) -> ApiError {
    error!("spawn_blocking join error: {}", e);
    internal_error()
}

/// The participant on the other side of `user_id`, if any.
fn counterpart(challenge: &Challenge, user_id: Uuid) -> Option<Uuid> {
    if challenge.owner_id == user_id {
        challenge.opponent_id
    } else {
        Some(challenge.owner_id)
    }
}

// -- Handlers --

pub async fn create_challenge(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let engine = state.engine.clone();
    let owner_id = claims.sub;
    let now = Utc::now();

    // Run blocking engine + DB work off the async runtime
    let challenge = tokio::task::spawn_blocking(move || {
        // Friend challenges may only target accepted friends; this gate
        // belongs to the caller, not the engine.
        if req.kind == ChallengeKind::Friend {
            if let Some(opponent_id) = req.opponent_id {
                let friends = engine
                    .store()
                    .is_friend(owner_id, opponent_id)
                    .map_err(EngineError::Storage)?;
                if !friends {
                    return Err(EngineError::Forbidden(
                        "challenges can only be sent to friends",
                    ));
                }
            }
        }
        engine.create_challenge(owner_id, req, now)
    })
    .await
    .map_err(join_error)?
    .map_err(engine_error)?;

    if let Some(opponent_id) = challenge.opponent_id {
        notify(
            opponent_id,
            "challenge_invite",
            json!({ "challenge_id": challenge.id, "from": claims.username }),
        );
    }

    Ok((StatusCode::CREATED, Json(ChallengeView::from(&challenge))))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_challenges(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ChallengeView>>, ApiError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(ChallengeStatus::parse(s).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: format!("unknown status filter: {s}"),
                }),
            )
        })?),
        None => None,
    };

    let engine = state.engine.clone();
    let user_id = claims.sub;
    let challenges = tokio::task::spawn_blocking(move || engine.list_challenges(user_id, status))
        .await
        .map_err(join_error)?
        .map_err(engine_error)?;

    Ok(Json(challenges.iter().map(ChallengeView::from).collect()))
}

pub async fn challenge_summary(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ChallengeSummary>, ApiError> {
    let engine = state.engine.clone();
    let viewer_id = claims.sub;
    // One captured instant drives every day boundary in the summary.
    let now = Utc::now();

    let summary =
        tokio::task::spawn_blocking(move || engine.challenge_summary(challenge_id, viewer_id, now))
            .await
            .map_err(join_error)?
            .map_err(engine_error)?;

    Ok(Json(summary))
}

pub async fn respond_to_challenge(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<ChallengeView>, ApiError> {
    let engine = state.engine.clone();
    let user_id = claims.sub;
    let action = req.action;

    let challenge =
        tokio::task::spawn_blocking(move || engine.respond_to_challenge(challenge_id, user_id, req))
            .await
            .map_err(join_error)?
            .map_err(engine_error)?;

    let event = match action {
        RespondAction::Accept => "challenge_accepted",
        RespondAction::Reject => "challenge_rejected",
        RespondAction::Modify => "challenge_countered",
    };
    if let Some(recipient) = counterpart(&challenge, user_id) {
        notify(recipient, event, json!({ "challenge_id": challenge.id }));
    }

    Ok(Json(ChallengeView::from(&challenge)))
}

pub async fn request_finish(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ChallengeView>, ApiError> {
    let engine = state.engine.clone();
    let user_id = claims.sub;
    let now = Utc::now();

    let challenge =
        tokio::task::spawn_blocking(move || engine.request_finish(challenge_id, user_id, now))
            .await
            .map_err(join_error)?
            .map_err(engine_error)?;

    let event = if challenge.status == ChallengeStatus::Finished {
        "challenge_finished"
    } else {
        "finish_requested"
    };
    if let Some(recipient) = counterpart(&challenge, user_id) {
        notify(recipient, event, json!({ "challenge_id": challenge.id }));
    }

    Ok(Json(ChallengeView::from(&challenge)))
}

pub async fn decline_finish(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ChallengeView>, ApiError> {
    let engine = state.engine.clone();
    let user_id = claims.sub;

    let challenge =
        tokio::task::spawn_blocking(move || engine.decline_finish(challenge_id, user_id))
            .await
            .map_err(join_error)?
            .map_err(engine_error)?;

    if let Some(recipient) = counterpart(&challenge, user_id) {
        notify(
            recipient,
            "finish_declined",
            json!({ "challenge_id": challenge.id }),
        );
    }

    Ok(Json(ChallengeView::from(&challenge)))
}

pub async fn delete_challenge(
    State(state): State<AppState>,
    Path(challenge_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let engine = state.engine.clone();
    let user_id = claims.sub;

    tokio::task::spawn_blocking(move || engine.delete_challenge(challenge_id, user_id))
        .await
        .map_err(join_error)?
        .map_err(engine_error)?;

    Ok(StatusCode::NO_CONTENT)
}
