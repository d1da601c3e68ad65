use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::{CreatorUser, MaybeAuthUser},
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::dto::{CreateQuizRequest, QuizResponse, SubmitQuizRequest, SubmitQuizResponse};
use super::repo::{QuizMeta, QuizResult, Submission};

pub fn quiz_routes() -> Router<AppState> {
    Router::new()
        .route("/quizzes", post(create_quiz))
        .route("/quizzes/:id", get(get_quiz))
        .route("/quizzes/:id/submit", post(submit_quiz))
}

#[instrument(skip(state))]
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<QuizResponse>> {
    let quiz = QuizMeta::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Quiz"))?;
    if quiz.is_expired(OffsetDateTime::now_utc()) {
        return Err(ApiError::Expired);
    }
    Ok(Json(QuizResponse { quiz }))
}

/// Submission gate: validation happens in full before any persistence, and
/// guests short-circuit after validation with no durable write. Crediting
/// coins and awarding the badge are separate, caller-driven ledger calls.
#[instrument(skip(state, payload))]
pub async fn submit_quiz(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
    Path(quiz_id): Path<Uuid>,
    Json(payload): Json<SubmitQuizRequest>,
) -> ApiResult<Json<SubmitQuizResponse>> {
    let quiz = QuizMeta::find_by_id(&state.db, quiz_id)
        .await?
        .ok_or(ApiError::NotFound("Quiz"))?;
    if quiz.is_expired(OffsetDateTime::now_utc()) {
        return Err(ApiError::Expired);
    }
    let result = QuizResult::find_for_quiz(&state.db, quiz_id, payload.result_id)
        .await?
        .ok_or(ApiError::InvalidResult)?;

    let Some(claims) = claims else {
        info!(quiz_id = %quiz_id, "guest submission accepted");
        return Ok(Json(SubmitQuizResponse {
            message: "Quiz result submitted successfully",
            coins_earned: 0,
            is_guest: true,
            submission: None,
            result,
        }));
    };

    let submission = Submission::insert(
        &state.db,
        claims.sub,
        quiz_id,
        result.id,
        payload.answers.as_ref(),
        payload.traits.as_ref(),
    )
    .await?;
    QuizMeta::increment_taken(&state.db, quiz_id).await?;

    info!(user_id = %claims.sub, quiz_id = %quiz_id, coins = result.coin_value, "submission recorded");
    Ok(Json(SubmitQuizResponse {
        message: "Quiz result submitted successfully",
        coins_earned: result.coin_value,
        is_guest: false,
        submission: Some(submission),
        result,
    }))
}

/// Creator-only: creates a draft quiz shell. Content authoring belongs to
/// the quiz collaborator.
#[instrument(skip(state, payload))]
pub async fn create_quiz(
    State(state): State<AppState>,
    CreatorUser(claims): CreatorUser,
    Json(payload): Json<CreateQuizRequest>,
) -> ApiResult<(StatusCode, Json<QuizResponse>)> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::Validation {
            field: "title",
            message: "Title is required".into(),
        });
    }

    let quiz = QuizMeta::create(
        &state.db,
        title,
        payload.description.as_deref(),
        payload.expires_at,
        claims.sub,
    )
    .await?;

    info!(quiz_id = %quiz.id, created_by = %claims.sub, "quiz draft created");
    Ok((StatusCode::CREATED, Json(QuizResponse { quiz })))
}
