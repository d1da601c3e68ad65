use axum::{
    extract::{Path, State},
    routing::{get, patch, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    auth::validation::is_valid_name,
    error::{ApiError, ApiResult},
    quizzes::repo::Submission,
    state::AppState,
};

use super::dto::{
    AdjustCoinsRequest, AwardBadgeRequest, BadgeResponse, CoinsResponse, ProfileResponse,
    ProfileWithBadges, SubmissionsResponse, UpdateProfileRequest, UserWithBadges,
};
use super::repo::{adjust_coins, Badge, BadgeAward, PublicProfile, User};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/profile", put(update_profile))
        .route("/users/:username", get(get_profile))
        .route("/users/:username/submissions", get(get_submissions))
        .route("/users/:id/coins", patch(patch_coins))
        .route("/users/:id/badges", post(award_badge))
}

async fn load_user_with_badges(state: &AppState, user_id: Uuid) -> ApiResult<UserWithBadges> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    let badges = Badge::list_for_user(&state.db, user_id).await?;
    Ok(UserWithBadges {
        user: user.into(),
        badges,
    })
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = PublicProfile::find_by_username(&state.db, &username)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    let badges = Badge::list_for_user(&state.db, profile.id).await?;
    Ok(Json(ProfileResponse {
        user: ProfileWithBadges { profile, badges },
    }))
}

/// Trims before validating, so surrounding whitespace cannot smuggle a
/// too-short name past the 2-100 rule.
fn validated_name(name: Option<&str>) -> ApiResult<Option<&str>> {
    match name.map(str::trim) {
        Some(trimmed) if !is_valid_name(trimmed) => Err(ApiError::Validation {
            field: "name",
            message: "Name must be 2-100 characters (letters and spaces only)".into(),
        }),
        other => Ok(other),
    }
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let name = validated_name(payload.name.as_deref())?;

    let user = User::update_profile(
        &state.db,
        claims.sub,
        name,
        payload.profile_picture.as_deref(),
    )
    .await?;
    let badges = Badge::list_for_user(&state.db, user.id).await?;

    info!(user_id = %claims.sub, "profile updated");
    Ok(Json(serde_json::json!({
        "message": "Profile updated successfully",
        "user": UserWithBadges { user: user.into(), badges },
    })))
}

#[instrument(skip(state))]
pub async fn get_submissions(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<Json<SubmissionsResponse>> {
    let profile = PublicProfile::find_by_username(&state.db, &username)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    let submissions = Submission::list_for_user(&state.db, profile.id).await?;
    let total = submissions.len();
    Ok(Json(SubmissionsResponse { submissions, total }))
}

/// Ledger endpoint: clamped balance arithmetic, self-only.
#[instrument(skip(state, payload))]
pub async fn patch_coins(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustCoinsRequest>,
) -> ApiResult<Json<CoinsResponse>> {
    if claims.sub != id {
        return Err(ApiError::Forbidden);
    }

    let (previous_amount, new_amount) =
        adjust_coins(&state.db, id, payload.amount, payload.operation).await?;
    let user = load_user_with_badges(&state, id).await?;

    info!(user_id = %id, previous = previous_amount, new = new_amount, "coins adjusted");
    Ok(Json(CoinsResponse {
        message: "Coins updated successfully",
        user,
        previous_amount,
        new_amount,
    }))
}

/// Badge award is deliberately independent of the coin ledger: crediting
/// the balance for an earned badge is a separate, explicit call.
#[instrument(skip(state, payload))]
pub async fn award_badge(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AwardBadgeRequest>,
) -> ApiResult<Json<BadgeResponse>> {
    if claims.sub != id {
        return Err(ApiError::Forbidden);
    }

    let award = BadgeAward {
        quiz_id: payload.quiz_id,
        result_id: payload.result_id,
        title: &payload.title,
        image: payload.image.as_deref(),
        coin_value: payload.coin_value,
    };
    let (badge, is_new) = Badge::upsert(&state.db, id, &award).await?;
    let user = load_user_with_badges(&state, id).await?;

    info!(user_id = %id, quiz_id = %payload.quiz_id, is_new, "badge awarded");
    Ok(Json(BadgeResponse {
        message: if is_new {
            "Badge added successfully"
        } else {
            "Badge updated successfully"
        },
        badge,
        user,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_trimmed_before_validation() {
        // "  A  " is 5 chars raw but 1 char trimmed; must be rejected.
        let err = validated_name(Some("  A  ")).unwrap_err();
        match err {
            ApiError::Validation { field, .. } => assert_eq!(field, "name"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn valid_names_come_back_trimmed() {
        assert_eq!(validated_name(Some("  Ana Maria  ")).unwrap(), Some("Ana Maria"));
        assert_eq!(validated_name(None).unwrap(), None);
    }
}
