use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::ApiResult,
    state::AppState,
};

use super::repo;

pub fn manifesto_routes() -> Router<AppState> {
    Router::new()
        .route("/manifesto/likes", get(get_likes))
        .route("/manifesto/like", post(toggle_like))
        .route("/manifesto/like/status", get(like_status))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikesResponse {
    pub total_likes: i64,
    pub has_liked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub message: &'static str,
    pub total_likes: i64,
    pub has_liked: bool,
}

/// Guests see the total; known users also see their own membership.
#[instrument(skip(state))]
pub async fn get_likes(
    State(state): State<AppState>,
    MaybeAuthUser(claims): MaybeAuthUser,
) -> ApiResult<Json<LikesResponse>> {
    let total_likes = repo::total_likes(&state.db).await?;
    let has_liked = match &claims {
        Some(c) => repo::has_liked(&state.db, c.sub).await?,
        None => false,
    };
    Ok(Json(LikesResponse {
        total_likes,
        has_liked,
    }))
}

#[instrument(skip(state))]
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<ToggleResponse>> {
    let (has_liked, total_likes) = repo::toggle_like(&state.db, claims.sub).await?;
    info!(user_id = %claims.sub, has_liked, total_likes, "manifesto like toggled");
    Ok(Json(ToggleResponse {
        message: "Like toggled successfully",
        total_likes,
        has_liked,
    }))
}

#[instrument(skip(state))]
pub async fn like_status(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<LikesResponse>> {
    let total_likes = repo::total_likes(&state.db).await?;
    let has_liked = repo::has_liked(&state.db, claims.sub).await?;
    Ok(Json(LikesResponse {
        total_likes,
        has_liked,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_use_camel_case_fields() {
        let json = serde_json::to_value(LikesResponse {
            total_likes: 3,
            has_liked: true,
        })
        .unwrap();
        assert_eq!(json["totalLikes"], 3);
        assert_eq!(json["hasLiked"], true);
    }
}
