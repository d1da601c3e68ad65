use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use std::convert::Infallible;
use tracing::warn;

use super::jwt::Claims;
use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| {
            auth.strip_prefix("Bearer ")
                .or_else(|| auth.strip_prefix("bearer "))
        })
}

/// Rejects the request unless a valid, unexpired bearer token is present;
/// decoded claims are handed to the handler. A missing signing secret is a
/// server-side configuration error, not a 401.
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::NoToken)?;
        let keys = state.token_keys()?;
        let claims = keys.verify(token).map_err(|e| {
            warn!(code = e.code(), "token rejected");
            e
        })?;
        Ok(AuthUser(claims))
    }
}

/// Optional variant: any token failure is swallowed and the request
/// proceeds unauthenticated.
pub struct MaybeAuthUser(pub Option<Claims>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_token(parts)
            .and_then(|token| state.token_keys().ok().map(|keys| (keys, token.to_owned())))
            .and_then(|(keys, token)| keys.verify(&token).ok());
        Ok(MaybeAuthUser(claims))
    }
}

/// Authenticated user whose username passes the creator policy.
pub struct CreatorUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for CreatorUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !state.creators.is_creator(&claims.username) {
            warn!(username = %claims.username, "creator permission denied");
            return Err(ApiError::InsufficientPermissions);
        }
        Ok(CreatorUser(claims))
    }
}
