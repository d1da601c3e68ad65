use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    users::dto::UserWithBadges,
    users::repo::{Badge, NewUser, User},
};

use super::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
    ResetPasswordRequest, ValidateResponse, ValidatedClaims,
};
use super::extractors::AuthUser;
use super::password::{hash_password, verify_password};
use super::validation::{is_valid_email, is_valid_password, validate_registration};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/change-password", post(change_password))
        .route("/auth/validate", get(validate_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let name = payload.name.trim();
    let username = payload.username.trim().to_lowercase();
    let email = payload.email.trim().to_lowercase();

    // All validation happens before any store access.
    validate_registration(name, &username, &email, &payload.password)?;

    User::check_conflicts(&state.db, &email, &username).await?;

    let password_hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &NewUser {
            username: &username,
            name,
            email: &email,
            password_hash: &password_hash,
            coins: state.config.starting_coins,
        },
    )
    .await?;

    let token = state.token_keys()?.sign(&user)?;
    info!(user_id = %user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: UserWithBadges {
                user: user.into(),
                badges: vec![],
            },
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let identifier = payload.email.trim();
    if identifier.is_empty() {
        return Err(ApiError::Validation {
            field: "email",
            message: "Email or username is required".into(),
        });
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation {
            field: "password",
            message: "Password is required".into(),
        });
    }

    // Unknown identifier and wrong password are indistinguishable to the
    // caller; both paths end in the same error kind.
    let user = match User::find_by_identifier(&state.db, identifier).await? {
        Some(u) => u,
        None => {
            warn!("login failed: unknown identifier");
            return Err(ApiError::InvalidCredentials);
        }
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login failed: bad password");
        return Err(ApiError::InvalidCredentials);
    }

    User::update_last_login(&state.db, user.id).await?;
    let badges = Badge::list_for_user(&state.db, user.id).await?;
    let token = state.token_keys()?.sign(&user)?;
    info!(user_id = %user.id, username = %user.username, "user logged in");

    Ok(Json(AuthResponse {
        message: "Login successful",
        user: UserWithBadges {
            user: user.into(),
            badges,
        },
        token,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    let badges = Badge::list_for_user(&state.db, user.id).await?;
    Ok(Json(serde_json::json!({
        "user": UserWithBadges { user: user.into(), badges },
    })))
}

/// Anti-enumeration: the response is identical whether or not the account
/// exists; a matching account only triggers an out-of-band notification.
#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::Validation {
            field: "email",
            message: "Invalid email format".into(),
        });
    }

    if let Some(user) = User::find_by_identifier(&state.db, &email).await? {
        info!(user_id = %user.id, "password reset requested");
    }

    Ok(Json(MessageResponse {
        message: "If an account with that email exists, a password reset link has been sent.",
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "change password: current password mismatch");
        return Err(ApiError::InvalidCredentials);
    }
    if !is_valid_password(&payload.new_password) {
        return Err(ApiError::WeakPassword);
    }

    let new_hash = hash_password(&payload.new_password)?;
    User::set_password_hash(&state.db, user.id, &new_hash).await?;
    info!(user_id = %user.id, "password changed");

    Ok(Json(MessageResponse {
        message: "Password changed successfully",
    }))
}

#[instrument]
pub async fn validate_token(AuthUser(claims): AuthUser) -> Json<ValidateResponse> {
    Json(ValidateResponse {
        valid: true,
        user: ValidatedClaims {
            user_id: claims.sub,
            username: claims.username,
            email: claims.email,
        },
    })
}
