use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::error;
use uuid::Uuid;

use petfinder_types::api::{
    ConfirmEmailChangeRequest, EmailChangeRequest, MessageResponse, ProfileResponse,
    UpdateProfileRequest, VerifyEmailChangeRequest,
};
use petfinder_types::models::{Role, UserPublic};

use crate::auth::{self, AppState};
use crate::codes;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::policy::require_role;

/// The caller's own profile; only the safe subset is returned.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(ProfileResponse {
        username: user.username,
        email: user.email,
    }))
}

/// Profile updates are gated by re-entry of the current password.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserPublic>, ApiError> {
    if req.current_password.is_empty() {
        return Err(ApiError::Validation(
            "current password is required to update the profile".into(),
        ));
    }

    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound("user"))?;

    if !auth::verify_password(&req.current_password, &user.password)? {
        return Err(ApiError::Validation("current password is incorrect".into()));
    }

    if let Some(username) = &req.username {
        if username.len() < 3 || username.len() > 32 {
            return Err(ApiError::Validation("username must be 3-32 characters".into()));
        }
        if username != &user.username && state.db.get_user_by_username(username)?.is_some() {
            return Err(ApiError::Conflict("username already taken".into()));
        }
    }
    if let Some(email) = &req.email {
        if !email.contains('@') {
            return Err(ApiError::Validation("a valid email address is required".into()));
        }
        if email != &user.email && state.db.email_in_use(email)? {
            return Err(ApiError::Conflict("email already in use".into()));
        }
    }

    let password_hash = match &req.password {
        Some(password) => {
            if password.len() < 8 {
                return Err(ApiError::Validation("password must be at least 8 characters".into()));
            }
            Some(auth::hash_password(password)?)
        }
        None => None,
    };

    state.db.update_profile(
        &user.id,
        req.username.as_deref(),
        req.email.as_deref(),
        password_hash.as_deref(),
    )?;

    let updated = state
        .db
        .get_user_by_id(&user.id)?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(auth::user_public(&updated)?))
}

/// Admin: list all accounts (safe views only).
pub async fn get_users(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<UserPublic>>, ApiError> {
    require_role(&claims, &[Role::Admin])?;

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_users())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error")
        })??;

    let users = rows
        .iter()
        .map(auth::user_public)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(users))
}

/// Admin: fetch one account by id.
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserPublic>, ApiError> {
    require_role(&claims, &[Role::Admin])?;

    let user = state
        .db
        .get_user_by_id(&id.to_string())?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(auth::user_public(&user)?))
}

/// Admin: delete an account and everything it owns. Admin accounts are
/// protected from deletion.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_role(&claims, &[Role::Admin])?;

    let user = state
        .db
        .get_user_by_id(&id.to_string())?
        .ok_or(ApiError::NotFound("user"))?;

    if user.role == Role::Admin.as_str() {
        return Err(ApiError::Forbidden("administrator accounts cannot be deleted"));
    }

    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.delete_user_cascade(&user.id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error")
        })??;

    Ok(Json(MessageResponse::new("user and associated data deleted successfully")))
}

/// Step one of the authenticated email change: park the new address and a
/// code, then mail the code to the address being claimed.
pub async fn request_email_change(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EmailChangeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !req.new_email.contains('@') {
        return Err(ApiError::Validation("a valid email address is required".into()));
    }
    if state.db.email_in_use(&req.new_email)? {
        return Err(ApiError::Conflict("that email is already in use".into()));
    }

    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound("user"))?;

    let code = codes::generate_code();
    state.db.set_pending_email(&user.id, &req.new_email, &code)?;

    let mailer = state.mailer.clone();
    let to = req.new_email.clone();
    auth::send_best_effort(move || mailer.send_verification_email(&to, &code), "email-change code")
        .await;

    Ok(Json(MessageResponse::new("verification code sent to the new address")))
}

/// Step two: consume the code and promote the pending address.
pub async fn confirm_email_change(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ConfirmEmailChangeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound("user"))?;

    if user.pending_email.is_none() || user.pending_email_code.is_none() {
        return Err(ApiError::Validation("no pending email change".into()));
    }

    if !state.db.confirm_pending_email(&user.id, &req.code)? {
        return Err(ApiError::InvalidCode);
    }

    Ok(Json(MessageResponse::new("email updated successfully")))
}

/// One-shot unauthenticated variant: old address, new address, and code
/// must all match the parked change.
pub async fn verify_email_change(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailChangeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if state.db.get_user_by_email(&req.old_email)?.is_none() {
        return Err(ApiError::NotFound("user"));
    }

    if !state
        .db
        .confirm_pending_email_by_addresses(&req.old_email, &req.new_email, &req.code)?
    {
        return Err(ApiError::InvalidCode);
    }

    Ok(Json(MessageResponse::new("email updated successfully")))
}
