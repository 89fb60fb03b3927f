use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Extension, Json, extract::State, http::StatusCode};
use tracing::warn;
use uuid::Uuid;

use petfinder_db::Database;
use petfinder_db::models::UserRow;
use petfinder_mail::{MailError, Mailer};
use petfinder_types::api::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RefreshResponse,
    RegisterRequest, RegisterResponse, ResetPasswordRequest, VerifyCodeRequest,
};
use petfinder_types::models::{parse_timestamp, Role, UserPublic};

use crate::codes::{self, RESET_CODE_TTL_SECS};
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::Validation("username must be 3-32 characters".into()));
    }
    if !req.email.contains('@') {
        return Err(ApiError::Validation("a valid email address is required".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation("password must be at least 8 characters".into()));
    }

    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Conflict("email already registered".into()));
    }
    if state.db.get_user_by_username(&req.username)?.is_some() {
        return Err(ApiError::Conflict("username already taken".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();
    let code = codes::generate_code();

    state.db.create_user(
        &user_id.to_string(),
        &req.username,
        &req.email,
        &password_hash,
        Some(&code),
    )?;

    // Best-effort: the account exists either way, and a login attempt
    // re-issues a fresh code.
    let mailer = state.mailer.clone();
    let to = req.email.clone();
    send_best_effort(move || mailer.send_verification_email(&to, &code), "verification email").await;

    let row = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("user missing after insert")))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "registration successful, check your email for a verification code".into(),
            user: user_public(&row)?,
        }),
    ))
}

pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if state.db.get_user_by_email(&req.email)?.is_none() {
        return Err(ApiError::NotFound("user"));
    }

    // Match-and-clear is a single store operation; a replayed or wrong code
    // changes nothing.
    if !state.db.consume_verification_code(&req.email, &req.code)? {
        return Err(ApiError::InvalidCode);
    }

    let mailer = state.mailer.clone();
    let to = req.email.clone();
    send_best_effort(move || mailer.send_confirmation_email(&to), "confirmation email").await;

    Ok(Json(MessageResponse::new("registration completed successfully")))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // Unknown email and wrong password must be indistinguishable
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::InvalidCredentials)?;

    // Unverified accounts get a fresh code re-sent instead of a session
    if !user.is_verified {
        let code = codes::generate_code();
        state.db.set_verification_code(&user.email, &code)?;

        let mailer = state.mailer.clone();
        let to = user.email.clone();
        send_best_effort(move || mailer.send_verification_email(&to, &code), "verification email")
            .await;

        return Ok(Json(LoginResponse {
            message: "verify your email address before logging in".into(),
            is_verified: false,
            token: None,
            user: None,
        }));
    }

    if !verify_password(&req.password, &user.password)? {
        return Err(ApiError::InvalidCredentials);
    }

    let public = user_public(&user)?;
    let token = state.tokens.issue(public.id, public.role)?;

    Ok(Json(LoginResponse {
        message: "login successful".into(),
        is_verified: true,
        token: Some(token),
        user: Some(public),
    }))
}

/// The gate has already validated the presented token; hand back a new one
/// with the same claims and a fresh expiry.
pub async fn refresh(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let token = state.tokens.issue(claims.sub, claims.role)?;
    Ok(Json(RefreshResponse { token }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.email.trim().is_empty() {
        return Err(ApiError::Validation("email is required".into()));
    }

    // Uniform acknowledgement whether or not the address is registered —
    // the same disclosure policy as login.
    let ack = MessageResponse::new("if that address is registered, a reset code has been sent");

    let Some(user) = state.db.get_user_by_email(&req.email)? else {
        return Ok(Json(ack));
    };

    let code = codes::generate_code();
    let expires = chrono::Utc::now().timestamp() + RESET_CODE_TTL_SECS;
    state.db.set_reset_code(&user.email, &code, expires)?;

    // Unlike the other notification mails this failure is surfaced: the
    // caller has no other way to learn the code never left the server.
    // The stored code stays valid for a retry.
    let mailer = state.mailer.clone();
    let to = user.email.clone();
    tokio::task::spawn_blocking(move || mailer.send_reset_email(&to, &code))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))?
        .map_err(|e| anyhow::anyhow!("failed to send reset email: {}", e))?;

    Ok(Json(ack))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.email.trim().is_empty() || req.code.trim().is_empty() {
        return Err(ApiError::Validation("email and code are required".into()));
    }
    if req.new_password.len() < 8 {
        return Err(ApiError::Validation("password must be at least 8 characters".into()));
    }

    // Hash first, then consume code and store the new password as one
    // conditional update; email, code, and expiry must all match.
    let password_hash = hash_password(&req.new_password)?;
    let now = chrono::Utc::now().timestamp();
    if !state.db.consume_reset_code(&req.email, &req.code, now, &password_hash)? {
        return Err(ApiError::InvalidCode);
    }

    Ok(Json(MessageResponse::new("password reset successfully")))
}

// Hash with Argon2id
pub(crate) fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("failed to hash password: {}", e)))?
        .to_string();
    Ok(hash)
}

pub(crate) fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub(crate) fn user_public(row: &UserRow) -> Result<UserPublic, ApiError> {
    Ok(UserPublic {
        id: row
            .id
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {}", row.id, e)))?,
        username: row.username.clone(),
        email: row.email.clone(),
        role: Role::parse(&row.role).ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!("unknown role '{}' on user {}", row.role, row.id))
        })?,
        is_verified: row.is_verified,
        created_at: parse_timestamp(&row.created_at, "user"),
    })
}

/// Fire-and-forget mail send: SMTP runs off the async runtime and failures
/// are logged, never surfaced to the client.
pub(crate) async fn send_best_effort<F>(task: F, what: &str)
where
    F: FnOnce() -> Result<(), MailError> + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to send {}: {}", what, e),
        Err(e) => warn!("spawn_blocking join error: {}", e),
    }
}
