use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

pub use petfinder_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Extract and validate JWT from Authorization header, attaching the
/// resolved claims to the request for downstream handlers. Never touches
/// the store.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthenticated)?;

    let claims = state.tokens.validate(token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
