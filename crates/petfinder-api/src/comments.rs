use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::error;
use uuid::Uuid;

use petfinder_db::models::CommentRow;
use petfinder_types::api::{CommentResponse, CreateCommentRequest};
use petfinder_types::models::{parse_timestamp, parse_uuid};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Claims;

pub async fn get_comments(
    State(state): State<AppState>,
    Path(pet_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let db = state.clone();
    let pid = pet_id.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.get_comments_for_pet(&pid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error")
        })??;

    Ok(Json(rows.into_iter().map(comment_response).collect()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(pet_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("comment cannot be empty".into()));
    }

    if state.db.get_pet(&pet_id.to_string())?.is_none() {
        return Err(ApiError::NotFound("pet"));
    }

    let author = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound("user"))?;

    let comment_id = Uuid::new_v4();
    state.db.insert_comment(
        &comment_id.to_string(),
        &pet_id.to_string(),
        &author.id,
        &req.content,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id: comment_id,
            pet_id,
            author_id: claims.sub,
            author_username: author.username,
            content: req.content,
            created_at: chrono::Utc::now(),
        }),
    ))
}

fn comment_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: parse_uuid(&row.id, "comment id"),
        pet_id: parse_uuid(&row.pet_id, "comment pet id"),
        author_id: parse_uuid(&row.author_id, "comment author id"),
        author_username: row.author_username,
        content: row.content,
        created_at: parse_timestamp(&row.created_at, "comment"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{claims_for, test_state};
    use petfinder_types::models::Role;

    #[tokio::test]
    async fn comment_on_existing_pet() {
        let (state, _mailer) = test_state();
        let alice = Uuid::new_v4();
        state
            .db
            .create_user(&alice.to_string(), "alice", "alice@x.com", "hash", None)
            .unwrap();
        let pet_id = Uuid::new_v4();
        state
            .db
            .insert_pet(&pet_id.to_string(), "Rex", "dog", "mix", "2020-01-01", "d", "Madrid", "x.jpg", None, &alice.to_string())
            .unwrap();

        let claims = claims_for(alice, Role::User);
        let (status, Json(comment)) = create_comment(
            State(state.clone()),
            Path(pet_id),
            Extension(claims.clone()),
            Json(CreateCommentRequest { content: "what a good dog".into() }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment.author_username, "alice");

        let Json(comments) = get_comments(State(state.clone()), Path(pet_id), Extension(claims))
            .await
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].content, "what a good dog");
        assert_eq!(comments[0].author_username, "alice");
    }

    #[tokio::test]
    async fn blank_comment_and_missing_pet_rejected() {
        let (state, _mailer) = test_state();
        let alice = Uuid::new_v4();
        state
            .db
            .create_user(&alice.to_string(), "alice", "alice@x.com", "hash", None)
            .unwrap();
        let claims = claims_for(alice, Role::User);

        let blank = create_comment(
            State(state.clone()),
            Path(Uuid::new_v4()),
            Extension(claims.clone()),
            Json(CreateCommentRequest { content: "   ".into() }),
        )
        .await;
        assert!(matches!(blank, Err(ApiError::Validation(_))));

        let missing = create_comment(
            State(state.clone()),
            Path(Uuid::new_v4()),
            Extension(claims),
            Json(CreateCommentRequest { content: "hello".into() }),
        )
        .await;
        assert!(matches!(missing, Err(ApiError::NotFound("pet"))));
    }
}
