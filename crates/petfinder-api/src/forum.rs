use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::error;
use uuid::Uuid;

use petfinder_db::models::PostRow;
use petfinder_types::api::{CreatePostRequest, MessageResponse, PostResponse, UpdatePostRequest};
use petfinder_types::models::{parse_timestamp, parse_uuid};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::policy::require_post_ownership;

pub async fn create_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err(ApiError::Validation("title and content are required".into()));
    }

    let author = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound("user"))?;

    let post_id = Uuid::new_v4();
    state
        .db
        .insert_post(&post_id.to_string(), &req.title, &req.content, &author.id)?;

    Ok((
        StatusCode::CREATED,
        Json(PostResponse {
            id: post_id,
            title: req.title,
            content: req.content,
            author_id: claims.sub,
            author_username: author.username,
            created_at: chrono::Utc::now(),
        }),
    ))
}

pub async fn get_posts(State(state): State<AppState>) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_posts())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error")
        })??;

    Ok(Json(rows.into_iter().map(post_response).collect()))
}

pub async fn get_post_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostResponse>, ApiError> {
    let post = state
        .db
        .get_post(&id.to_string())?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post_response(post)))
}

pub async fn update_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    require_post_ownership(&state, &claims, id).await?;

    let found = state
        .db
        .update_post(&id.to_string(), req.title.as_deref(), req.content.as_deref())?;
    if !found {
        return Err(ApiError::NotFound("post"));
    }

    let post = state
        .db
        .get_post(&id.to_string())?
        .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(post_response(post)))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_post_ownership(&state, &claims, id).await?;

    if !state.db.delete_post(&id.to_string())? {
        return Err(ApiError::NotFound("post"));
    }

    Ok(Json(MessageResponse::new("post deleted successfully")))
}

fn post_response(row: PostRow) -> PostResponse {
    PostResponse {
        id: parse_uuid(&row.id, "post id"),
        title: row.title,
        content: row.content,
        author_id: parse_uuid(&row.author_id, "post author id"),
        author_username: row.author_username,
        created_at: parse_timestamp(&row.created_at, "post"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{claims_for, test_state};
    use petfinder_types::models::Role;

    fn seed_user(state: &AppState, username: &str, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        state
            .db
            .create_user(&id.to_string(), username, email, "hash", None)
            .unwrap();
        id
    }

    #[tokio::test]
    async fn post_crud_with_ownership() {
        let (state, _mailer) = test_state();
        let alice = seed_user(&state, "alice", "alice@x.com");
        let bob = seed_user(&state, "bob", "bob@x.com");

        let (status, Json(post)) = create_post(
            State(state.clone()),
            Extension(claims_for(alice, Role::User)),
            Json(CreatePostRequest {
                title: "lost dog tips".into(),
                content: "check the shelters first".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post.author_username, "alice");

        // stranger cannot edit
        let denied = update_post(
            State(state.clone()),
            Extension(claims_for(bob, Role::User)),
            Path(post.id),
            Json(UpdatePostRequest {
                title: Some("hijacked".into()),
                content: None,
            }),
        )
        .await;
        assert!(matches!(denied, Err(ApiError::Forbidden(_))));

        // owner can
        let Json(updated) = update_post(
            State(state.clone()),
            Extension(claims_for(alice, Role::User)),
            Path(post.id),
            Json(UpdatePostRequest {
                title: Some("lost dog tips (updated)".into()),
                content: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "lost dog tips (updated)");
        assert_eq!(updated.content, "check the shelters first");

        // admin can delete without owning
        delete_post(
            State(state.clone()),
            Extension(claims_for(Uuid::new_v4(), Role::Admin)),
            Path(post.id),
        )
        .await
        .unwrap();
        assert!(matches!(
            get_post_by_id(State(state.clone()), Path(post.id)).await,
            Err(ApiError::NotFound("post"))
        ));
    }

    #[tokio::test]
    async fn listing_joins_author_names() {
        let (state, _mailer) = test_state();
        let alice = seed_user(&state, "alice", "alice@x.com");

        create_post(
            State(state.clone()),
            Extension(claims_for(alice, Role::User)),
            Json(CreatePostRequest {
                title: "hello".into(),
                content: "first".into(),
            }),
        )
        .await
        .unwrap();

        let Json(posts) = get_posts(State(state)).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].author_username, "alice");
    }
}
