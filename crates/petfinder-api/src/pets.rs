use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{error, warn};
use uuid::Uuid;

use petfinder_db::models::PetRow;
use petfinder_types::api::{CreatePetRequest, MessageResponse, PetResponse, UpdatePetRequest};
use petfinder_types::models::{parse_timestamp, parse_uuid, PetStatus};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::policy::require_pet_ownership;

/// Adoption front pages show at most a dozen listings.
const STATUS_VIEW_LIMIT: u32 = 12;

pub async fn create_pet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePetRequest>,
) -> Result<(StatusCode, Json<PetResponse>), ApiError> {
    for (field, value) in [
        ("name", &req.name),
        ("species", &req.species),
        ("breed", &req.breed),
        ("birth_date", &req.birth_date),
        ("description", &req.description),
        ("city", &req.city),
        ("image", &req.image),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::Validation(format!("{} is required", field)));
        }
    }

    let pet_id = Uuid::new_v4();

    // Run blocking DB insert off the async runtime
    let db = state.clone();
    let id = pet_id.to_string();
    let owner = claims.sub.to_string();
    let insert = req.clone();
    tokio::task::spawn_blocking(move || {
        db.db.insert_pet(
            &id,
            &insert.name,
            &insert.species,
            &insert.breed,
            &insert.birth_date,
            &insert.description,
            &insert.city,
            &insert.image,
            insert.last_seen.as_deref(),
            &owner,
        )
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        anyhow::anyhow!("join error")
    })??;

    Ok((
        StatusCode::CREATED,
        Json(PetResponse {
            id: pet_id,
            name: req.name,
            species: req.species,
            breed: req.breed,
            birth_date: req.birth_date,
            description: req.description,
            city: req.city,
            image: req.image,
            status: PetStatus::Available,
            last_seen: req.last_seen,
            owner_id: claims.sub,
            created_at: chrono::Utc::now(),
        }),
    ))
}

pub async fn get_pets(State(state): State<AppState>) -> Result<Json<Vec<PetResponse>>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_pets())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error")
        })??;

    Ok(Json(rows.into_iter().map(pet_response).collect()))
}

pub async fn get_pet_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PetResponse>, ApiError> {
    let pet = state
        .db
        .get_pet(&id.to_string())?
        .ok_or(ApiError::NotFound("pet"))?;
    Ok(Json(pet_response(pet)))
}

/// Pets currently up for adoption, newest first.
pub async fn get_adoptable_pets(
    State(state): State<AppState>,
) -> Result<Json<Vec<PetResponse>>, ApiError> {
    list_by_status(state, PetStatus::Available).await
}

/// Lost-pet notices, newest first.
pub async fn get_lost_pets(
    State(state): State<AppState>,
) -> Result<Json<Vec<PetResponse>>, ApiError> {
    list_by_status(state, PetStatus::Lost).await
}

async fn list_by_status(state: AppState, status: PetStatus) -> Result<Json<Vec<PetResponse>>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || {
        db.db.list_pets_by_status(status.as_str(), STATUS_VIEW_LIMIT)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        anyhow::anyhow!("join error")
    })??;

    Ok(Json(rows.into_iter().map(pet_response).collect()))
}

pub async fn update_pet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePetRequest>,
) -> Result<Json<PetResponse>, ApiError> {
    require_pet_ownership(&state, &claims, id).await?;

    let found = state.db.update_pet(
        &id.to_string(),
        req.name.as_deref(),
        req.species.as_deref(),
        req.breed.as_deref(),
        req.birth_date.as_deref(),
        req.description.as_deref(),
        req.city.as_deref(),
        req.image.as_deref(),
        req.status.map(|s| s.as_str()),
        req.last_seen.as_deref(),
    )?;
    if !found {
        return Err(ApiError::NotFound("pet"));
    }

    let pet = state
        .db
        .get_pet(&id.to_string())?
        .ok_or(ApiError::NotFound("pet"))?;
    Ok(Json(pet_response(pet)))
}

pub async fn delete_pet(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    require_pet_ownership(&state, &claims, id).await?;

    let db = state.clone();
    let pet_id = id.to_string();
    let found = tokio::task::spawn_blocking(move || db.db.delete_pet_cascade(&pet_id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error")
        })??;
    if !found {
        return Err(ApiError::NotFound("pet"));
    }

    Ok(Json(MessageResponse::new("pet deleted successfully")))
}

fn pet_response(row: PetRow) -> PetResponse {
    let status = PetStatus::parse(&row.status).unwrap_or_else(|| {
        warn!("Corrupt status '{}' on pet '{}'", row.status, row.id);
        PetStatus::Available
    });

    PetResponse {
        id: parse_uuid(&row.id, "pet id"),
        owner_id: parse_uuid(&row.owner_id, "pet owner id"),
        name: row.name,
        species: row.species,
        breed: row.breed,
        birth_date: row.birth_date,
        description: row.description,
        city: row.city,
        image: row.image,
        status,
        last_seen: row.last_seen,
        created_at: parse_timestamp(&row.created_at, "pet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{claims_for, test_state};
    use petfinder_types::models::Role;

    fn pet_req(name: &str) -> CreatePetRequest {
        CreatePetRequest {
            name: name.into(),
            species: "dog".into(),
            breed: "mix".into(),
            birth_date: "2020-01-01".into(),
            description: "friendly".into(),
            city: "Madrid".into(),
            image: "rex.jpg".into(),
            last_seen: None,
        }
    }

    fn seed_user(state: &AppState, username: &str, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        state
            .db
            .create_user(&id.to_string(), username, email, "hash", None)
            .unwrap();
        id
    }

    #[tokio::test]
    async fn create_then_update_and_delete_as_owner() {
        let (state, _mailer) = test_state();
        let alice = seed_user(&state, "alice", "alice@x.com");
        let claims = claims_for(alice, Role::User);

        let (status, Json(pet)) = create_pet(
            State(state.clone()),
            Extension(claims.clone()),
            Json(pet_req("Rex")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(pet.owner_id, alice);
        assert_eq!(pet.status, PetStatus::Available);

        let Json(updated) = update_pet(
            State(state.clone()),
            Extension(claims.clone()),
            Path(pet.id),
            Json(UpdatePetRequest {
                name: None,
                species: None,
                breed: None,
                birth_date: None,
                description: None,
                city: None,
                image: None,
                status: Some(PetStatus::Lost),
                last_seen: Some("river park".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, PetStatus::Lost);
        assert_eq!(updated.last_seen.as_deref(), Some("river park"));
        assert_eq!(updated.name, "Rex");

        delete_pet(State(state.clone()), Extension(claims), Path(pet.id))
            .await
            .unwrap();
        assert!(state.db.get_pet(&pet.id.to_string()).unwrap().is_none());
    }

    #[tokio::test]
    async fn mutations_respect_ownership() {
        let (state, _mailer) = test_state();
        let alice = seed_user(&state, "alice", "alice@x.com");
        let bob = seed_user(&state, "bob", "bob@x.com");

        let (_, Json(pet)) = create_pet(
            State(state.clone()),
            Extension(claims_for(alice, Role::User)),
            Json(pet_req("Rex")),
        )
        .await
        .unwrap();

        let intruder = claims_for(bob, Role::User);
        let denied = delete_pet(State(state.clone()), Extension(intruder), Path(pet.id)).await;
        assert!(matches!(denied, Err(ApiError::Forbidden(_))));

        // admins bypass ownership
        let admin = claims_for(Uuid::new_v4(), Role::Admin);
        delete_pet(State(state.clone()), Extension(admin), Path(pet.id))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn status_views_are_limited_and_filtered() {
        let (state, _mailer) = test_state();
        let alice = seed_user(&state, "alice", "alice@x.com");
        let claims = claims_for(alice, Role::User);

        let mut first_id = None;
        for i in 0..14 {
            let (_, Json(pet)) = create_pet(
                State(state.clone()),
                Extension(claims.clone()),
                Json(pet_req(&format!("pet{}", i))),
            )
            .await
            .unwrap();
            first_id.get_or_insert(pet.id);
        }

        update_pet(
            State(state.clone()),
            Extension(claims),
            Path(first_id.unwrap()),
            Json(UpdatePetRequest {
                name: None,
                species: None,
                breed: None,
                birth_date: None,
                description: None,
                city: None,
                image: None,
                status: Some(PetStatus::Lost),
                last_seen: None,
            }),
        )
        .await
        .unwrap();

        let Json(adoptable) = get_adoptable_pets(State(state.clone())).await.unwrap();
        assert_eq!(adoptable.len(), 12);
        assert!(adoptable.iter().all(|p| p.status == PetStatus::Available));

        let Json(lost) = get_lost_pets(State(state.clone())).await.unwrap();
        assert_eq!(lost.len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_blank_fields() {
        let (state, _mailer) = test_state();
        let claims = claims_for(seed_user(&state, "alice", "alice@x.com"), Role::User);

        let mut req = pet_req("Rex");
        req.city = "   ".into();
        let result = create_pet(State(state), Extension(claims), Json(req)).await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
