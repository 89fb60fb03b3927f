use tracing::error;
use uuid::Uuid;

use petfinder_types::api::Claims;
use petfinder_types::models::Role;

use crate::auth::AppState;
use crate::error::ApiError;

/// Reject unless the caller's role is in `allowed`. The two policies used
/// throughout are admin-only and user-or-admin.
pub fn require_role(claims: &Claims, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("access restricted"))
    }
}

/// Admins bypass the check unconditionally; any other caller must own the
/// pet. The owner reference is looked up freshly on every invocation —
/// ownership can change between requests, so it is never cached.
pub async fn require_pet_ownership(
    state: &AppState,
    claims: &Claims,
    pet_id: Uuid,
) -> Result<(), ApiError> {
    // role check happens before any store access
    require_role(claims, &[Role::User, Role::Admin])?;
    if claims.role == Role::Admin {
        return Ok(());
    }

    let db = state.clone();
    let id = pet_id.to_string();
    let owner = tokio::task::spawn_blocking(move || db.db.get_pet_owner(&id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error")
        })??;

    check_owner(owner, claims, "pet")
}

/// Same policy for forum posts.
pub async fn require_post_ownership(
    state: &AppState,
    claims: &Claims,
    post_id: Uuid,
) -> Result<(), ApiError> {
    require_role(claims, &[Role::User, Role::Admin])?;
    if claims.role == Role::Admin {
        return Ok(());
    }

    let db = state.clone();
    let id = post_id.to_string();
    let owner = tokio::task::spawn_blocking(move || db.db.get_post_author(&id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error")
        })??;

    check_owner(owner, claims, "post")
}

fn check_owner(owner: Option<String>, claims: &Claims, what: &'static str) -> Result<(), ApiError> {
    match owner {
        None => Err(ApiError::NotFound(what)),
        Some(owner_id) if owner_id == claims.sub.to_string() => Ok(()),
        Some(_) => Err(ApiError::Forbidden("you do not own this resource")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{claims_for, test_state};

    #[test]
    fn role_policy() {
        let admin = claims_for(Uuid::new_v4(), Role::Admin);
        let user = claims_for(Uuid::new_v4(), Role::User);

        assert!(require_role(&admin, &[Role::Admin]).is_ok());
        assert!(require_role(&admin, &[Role::User, Role::Admin]).is_ok());
        assert!(require_role(&user, &[Role::User, Role::Admin]).is_ok());
        assert!(matches!(
            require_role(&user, &[Role::Admin]),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn ownership_owner_admin_and_stranger() {
        let (state, _mailer) = test_state();

        let owner_id = Uuid::new_v4();
        let stranger_id = Uuid::new_v4();
        state
            .db
            .create_user(&owner_id.to_string(), "alice", "alice@x.com", "hash", None)
            .unwrap();
        state
            .db
            .create_user(&stranger_id.to_string(), "bob", "bob@x.com", "hash", None)
            .unwrap();

        let pet_id = Uuid::new_v4();
        state
            .db
            .insert_pet(
                &pet_id.to_string(),
                "Rex",
                "dog",
                "mix",
                "2020-01-01",
                "friendly",
                "Madrid",
                "rex.jpg",
                None,
                &owner_id.to_string(),
            )
            .unwrap();

        let owner = claims_for(owner_id, Role::User);
        let stranger = claims_for(stranger_id, Role::User);
        let admin = claims_for(Uuid::new_v4(), Role::Admin);

        assert!(require_pet_ownership(&state, &owner, pet_id).await.is_ok());
        assert!(require_pet_ownership(&state, &admin, pet_id).await.is_ok());
        assert!(matches!(
            require_pet_ownership(&state, &stranger, pet_id).await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn ownership_missing_resource_is_not_found() {
        let (state, _mailer) = test_state();
        let caller = claims_for(Uuid::new_v4(), Role::User);

        assert!(matches!(
            require_pet_ownership(&state, &caller, Uuid::new_v4()).await,
            Err(ApiError::NotFound("pet"))
        ));
        assert!(matches!(
            require_post_ownership(&state, &caller, Uuid::new_v4()).await,
            Err(ApiError::NotFound("post"))
        ));
    }
}
