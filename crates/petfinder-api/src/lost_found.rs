use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use tracing::{error, warn};
use uuid::Uuid;

use petfinder_db::models::ReportRow;
use petfinder_types::api::{CreateReportRequest, ReportResponse};
use petfinder_types::models::{parse_timestamp, parse_uuid, ReportType};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Claims;

pub async fn create_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    if req.description.trim().is_empty() || req.location.trim().is_empty() {
        return Err(ApiError::Validation("description and location are required".into()));
    }

    if state.db.get_pet(&req.pet_id.to_string())?.is_none() {
        return Err(ApiError::NotFound("pet"));
    }

    let report_id = Uuid::new_v4();
    state.db.insert_report(
        &report_id.to_string(),
        &req.pet_id.to_string(),
        req.report_type.as_str(),
        &req.description,
        &req.location,
        &claims.sub.to_string(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(ReportResponse {
            id: report_id,
            pet_id: req.pet_id,
            report_type: req.report_type,
            description: req.description,
            location: req.location,
            reporter_id: claims.sub,
            created_at: chrono::Utc::now(),
        }),
    ))
}

pub async fn get_reports(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReportResponse>>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_reports())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("join error")
        })??;

    Ok(Json(rows.into_iter().map(report_response).collect()))
}

fn report_response(row: ReportRow) -> ReportResponse {
    let report_type = ReportType::parse(&row.report_type).unwrap_or_else(|| {
        warn!("Corrupt report type '{}' on report '{}'", row.report_type, row.id);
        ReportType::Lost
    });

    ReportResponse {
        id: parse_uuid(&row.id, "report id"),
        pet_id: parse_uuid(&row.pet_id, "report pet id"),
        report_type,
        description: row.description,
        location: row.location,
        reporter_id: parse_uuid(&row.reporter_id, "reporter id"),
        created_at: parse_timestamp(&row.created_at, "report"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{claims_for, test_state};
    use petfinder_types::models::Role;

    #[tokio::test]
    async fn report_lifecycle() {
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
        let (status, Json(report)) = create_report(
            State(state.clone()),
            Extension(claims.clone()),
            Json(CreateReportRequest {
                pet_id,
                report_type: ReportType::Lost,
                description: "ran off at the park".into(),
                location: "river park".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(report.reporter_id, alice);

        let Json(reports) = get_reports(State(state.clone())).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].report_type, ReportType::Lost);

        let unknown_pet = create_report(
            State(state.clone()),
            Extension(claims),
            Json(CreateReportRequest {
                pet_id: Uuid::new_v4(),
                report_type: ReportType::Found,
                description: "spotted".into(),
                location: "plaza".into(),
            }),
        )
        .await;
        assert!(matches!(unknown_pet, Err(ApiError::NotFound("pet"))));
    }
}
