//! Caregiver endpoints: registration with pending-elder linkage, login,
//! roster reads

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use vigil_common::api::{
    ElderSummary, LoginRequest, LoginResponse, RegisterCaregiverRequest,
    RegisterCaregiverResponse,
};
use vigil_common::types::GameSession;

use crate::api::extract::CaregiverAuth;
use crate::auth::{hash_password, verify_password, Role};
use crate::db::{self, ElderRow};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/caregiver/me response
#[derive(Debug, Serialize)]
pub struct CaregiverProfile {
    pub guid: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub elders: Vec<ElderSummary>,
}

/// POST /api/caregiver/register
///
/// Any elders who registered earlier naming this email are linked here:
/// roster inserts and elder-side caregiver references are committed in one
/// transaction, so a failure links none of them.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterCaregiverRequest>,
) -> ApiResult<(StatusCode, Json<RegisterCaregiverResponse>)> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("a valid email is required".to_string()));
    }
    if req.password.len() < 6 {
        return Err(ApiError::BadRequest(
            "password must be at least 6 characters".to_string(),
        ));
    }
    if db::caregiver_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::Conflict("email already registered".to_string()));
    }

    let guid = Uuid::new_v4().to_string();
    let password_hash = hash_password(&req.password)?;
    let now = Utc::now();

    let mut tx = state.db.begin().await?;
    sqlx::query(
        "INSERT INTO caregivers (guid, name, email, password_hash, phone, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&guid)
    .bind(&name)
    .bind(&email)
    .bind(&password_hash)
    .bind(&req.phone)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let pending = sqlx::query_as::<_, ElderRow>(
        "SELECT * FROM elders WHERE pending_caregiver_email = ?",
    )
    .bind(&email)
    .fetch_all(&mut *tx)
    .await?;

    for elder in &pending {
        sqlx::query(
            "UPDATE elders SET caregiver_guid = ?, pending_caregiver_email = NULL WHERE guid = ?",
        )
        .bind(&guid)
        .bind(&elder.guid)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO caregiver_elders (caregiver_guid, elder_guid, created_at) VALUES (?, ?, ?)",
        )
        .bind(&guid)
        .bind(&elder.guid)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    if !pending.is_empty() {
        info!("Linked {} pending elder(s) to caregiver {}", pending.len(), email);
    }

    let token = state.auth.issue(&guid, Role::Caregiver)?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterCaregiverResponse { token, name, email, elders_linked: pending.len() }),
    ))
}

/// POST /api/caregiver/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = req.email.trim().to_lowercase();
    let invalid = || ApiError::Unauthorized("invalid email or password".to_string());

    let caregiver = db::caregiver_by_email(&state.db, &email).await?.ok_or_else(invalid)?;
    if !verify_password(&req.password, &caregiver.password_hash) {
        return Err(invalid());
    }

    let token = state.auth.issue(&caregiver.guid, Role::Caregiver)?;
    Ok(Json(LoginResponse { token, name: caregiver.name, email: caregiver.email }))
}

/// GET /api/caregiver/me
pub async fn me(
    State(state): State<AppState>,
    auth: CaregiverAuth,
) -> ApiResult<Json<CaregiverProfile>> {
    let caregiver = db::caregiver_by_guid(&state.db, &auth.caregiver_guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("caregiver not found".to_string()))?;
    let elders = db::roster_elders(&state.db, &caregiver.guid).await?;

    Ok(Json(CaregiverProfile {
        guid: caregiver.guid,
        name: caregiver.name,
        email: caregiver.email,
        phone: caregiver.phone,
        elders: elders.iter().map(ElderRow::summary).collect(),
    }))
}

/// GET /api/caregiver/elders
pub async fn elders(
    State(state): State<AppState>,
    auth: CaregiverAuth,
) -> ApiResult<Json<Vec<ElderSummary>>> {
    let elders = db::roster_elders(&state.db, &auth.caregiver_guid).await?;
    Ok(Json(elders.iter().map(ElderRow::summary).collect()))
}

/// GET /api/caregiver/elders/:elder_id/sessions
///
/// A non-roster elder gets the same 404 as a nonexistent one.
pub async fn elder_sessions(
    State(state): State<AppState>,
    auth: CaregiverAuth,
    Path(elder_id): Path<String>,
) -> ApiResult<Json<Vec<GameSession>>> {
    if !db::roster_contains(&state.db, &auth.caregiver_guid, &elder_id).await? {
        return Err(ApiError::NotFound("elder not found".to_string()));
    }

    let rows = db::sessions_newest_first(&state.db, &elder_id).await?;
    let sessions = rows
        .into_iter()
        .map(|r| r.into_session())
        .collect::<vigil_common::Result<Vec<_>>>()?;
    Ok(Json(sessions))
}
