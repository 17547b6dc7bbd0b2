//! Health questionnaire submission and retrieval
//!
//! Submission prefers a verified elder token; a body `elderId` is honored
//! only when no token is present and the record is marked lower-trust.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use vigil_common::api::SubmitQuestionnaireRequest;
use vigil_common::types::{derive_bmi, Questionnaire};

use crate::api::extract::{AnyAuth, MaybeElderAuth};
use crate::api::authorize_elder_read;
use crate::db::{self, QuestionnaireRow};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DEFAULT_STRESS_LEVEL: i64 = 3;
const HISTORY_LIMIT: i64 = 50;

/// POST /api/questionnaire
pub async fn submit(
    State(state): State<AppState>,
    auth: MaybeElderAuth,
    Json(req): Json<SubmitQuestionnaireRequest>,
) -> ApiResult<(StatusCode, Json<Questionnaire>)> {
    let authenticated = auth.0.is_some();
    let elder_guid = match auth.0 {
        Some(guid) => guid,
        None => req.elder_id.clone().ok_or_else(|| {
            ApiError::Unauthorized("a bearer token or elderId is required".to_string())
        })?,
    };

    if db::elder_by_guid(&state.db, &elder_guid).await?.is_none() {
        return Err(ApiError::NotFound("elder not found".to_string()));
    }
    if req.breaths_per_min <= 0.0 {
        return Err(ApiError::BadRequest("breathsPerMin must be positive".to_string()));
    }
    let (bmi, bmi_status) = derive_bmi(req.height, req.weight)
        .ok_or_else(|| ApiError::BadRequest("height and weight must be positive".to_string()))?;

    if let Some(caregiver_id) = &req.caregiver_id {
        if db::caregiver_by_guid(&state.db, caregiver_id).await?.is_none() {
            return Err(ApiError::BadRequest("unknown caregiver".to_string()));
        }
    }

    let record = Questionnaire {
        guid: Uuid::new_v4().to_string(),
        elder_guid,
        caregiver_guid: req.caregiver_id,
        height: req.height,
        weight: req.weight,
        blood_pressure: req.blood_pressure,
        heart_rate: req.heart_rate,
        breaths_per_min: req.breaths_per_min,
        physical_activity: req.physical_activity,
        sleep_hours: req.sleep_hours,
        stress_level: req.stress_level.unwrap_or(DEFAULT_STRESS_LEVEL),
        bmi,
        bmi_status: bmi_status.to_string(),
        authenticated,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO questionnaires
            (guid, elder_guid, caregiver_guid, height, weight, blood_pressure,
             heart_rate, breaths_per_min, physical_activity, sleep_hours,
             stress_level, bmi, bmi_status, authenticated, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.guid)
    .bind(&record.elder_guid)
    .bind(&record.caregiver_guid)
    .bind(record.height)
    .bind(record.weight)
    .bind(&record.blood_pressure)
    .bind(record.heart_rate)
    .bind(record.breaths_per_min)
    .bind(&record.physical_activity)
    .bind(record.sleep_hours)
    .bind(record.stress_level)
    .bind(record.bmi)
    .bind(&record.bmi_status)
    .bind(record.authenticated)
    .bind(record.created_at)
    .execute(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/questionnaire/elder/:elder_id
pub async fn by_elder(
    State(state): State<AppState>,
    auth: AnyAuth,
    Path(elder_id): Path<String>,
) -> ApiResult<Json<Vec<Questionnaire>>> {
    authorize_elder_read(&state, &auth, &elder_id).await?;

    let rows = sqlx::query_as::<_, QuestionnaireRow>(
        "SELECT * FROM questionnaires WHERE elder_guid = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(&elder_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(rows.into_iter().map(QuestionnaireRow::into_questionnaire).collect()))
}

/// GET /api/questionnaire/:id
pub async fn by_id(
    State(state): State<AppState>,
    auth: AnyAuth,
    Path(id): Path<String>,
) -> ApiResult<Json<Questionnaire>> {
    let row = sqlx::query_as::<_, QuestionnaireRow>("SELECT * FROM questionnaires WHERE guid = ?")
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("questionnaire not found".to_string()))?;

    // Same 404 as a missing record, so ids cannot be probed across elders
    authorize_elder_read(&state, &auth, &row.elder_guid)
        .await
        .map_err(|_| ApiError::NotFound("questionnaire not found".to_string()))?;

    Ok(Json(row.into_questionnaire()))
}
