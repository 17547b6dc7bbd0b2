//! Game session recording and retrieval
//!
//! Session ownership always comes from the bearer token; a body cannot
//! record a session against another elder. Rows are append-only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use vigil_common::api::RecordSessionRequest;
use vigil_common::types::GameSession;

use crate::api::extract::ElderAuth;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/session/record
pub async fn record(
    State(state): State<AppState>,
    auth: ElderAuth,
    Json(req): Json<RecordSessionRequest>,
) -> ApiResult<(StatusCode, Json<GameSession>)> {
    if req.result.trim().is_empty() {
        return Err(ApiError::BadRequest("result is required".to_string()));
    }

    let guid = Uuid::new_v4().to_string();
    let now = Utc::now();
    let metrics_json = serde_json::to_string(&req.metrics)?;

    sqlx::query(
        r#"
        INSERT INTO game_sessions
            (guid, elder_guid, disease_type, mode, result, metrics, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(&auth.elder_guid)
    .bind(req.disease_type.as_str())
    .bind(req.mode.as_str())
    .bind(&req.result)
    .bind(&metrics_json)
    .bind(now)
    .execute(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(GameSession {
            guid,
            elder_guid: auth.elder_guid,
            disease_type: req.disease_type,
            mode: req.mode,
            result: req.result,
            metrics: req.metrics,
            created_at: now,
        }),
    ))
}

/// GET /api/session/mine
pub async fn mine(
    State(state): State<AppState>,
    auth: ElderAuth,
) -> ApiResult<Json<Vec<GameSession>>> {
    let rows = db::sessions_newest_first(&state.db, &auth.elder_guid).await?;
    let sessions = rows
        .into_iter()
        .map(|r| r.into_session())
        .collect::<vigil_common::Result<Vec<_>>>()?;
    Ok(Json(sessions))
}
