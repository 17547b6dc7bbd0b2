//! Report aggregation
//!
//! Reports are recomputed from the session log on every request; there is no
//! cached rollup to drift out of date.

use axum::extract::{Path, State};
use axum::Json;

use vigil_common::api::{DiseaseReport, ElderReport, TrendPoint};
use vigil_common::types::{Disease, GameSession, SessionMetrics, SessionMode};

use crate::api::extract::{CaregiverAuth, ElderAuth};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Therapy sessions shown in a trend series
const TREND_POINTS: usize = 5;

/// GET /api/report/mine
pub async fn mine(
    State(state): State<AppState>,
    auth: ElderAuth,
) -> ApiResult<Json<ElderReport>> {
    Ok(Json(build_report(&state, &auth.elder_guid).await?))
}

/// GET /api/report/elder/:elder_id - caregiver, roster-gated
pub async fn for_elder(
    State(state): State<AppState>,
    auth: CaregiverAuth,
    Path(elder_id): Path<String>,
) -> ApiResult<Json<ElderReport>> {
    if !db::roster_contains(&state.db, &auth.caregiver_guid, &elder_id).await? {
        return Err(ApiError::NotFound("elder not found".to_string()));
    }
    Ok(Json(build_report(&state, &elder_id).await?))
}

async fn build_report(state: &AppState, elder_guid: &str) -> ApiResult<ElderReport> {
    let rows = db::sessions_oldest_first(&state.db, elder_guid).await?;
    let sessions = rows
        .into_iter()
        .map(|r| r.into_session())
        .collect::<vigil_common::Result<Vec<_>>>()?;

    Ok(ElderReport {
        parkinson: disease_report(&sessions, Disease::Parkinson),
        dementia: disease_report(&sessions, Disease::Dementia),
        vision: disease_report(&sessions, Disease::Vision),
    })
}

fn disease_report(sessions: &[GameSession], disease: Disease) -> DiseaseReport {
    let detection_count = sessions
        .iter()
        .filter(|s| s.disease_type == disease && s.mode == SessionMode::Detection)
        .count();

    let therapy: Vec<&GameSession> = sessions
        .iter()
        .filter(|s| s.disease_type == disease && s.mode == SessionMode::Therapy)
        .collect();
    let therapy_count = therapy.len();

    // Sessions arrive oldest first; the trend is the tail of that series
    let therapy_trend = therapy
        .iter()
        .skip(therapy.len().saturating_sub(TREND_POINTS))
        .filter_map(|s| {
            let (value, unit) = trend_value(disease, &s.metrics)?;
            Some(TrendPoint {
                date: s.created_at.to_rfc3339(),
                value,
                unit: unit.to_string(),
            })
        })
        .collect();

    DiseaseReport { detection_count, therapy_count, therapy_trend }
}

/// The single numeric series tracked per disease: elapsed time for the motor
/// and memory therapies, perceptual threshold (or correct count when the
/// threshold is absent) for vision.
fn trend_value(disease: Disease, metrics: &SessionMetrics) -> Option<(f64, &'static str)> {
    match disease {
        Disease::Parkinson => metrics.parkinson.as_ref()?.time.map(|t| (t, "sec")),
        Disease::Dementia => metrics.dementia.as_ref()?.time.map(|t| (t, "sec")),
        Disease::Vision => {
            let vision = metrics.vision.as_ref()?;
            vision
                .final_threshold
                .map(|t| (f64::from(t), "threshold"))
                .or_else(|| vision.correct_answers.map(|c| (f64::from(c), "correct")))
        }
    }
}
