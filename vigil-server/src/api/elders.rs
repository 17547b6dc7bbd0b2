//! Elder account endpoints: registration, login, profile, disease flags

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use uuid::Uuid;

use vigil_common::api::{
    ElderProfile, FlagUpdateRequest, LoginRequest, LoginResponse, RegisterElderRequest,
    RegisterElderResponse,
};

use crate::api::extract::ElderAuth;
use crate::auth::{hash_password, verify_password, Role};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

const GENDERS: [&str; 3] = ["Male", "Female", "Other"];

fn validate_credentials(name: &str, email: &str, password: &str) -> ApiResult<()> {
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("a valid email is required".to_string()));
    }
    if password.len() < 6 {
        return Err(ApiError::BadRequest(
            "password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/elder/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterElderRequest>,
) -> ApiResult<(StatusCode, Json<RegisterElderResponse>)> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    validate_credentials(&name, &email, &req.password)?;
    if req.age <= 0 {
        return Err(ApiError::BadRequest("age must be positive".to_string()));
    }
    if !GENDERS.contains(&req.gender.as_str()) {
        return Err(ApiError::BadRequest(
            "gender must be Male, Female, or Other".to_string(),
        ));
    }
    if db::elder_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::Conflict("email already registered".to_string()));
    }

    let caregiver_email = req
        .caregiver_email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    let caregiver = match &caregiver_email {
        Some(e) => db::caregiver_by_email(&state.db, e).await?,
        None => None,
    };
    // Unresolved caregiver email stays pending until that caregiver registers
    let pending_email = match &caregiver {
        Some(_) => None,
        None => caregiver_email,
    };

    let guid = Uuid::new_v4().to_string();
    let password_hash = hash_password(&req.password)?;
    let now = Utc::now();

    let mut tx = state.db.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO elders
            (guid, name, email, password_hash, age, gender, d1, d2, d3,
             caregiver_guid, pending_caregiver_email, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guid)
    .bind(&name)
    .bind(&email)
    .bind(&password_hash)
    .bind(req.age)
    .bind(&req.gender)
    .bind(req.parkinsons)
    .bind(req.dementia)
    .bind(req.vision)
    .bind(caregiver.as_ref().map(|c| &c.guid))
    .bind(&pending_email)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if let Some(c) = &caregiver {
        sqlx::query(
            "INSERT INTO caregiver_elders (caregiver_guid, elder_guid, created_at) VALUES (?, ?, ?)",
        )
        .bind(&c.guid)
        .bind(&guid)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    let token = state.auth.issue(&guid, Role::Elder)?;
    let caregiver_linked = caregiver.is_some();
    let elder = ElderProfile {
        guid,
        name,
        email,
        age: req.age,
        gender: req.gender,
        d1: req.parkinsons,
        d2: req.dementia,
        d3: req.vision,
        caregiver: caregiver.map(|c| c.summary()),
    };

    Ok((
        StatusCode::CREATED,
        Json(RegisterElderResponse { token, elder, caregiver_linked }),
    ))
}

/// POST /api/elder/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let email = req.email.trim().to_lowercase();
    // Same message for unknown email and bad password
    let invalid = || ApiError::Unauthorized("invalid email or password".to_string());

    let elder = db::elder_by_email(&state.db, &email).await?.ok_or_else(invalid)?;
    if !verify_password(&req.password, &elder.password_hash) {
        return Err(invalid());
    }

    let token = state.auth.issue(&elder.guid, Role::Elder)?;
    Ok(Json(LoginResponse { token, name: elder.name, email: elder.email }))
}

/// GET /api/elder/me
pub async fn me(
    State(state): State<AppState>,
    auth: ElderAuth,
) -> ApiResult<Json<ElderProfile>> {
    let elder = db::elder_by_guid(&state.db, &auth.elder_guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("elder not found".to_string()))?;

    let caregiver = match &elder.caregiver_guid {
        Some(guid) => db::caregiver_by_guid(&state.db, guid).await?.map(|c| c.summary()),
        None => None,
    };
    Ok(Json(elder.profile(caregiver)))
}

/// PUT /api/elder/disease-status
///
/// Partial update: omitted flags keep their stored value; last write wins.
pub async fn update_disease_status(
    State(state): State<AppState>,
    auth: ElderAuth,
    Json(req): Json<FlagUpdateRequest>,
) -> ApiResult<Json<ElderProfile>> {
    if req.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one of d1, d2, d3 is required".to_string(),
        ));
    }

    let updated = sqlx::query(
        r#"
        UPDATE elders
        SET d1 = COALESCE(?, d1), d2 = COALESCE(?, d2), d3 = COALESCE(?, d3)
        WHERE guid = ?
        "#,
    )
    .bind(req.d1)
    .bind(req.d2)
    .bind(req.d3)
    .bind(&auth.elder_guid)
    .execute(&state.db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("elder not found".to_string()));
    }

    let elder = db::elder_by_guid(&state.db, &auth.elder_guid)
        .await?
        .ok_or_else(|| ApiError::NotFound("elder not found".to_string()))?;
    let caregiver = match &elder.caregiver_guid {
        Some(guid) => db::caregiver_by_guid(&state.db, guid).await?.map(|c| c.summary()),
        None => None,
    };
    Ok(Json(elder.profile(caregiver)))
}
