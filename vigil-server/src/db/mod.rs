//! Database access layer: row types and shared queries
//!
//! Handlers own their one-off statements; queries used from more than one
//! handler live here.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use vigil_common::api::{CaregiverSummary, ElderProfile, ElderSummary};
use vigil_common::types::{Disease, GameSession, Questionnaire, SessionMode};
use vigil_common::{Error, Result};

mod init;
pub use init::{connect, init_database};

/// One row of the elders table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ElderRow {
    pub guid: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: i64,
    pub gender: String,
    pub d1: bool,
    pub d2: bool,
    pub d3: bool,
    pub caregiver_guid: Option<String>,
    pub pending_caregiver_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ElderRow {
    pub fn profile(&self, caregiver: Option<CaregiverSummary>) -> ElderProfile {
        ElderProfile {
            guid: self.guid.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            age: self.age,
            gender: self.gender.clone(),
            d1: self.d1,
            d2: self.d2,
            d3: self.d3,
            caregiver,
        }
    }

    pub fn summary(&self) -> ElderSummary {
        ElderSummary {
            guid: self.guid.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            age: self.age,
            gender: self.gender.clone(),
            d1: self.d1,
            d2: self.d2,
            d3: self.d3,
        }
    }
}

/// One row of the caregivers table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CaregiverRow {
    pub guid: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CaregiverRow {
    pub fn summary(&self) -> CaregiverSummary {
        CaregiverSummary { name: self.name.clone(), email: self.email.clone() }
    }
}

/// One row of the game_sessions table; metrics are stored as JSON text
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub guid: String,
    pub elder_guid: String,
    pub disease_type: String,
    pub mode: String,
    pub result: String,
    pub metrics: String,
    pub created_at: DateTime<Utc>,
}

impl SessionRow {
    pub fn into_session(self) -> Result<GameSession> {
        let disease_type = Disease::parse(&self.disease_type)
            .ok_or_else(|| Error::Internal(format!("bad disease in row: {}", self.disease_type)))?;
        let mode = SessionMode::parse(&self.mode)
            .ok_or_else(|| Error::Internal(format!("bad mode in row: {}", self.mode)))?;
        Ok(GameSession {
            guid: self.guid,
            elder_guid: self.elder_guid,
            disease_type,
            mode,
            result: self.result,
            metrics: serde_json::from_str(&self.metrics)
                .map_err(|e| Error::Internal(format!("bad metrics in row: {e}")))?,
            created_at: self.created_at,
        })
    }
}

/// One row of the questionnaires table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuestionnaireRow {
    pub guid: String,
    pub elder_guid: String,
    pub caregiver_guid: Option<String>,
    pub height: f64,
    pub weight: f64,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<f64>,
    pub breaths_per_min: f64,
    pub physical_activity: Option<String>,
    pub sleep_hours: Option<f64>,
    pub stress_level: i64,
    pub bmi: f64,
    pub bmi_status: String,
    pub authenticated: bool,
    pub created_at: DateTime<Utc>,
}

impl QuestionnaireRow {
    pub fn into_questionnaire(self) -> Questionnaire {
        Questionnaire {
            guid: self.guid,
            elder_guid: self.elder_guid,
            caregiver_guid: self.caregiver_guid,
            height: self.height,
            weight: self.weight,
            blood_pressure: self.blood_pressure,
            heart_rate: self.heart_rate,
            breaths_per_min: self.breaths_per_min,
            physical_activity: self.physical_activity,
            sleep_hours: self.sleep_hours,
            stress_level: self.stress_level,
            bmi: self.bmi,
            bmi_status: self.bmi_status,
            authenticated: self.authenticated,
            created_at: self.created_at,
        }
    }
}

pub async fn elder_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<ElderRow>> {
    let row = sqlx::query_as::<_, ElderRow>("SELECT * FROM elders WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn elder_by_email(pool: &SqlitePool, email: &str) -> Result<Option<ElderRow>> {
    let row = sqlx::query_as::<_, ElderRow>("SELECT * FROM elders WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn caregiver_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<CaregiverRow>> {
    let row = sqlx::query_as::<_, CaregiverRow>("SELECT * FROM caregivers WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn caregiver_by_email(pool: &SqlitePool, email: &str) -> Result<Option<CaregiverRow>> {
    let row = sqlx::query_as::<_, CaregiverRow>("SELECT * FROM caregivers WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Roster membership check, re-verified on every scoped read
pub async fn roster_contains(
    pool: &SqlitePool,
    caregiver_guid: &str,
    elder_guid: &str,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM caregiver_elders WHERE caregiver_guid = ? AND elder_guid = ?",
    )
    .bind(caregiver_guid)
    .bind(elder_guid)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn roster_elders(pool: &SqlitePool, caregiver_guid: &str) -> Result<Vec<ElderRow>> {
    let rows = sqlx::query_as::<_, ElderRow>(
        r#"
        SELECT e.* FROM elders e
        JOIN caregiver_elders ce ON ce.elder_guid = e.guid
        WHERE ce.caregiver_guid = ?
        ORDER BY e.name
        "#,
    )
    .bind(caregiver_guid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All sessions for one elder, newest first
pub async fn sessions_newest_first(
    pool: &SqlitePool,
    elder_guid: &str,
) -> Result<Vec<SessionRow>> {
    let rows = sqlx::query_as::<_, SessionRow>(
        "SELECT * FROM game_sessions WHERE elder_guid = ? ORDER BY created_at DESC",
    )
    .bind(elder_guid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// All sessions for one elder, oldest first (report aggregation order)
pub async fn sessions_oldest_first(
    pool: &SqlitePool,
    elder_guid: &str,
) -> Result<Vec<SessionRow>> {
    let rows = sqlx::query_as::<_, SessionRow>(
        "SELECT * FROM game_sessions WHERE elder_guid = ? ORDER BY created_at ASC",
    )
    .bind(elder_guid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
