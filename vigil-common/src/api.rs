//! Shared API request/response types
//!
//! Wire types used by both vigil-server handlers and the vigil-engine
//! session recorder, so the two sides cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::types::{Disease, SessionMetrics, SessionMode};

/// Generic error body returned for all failure responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

// ========================================
// Elder endpoints
// ========================================

/// POST /api/elder/register
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterElderRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub age: i64,
    pub gender: String,
    /// Caregiver contact email; linked now if registered, else kept pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver_email: Option<String>,
    /// Self-reported "already in therapy" answers, one per disease
    #[serde(default)]
    pub parkinsons: bool,
    #[serde(default)]
    pub dementia: bool,
    #[serde(default)]
    pub vision: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterElderResponse {
    pub token: String,
    pub elder: ElderProfile,
    pub caregiver_linked: bool,
}

/// POST /api/elder/login, /api/caregiver/login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub name: String,
    pub email: String,
}

/// Elder profile as returned by /api/elder/me
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElderProfile {
    pub guid: String,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub gender: String,
    pub d1: bool,
    pub d2: bool,
    pub d3: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caregiver: Option<CaregiverSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaregiverSummary {
    pub name: String,
    pub email: String,
}

/// PUT /api/elder/disease-status — partial update, omitted fields untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d1: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d2: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d3: Option<bool>,
}

impl FlagUpdateRequest {
    pub fn is_empty(&self) -> bool {
        self.d1.is_none() && self.d2.is_none() && self.d3.is_none()
    }

    /// The single-flag update for one disease
    pub fn for_disease(disease: Disease, value: bool) -> Self {
        let mut req = Self::default();
        match disease {
            Disease::Parkinson => req.d1 = Some(value),
            Disease::Dementia => req.d2 = Some(value),
            Disease::Vision => req.d3 = Some(value),
        }
        req
    }
}

// ========================================
// Caregiver endpoints
// ========================================

/// POST /api/caregiver/register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCaregiverRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCaregiverResponse {
    pub token: String,
    pub name: String,
    pub email: String,
    /// Number of pending elders linked during registration
    pub elders_linked: usize,
}

/// Roster entry returned to caregivers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElderSummary {
    pub guid: String,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub gender: String,
    pub d1: bool,
    pub d2: bool,
    pub d3: bool,
}

// ========================================
// Session recording
// ========================================

/// POST /api/session/record — ownership comes from the bearer token, never
/// from the body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSessionRequest {
    pub disease_type: Disease,
    pub mode: SessionMode,
    pub result: String,
    pub metrics: SessionMetrics,
}

// ========================================
// Questionnaires
// ========================================

/// POST /api/questionnaire
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuestionnaireRequest {
    /// Lower-trust fallback identity, honored only without a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elder_id: Option<String>,
    pub height: f64,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    pub breaths_per_min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver_id: Option<String>,
}

// ========================================
// Reports
// ========================================

/// One point of a therapy trend series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Session creation date (RFC 3339)
    pub date: String,
    pub value: f64,
    /// Unit label for the extracted metric ("sec", "threshold", "correct")
    pub unit: String,
}

/// Per-disease slice of an elder report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiseaseReport {
    pub detection_count: usize,
    pub therapy_count: usize,
    /// Last 5 therapy sessions, oldest first
    pub therapy_trend: Vec<TrendPoint>,
}

/// GET /api/report/... response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElderReport {
    pub parkinson: DiseaseReport,
    pub dementia: DiseaseReport,
    pub vision: DiseaseReport,
}
