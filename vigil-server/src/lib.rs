//! vigil-server library: screening and therapy backend
//!
//! Elder and caregiver accounts, game session persistence, questionnaires,
//! and report aggregation over an SQLite store.

use axum::routing::{get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;

use auth::AuthKeys;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// JWT signing and verification keys
    pub auth: AuthKeys,
}

impl AppState {
    pub fn new(db: SqlitePool, jwt_secret: &str) -> Self {
        Self { db, auth: AuthKeys::new(jwt_secret) }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        // Elder accounts
        .route("/api/elder/register", post(api::elders::register))
        .route("/api/elder/login", post(api::elders::login))
        .route("/api/elder/me", get(api::elders::me))
        .route("/api/elder/disease-status", put(api::elders::update_disease_status))
        // Caregiver accounts and roster
        .route("/api/caregiver/register", post(api::caregivers::register))
        .route("/api/caregiver/login", post(api::caregivers::login))
        .route("/api/caregiver/me", get(api::caregivers::me))
        .route("/api/caregiver/elders", get(api::caregivers::elders))
        .route("/api/caregiver/elders/:elder_id/sessions", get(api::caregivers::elder_sessions))
        // Sessions
        .route("/api/session/record", post(api::sessions::record))
        .route("/api/session/mine", get(api::sessions::mine))
        // Questionnaires
        .route("/api/questionnaire", post(api::questionnaires::submit))
        .route("/api/questionnaire/elder/:elder_id", get(api::questionnaires::by_elder))
        .route("/api/questionnaire/:id", get(api::questionnaires::by_id))
        // Reports
        .route("/api/report/mine", get(api::reports::mine))
        .route("/api/report/elder/:elder_id", get(api::reports::for_elder))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
