//! HTTP API handlers

use axum::Json;
use serde_json::{json, Value};

use crate::auth::Role;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub mod caregivers;
pub mod elders;
pub mod extract;
pub mod questionnaires;
pub mod reports;
pub mod sessions;

pub use extract::{AnyAuth, CaregiverAuth, ElderAuth, MaybeElderAuth};

/// GET /health - no authentication
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "module": "vigil-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Elder-scoped read authorization: the elder itself, or a caregiver with the
/// elder in its roster. Failure is a 404 identical to a missing elder, so a
/// caller cannot probe which elder guids exist.
pub(crate) async fn authorize_elder_read(
    state: &AppState,
    auth: &AnyAuth,
    elder_guid: &str,
) -> ApiResult<()> {
    let allowed = match auth.role {
        Role::Elder => auth.guid == elder_guid,
        Role::Caregiver => db::roster_contains(&state.db, &auth.guid, elder_guid).await?,
    };
    if allowed {
        Ok(())
    } else {
        Err(ApiError::NotFound("elder not found".to_string()))
    }
}
