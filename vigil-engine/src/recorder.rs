//! Session recording client
//!
//! Posts finished runs and disease-flag updates to the vigil-server API.
//! Submission is latched: a run is recorded at most once no matter how many
//! exit paths race to report it.

use thiserror::Error;

use vigil_common::api::{FlagUpdateRequest, RecordSessionRequest};

use crate::schedule::CompletionLatch;

/// Recorder errors
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server rejected request: {0}")]
    Rejected(u16),

    #[error("Session already submitted")]
    AlreadySubmitted,
}

/// HTTP client for the session and flag endpoints, bound to one elder's
/// bearer token
pub struct SessionRecorder {
    client: reqwest::Client,
    base_url: String,
    token: String,
    submitted: CompletionLatch,
}

impl SessionRecorder {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            submitted: CompletionLatch::new(),
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.is_complete()
    }

    /// Record a finished run. The first call wins; later calls return
    /// `AlreadySubmitted` without touching the network.
    pub async fn submit(&self, record: &RecordSessionRequest) -> Result<(), RecorderError> {
        if !self.submitted.try_complete() {
            return Err(RecorderError::AlreadySubmitted);
        }
        let url = format!("{}/api/session/record", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(record)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RecorderError::Rejected(status.as_u16()));
        }
        tracing::info!(
            disease = %record.disease_type,
            mode = %record.mode,
            result = %record.result,
            "session recorded"
        );
        Ok(())
    }

    /// Record a finished run, logging failures instead of surfacing them.
    /// Game flows keep going even when the backend is unreachable.
    pub async fn submit_best_effort(&self, record: &RecordSessionRequest) {
        match self.submit(record).await {
            Ok(()) => {}
            Err(RecorderError::AlreadySubmitted) => {}
            Err(e) => tracing::error!("Failed to record session: {}", e),
        }
    }

    /// Push a disease-flag change for the authenticated elder
    pub async fn update_flags(&self, flags: &FlagUpdateRequest) -> Result<(), RecorderError> {
        let url = format!("{}/api/elder/disease-status", self.base_url);
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(flags)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RecorderError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_common::types::{ParkinsonMetrics, SessionMetrics};
    use vigil_common::{Disease, SessionMode};

    fn record() -> RecordSessionRequest {
        RecordSessionRequest {
            disease_type: Disease::Parkinson,
            mode: SessionMode::Detection,
            result: "Green".to_string(),
            metrics: SessionMetrics::parkinson(ParkinsonMetrics {
                taps_per_second: Some(3.0),
                correct_taps: Some(45),
                time: Some(15.0),
            }),
        }
    }

    #[tokio::test]
    async fn second_submit_is_rejected_before_the_network() {
        // Unroutable base URL: the first call consumes the latch and fails on
        // the network; the second must short-circuit with AlreadySubmitted.
        let recorder = SessionRecorder::new("http://127.0.0.1:1", "token");
        let first = recorder.submit(&record()).await;
        assert!(matches!(first, Err(RecorderError::Network(_))));
        assert!(recorder.is_submitted());

        let second = recorder.submit(&record()).await;
        assert!(matches!(second, Err(RecorderError::AlreadySubmitted)));
    }

    #[tokio::test]
    async fn best_effort_swallows_errors() {
        let recorder = SessionRecorder::new("http://127.0.0.1:1", "token");
        recorder.submit_best_effort(&record()).await;
        recorder.submit_best_effort(&record()).await;
        assert!(recorder.is_submitted());
    }
}
