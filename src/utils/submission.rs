// src/utils/submission.rs

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;

use crate::{engine::session::SubmissionPayload, error::AppError};

/// Where finished answer sheets go.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, session_id: Uuid, payload: &SubmissionPayload) -> Result<(), AppError>;
}

/// Posts `{answers: [...]}` to the test-submission endpoint.
pub struct HttpSubmissionSink {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSubmissionSink {
    pub fn new(endpoint: Url) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl SubmissionSink for HttpSubmissionSink {
    async fn submit(&self, session_id: Uuid, payload: &SubmissionPayload) -> Result<(), AppError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("X-Exam-Session", session_id.to_string())
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(%session_id, "Submission request failed: {:?}", e);
                AppError::BadGateway("Submission service unreachable".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(%session_id, status = %response.status(), "Submission rejected");
            return Err(AppError::BadGateway(format!(
                "Submission service returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Keeps submissions in memory. Used when no endpoint is configured.
#[derive(Default)]
pub struct MemorySubmissionSink {
    received: Mutex<Vec<(Uuid, SubmissionPayload)>>,
}

impl MemorySubmissionSink {
    pub async fn received(&self) -> Vec<(Uuid, SubmissionPayload)> {
        self.received.lock().await.clone()
    }
}

#[async_trait]
impl SubmissionSink for MemorySubmissionSink {
    async fn submit(&self, session_id: Uuid, payload: &SubmissionPayload) -> Result<(), AppError> {
        self.received.lock().await.push((session_id, payload.clone()));
        tracing::info!(%session_id, answers = payload.answers.len(), "Submission stored in memory");
        Ok(())
    }
}
