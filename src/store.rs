// src/store.rs

//! In-memory registries for registered tests and running sessions.

use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    engine::session::ExamSession,
    error::AppError,
    models::test_content::{TestContent, TestSummary},
    utils::{jwt::Claims, submission::SubmissionSink},
};

/// A running session and who it belongs to.
pub struct SessionEntry {
    pub id: Uuid,
    pub test_id: Uuid,
    /// `sub` claim of the user taking the test.
    pub owner: String,
    pub session: ExamSession,
}

pub type SharedSession = Arc<Mutex<SessionEntry>>;

#[derive(Default)]
pub struct ContentStore {
    tests: RwLock<HashMap<Uuid, TestContent>>,
}

impl ContentStore {
    pub async fn insert(&self, test: TestContent) {
        self.tests.write().await.insert(test.id, test);
    }

    pub async fn get(&self, id: Uuid) -> Option<TestContent> {
        self.tests.read().await.get(&id).cloned()
    }

    pub async fn list(&self) -> Vec<TestSummary> {
        let mut tests: Vec<TestSummary> = self
            .tests
            .read()
            .await
            .values()
            .map(TestSummary::from)
            .collect();
        tests.sort_by(|a, b| a.title.cmp(&b.title));
        tests
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionStore {
    pub async fn insert(&self, entry: SessionEntry) -> SharedSession {
        let id = entry.id;
        let shared = Arc::new(Mutex::new(entry));
        self.sessions.write().await.insert(id, shared.clone());
        shared
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Looks up a session the caller owns.
    pub async fn get_owned(&self, id: Uuid, claims: &Claims) -> Result<SharedSession, AppError> {
        let shared = self
            .get(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
        if shared.lock().await.owner != claims.sub {
            return Err(AppError::Forbidden("Session belongs to another user".to_string()));
        }
        Ok(shared)
    }

    pub async fn all(&self) -> Vec<SharedSession> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Drops sessions that finished more than `retention` ago.
    pub async fn prune_finished(&self, retention: Duration) -> usize {
        let now = Utc::now();
        let mut stale = Vec::new();
        for shared in self.all().await {
            let entry = shared.lock().await;
            if entry
                .session
                .finished_at()
                .is_some_and(|t| now - t >= retention)
            {
                stale.push(entry.id);
            }
        }

        if !stale.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &stale {
                sessions.remove(id);
            }
            tracing::debug!(removed = stale.len(), "Pruned finished sessions");
        }
        stale.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Delivers the answer sheet and closes the session on success.
///
/// The session lock is not held while the sink works; the answers are frozen
/// instead. On failure the session stays open with its answers intact so the
/// delivery can be retried. A session whose time ran out is closed as expired.
pub async fn deliver_submission(shared: &SharedSession, sink: &dyn SubmissionSink) -> Result<(), AppError> {
    let (id, payload) = {
        let mut entry = shared.lock().await;
        let payload = entry.session.begin_submission()?;
        (entry.id, payload)
    };

    let delivered = sink.submit(id, &payload).await;

    let mut entry = shared.lock().await;
    match delivered {
        Ok(()) => {
            let expired = entry.session.countdown().is_expired();
            entry.session.mark_submitted(expired);
            tracing::info!(
                session_id = %entry.id,
                test_id = %entry.test_id,
                expired,
                "Session submitted"
            );
            Ok(())
        }
        Err(e) => {
            entry.session.abort_submission();
            tracing::warn!(session_id = %entry.id, "Submission not delivered: {}", e);
            Err(e)
        }
    }
}
