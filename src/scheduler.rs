// src/scheduler.rs

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior, interval};

use crate::{
    error::AppError,
    store::{SessionStore, SharedSession, deliver_submission},
    utils::submission::SubmissionSink,
};

/// Ticks every session's countdown once per second until shutdown.
///
/// Deliveries run on their own tasks so a slow sink never holds up the
/// clock of other sessions.
pub async fn run_countdown(
    sessions: Arc<SessionStore>,
    sink: Arc<dyn SubmissionSink>,
    retention: chrono::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for shared in tick_all(&sessions).await {
                    let sink = sink.clone();
                    tokio::spawn(async move {
                        // failures are retried on the next tick
                        let _ = auto_submit(&shared, sink.as_ref()).await;
                    });
                }
                sessions.prune_finished(retention).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    tracing::info!("Countdown task stopped");
}

/// One countdown step.
///
/// Returns the sessions that are out of time and still waiting to be
/// submitted, including those whose earlier delivery failed.
pub async fn tick_all(sessions: &SessionStore) -> Vec<SharedSession> {
    let mut due = Vec::new();
    for shared in sessions.all().await {
        let mut entry = shared.lock().await;
        if entry.session.tick() {
            tracing::info!(session_id = %entry.id, "Time is up, submitting");
        }
        if entry.session.is_due() {
            due.push(shared.clone());
        }
    }
    due
}

/// Submits a session whose time ran out.
pub async fn auto_submit(shared: &SharedSession, sink: &dyn SubmissionSink) -> Result<(), AppError> {
    deliver_submission(shared, sink).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        EngineError,
        lockdown::Role,
        session::{ExamSession, SectionKind, SectionSource, SessionStatus, SubmissionPayload},
    };
    use crate::store::SessionEntry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Fails the first `failures` deliveries.
    struct RecoveringSink {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SubmissionSink for RecoveringSink {
        async fn submit(&self, _: Uuid, _: &SubmissionPayload) -> Result<(), AppError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(AppError::BadGateway("down".to_string()));
            }
            Ok(())
        }
    }

    async fn store_with_session(seconds: u64) -> (SessionStore, SharedSession) {
        let source = SectionSource {
            kind: SectionKind::Reading,
            title: "Reading".into(),
            html: r#"<question-input data-question-number="1" data-question-type="short_answer"></question-input>"#.into(),
        };
        let store = SessionStore::default();
        let shared = store
            .insert(SessionEntry {
                id: Uuid::new_v4(),
                test_id: Uuid::new_v4(),
                owner: "s1".into(),
                session: ExamSession::start(vec![source], Role::Student, seconds),
            })
            .await;
        (store, shared)
    }

    #[tokio::test]
    async fn test_failed_auto_submit_is_retried_and_session_stays_frozen() {
        let (store, shared) = store_with_session(2).await;
        let sink = RecoveringSink {
            failures: 3,
            calls: AtomicUsize::new(0),
        };

        let mut attempts = 0;
        for _ in 0..10 {
            for due in tick_all(&store).await {
                attempts += 1;
                let _ = auto_submit(&due, &sink).await;
            }
            if attempts == 1 {
                let mut entry = shared.lock().await;
                assert_eq!(entry.session.status(), SessionStatus::InProgress);
                assert_eq!(
                    entry.session.set_answer(1, "written after time ran out"),
                    Err(EngineError::TimeUp)
                );
            }
        }

        assert_eq!(attempts, 4);
        let entry = shared.lock().await;
        assert_eq!(entry.session.status(), SessionStatus::Expired);
        assert_eq!(entry.session.answers().answer(1), Some(""));
    }

    #[tokio::test]
    async fn test_tick_skips_sessions_being_submitted() {
        let (store, shared) = store_with_session(1).await;

        shared.lock().await.session.begin_submission().unwrap();
        assert!(tick_all(&store).await.is_empty());

        shared.lock().await.session.abort_submission();
        assert_eq!(tick_all(&store).await.len(), 1);
    }
}
