// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    store::{ContentStore, SessionStore},
    utils::submission::SubmissionSink,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub tests: Arc<ContentStore>,
    pub sessions: Arc<SessionStore>,
    pub sink: Arc<dyn SubmissionSink>,
}

impl AppState {
    pub fn new(config: Config, sink: Arc<dyn SubmissionSink>) -> Self {
        Self {
            config,
            tests: Arc::new(ContentStore::default()),
            sessions: Arc::new(SessionStore::default()),
            sink,
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
