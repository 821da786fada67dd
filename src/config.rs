// src/config.rs

use std::env;
use dotenvy::dotenv;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: String,
    /// Time budget for tests registered without one.
    pub default_exam_seconds: u64,
    /// Test-submission endpoint. Submissions stay in memory when unset.
    pub submission_url: Option<Url>,
    pub cors_origins: Vec<String>,
    /// Highest question number a test may use; sizes every answer store.
    pub max_questions: usize,
    /// How long finished sessions stay readable before they are dropped.
    pub session_retention_secs: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let default_exam_seconds = env::var("DEFAULT_EXAM_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let submission_url = env::var("SUBMISSION_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| Url::parse(&v).expect("SUBMISSION_URL must be a valid URL"));

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_questions = env::var("MAX_QUESTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(200);

        let session_retention_secs = env::var("SESSION_RETENTION_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        Self {
            jwt_secret,
            rust_log,
            bind_addr,
            default_exam_seconds,
            submission_url,
            cors_origins,
            max_questions,
            session_retention_secs,
        }
    }
}
