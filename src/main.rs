// src/main.rs

use std::sync::Arc;

use dotenvy::dotenv;
use exam_engine::config::Config;
use exam_engine::routes;
use exam_engine::scheduler;
use exam_engine::state::AppState;
use exam_engine::utils::submission::{HttpSubmissionSink, MemorySubmissionSink, SubmissionSink};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "exam-engine.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let sink: Arc<dyn SubmissionSink> = match &config.submission_url {
        Some(url) => {
            tracing::info!("Submissions will be posted to {}", url);
            Arc::new(HttpSubmissionSink::new(url.clone()).expect("Failed to build HTTP client"))
        }
        None => {
            tracing::warn!("SUBMISSION_URL not set, submissions are kept in memory");
            Arc::new(MemorySubmissionSink::default())
        }
    };

    let state = AppState::new(config.clone(), sink);

    // Countdown for every running session
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let countdown = tokio::spawn(scheduler::run_countdown(
        state.sessions.clone(),
        state.sink.clone(),
        chrono::Duration::seconds(config.session_retention_secs),
        shutdown_rx,
    ));

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listening address");
    tracing::info!("Listening on {}", config.bind_addr);

    // Start the server
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .expect("Server error");

    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Countdown task already stopped");
    }
    if let Err(e) = countdown.await {
        tracing::error!("Countdown task join failed: {}", e);
    }
}
