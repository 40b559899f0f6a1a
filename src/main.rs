//! Moodle Gateway - one API in front of any Moodle instance
//!
//! Users sign in with their university's Moodle URL and credentials. The
//! gateway validates the instance, exchanges the credentials for a
//! web-service token, and keeps that token in a server-side session. Course
//! listings, content trees, file downloads and the chat assistant are then
//! served against whichever instance the session points at.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod assistant;
mod config;
mod conversation;
mod moodle;
mod routes;
mod session;

use assistant::Assistant;
use config::Config;
use moodle::MoodleConnector;
use session::{spawn_sweeper, SessionStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub moodle: MoodleConnector,
    pub assistant: Assistant,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            moodle: MoodleConnector::new(config.timeouts),
            assistant: Assistant::new(),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodle_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr = config.bind_addr();

    let state = AppState::new(&config);
    let sweeper = spawn_sweeper(state.sessions.clone(), config.sweep_interval());
    let sessions = state.sessions.clone();

    let app = Router::new()
        .merge(routes::router())
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("CORS origins: {:?}", config.cors_origins);
    tracing::info!("Moodle gateway running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down Moodle gateway");
    sweeper.shutdown().await;
    let expired = sessions.sweep();
    let dropped = sessions.clear();
    tracing::info!("Swept {} expired and dropped {} live session(s)", expired, dropped);

    Ok(())
}
