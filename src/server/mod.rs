//! Prediction server
//!
//! Serves `POST /predict`, `POST /explain` and `GET /health` over a pipeline
//! loaded once at startup. The server refuses to start without an artifact.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use crate::export::DEFAULT_MODEL_PATH;
use crate::inference::DriftPolicy;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub drift_policy: DriftPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("API_PORT", std::env::var("API_PORT").ok(), 5050),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH)),
            drift_policy: parse_or("DRIFT_POLICY", std::env::var("DRIFT_POLICY").ok(), DriftPolicy::default()),
        }
    }
}

/// Parse an environment override, keeping `default` (with a warning) when
/// the value is malformed
fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + fmt::Display,
    T::Err: fmt::Display,
{
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|e| {
            warn!(key, value = %value, error = %e, fallback = %default, "Ignoring invalid environment value");
            default
        }),
    }
}

impl ServerConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_drift_policy(mut self, policy: DriftPolicy) -> Self {
        self.drift_policy = policy;
        self
    }
}

/// Load the pipeline, then bind and serve until ctrl+c
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    info!(model_path = %config.model_path.display(), "Loading pipeline");
    let state = AppState::load(config.clone())?;
    let start_time = state.started_at;
    {
        let meta = state.pipeline.metadata();
        info!(
            model = %meta.model_type,
            params = %state.pipeline.params(),
            cv_mean_f1 = meta.cv_mean_f1,
            trained_at = %meta.trained_at.to_rfc3339(),
            drift_policy = %config.drift_policy,
            "Pipeline loaded"
        );
    }

    let app = create_router(Arc::new(state), &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c, shutting down");
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
