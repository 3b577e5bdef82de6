//! Liveness and dependency checks (public)
//!
//! | Path | Method |
//! |------|--------|
//! | /health | GET |
//! | /health/detailed | GET |

use std::fmt::Display;
use std::time::Instant;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
}

#[derive(Serialize)]
pub struct DetailedHealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    checks: DependencyChecks,
}

#[derive(Serialize)]
pub struct DependencyChecks {
    database: Probe,
    audit_log: Probe,
    cache: Probe,
}

/// Outcome of one dependency probe
#[derive(Serialize)]
pub struct Probe {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl Probe {
    fn run<T, E: Display>(label: &str, check: impl FnOnce() -> Result<T, E>) -> Self {
        let started = Instant::now();
        match check() {
            Ok(_) => Self {
                status: "ok",
                latency_ms: Some(started.elapsed().as_millis() as u64),
                message: None,
            },
            Err(e) => {
                tracing::warn!(check = label, error = %e, "Health probe failed");
                Self {
                    status: "error",
                    latency_ms: None,
                    message: Some(format!("{}: {}", label, e)),
                }
            }
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
    })
}

pub async fn detailed_health(State(state): State<ServerState>) -> Json<DetailedHealthResponse> {
    let database = Probe::run("database", || state.storage.get_order(0));
    let audit_log = Probe::run("audit log", || state.audit.query_last(1));

    let cache_started = Instant::now();
    let cache = match state.cache.get("health:probe").await {
        Ok(_) => Probe {
            status: "ok",
            latency_ms: Some(cache_started.elapsed().as_millis() as u64),
            message: None,
        },
        Err(e) => Probe::run("cache", || Err::<(), _>(e)),
    };

    // The cache is a side channel; only storage failures degrade the service
    let healthy = database.is_ok() && audit_log.is_ok();

    Json(DetailedHealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        checks: DependencyChecks {
            database,
            audit_log,
            cache,
        },
    })
}
