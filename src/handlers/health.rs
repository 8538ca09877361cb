//! Liveness and readiness probes.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use mongodb::bson::doc;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::timeout;

use super::AppState;

/// Per-check timeout for the readiness probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Raw handles the readiness probe pings.
#[derive(Clone)]
pub struct ReadinessTargets {
    pub mongo: mongodb::Database,
    pub redis: redis::aio::ConnectionManager,
}

#[derive(Debug, Serialize)]
struct DependencyStatus {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    status: &'static str,
    dependencies: BTreeMap<&'static str, DependencyStatus>,
}

/// `GET /health` — the process is alive.
pub async fn liveness() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /health/ready` — MongoDB and Redis are reachable. Degraded
/// dependencies yield 503 with per-dependency detail.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let mut dependencies = BTreeMap::new();
    let mut healthy = true;

    if let Some(targets) = state.readiness.as_ref() {
        match check_mongo(&targets.mongo).await {
            Ok(()) => {
                dependencies.insert("mongodb", DependencyStatus { status: "ok", error: None });
            }
            Err(e) => {
                healthy = false;
                dependencies.insert(
                    "mongodb",
                    DependencyStatus {
                        status: "unhealthy",
                        error: Some(e),
                    },
                );
            }
        }

        match check_redis(targets.redis.clone()).await {
            Ok(()) => {
                dependencies.insert("redis", DependencyStatus { status: "ok", error: None });
            }
            Err(e) => {
                healthy = false;
                dependencies.insert(
                    "redis",
                    DependencyStatus {
                        status: "unhealthy",
                        error: Some(e),
                    },
                );
            }
        }
    }

    let (status, code) = if healthy {
        ("ok", StatusCode::OK)
    } else {
        ("degraded", StatusCode::SERVICE_UNAVAILABLE)
    };

    (code, Json(ReadinessResponse { status, dependencies }))
}

async fn check_mongo(db: &mongodb::Database) -> Result<(), String> {
    match timeout(PROBE_TIMEOUT, db.run_command(doc! { "ping": 1 })).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("ping timed out".to_string()),
    }
}

async fn check_redis(mut conn: redis::aio::ConnectionManager) -> Result<(), String> {
    let ping = async {
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok::<_, redis::RedisError>(pong)
    };
    match timeout(PROBE_TIMEOUT, ping).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("ping timed out".to_string()),
    }
}
