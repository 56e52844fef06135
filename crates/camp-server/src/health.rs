//! Health checks
//!
//! `/health` and `/health/live` only prove the process answers.
//! `/health/ready` pings the database and reports 503 while it is down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use camp_db::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: Vec<ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub check_timeout: Duration,
    /// How long a report is reused before the database is pinged again
    pub cache_duration: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout: Duration::from_secs(5),
            cache_duration: Duration::from_secs(5),
        }
    }
}

struct CachedHealth {
    report: HealthReport,
    cached_at: Instant,
}

pub struct HealthChecker {
    config: HealthConfig,
    start_time: Instant,
    cache: RwLock<Option<CachedHealth>>,
    database: Option<Database>,
}

impl HealthChecker {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            cache: RwLock::new(None),
            database: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub async fn check(&self) -> HealthReport {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.cached_at.elapsed() < self.config.cache_duration {
                    debug!("Returning cached health report");
                    return cached.report.clone();
                }
            }
        }

        let report = self.perform_checks().await;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedHealth {
            report: report.clone(),
            cached_at: Instant::now(),
        });
        report
    }

    async fn perform_checks(&self) -> HealthReport {
        let mut components = Vec::new();
        if let Some(ref database) = self.database {
            components.push(self.check_database(database).await);
        }

        let status = if components
            .iter()
            .all(|component| component.status == HealthStatus::Healthy)
        {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    async fn check_database(&self, database: &Database) -> ComponentHealth {
        let start = Instant::now();
        let outcome = tokio::time::timeout(self.config.check_timeout, database.ping()).await;

        let (status, message) = match outcome {
            Ok(Ok(())) => (HealthStatus::Healthy, "Connected".to_string()),
            Ok(Err(e)) => {
                warn!(error = %e, "Database health check failed");
                (HealthStatus::Unhealthy, e.to_string())
            }
            Err(_) => {
                warn!("Database health check timed out");
                (HealthStatus::Unhealthy, "timed out".to_string())
            }
        };

        let stats = database.stats();
        ComponentHealth {
            name: "database".to_string(),
            status,
            message: Some(message),
            response_time_ms: start.elapsed().as_millis() as u64,
            details: Some(serde_json::json!({
                "type": "postgresql",
                "pool_size": stats.size,
                "idle_connections": stats.idle,
            })),
        }
    }
}

pub async fn liveness() -> &'static str {
    "OK"
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn readiness(
    State(health): State<Arc<HealthChecker>>,
) -> (StatusCode, Json<HealthReport>) {
    let report = health.check().await;
    (report.http_status(), Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_without_database_is_healthy() {
        let checker = HealthChecker::new(HealthConfig::default());
        let report = checker.check().await;

        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.components.is_empty());
        assert_eq!(report.http_status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_report_is_cached() {
        let checker = HealthChecker::new(HealthConfig {
            cache_duration: Duration::from_secs(60),
            ..Default::default()
        });

        let first = checker.check().await;
        let second = checker.check().await;
        assert_eq!(first.timestamp, second.timestamp);
    }

    #[test]
    fn test_unhealthy_is_503() {
        let report = HealthReport {
            status: HealthStatus::Unhealthy,
            version: "0.1.0".to_string(),
            uptime_seconds: 3,
            components: vec![],
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(report.http_status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
