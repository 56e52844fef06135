//! CampHQ Server
//!
//! HTTP server for the CampHQ licensee platform.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use camp_api::AppState;
use camp_auth::{Authenticator, MemorySessionStore};
use camp_core::config::{AppConfig, ServerConfig};
use camp_db::Database;
use camp_notifications::{sender_from_config, Mailer};
use camp_services::{ManualGateway, ServiceContext, ServiceSettings};
use camp_storage::storage_from_config;

mod health;
mod maintenance;
mod metrics;

use health::{HealthChecker, HealthConfig};
use metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::load()?;
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        environment = %config.server.environment,
        "Starting CampHQ"
    );

    let db = Database::connect(&config.database)
        .await
        .context("connecting to database")?;
    info!("Connected to database");

    if config.database.run_migrations {
        db.migrate().await.context("running migrations")?;
        info!("Migrations applied");
    }

    let ctx = ServiceContext::new(
        db.pool().clone(),
        Arc::new(ManualGateway),
        sender_from_config(&config.email),
        Mailer::from_config(&config.email),
        storage_from_config(&config.storage),
        ServiceSettings::from_config(&config),
    );
    let sessions = Arc::new(MemorySessionStore::new());
    let auth = Arc::new(Authenticator::new(&config.auth, sessions.clone()));
    let sweeper =
        maintenance::spawn_sweeper(sessions, ctx.kiosks.clone(), maintenance::SWEEP_INTERVAL);

    let metrics = Arc::new(Metrics::new(ctx.counters.clone()));
    let health = Arc::new(HealthChecker::new(HealthConfig::default()).with_database(db.clone()));
    let app = build_router(&config.server, AppState::new(ctx, auth), health, metrics);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `LOG_FORMAT=json` switches to one JSON object per line
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,camp_server=debug,camp_api=debug,camp_services=debug,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

fn build_router(
    config: &ServerConfig,
    api: AppState,
    health: Arc<HealthChecker>,
    metrics: Arc<Metrics>,
) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(health);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/metrics.json", get(metrics::json_metrics))
        .with_state(metrics.clone());

    Router::new()
        .merge(health_routes)
        .merge(metrics_routes)
        .merge(camp_api::router().with_state(api))
        .layer(DefaultBodyLimit::max(config.max_body_size_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_seconds,
                )))
                .layer(CompressionLayer::new())
                .layer(cors_layer(&config.cors_origins)),
        )
        .layer(middleware::from_fn_with_state(
            metrics,
            metrics::metrics_middleware,
        ))
}

/// Any origin when none are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use camp_notifications::MemoryEmailSender;
    use camp_storage::MemoryStorage;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = AppConfig::default();
        let db = Database::connect_lazy(&config.database).unwrap();
        let ctx = ServiceContext::new(
            db.pool().clone(),
            Arc::new(ManualGateway),
            Arc::new(MemoryEmailSender::new()),
            Mailer::from_config(&config.email),
            Arc::new(MemoryStorage::new()),
            ServiceSettings::from_config(&config),
        );
        let auth = Arc::new(Authenticator::new(
            &config.auth,
            Arc::new(MemorySessionStore::new()),
        ));
        let metrics = Arc::new(Metrics::new(ctx.counters.clone()));
        let health = Arc::new(HealthChecker::new(HealthConfig::default()));

        build_router(&config.server, AppState::new(ctx, auth), health, metrics)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = test_app();

        let (status, body) = get(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"status\":\"ok\""));

        let (status, _) = get(&app, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_count_requests() {
        let app = test_app();

        get(&app, "/health").await;
        get(&app, "/api/auth/me").await;

        let (status, body) = get(&app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("http_requests_by_status{status=\"2xx\"} 1\n"));
        assert!(body.contains("http_requests_by_status{status=\"4xx\"} 1\n"));
        assert!(body.contains("camp_checkouts_total 0\n"));
    }

    #[tokio::test]
    async fn test_api_is_mounted() {
        let app = test_app();
        let (status, body) = get(&app, "/api/auth/me").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("authentication required"));
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/camps")
                    .header(header::ORIGIN, "https://camps.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[test]
    fn test_cors_skips_invalid_origins() {
        let _ = cors_layer(&["https://ok.example".to_string(), "bad\norigin".to_string()]);
    }
}
