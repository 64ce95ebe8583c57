//! HTTP gateway server built on axum.

use super::error::GatewayError;
use crate::config::ServerConfig;
use crate::region::RegionTable;
use crate::report::{TransparencyReport, build_report};
use crate::score::Score;
use crate::source::MetadataSource;
use crate::types::TransparencyRecord;
use axum::{
    Json, Router,
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, header},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, Span, info, warn};

/// Shared gateway reference for axum handlers. Read-only after construction.
pub type SharedGateway = Arc<GatewayServer>;

/// Serves transparency reports built from a metadata source.
pub struct GatewayServer {
    source: Arc<dyn MetadataSource>,
    regions: RegionTable,
    started_at: chrono::DateTime<Utc>,
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("source", &self.source.describe())
            .field("regions", &self.regions.len())
            .finish()
    }
}

impl GatewayServer {
    pub fn new(source: Arc<dyn MetadataSource>, regions: RegionTable) -> Self {
        Self {
            source,
            regions,
            started_at: Utc::now(),
        }
    }

    /// Convenience for wrapping into a [`SharedGateway`].
    pub fn shared(self) -> SharedGateway {
        Arc::new(self)
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// Uptime in seconds since the server was created.
    pub fn uptime_secs(&self) -> u64 {
        let elapsed = Utc::now() - self.started_at;
        elapsed.num_seconds().max(0) as u64
    }

    /// Fetch a fresh snapshot and build a report from it.
    pub async fn report(&self) -> Result<TransparencyReport, GatewayError> {
        let snapshot = self.source.snapshot().await?;
        Ok(build_report(&snapshot, &self.regions)?)
    }
}

/// Build the axum Router with `/health`, `/map`, `/score` and `/report` routes.
pub fn router(shared: SharedGateway) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/map", get(map_handler))
        .route("/score", get(score_handler))
        .route("/report", get(report_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(shared)
}

/// Span carrying method, path, remote address and user agent of a request.
fn request_span(request: &Request<Body>) -> Span {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        remote = %remote,
        user_agent = %user_agent,
    )
}

/// Health check endpoint.
async fn health_handler(State(gw): State<SharedGateway>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "uptime_secs": gw.uptime_secs(),
    }))
}

/// Transparency records of every unit.
async fn map_handler(
    State(gw): State<SharedGateway>,
) -> Result<Json<Vec<TransparencyRecord>>, GatewayError> {
    Ok(Json(gw.report().await?.records))
}

/// Completeness score only.
async fn score_handler(State(gw): State<SharedGateway>) -> Result<Json<Score>, GatewayError> {
    Ok(Json(gw.report().await?.score))
}

/// Records and score together.
async fn report_handler(
    State(gw): State<SharedGateway>,
) -> Result<Json<TransparencyReport>, GatewayError> {
    Ok(Json(gw.report().await?))
}

/// Start the gateway on the configured address.
///
/// Serves HTTPS when `config.tls.enabled`, plain HTTP otherwise, and runs
/// until Ctrl-C is received.
pub async fn run(config: &ServerConfig, gw: SharedGateway) -> Result<(), std::io::Error> {
    let addr = tokio::net::lookup_host((config.host.as_str(), config.port))
        .await?
        .next()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("cannot resolve {}:{}", config.host, config.port),
            )
        })?;
    let app = router(gw).into_make_service_with_connect_info::<SocketAddr>();

    if config.tls.enabled {
        // Ensure the rustls CryptoProvider is installed (idempotent).
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            &config.tls.cert_path,
            &config.tls.key_path,
        )
        .await?;

        let handle = axum_server::Handle::new();
        let shutdown = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        info!(%addr, "Listening (TLS)");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app)
            .await
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        warn!(%addr, "Listening without TLS");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

/// Resolves on Ctrl-C, or on SIGTERM (what the kubelet sends) on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl-C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}
