//! API server — dashboard REST API, probes, OpenAPI docs and the metrics exporter.

use crate::rest::{self, AppState};
use crate::swagger::ApiDoc;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use crm_core::config::AppConfig;
use crm_management::{management_router, ManagementState};
use std::net::SocketAddr;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub struct ApiServer {
    config: AppConfig,
    state: ManagementState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: ManagementState) -> Self {
        Self { config, state }
    }

    /// Full application router with middleware applied.
    pub fn router(&self) -> anyhow::Result<Router> {
        let probe_state = AppState {
            store: self.state.store.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };

        let probes = Router::new()
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            .with_state(probe_state);

        let cors = match &self.config.api.cors_origin {
            Some(origin) => CorsLayer::new()
                .allow_origin(origin.parse::<HeaderValue>()?)
                .allow_methods(Any)
                .allow_headers(Any),
            None => CorsLayer::permissive(),
        };

        Ok(Router::new()
            .merge(management_router(self.state.clone()))
            .merge(probes)
            .merge(SwaggerUi::new("/api-docs").url("/openapi.json", ApiDoc::openapi()))
            .layer(CompressionLayer::new())
            .layer(cors)
            .layer(TraceLayer::new_for_http()))
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = self.router()?;
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the Prometheus exporter on its own port.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use crm_core::event_bus::noop_sink;
    use crm_store::MemoryStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn server() -> ApiServer {
        let config = AppConfig::default();
        let store = Arc::new(MemoryStore::new());
        store.seed_demo_data();
        let state = ManagementState::new(&config, store, noop_sink()).unwrap();
        ApiServer::new(config, state)
    }

    #[tokio::test]
    async fn test_health_reports_store_counts() {
        let app = server().router().unwrap();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert!(body["customers"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_probes_skip_auth() {
        let app = server().router().unwrap();
        for uri in ["/ready", "/live"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
        let response = app
            .oneshot(Request::builder().uri("/api/campaigns").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let app = server().router().unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
