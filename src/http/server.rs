//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the gateway Route Table (user invocation routes, then test invoke)
//! - Create the Axum Router and wire up middleware (tracing, timeout, request ID)
//! - Buffer each request and dispatch it through the Route Table
//! - Bind server to listener with graceful shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::gateway::dispatch::Handler;
use crate::gateway::{ApiLookup, ApigatewayRouter, IntegrationInvoker, TestInvokeHandler};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::invocation::GatewayRequest;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::routing::{RouteError, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable<Handler>>,
    pub max_body_size: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server dispatching to the given collaborators.
    pub fn new(
        config: GatewayConfig,
        lookup: Arc<dyn ApiLookup>,
        invoker: Arc<dyn IntegrationInvoker>,
    ) -> Result<Self, RouteError> {
        let mut routes = RouteTable::new();
        let gateway = Arc::new(ApigatewayRouter::new(lookup.clone(), invoker.clone()));
        gateway.register_routes(&mut routes)?;
        Arc::new(TestInvokeHandler::new(lookup, invoker)).register(&mut routes)?;

        tracing::info!(routes = routes.len(), "Route table built");

        let state = AppState {
            routes: Arc::new(routes),
            max_body_size: config.limits.max_body_size,
        };
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .fallback(gateway_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The configured Axum router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<std::net::SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Resolve the request through the Route Table and run the bound handler.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();

    let request = match GatewayRequest::from_http(request, state.max_body_size).await {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected request body");
            let response = e.into_response();
            metrics::record_invocation(&method, response.status().as_u16(), start_time);
            return response;
        }
    };

    let host = request.host().to_string();
    let path = request.decoded_path().into_owned();

    let response = match state.routes.resolve(&host, &path) {
        Some(matched) => {
            tracing::debug!(host = %host, path = %path, "Route matched");
            matched
                .handler
                .handle(request, matched.params)
                .unwrap_or_else(|e| e.into_response())
        }
        None => {
            tracing::debug!(host = %host, path = %path, "No route matched");
            (StatusCode::NOT_FOUND, "No matching route found").into_response()
        }
    };

    metrics::record_invocation(&method, response.status().as_u16(), start_time);
    response
}
