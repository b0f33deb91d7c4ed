//! Shared utilities for integration testing.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apigw_router::{
    ApiLookup, GatewayConfig, GatewayError, HttpServer, IntegrationInvoker, IntegrationResponse,
    InvocationContext, Shutdown,
};
use axum::http::StatusCode;
use serde_json::json;

/// Collaborator that knows a fixed set of APIs and answers every invocation
/// with a JSON description of the context it received. Paths under
/// `/missing` yield no integration result.
pub struct EchoBackend {
    apis: BTreeSet<String>,
    pub invocations: Mutex<usize>,
}

impl EchoBackend {
    pub fn new(apis: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            apis: apis.iter().map(|s| s.to_string()).collect(),
            invocations: Mutex::new(0),
        })
    }

    pub fn invocation_count(&self) -> usize {
        *self.invocations.lock().unwrap()
    }
}

impl ApiLookup for EchoBackend {
    fn lookup_region(&self, api_id: &str) -> Option<String> {
        self.apis.contains(api_id).then(|| "us-east-1".to_string())
    }
}

impl IntegrationInvoker for EchoBackend {
    fn invoke(
        &self,
        ctx: &mut InvocationContext<'_>,
    ) -> Result<Option<IntegrationResponse>, GatewayError> {
        *self.invocations.lock().unwrap() += 1;
        let path = ctx.invocation_path()?.to_string();
        if path.starts_with("/missing") {
            return Ok(None);
        }

        let body = json!({
            "apiId": ctx.api_id,
            "stage": ctx.stage,
            "region": ctx.region_name,
            "method": ctx.method().as_str(),
            "invocationPath": path,
            "pathWithQueryString": ctx.path_with_query_string()?,
            "queryParams": ctx.query_params(),
            "domainName": ctx.domain_name(),
            "domainPrefix": ctx.domain_prefix(),
            "forwardedFor": ctx.headers().get("x-forwarded-for").and_then(|v| v.to_str().ok()),
            "requestId": ctx.request_id,
            "body": ctx.body_as_string(),
            "isBase64Encoded": ctx.is_body_base64_encoded(),
            "isWebsocket": ctx.is_websocket_request(),
        });
        let mut response = IntegrationResponse::new(StatusCode::OK, body.to_string());
        response
            .headers
            .insert("content-type", "application/json".parse().unwrap());
        Ok(Some(response))
    }
}

/// Start a gateway on an ephemeral port, returning its address.
#[allow(dead_code)]
pub async fn start_gateway(backend: Arc<EchoBackend>, shutdown: &Shutdown) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(GatewayConfig::default(), backend.clone(), backend).unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    addr
}
