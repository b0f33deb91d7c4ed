//! Translation of a routed HTTP request into an invocation context.
//!
//! # Responsibilities
//! - Append this hop to `X-Forwarded-For`
//! - Stamp the edge URL header used for domain extraction
//! - Resolve (API id, stage, invocation path) for each addressing scheme
//! - Resolve the region through the API lookup collaborator
//!
//! # Data Flow
//! ```text
//! GatewayRequest + captured route variables + RequestShape
//!     → forwarding headers stamped on the request
//!     → InvocationContext (api id, stage, path, method, region)
//! ```

use axum::http::{HeaderValue, Method};
use serde::Deserialize;

use crate::error::GatewayError;
use crate::gateway::ApiLookup;
use crate::invocation::context::{ApiGatewayVersion, InvocationContext, HEADER_EDGE_URL};
use crate::invocation::request::GatewayRequest;
use crate::routing::Captures;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REQUEST_ID: &str = "x-request-id";

/// Overrides carried in the JSON body of a test-invoke call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestInvokeOverrides {
    pub rest_api_id: Option<String>,
    pub http_method: Option<String>,
    pub path_with_query_string: Option<String>,
}

impl TestInvokeOverrides {
    /// Parse the test-invoke body. Anything that is not a JSON object with
    /// the expected keys yields no overrides.
    pub fn from_body(body: &[u8]) -> Self {
        if body.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Ignoring malformed test-invoke payload");
            Self::default()
        })
    }
}

/// How the request addressed its target API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestShape {
    /// `<api_id>.execute-api.<host>/[<stage>/[<path>]]`
    HostBased,
    /// `/restapis/<api_id>/<stage>/_user_request_[/<path>]`
    UserRequest,
    /// Synthetic call; target taken from the body rather than the URL.
    TestInvoke(TestInvokeOverrides),
}

impl RequestShape {
    /// Shape of a user invocation, judged by which variables the route captured.
    pub fn from_params(params: &Captures) -> Self {
        if params.contains_key("server") {
            RequestShape::HostBased
        } else {
            RequestShape::UserRequest
        }
    }
}

pub struct ContextBuilder<'a> {
    lookup: &'a dyn ApiLookup,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(lookup: &'a dyn ApiLookup) -> Self {
        Self { lookup }
    }

    /// Build the context for one request. Fails with `ApiNotFound` when the
    /// target API has no configured region.
    pub fn build<'r>(
        &self,
        request: &'r mut GatewayRequest,
        params: &Captures,
        shape: RequestShape,
    ) -> Result<InvocationContext<'r>, GatewayError> {
        stamp_forwarding_headers(request);
        let request: &'r GatewayRequest = request;

        let mut ctx = InvocationContext::new(
            request,
            params.get("api_id").cloned(),
            params.get("stage").cloned(),
        );
        ctx.apigw_version = Some(ApiGatewayVersion::V1);
        ctx.set_invocation_path(params.get("path").map(String::as_str).unwrap_or(""));
        if let Some(request_id) = request.header_str(X_REQUEST_ID) {
            ctx.request_id = request_id.to_string();
        }

        if let RequestShape::TestInvoke(overrides) = &shape {
            apply_test_invoke(&mut ctx, overrides);
        }

        let api_id = ctx.api_id.clone().unwrap_or_default();
        let region = self
            .lookup
            .lookup_region(&api_id)
            .ok_or_else(|| GatewayError::ApiNotFound(api_id.clone()))?;
        ctx.region_name = Some(region);
        ctx.account_id = self.lookup.lookup_account(&api_id);

        if ctx.is_websocket_request() {
            ctx.connection_id = Some(uuid::Uuid::new_v4().simple().to_string());
        }

        tracing::debug!(
            request_id = %ctx.request_id,
            api_id = %api_id,
            stage = ctx.stage.as_deref().unwrap_or("-"),
            path = ctx.invocation_path().unwrap_or("/"),
            shape = ?shape,
            "Built invocation context"
        );
        Ok(ctx)
    }
}

fn apply_test_invoke(ctx: &mut InvocationContext<'_>, overrides: &TestInvokeOverrides) {
    if let Some(api_id) = &overrides.rest_api_id {
        ctx.api_id = Some(api_id.clone());
    }
    if let Some(method) = &overrides.http_method {
        match Method::from_bytes(method.to_uppercase().as_bytes()) {
            Ok(method) => ctx.set_method(method),
            Err(_) => tracing::debug!(method = %method, "Ignoring invalid test-invoke method"),
        }
    }
    if let Some(path) = overrides.path_with_query_string.as_deref().filter(|p| !p.is_empty()) {
        let invocation_path = path.split('?').next().unwrap_or(path);
        ctx.set_invocation_path(invocation_path);
        ctx.set_path_with_query_string(path);
    }
}

/// Append the peer address and host to `X-Forwarded-For` and record the URL
/// this request arrived on.
fn stamp_forwarding_headers(request: &mut GatewayRequest) {
    let mut chain: Vec<String> = request
        .headers()
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();
    if let Some(addr) = request.remote_addr() {
        chain.push(addr.ip().to_string());
    }
    let host = request.host().to_string();
    if !host.is_empty() {
        chain.push(host.clone());
    }

    if !chain.is_empty() {
        match HeaderValue::try_from(chain.join(", ")) {
            Ok(value) => {
                request.headers_mut().insert(X_FORWARDED_FOR, value);
            }
            Err(e) => tracing::warn!(error = %e, "Could not rewrite X-Forwarded-For"),
        }
    }

    if !host.is_empty() {
        let edge_url = request.host_url().trim_matches('/').to_string();
        if let Ok(value) = HeaderValue::try_from(edge_url) {
            request.headers_mut().insert(HEADER_EDGE_URL, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::registry::ApiRegistry;
    use crate::config::ApiConfig;
    use axum::body::Bytes;
    use axum::http::{header, HeaderMap};

    fn registry() -> ApiRegistry {
        let registry = ApiRegistry::new();
        registry.insert(ApiConfig::new("abc123", "us-east-1").with_account("000000000000"));
        registry
    }

    fn request(uri: &str, host: &str) -> GatewayRequest {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, host.parse().unwrap());
        GatewayRequest::new(Method::GET, uri.parse().unwrap(), headers, Bytes::new())
            .with_remote_addr("10.1.2.3:5555".parse().unwrap())
    }

    fn params(pairs: &[(&str, &str)]) -> Captures {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_build_host_based() {
        let registry = registry();
        let mut req = request("/prod/pets/1", "abc123.execute-api.localhost:4566");
        let params = params(&[("api_id", "abc123"), ("stage", "prod"), ("path", "pets/1"), ("server", "localhost:4566")]);
        let shape = RequestShape::from_params(&params);
        assert_eq!(shape, RequestShape::HostBased);

        let ctx = ContextBuilder::new(&registry).build(&mut req, &params, shape).unwrap();
        assert_eq!(ctx.api_id.as_deref(), Some("abc123"));
        assert_eq!(ctx.stage.as_deref(), Some("prod"));
        assert_eq!(ctx.invocation_path().unwrap(), "/pets/1");
        assert_eq!(ctx.region_name.as_deref(), Some("us-east-1"));
        assert_eq!(ctx.account_id.as_deref(), Some("000000000000"));
        assert!(ctx.is_v1());
        assert_eq!(ctx.domain_name(), "abc123.execute-api.localhost");
        assert_eq!(
            ctx.headers()[HEADER_EDGE_URL],
            "http://abc123.execute-api.localhost:4566"
        );
    }

    #[test]
    fn test_forwarded_for_chain_extended() {
        let registry = registry();
        let mut req = request("/restapis/abc123/dev/_user_request_", "localhost:4566");
        req.headers_mut().append(X_FORWARDED_FOR, "1.1.1.1".parse().unwrap());
        req.headers_mut().append(X_FORWARDED_FOR, "2.2.2.2".parse().unwrap());
        let params = params(&[("api_id", "abc123"), ("stage", "dev"), ("path", "")]);

        let ctx = ContextBuilder::new(&registry)
            .build(&mut req, &params, RequestShape::UserRequest)
            .unwrap();
        assert_eq!(ctx.invocation_path().unwrap(), "/");
        let chain: Vec<_> = ctx.headers().get_all(X_FORWARDED_FOR).iter().collect();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0], "1.1.1.1, 2.2.2.2, 10.1.2.3, localhost:4566");
    }

    #[test]
    fn test_unknown_api() {
        let registry = registry();
        let mut req = request("/prod/pets/1", "nope.execute-api.localhost");
        let params = params(&[("api_id", "nope"), ("stage", "prod"), ("path", "pets/1")]);
        let err = ContextBuilder::new(&registry)
            .build(&mut req, &params, RequestShape::HostBased)
            .err()
            .unwrap();
        assert!(matches!(err, GatewayError::ApiNotFound(id) if id == "nope"));
    }

    #[test]
    fn test_test_invoke_overrides() {
        let registry = registry();
        let overrides = TestInvokeOverrides::from_body(
            br#"{"restApiId":"abc123","httpMethod":"PUT","pathWithQueryString":"/pets/1?x=1"}"#,
        );
        let mut req = request("/restapis/abc123/resources/r1/methods/PUT", "localhost:4566");

        let ctx = ContextBuilder::new(&registry)
            .build(&mut req, &Captures::new(), RequestShape::TestInvoke(overrides))
            .unwrap();
        assert_eq!(ctx.api_id.as_deref(), Some("abc123"));
        assert_eq!(ctx.method(), Method::PUT);
        assert_eq!(ctx.invocation_path().unwrap(), "/pets/1");
        assert_eq!(ctx.path_with_query_string().unwrap(), "/pets/1?x=1");
    }

    #[test]
    fn test_malformed_test_invoke_payload() {
        assert_eq!(TestInvokeOverrides::from_body(b"{not json"), TestInvokeOverrides::default());
        assert_eq!(TestInvokeOverrides::from_body(b"[1, 2]"), TestInvokeOverrides::default());
        assert_eq!(TestInvokeOverrides::from_body(b""), TestInvokeOverrides::default());
    }

    #[test]
    fn test_websocket_gets_connection_id() {
        let registry = registry();
        let mut req = request("/prod/", "abc123.execute-api.localhost");
        req.headers_mut().insert(header::UPGRADE, "WebSocket".parse().unwrap());
        let params = params(&[("api_id", "abc123"), ("stage", "prod"), ("path", "")]);
        let ctx = ContextBuilder::new(&registry)
            .build(&mut req, &params, RequestShape::HostBased)
            .unwrap();
        assert!(ctx.is_websocket_request());
        assert!(ctx.connection_id.is_some());
    }
}
