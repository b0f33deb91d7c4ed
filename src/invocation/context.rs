//! Canonical per-request invocation context.
//!
//! # Responsibilities
//! - Hold the resolved target (API id, stage, region, paths, method)
//! - Hold configuration resolved by the integration layer (resource,
//!   integration, route, stage variables, auth result)
//! - Derive request facts on demand: domain, cookies, websocket upgrade,
//!   body text/base64, query parameters
//!
//! # Design Decisions
//! - Borrows the buffered request; the dispatcher owns it
//! - Derived accessors recompute on every call, nothing is cached
//! - Explicit overrides (method, path with query string) win over the request

use std::borrow::Cow;
use std::collections::BTreeMap;

use axum::http::{header, Method};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;
use crate::invocation::request::GatewayRequest;

/// Internal header carrying the edge URL the request arrived on. Preferred
/// over `Host` when extracting the domain name, since an edge proxy may
/// rewrite `Host`.
pub const HEADER_EDGE_URL: &str = "x-gateway-edge-url";

/// Key names under which an integration may store its target URI, in
/// lookup order.
const INTEGRATION_URI_KEYS: [&str; 2] = ["uri", "integrationUri"];

pub type JsonMap = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiGatewayVersion {
    V1,
    V2,
}

/// Result of authentication/authorization for one invocation.
#[derive(Debug, Clone, Default)]
pub struct AuthInfo {
    pub principal_id: Option<String>,
    pub authorizer_type: Option<String>,
    context: Option<JsonMap>,
    identity: Option<JsonMap>,
}

pub struct InvocationContext<'r> {
    request: &'r GatewayRequest,

    pub request_id: String,

    pub api_id: Option<String>,
    pub stage: Option<String>,
    pub account_id: Option<String>,
    pub region_name: Option<String>,

    /// Configured resource template, e.g. `/pets/{id}`.
    pub resource_path: Option<String>,
    invocation_path: Option<String>,
    path_with_query_string: Option<String>,
    method: Option<Method>,
    pub path_params: BTreeMap<String, String>,

    pub integration: Option<JsonMap>,
    pub resource: Option<JsonMap>,
    pub route: Option<JsonMap>,
    pub response_templates: JsonMap,
    pub stage_variables: BTreeMap<String, String>,
    pub auth_info: AuthInfo,

    pub connection_id: Option<String>,
    pub ws_route: Option<String>,
    pub apigw_version: Option<ApiGatewayVersion>,
}

impl<'r> InvocationContext<'r> {
    pub fn new(request: &'r GatewayRequest, api_id: Option<String>, stage: Option<String>) -> Self {
        Self {
            request,
            request_id: uuid::Uuid::new_v4().simple().to_string(),
            api_id,
            stage,
            account_id: None,
            region_name: None,
            resource_path: None,
            invocation_path: None,
            path_with_query_string: None,
            method: None,
            path_params: BTreeMap::new(),
            integration: None,
            resource: None,
            route: None,
            response_templates: JsonMap::new(),
            stage_variables: BTreeMap::new(),
            auth_info: AuthInfo::default(),
            connection_id: None,
            ws_route: None,
            apigw_version: None,
        }
    }

    pub fn request(&self) -> &'r GatewayRequest {
        self.request
    }

    pub fn headers(&self) -> &'r axum::http::HeaderMap {
        self.request.headers()
    }

    /// Set the concrete invoked path. A missing leading `/` is added, so an
    /// empty path becomes `/`.
    pub fn set_invocation_path(&mut self, path: &str) {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        self.invocation_path = Some(path);
    }

    pub fn invocation_path(&self) -> Result<&str, GatewayError> {
        self.invocation_path
            .as_deref()
            .ok_or(GatewayError::MissingInvocationPath)
    }

    /// Override the path with query string reported to integrations.
    pub fn set_path_with_query_string(&mut self, path: impl Into<String>) {
        self.path_with_query_string = Some(path.into());
    }

    /// The override if one was set, else the invocation path followed by the
    /// request's query string (the `?` is omitted when there is no query).
    pub fn path_with_query_string(&self) -> Result<Cow<'_, str>, GatewayError> {
        if let Some(path) = &self.path_with_query_string {
            return Ok(Cow::Borrowed(path));
        }
        let path = self.invocation_path()?;
        let query = self.request.query_string();
        if query.is_empty() {
            return Ok(Cow::Borrowed(path));
        }
        Ok(Cow::Owned(format!("{}?{}", path, query)))
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = Some(method);
    }

    /// The overriding method if set, else the HTTP method of the request.
    pub fn method(&self) -> &Method {
        self.method.as_ref().unwrap_or_else(|| self.request.method())
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.resource.as_ref()?.get("id")?.as_str()
    }

    pub fn integration_uri(&self) -> Option<&str> {
        let integration = self.integration.as_ref()?;
        INTEGRATION_URI_KEYS
            .iter()
            .filter_map(|key| integration.get(*key)?.as_str())
            .find(|uri| !uri.is_empty())
    }

    /// Authorizer context, created on first access. The principal id, when
    /// known, is mirrored into it on every call.
    pub fn auth_context(&mut self) -> &mut JsonMap {
        let auth = &mut self.auth_info;
        let context = auth.context.get_or_insert_with(JsonMap::new);
        if let Some(principal) = &auth.principal_id {
            context.insert("principalId".into(), Value::String(principal.clone()));
        }
        context
    }

    /// Caller identity, created on first access.
    pub fn auth_identity(&mut self) -> &mut JsonMap {
        self.auth_info.identity.get_or_insert_with(JsonMap::new)
    }

    pub fn authorizer_type(&self) -> Option<&str> {
        self.auth_info.authorizer_type.as_deref()
    }

    pub fn is_websocket_request(&self) -> bool {
        self.request
            .header_str(header::UPGRADE.as_str())
            .is_some_and(|value| value.eq_ignore_ascii_case("websocket"))
    }

    pub fn is_v1(&self) -> bool {
        self.apigw_version == Some(ApiGatewayVersion::V1)
    }

    pub fn cookies(&self) -> Vec<&'r str> {
        match self.request.header_str(header::COOKIE.as_str()) {
            Some(cookies) if !cookies.is_empty() => cookies.split(';').collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_body_base64_encoded(&self) -> bool {
        self.request.body_text().is_err()
    }

    /// Body as text, or the base64 encoding of the raw bytes when they are
    /// not valid UTF-8.
    pub fn body_as_string(&self) -> Cow<'r, str> {
        match self.request.body_text() {
            Ok(text) => text,
            Err(_) => Cow::Owned(STANDARD.encode(self.request.body_bytes())),
        }
    }

    /// Host the request was addressed to, without scheme, path or port.
    pub fn domain_name(&self) -> &'r str {
        let host = self
            .request
            .header_str(HEADER_EDGE_URL)
            .filter(|h| !h.is_empty())
            .or_else(|| self.request.header_str(header::HOST.as_str()))
            .unwrap_or("");
        let host = host.rsplit("://").next().unwrap_or(host);
        let host = host.split('/').next().unwrap_or(host);
        host.split(':').next().unwrap_or(host)
    }

    /// First label of the domain name (the API id for execute-api hosts).
    pub fn domain_prefix(&self) -> &'r str {
        let domain = self.domain_name();
        domain.split('.').next().unwrap_or(domain)
    }

    /// Query parameters of the actual request; the last value wins for
    /// repeated keys. Unaffected by a path-with-query-string override.
    pub fn query_params(&self) -> BTreeMap<String, String> {
        url::form_urlencoded::parse(self.request.query_string().as_bytes())
            .into_owned()
            .collect()
    }

    pub fn multi_value_query_params(&self) -> BTreeMap<String, Vec<String>> {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in url::form_urlencoded::parse(self.request.query_string().as_bytes()) {
            params.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::request::Payload;
    use axum::body::Bytes;
    use axum::http::HeaderMap;
    use serde_json::json;

    fn request_with(uri: &str, headers: &[(&str, &str)], body: &'static [u8]) -> GatewayRequest {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        GatewayRequest::new(Method::GET, uri.parse().unwrap(), map, Bytes::from_static(body))
    }

    #[test]
    fn test_domain_name_from_host() {
        let req = request_with("/", &[("host", "foo.execute-api.example.com")], b"");
        let ctx = InvocationContext::new(&req, None, None);
        assert_eq!(ctx.domain_name(), "foo.execute-api.example.com");
        assert_eq!(ctx.domain_prefix(), "foo");
    }

    #[test]
    fn test_edge_header_wins() {
        let req = request_with(
            "/",
            &[
                ("host", "foo.execute-api.example.com"),
                (HEADER_EDGE_URL, "http://bar.local/"),
            ],
            b"",
        );
        let ctx = InvocationContext::new(&req, None, None);
        assert_eq!(ctx.domain_name(), "bar.local");

        let req = request_with("/", &[(HEADER_EDGE_URL, "https://api1.execute-api.localhost:4566")], b"");
        let ctx = InvocationContext::new(&req, None, None);
        assert_eq!(ctx.domain_name(), "api1.execute-api.localhost");
        assert_eq!(ctx.domain_prefix(), "api1");
    }

    #[test]
    fn test_body_text_and_flag_agree() {
        let req = request_with("/", &[], b"{\"name\": \"rex\"}");
        let ctx = InvocationContext::new(&req, None, None);
        assert!(!ctx.is_body_base64_encoded());
        assert_eq!(ctx.body_as_string(), "{\"name\": \"rex\"}");

        let req = request_with("/", &[], &[0x89, 0x50, 0x4e, 0x47, 0xff]);
        let ctx = InvocationContext::new(&req, None, None);
        assert!(ctx.is_body_base64_encoded());
        assert_eq!(ctx.body_as_string(), STANDARD.encode([0x89, 0x50, 0x4e, 0x47, 0xff]));
    }

    #[test]
    fn test_structured_body_is_json_encoded() {
        let req = request_with("/", &[], b"")
            .with_payload(Payload::Structured(json!([{"id": 1}])));
        let ctx = InvocationContext::new(&req, None, None);
        assert!(!ctx.is_body_base64_encoded());
        assert_eq!(ctx.body_as_string(), r#"[{"id":1}]"#);
    }

    #[test]
    fn test_invocation_path_normalized() {
        let req = request_with("/", &[], b"");
        let mut ctx = InvocationContext::new(&req, None, None);
        assert!(matches!(ctx.invocation_path(), Err(GatewayError::MissingInvocationPath)));

        ctx.set_invocation_path("");
        assert_eq!(ctx.invocation_path().unwrap(), "/");
        ctx.set_invocation_path("pets/1");
        assert_eq!(ctx.invocation_path().unwrap(), "/pets/1");
        ctx.set_invocation_path("/pets/2");
        assert_eq!(ctx.invocation_path().unwrap(), "/pets/2");
    }

    #[test]
    fn test_query_params_follow_actual_request() {
        let req = request_with("/prod/pets?limit=10&tag=a&tag=b", &[], b"");
        let mut ctx = InvocationContext::new(&req, None, None);
        ctx.set_invocation_path("pets");
        assert_eq!(ctx.path_with_query_string().unwrap(), "/pets?limit=10&tag=a&tag=b");

        ctx.set_path_with_query_string("/pets?limit=99");
        assert_eq!(ctx.path_with_query_string().unwrap(), "/pets?limit=99");

        let params = ctx.query_params();
        assert_eq!(params["limit"], "10");
        assert_eq!(params["tag"], "b");
        assert_eq!(ctx.multi_value_query_params()["tag"], vec!["a", "b"]);
    }

    #[test]
    fn test_path_without_query() {
        let req = request_with("/prod/pets", &[], b"");
        let mut ctx = InvocationContext::new(&req, None, None);
        ctx.set_invocation_path("pets");
        assert_eq!(ctx.path_with_query_string().unwrap(), "/pets");
    }

    #[test]
    fn test_method_override() {
        let req = request_with("/", &[], b"");
        let mut ctx = InvocationContext::new(&req, None, None);
        assert_eq!(ctx.method(), Method::GET);
        ctx.set_method(Method::PUT);
        assert_eq!(ctx.method(), Method::PUT);
    }

    #[test]
    fn test_websocket_detection() {
        for value in ["websocket", "WebSocket", "WEBSOCKET"] {
            let req = request_with("/", &[("upgrade", value), ("connection", "keep-alive")], b"");
            assert!(InvocationContext::new(&req, None, None).is_websocket_request());
        }
        let req = request_with("/", &[("upgrade", "h2c")], b"");
        assert!(!InvocationContext::new(&req, None, None).is_websocket_request());
        let req = request_with("/", &[], b"");
        assert!(!InvocationContext::new(&req, None, None).is_websocket_request());
    }

    #[test]
    fn test_cookies() {
        let req = request_with("/", &[("cookie", "a=1; b=2")], b"");
        let ctx = InvocationContext::new(&req, None, None);
        assert_eq!(ctx.cookies(), vec!["a=1", " b=2"]);

        let req = request_with("/", &[], b"");
        assert!(InvocationContext::new(&req, None, None).cookies().is_empty());
    }

    #[test]
    fn test_resource_and_integration_uri() {
        let req = request_with("/", &[], b"");
        let mut ctx = InvocationContext::new(&req, None, None);
        assert_eq!(ctx.resource_id(), None);
        assert_eq!(ctx.integration_uri(), None);

        ctx.resource = json!({"id": "r1", "path": "/pets"}).as_object().cloned();
        assert_eq!(ctx.resource_id(), Some("r1"));

        ctx.integration = json!({"integrationUri": "arn:new"}).as_object().cloned();
        assert_eq!(ctx.integration_uri(), Some("arn:new"));
        ctx.integration = json!({"uri": "arn:old", "integrationUri": "arn:new"}).as_object().cloned();
        assert_eq!(ctx.integration_uri(), Some("arn:old"));
        ctx.integration = json!({"uri": "", "integrationUri": "arn:new"}).as_object().cloned();
        assert_eq!(ctx.integration_uri(), Some("arn:new"));
    }

    #[test]
    fn test_auth_context_mirrors_principal() {
        let req = request_with("/", &[], b"");
        let mut ctx = InvocationContext::new(&req, None, None);
        assert!(ctx.auth_context().is_empty());

        ctx.auth_info.principal_id = Some("user-1".into());
        ctx.auth_context().insert("scope".into(), json!("read"));
        let context = ctx.auth_context();
        assert_eq!(context["principalId"], "user-1");
        assert_eq!(context["scope"], "read");
        assert_eq!(context.len(), 2);

        ctx.auth_identity().insert("sourceIp".into(), json!("10.0.0.1"));
        assert_eq!(ctx.auth_identity()["sourceIp"], "10.0.0.1");
        assert_eq!(ctx.authorizer_type(), None);
    }

    #[test]
    fn test_is_v1() {
        let req = request_with("/", &[], b"");
        let mut ctx = InvocationContext::new(&req, None, None);
        assert!(!ctx.is_v1());
        ctx.apigw_version = Some(ApiGatewayVersion::V1);
        assert!(ctx.is_v1());
        ctx.apigw_version = Some(ApiGatewayVersion::V2);
        assert!(!ctx.is_v1());
    }
}
