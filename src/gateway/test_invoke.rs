//! Test-invoke entry point.
//!
//! Simulates a call to a method of a REST API without going through URL
//! routing: the target API, method and path come from the JSON body
//! (`restApiId`, `httpMethod`, `pathWithQueryString`), falling back to the
//! variables captured from the control-plane URL.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    http::Method,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::GatewayError;
use crate::gateway::dispatch::Handler;
use crate::gateway::{ApiLookup, IntegrationInvoker, IntegrationResponse, RouteHandler};
use crate::invocation::{ContextBuilder, GatewayRequest, RequestShape, TestInvokeOverrides};
use crate::routing::{Captures, RouteError, RouteTable};

pub const TEST_INVOKE_PATH: &str = "/restapis/<api_id>/resources/<resource_id>/methods/<http_method>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestInvokeResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl From<IntegrationResponse> for TestInvokeResponse {
    fn from(response: IntegrationResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
            .collect();
        Self {
            status: response.status.as_u16(),
            headers,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }
    }
}

pub struct TestInvokeHandler {
    lookup: Arc<dyn ApiLookup>,
    invoker: Arc<dyn IntegrationInvoker>,
}

impl TestInvokeHandler {
    pub fn new(lookup: Arc<dyn ApiLookup>, invoker: Arc<dyn IntegrationInvoker>) -> Self {
        Self { lookup, invoker }
    }

    /// Register the control-plane test-invoke route. Must come after the user
    /// invocation routes so execute-api hosts keep precedence.
    pub fn register(self: &Arc<Self>, table: &mut RouteTable<Handler>) -> Result<(), RouteError> {
        table.register(None, TEST_INVOKE_PATH, self.clone(), &[])
    }

    pub fn test_invoke(
        &self,
        mut request: GatewayRequest,
        params: &Captures,
    ) -> Result<TestInvokeResponse, GatewayError> {
        if request.method() != Method::POST {
            return Err(GatewayError::MethodNotAllowed(request.method().to_string()));
        }

        let mut overrides = TestInvokeOverrides::from_body(&request.body_bytes());
        if overrides.rest_api_id.is_none() {
            overrides.rest_api_id = params.get("api_id").cloned();
        }
        if overrides.http_method.is_none() {
            overrides.http_method = params.get("http_method").cloned();
        }

        let mut ctx = ContextBuilder::new(self.lookup.as_ref()).build(
            &mut request,
            &Captures::new(),
            RequestShape::TestInvoke(overrides),
        )?;
        tracing::info!(
            request_id = %ctx.request_id,
            api_id = ctx.api_id.as_deref().unwrap_or("-"),
            method = %ctx.method(),
            path = ctx.invocation_path().unwrap_or("/"),
            "Test invoke"
        );

        let response = self.invoker.invoke(&mut ctx)?.ok_or(GatewayError::NotFound)?;
        Ok(response.into())
    }
}

impl RouteHandler for TestInvokeHandler {
    fn handle(&self, request: GatewayRequest, params: Captures) -> Result<Response, GatewayError> {
        let result = self.test_invoke(request, &params)?;
        Ok(Json(result).into_response())
    }
}
