//! API gateway dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Route Table match (handler + captured variables)
//!     → dispatch.rs (API exists? build context, invoke integration)
//!     → test_invoke.rs (synthetic invocation described by a JSON body)
//!     → IntegrationInvoker (external: runs the backend integration)
//!     → IntegrationResponse, or 404
//! ```
//!
//! # Collaborators
//! - `ApiLookup`: API id → region (absence means the API does not exist)
//! - `IntegrationInvoker`: executes the resolved integration
//!
//! `registry.rs` provides an in-memory implementation of both, seeded from
//! configuration, answering with static MOCK integration responses.

pub mod dispatch;
pub mod registry;
pub mod test_invoke;

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::invocation::{GatewayRequest, InvocationContext};
use crate::routing::Captures;

pub use dispatch::ApigatewayRouter;
pub use registry::ApiRegistry;
pub use test_invoke::{TestInvokeHandler, TestInvokeResponse};

/// Resolves where a REST API lives.
pub trait ApiLookup: Send + Sync {
    /// Region of a known API, `None` if the API does not exist.
    fn lookup_region(&self, api_id: &str) -> Option<String>;

    /// Owning account of a known API.
    fn lookup_account(&self, _api_id: &str) -> Option<String> {
        None
    }
}

/// Executes the backend integration for a fully built context.
pub trait IntegrationInvoker: Send + Sync {
    /// `Ok(None)` means no resource/method of the (existing) API matched.
    fn invoke(
        &self,
        ctx: &mut InvocationContext<'_>,
    ) -> Result<Option<IntegrationResponse>, GatewayError>;
}

/// A handler bound into the Route Table.
pub trait RouteHandler: Send + Sync {
    fn handle(&self, request: GatewayRequest, params: Captures) -> Result<Response, GatewayError>;
}

/// Response produced by an integration.
#[derive(Debug, Clone)]
pub struct IntegrationResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntegrationResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

impl IntoResponse for IntegrationResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
