//! User invocation routes and their dispatch.
//!
//! # Routes
//! ```text
//! <api_id>.execute-api.<server>  /                      (stage: none, path: "")
//! <api_id>.execute-api.<server>  /<stage>/              (path: "")
//! <api_id>.execute-api.<server>  /<stage>/<path>
//! *                              /restapis/<api_id>/<stage>/_user_request_        (path: "")
//! *                              /restapis/<api_id>/<stage>/_user_request_/<path>
//! ```
//!
//! # Design Decisions
//! - Registration is one-shot: repeated calls are a silent no-op
//! - Unknown APIs are rejected before any context is built

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::GatewayError;
use crate::gateway::{ApiLookup, IntegrationInvoker, IntegrationResponse, RouteHandler};
use crate::invocation::{ContextBuilder, GatewayRequest, RequestShape};
use crate::routing::{Captures, RouteError, RouteTable};

/// Host template for execute-api style invocations.
pub const EXECUTE_API_HOST: &str = "<api_id>.execute-api.<any:server>";

pub type Handler = Arc<dyn RouteHandler>;

pub struct ApigatewayRouter {
    lookup: Arc<dyn ApiLookup>,
    invoker: Arc<dyn IntegrationInvoker>,
    registered: AtomicBool,
}

impl ApigatewayRouter {
    pub fn new(lookup: Arc<dyn ApiLookup>, invoker: Arc<dyn IntegrationInvoker>) -> Self {
        Self {
            lookup,
            invoker,
            registered: AtomicBool::new(false),
        }
    }

    /// Register the parameterized user invocation routes into `table`.
    pub fn register_routes(self: &Arc<Self>, table: &mut RouteTable<Handler>) -> Result<(), RouteError> {
        if self.registered.swap(true, Ordering::SeqCst) {
            tracing::debug!("Skipped API gateway route registration (routes already registered)");
            return Ok(());
        }
        tracing::debug!("Registering parameterized API gateway routes");

        let handler: Handler = self.clone();
        let host = Some(EXECUTE_API_HOST);
        table.register(host, "/", handler.clone(), &[("path", "")])?;
        table.register(host, "/<stage>/", handler.clone(), &[("path", "")])?;
        table.register(host, "/<stage>/<path:path>", handler.clone(), &[])?;
        table.register(
            None,
            "/restapis/<api_id>/<stage>/_user_request_",
            handler.clone(),
            &[("path", "")],
        )?;
        table.register(
            None,
            "/restapis/<api_id>/<stage>/_user_request_/<path:path>",
            handler,
            &[],
        )?;
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    /// Invoke the REST API addressed by `params`.
    pub fn invoke_rest_api(
        &self,
        mut request: GatewayRequest,
        params: &Captures,
    ) -> Result<IntegrationResponse, GatewayError> {
        let api_id = params.get("api_id").map(String::as_str).unwrap_or("");
        if self.lookup.lookup_region(api_id).is_none() {
            tracing::debug!(api_id = %api_id, "No region configured for API");
            return Err(GatewayError::ApiNotFound(api_id.to_string()));
        }

        let shape = RequestShape::from_params(params);
        let mut ctx = ContextBuilder::new(self.lookup.as_ref()).build(&mut request, params, shape)?;

        match self.invoker.invoke(&mut ctx)? {
            Some(response) => Ok(response),
            None => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    api_id = %api_id,
                    method = %ctx.method(),
                    path = ctx.invocation_path().unwrap_or("/"),
                    "No resource or method matched"
                );
                Err(GatewayError::NotFound)
            }
        }
    }
}

impl RouteHandler for ApigatewayRouter {
    fn handle(&self, request: GatewayRequest, params: Captures) -> Result<Response, GatewayError> {
        match self.invoke_rest_api(request, &params) {
            Ok(response) => Ok(response.into_response()),
            Err(GatewayError::ApiNotFound(_)) => Ok(StatusCode::NOT_FOUND.into_response()),
            Err(e) => Err(e),
        }
    }
}
