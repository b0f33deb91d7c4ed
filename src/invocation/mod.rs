//! Invocation subsystem.
//!
//! # Data Flow
//! ```text
//! axum Request<Body>
//!     → request.rs (buffer body, keep headers/peer address)
//!     → builder.rs (stamp forwarding headers, resolve api/stage/path/region)
//!     → context.rs (InvocationContext consumed by integrations)
//! ```
//!
//! # Design Decisions
//! - One context per request, owned by the task handling it
//! - The context borrows the request; nothing outlives the response
//! - Addressing scheme (host, path alias, test invoke) resolved once, in the builder

pub mod builder;
pub mod context;
pub mod request;

pub use builder::{ContextBuilder, RequestShape, TestInvokeOverrides, X_FORWARDED_FOR};
pub use context::{ApiGatewayVersion, AuthInfo, InvocationContext, HEADER_EDGE_URL};
pub use request::{GatewayRequest, Payload};
