//! API gateway request normalization and routing library.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod invocation;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::{ApiLookup, ApiRegistry, IntegrationInvoker, IntegrationResponse};
pub use http::HttpServer;
pub use invocation::{GatewayRequest, InvocationContext};
pub use lifecycle::Shutdown;
