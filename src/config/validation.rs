//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse, status codes)
//! - Detect duplicate API ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use axum::http::Method;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::new("limits.max_body_size", "must be greater than 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    let mut seen = HashSet::new();
    for (i, api) in config.apis.iter().enumerate() {
        let prefix = format!("apis[{}]", i);
        if api.id.is_empty() || api.id.contains(['.', '/']) {
            errors.push(ValidationError::new(format!("{}.id", prefix), "must be a non-empty label"));
        } else if !seen.insert(api.id.as_str()) {
            errors.push(ValidationError::new(format!("{}.id", prefix), format!("duplicate API id '{}'", api.id)));
        }
        if api.region.is_empty() {
            errors.push(ValidationError::new(format!("{}.region", prefix), "must not be empty"));
        }

        for (j, resource) in api.resources.iter().enumerate() {
            let prefix = format!("{}.resources[{}]", prefix, j);
            if !resource.path.starts_with('/') {
                errors.push(ValidationError::new(format!("{}.path", prefix), "must start with '/'"));
            }
            for (k, method) in resource.methods.iter().enumerate() {
                let prefix = format!("{}.methods[{}]", prefix, k);
                if Method::from_bytes(method.http_method.as_bytes()).is_err() {
                    errors.push(ValidationError::new(format!("{}.http_method", prefix), "not an HTTP method"));
                }
                if !(100..=599).contains(&method.integration.status) {
                    errors.push(ValidationError::new(
                        format!("{}.integration.status", prefix),
                        "must be between 100 and 599",
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
