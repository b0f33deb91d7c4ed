//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// REST APIs served by the built-in registry.
    pub apis: Vec<ApiConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4566").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4566".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum buffered request body in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A deployed REST API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API identifier (first label of the execute-api host).
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Region the API is deployed in.
    pub region: String,

    #[serde(default)]
    pub account_id: Option<String>,

    /// Deployed stages. When empty, any stage name is accepted.
    #[serde(default)]
    pub stages: Vec<StageConfig>,

    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

impl ApiConfig {
    pub fn new(id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            region: region.into(),
            account_id: None,
            stages: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_stage(mut self, stage: StageConfig) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn with_resource(mut self, resource: ResourceConfig) -> Self {
        self.resources.push(resource);
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    pub name: String,

    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl StageConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// A resource of a REST API, with its path template.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceConfig {
    pub id: String,

    /// Path template, e.g. `/pets/{id}` or `/files/{proxy+}`.
    pub path: String,

    #[serde(default)]
    pub methods: Vec<MethodConfig>,
}

impl ResourceConfig {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: MethodConfig) -> Self {
        self.methods.push(method);
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MethodConfig {
    /// HTTP method, or `ANY`.
    pub http_method: String,

    pub integration: IntegrationConfig,
}

impl MethodConfig {
    /// A method answered by a static MOCK integration.
    pub fn mock(http_method: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            http_method: http_method.into(),
            integration: IntegrationConfig {
                status,
                body: body.into(),
                ..IntegrationConfig::default()
            },
        }
    }
}

/// Backend integration of a method. Serialized in camelCase so the
/// invocation context sees the same keys as the API definition store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntegrationConfig {
    #[serde(rename = "type")]
    pub integration_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub integration_uri: Option<String>,

    /// Status code of the MOCK response.
    pub status: u16,

    pub headers: BTreeMap<String, String>,

    pub body: String,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            integration_type: "MOCK".to_string(),
            uri: None,
            integration_uri: None,
            status: 200,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }
}
