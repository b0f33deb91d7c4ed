//! In-memory API registry.
//!
//! # Responsibilities
//! - Answer region/account lookups for configured APIs
//! - Resolve stage, resource and method for an invocation context
//! - Answer MOCK integrations with their configured static response
//!
//! # Design Decisions
//! - Concurrent map so APIs can be added or removed while serving
//! - Resource templates (`{id}`, `{proxy+}`) reuse the route template matcher
//! - Literal resource paths win over templated ones

use std::collections::BTreeMap;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use dashmap::DashMap;
use serde_json::Value;

use crate::config::{ApiConfig, MethodConfig, ResourceConfig};
use crate::error::GatewayError;
use crate::gateway::{ApiLookup, IntegrationInvoker, IntegrationResponse};
use crate::invocation::context::{InvocationContext, JsonMap};
use crate::routing::Template;

const ANY_METHOD: &str = "ANY";
const MOCK_INTEGRATION: &str = "MOCK";

#[derive(Debug, Default)]
pub struct ApiRegistry {
    apis: DashMap<String, ApiConfig>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(apis: impl IntoIterator<Item = ApiConfig>) -> Self {
        let registry = Self::new();
        for api in apis {
            registry.insert(api);
        }
        registry
    }

    /// Add or replace an API.
    pub fn insert(&self, api: ApiConfig) {
        tracing::debug!(api_id = %api.id, region = %api.region, "Registered API");
        self.apis.insert(api.id.clone(), api);
    }

    pub fn remove(&self, api_id: &str) -> Option<ApiConfig> {
        self.apis.remove(api_id).map(|(_, api)| api)
    }

    pub fn len(&self) -> usize {
        self.apis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }
}

impl ApiLookup for ApiRegistry {
    fn lookup_region(&self, api_id: &str) -> Option<String> {
        self.apis.get(api_id).map(|api| api.region.clone())
    }

    fn lookup_account(&self, api_id: &str) -> Option<String> {
        self.apis.get(api_id).and_then(|api| api.account_id.clone())
    }
}

impl IntegrationInvoker for ApiRegistry {
    fn invoke(
        &self,
        ctx: &mut InvocationContext<'_>,
    ) -> Result<Option<IntegrationResponse>, GatewayError> {
        let Some(api_id) = ctx.api_id.clone() else {
            return Ok(None);
        };
        // Clone out of the map so no shard lock is held during invocation.
        let Some(api) = self.apis.get(&api_id).map(|api| api.clone()) else {
            return Ok(None);
        };

        if let Some(stage) = &ctx.stage {
            if !api.stages.is_empty() {
                match api.stages.iter().find(|s| &s.name == stage) {
                    Some(config) => ctx.stage_variables = config.variables.clone(),
                    None => return Ok(None),
                }
            }
        }

        let path = ctx.invocation_path()?.to_string();
        let Some((resource, path_params)) = match_resource(&api.resources, &path) else {
            return Ok(None);
        };
        let method = ctx.method().as_str().to_string();
        let Some(method_config) = find_method(resource, &method) else {
            return Ok(None);
        };

        ctx.resource_path = Some(resource.path.clone());
        ctx.path_params = path_params;
        ctx.resource = Some(resource_json(resource));
        ctx.integration = to_json_map(&method_config.integration);

        let integration = &method_config.integration;
        if !integration.integration_type.eq_ignore_ascii_case(MOCK_INTEGRATION) {
            return Err(GatewayError::Integration(format!(
                "integration type '{}' is not supported by the in-memory registry",
                integration.integration_type
            )));
        }

        let status = StatusCode::from_u16(integration.status)
            .map_err(|e| GatewayError::Integration(e.to_string()))?;
        let mut response = IntegrationResponse::new(status, integration.body.clone());
        for (name, value) in &integration.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| GatewayError::Integration(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| GatewayError::Integration(e.to_string()))?;
            response.headers.insert(name, value);
        }

        tracing::debug!(
            request_id = %ctx.request_id,
            api_id = %api_id,
            resource_id = ctx.resource_id().unwrap_or("-"),
            method = %method,
            status = integration.status,
            "MOCK integration answered"
        );
        Ok(Some(response))
    }
}

/// Translate `/pets/{id}` style templates into route templates.
fn resource_template(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => match name.strip_suffix('+') {
                Some(greedy) => format!("<path:{}>", greedy),
                None => format!("<{}>", name),
            },
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn match_resource<'a>(
    resources: &'a [ResourceConfig],
    path: &str,
) -> Option<(&'a ResourceConfig, BTreeMap<String, String>)> {
    if let Some(exact) = resources.iter().find(|r| r.path == path) {
        return Some((exact, BTreeMap::new()));
    }
    resources.iter().find_map(|resource| {
        let template = match Template::path(&resource_template(&resource.path)) {
            Ok(template) => template,
            Err(e) => {
                tracing::warn!(resource = %resource.path, error = %e, "Invalid resource path");
                return None;
            }
        };
        template.captures(path).map(|params| (resource, params))
    })
}

fn find_method<'a>(resource: &'a ResourceConfig, method: &str) -> Option<&'a MethodConfig> {
    resource
        .methods
        .iter()
        .find(|m| m.http_method.eq_ignore_ascii_case(method))
        .or_else(|| {
            resource
                .methods
                .iter()
                .find(|m| m.http_method.eq_ignore_ascii_case(ANY_METHOD))
        })
}

fn resource_json(resource: &ResourceConfig) -> JsonMap {
    let mut map = JsonMap::new();
    map.insert("id".into(), Value::String(resource.id.clone()));
    map.insert("path".into(), Value::String(resource.path.clone()));
    map
}

fn to_json_map(value: &impl serde::Serialize) -> Option<JsonMap> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}
