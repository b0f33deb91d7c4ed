//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled (host template, path template) → handler bindings
//! - Look up matching binding for a (host, path) pair
//! - Return matched handler plus captured variables, or explicit no-match
//!
//! # Design Decisions
//! - Built once at startup, then shared immutably (thread-safe without locks)
//! - O(n) template scan (acceptable for typical route counts)
//! - First match wins, in registration order
//! - Bindings whose templates have the same shape are rejected at registration
//!
//! # Limitations
//! Only identical shapes count as a conflict. Templates that differ in shape
//! but still accept a common input (host-less `/<a>/<path:p>` and
//! `/restapis/<x>/<y>/_user_request_/<path:p>`) are both accepted, and the
//! earlier registration wins for the inputs they share. Callers registering
//! such pairs order them from most to least specific.

use std::fmt;

use crate::routing::matcher::{Captures, Template, TemplateError};

/// Error returned when a binding cannot be registered.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("route {host} {path} overlaps an existing binding")]
    Conflict { host: String, path: String },
}

/// A registered (host template, path template) → handler binding.
pub struct RouteBinding<H> {
    host: Option<Template>,
    path: Template,
    handler: H,
    defaults: Captures,
}

impl<H> RouteBinding<H> {
    pub fn host(&self) -> Option<&Template> {
        self.host.as_ref()
    }

    pub fn path(&self) -> &Template {
        &self.path
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    fn overlaps(&self, host: Option<&Template>, path: &Template) -> bool {
        let host_shape = |t: Option<&Template>| t.map(Template::shape);
        host_shape(self.host.as_ref()) == host_shape(host) && self.path.shape() == path.shape()
    }
}

impl<H> fmt::Debug for RouteBinding<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("host", &self.host.as_ref().map(Template::as_str))
            .field("path", &self.path.as_str())
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub handler: &'a H,
    /// Captured variables, with the binding's defaults filling absent keys.
    pub params: Captures,
}

/// Ordered set of route bindings.
pub struct RouteTable<H> {
    bindings: Vec<RouteBinding<H>>,
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self { bindings: Vec::new() }
    }

    /// Add a binding. A `None` host template matches every host.
    pub fn register(
        &mut self,
        host: Option<&str>,
        path: &str,
        handler: H,
        defaults: &[(&str, &str)],
    ) -> Result<(), RouteError> {
        let host = host.map(Template::host).transpose()?;
        let path = Template::path(path)?;

        if self.bindings.iter().any(|b| b.overlaps(host.as_ref(), &path)) {
            return Err(RouteError::Conflict {
                host: host.as_ref().map(|t| t.to_string()).unwrap_or_else(|| "*".into()),
                path: path.to_string(),
            });
        }

        tracing::debug!(
            host = host.as_ref().map(Template::as_str).unwrap_or("*"),
            path = %path,
            "Registered route"
        );

        self.bindings.push(RouteBinding {
            host,
            path,
            handler,
            defaults: defaults
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        Ok(())
    }

    /// Resolve a request host and path to the first matching binding.
    pub fn resolve(&self, host: &str, path: &str) -> Option<RouteMatch<'_, H>> {
        self.bindings.iter().find_map(|binding| {
            let mut params = match &binding.host {
                Some(template) => template.captures(host)?,
                None => Captures::new(),
            };
            params.extend(binding.path.captures(path)?);
            for (key, value) in &binding.defaults {
                params.entry(key.clone()).or_insert_with(|| value.clone());
            }
            Some(RouteMatch {
                handler: &binding.handler,
                params,
            })
        })
    }

    pub fn bindings(&self) -> &[RouteBinding<H>] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}
