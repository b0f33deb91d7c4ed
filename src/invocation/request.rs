//! Buffered snapshot of an inbound HTTP request.
//!
//! # Responsibilities
//! - Buffer the body once (subject to the configured size limit)
//! - Keep method, URI, headers and peer address for context building
//! - Decide whether the body is text or binary
//!
//! # Design Decisions
//! - Headers stay mutable so the context builder can stamp routing metadata
//! - Routing sees the percent-decoded path; the URI keeps the raw one
//! - Text/binary is decided by one UTF-8 decode attempt, shared by all callers

use std::borrow::Cow;
use std::net::SocketAddr;
use std::str::Utf8Error;

use axum::{
    body::{Body, Bytes},
    extract::ConnectInfo,
    http::{header, HeaderMap, Method, Request, Uri},
};

use http_body_util::LengthLimitError;
use percent_encoding::percent_decode_str;

use crate::error::GatewayError;

/// Request payload, either raw bytes off the wire or an already parsed
/// JSON document.
#[derive(Debug, Clone)]
pub enum Payload {
    Raw(Bytes),
    Structured(serde_json::Value),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Raw(Bytes::new())
    }
}

#[derive(Debug, Clone)]
pub struct GatewayRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    payload: Payload,
    remote_addr: Option<SocketAddr>,
}

impl GatewayRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            uri,
            headers,
            payload: Payload::Raw(body.into()),
            remote_addr: None,
        }
    }

    /// Buffer an axum request. The peer address is taken from `ConnectInfo`
    /// when the server was started with it.
    pub async fn from_http(request: Request<Body>, limit: usize) -> Result<Self, GatewayError> {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0);
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| body_error(e, limit))?;

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            payload: Payload::Raw(body),
            remote_addr,
        })
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Path with percent-escapes decoded, as matched by the Route Table.
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn decoded_path(&self) -> Cow<'_, str> {
        percent_decode_str(self.uri.path()).decode_utf8_lossy()
    }

    /// Raw query string of the request URI, empty if absent.
    pub fn query_string(&self) -> &str {
        self.uri.query().unwrap_or("")
    }

    /// Host as sent by the client: the `Host` header, else the URI authority.
    pub fn host(&self) -> &str {
        self.headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
            .unwrap_or("")
    }

    /// Scheme and host with a trailing slash, e.g. `http://abc.execute-api.localhost/`.
    pub fn host_url(&self) -> String {
        let scheme = self.uri.scheme_str().unwrap_or("http");
        format!("{}://{}/", scheme, self.host())
    }

    /// First value of a header as text, if present and valid.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|h| h.to_str().ok())
    }

    /// Attempt to render the payload as text. Structured payloads are JSON
    /// encoded; raw bytes must be valid UTF-8.
    pub fn body_text(&self) -> Result<Cow<'_, str>, Utf8Error> {
        match &self.payload {
            Payload::Raw(bytes) => std::str::from_utf8(bytes).map(Cow::Borrowed),
            Payload::Structured(value) => Ok(Cow::Owned(value.to_string())),
        }
    }

    /// Payload bytes as they would be forwarded.
    pub fn body_bytes(&self) -> Cow<'_, [u8]> {
        match &self.payload {
            Payload::Raw(bytes) => Cow::Borrowed(bytes.as_ref()),
            Payload::Structured(value) => Cow::Owned(value.to_string().into_bytes()),
        }
    }
}

fn body_error(err: axum::Error, limit: usize) -> GatewayError {
    let inner = err.into_inner();
    if inner.is::<LengthLimitError>() {
        GatewayError::PayloadTooLarge(limit)
    } else {
        GatewayError::BodyRead(inner.to_string())
    }
}
