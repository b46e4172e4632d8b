//! Request interceptors and the simulated HTTP types they operate on.
//!
//! An [`Interceptor`] pairs a method and path pattern with a resolver. The
//! resolver receives the request context and mutable access to the mock
//! state, and either responds or passes the request through to the next
//! matching interceptor.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::state::MockState;

/// Default number of entries per page in list responses.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Largest page size the simulated API accepts.
pub const MAX_PAGE_SIZE: usize = 500;

/// HTTP methods understood by the mock layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(format!("unknown method: {}", s)),
        }
    }
}

/// A simulated outgoing API request.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    pub method: Method,
    /// Path without query string, e.g. `/v4/linode/instances/1`.
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub body: Value,
}

impl MockRequest {
    /// Build a request, splitting any `?key=value` query off the path.
    pub fn new(method: Method, path: &str) -> Self {
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p, parse_query(q)),
            None => (path, BTreeMap::new()),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            body: Value::Null,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &str, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn put(path: &str, body: Value) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    /// Requested page, 1-based.
    pub fn page(&self) -> usize {
        self.query
            .get("page")
            .and_then(|p| p.parse::<usize>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1)
    }

    /// Requested page size, clamped to the accepted range.
    pub fn page_size(&self) -> usize {
        self.query
            .get("page_size")
            .and_then(|p| p.parse::<usize>().ok())
            .map(|p| p.clamp(1, MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// A simulated API response.
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    /// HTTP status. Zero means the request never reached a server.
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    /// Simulated latency before the response is delivered.
    pub delay: Duration,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    /// Empty object body, as returned by successful deletes and actions.
    pub fn empty() -> Self {
        Self::json(200, json!({}))
    }

    /// Error body in the provider's `{ "errors": [...] }` envelope.
    pub fn api_error(status: u16, reason: &str) -> Self {
        Self::json(status, json!({ "errors": [{ "reason": reason }] }))
    }

    /// A request that failed before any response was received.
    pub fn network_error() -> Self {
        Self::json(0, Value::Null)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the response body.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }
}

/// Errors raised while serving a single simulated request.
///
/// These never escape the layer: each is turned into an API error response.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{0}")]
    NotFound(String),
    #[error("{reason}")]
    InvalidField { field: String, reason: String },
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn not_found(what: &str) -> Self {
        HandlerError::NotFound(format!("{} not found", what))
    }

    pub fn invalid_field(field: &str, reason: &str) -> Self {
        HandlerError::InvalidField {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            HandlerError::NotFound(_) => 404,
            HandlerError::InvalidField { .. } | HandlerError::BadRequest(_) => 400,
            HandlerError::Conflict(_) => 409,
            HandlerError::Internal(_) => 500,
        }
    }

    /// Render as an API error response.
    pub fn into_response(self) -> MockResponse {
        match &self {
            HandlerError::InvalidField { field, reason } => MockResponse::json(
                self.status(),
                json!({ "errors": [{ "field": field, "reason": reason }] }),
            ),
            _ => MockResponse::api_error(self.status(), &self.to_string()),
        }
    }
}

/// Outcome of a resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Respond(MockResponse),
    /// Defer to the next matching interceptor.
    Passthrough,
}

pub type HandlerResult = Result<Resolution, HandlerError>;

/// Serialize a value into a response with the given status.
pub fn respond<T: Serialize>(status: u16, value: &T) -> HandlerResult {
    let body = serde_json::to_value(value).map_err(anyhow::Error::from)?;
    Ok(Resolution::Respond(MockResponse::json(status, body)))
}

/// Serialize a value into a 200 response.
pub fn respond_ok<T: Serialize>(value: &T) -> HandlerResult {
    respond(200, value)
}

/// Serialize a slice into the provider's paginated list envelope.
pub fn paginate<T: Serialize>(items: &[T], request: &MockRequest) -> HandlerResult {
    let page_size = request.page_size();
    let pages = std::cmp::max(1, items.len().div_ceil(page_size));
    let page = std::cmp::min(request.page(), pages);
    let start = (page - 1) * page_size;
    let end = std::cmp::min(start + page_size, items.len());
    let data = items.get(start..end).unwrap_or(&[]);

    let body = json!({
        "data": serde_json::to_value(data).map_err(anyhow::Error::from)?,
        "page": page,
        "pages": pages,
        "results": items.len(),
    });
    Ok(Resolution::Respond(MockResponse::ok(body)))
}

/// Named parameters captured from the request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(BTreeMap<String, String>);

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Parse a numeric id parameter.
    pub fn id(&self, name: &str) -> Result<u64, HandlerError> {
        let raw = self
            .get(name)
            .ok_or_else(|| HandlerError::BadRequest(format!("missing path parameter {}", name)))?;
        raw.parse()
            .map_err(|_| HandlerError::NotFound(format!("invalid id {:?}", raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    /// Matches the remainder of the path, including nothing.
    Rest,
}

/// A route such as `/linode/instances/:id` or `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "*" {
                    Segment::Rest
                } else if let Some(name) = s.strip_prefix(':') {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a normalized path, returning captured parameters.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        let mut params = BTreeMap::new();

        for segment in &self.segments {
            match segment {
                Segment::Rest => return Some(PathParams(params)),
                Segment::Literal(lit) => {
                    if parts.next()? != lit {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    params.insert(name.clone(), parts.next()?.to_string());
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(PathParams(params))
    }
}

/// Per-request data visible to resolvers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request: MockRequest,
    /// Parameters captured by the interceptor currently resolving.
    pub params: PathParams,
    /// 1-based position of this request within the layer's lifetime.
    pub sequence: u64,
    /// Latency accumulated by passthrough interceptors.
    pub delay: Duration,
}

impl RequestContext {
    pub fn new(request: MockRequest, sequence: u64) -> Self {
        Self {
            request,
            params: PathParams::default(),
            sequence,
            delay: Duration::ZERO,
        }
    }

    /// Deserialize the request body, reporting failures as a bad request.
    pub fn body<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let body = match &self.request.body {
            Value::Null => json!({}),
            other => other.clone(),
        };
        serde_json::from_value(body)
            .map_err(|e| HandlerError::BadRequest(format!("invalid request body: {}", e)))
    }
}

/// Resolver signature shared by all interceptors.
pub type Resolver = Arc<dyn Fn(&mut RequestContext, &mut MockState) -> HandlerResult + Send + Sync>;

/// When an interceptor is consulted relative to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Consulted before any route, e.g. outages, rate limits, latency.
    Guard,
    /// Serves resources.
    Route,
}

/// A request interceptor produced by a mock handler.
#[derive(Clone)]
pub struct Interceptor {
    pub method: Option<Method>,
    pub pattern: PathPattern,
    pub stage: Stage,
    resolver: Resolver,
}

impl std::fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptor")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("stage", &self.stage)
            .finish()
    }
}

impl Interceptor {
    pub fn new<F>(method: Option<Method>, pattern: &str, resolver: F) -> Self
    where
        F: Fn(&mut RequestContext, &mut MockState) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            method,
            pattern: PathPattern::parse(pattern),
            stage: Stage::Route,
            resolver: Arc::new(resolver),
        }
    }

    pub fn get<F>(pattern: &str, resolver: F) -> Self
    where
        F: Fn(&mut RequestContext, &mut MockState) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(Some(Method::Get), pattern, resolver)
    }

    pub fn post<F>(pattern: &str, resolver: F) -> Self
    where
        F: Fn(&mut RequestContext, &mut MockState) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(Some(Method::Post), pattern, resolver)
    }

    pub fn put<F>(pattern: &str, resolver: F) -> Self
    where
        F: Fn(&mut RequestContext, &mut MockState) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(Some(Method::Put), pattern, resolver)
    }

    pub fn delete<F>(pattern: &str, resolver: F) -> Self
    where
        F: Fn(&mut RequestContext, &mut MockState) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(Some(Method::Delete), pattern, resolver)
    }

    /// Match any method.
    pub fn all<F>(pattern: &str, resolver: F) -> Self
    where
        F: Fn(&mut RequestContext, &mut MockState) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(None, pattern, resolver)
    }

    /// Move this interceptor to the guard stage.
    pub fn guard(mut self) -> Self {
        self.stage = Stage::Guard;
        self
    }

    /// Captured parameters when this interceptor applies to the request.
    pub fn matches(&self, method: Method, path: &str) -> Option<PathParams> {
        if let Some(m) = self.method {
            if m != method {
                return None;
            }
        }
        self.pattern.matches(path)
    }

    pub fn resolve(&self, ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
        (self.resolver)(ctx, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_splits_query() {
        let req = MockRequest::get("/v4/linode/instances?page=2&page_size=10");
        assert_eq!(req.path, "/v4/linode/instances");
        assert_eq!(req.page(), 2);
        assert_eq!(req.page_size(), 10);
    }

    #[test]
    fn test_page_size_is_clamped() {
        let req = MockRequest::get("/regions").with_query("page_size", "10000");
        assert_eq!(req.page_size(), MAX_PAGE_SIZE);
        let req = MockRequest::get("/regions").with_query("page", "0");
        assert_eq!(req.page(), 1);
    }

    #[test]
    fn test_pattern_params() {
        let pattern = PathPattern::parse("/domains/:id/records/:record_id");
        let params = pattern.matches("/domains/4/records/9").unwrap();
        assert_eq!(params.id("id").unwrap(), 4);
        assert_eq!(params.id("record_id").unwrap(), 9);

        assert!(pattern.matches("/domains/4/records").is_none());
        assert!(pattern.matches("/domains/4/records/9/extra").is_none());
    }

    #[test]
    fn test_pattern_wildcard() {
        let any = PathPattern::parse("*");
        assert!(any.matches("/linode/instances/1").is_some());
        assert!(any.matches("/").is_some());

        let nested = PathPattern::parse("/linode/*");
        assert!(nested.matches("/linode/instances").is_some());
        assert!(nested.matches("/domains").is_none());
    }

    #[test]
    fn test_invalid_id_is_not_found() {
        let params = PathPattern::parse("/volumes/:id").matches("/volumes/abc").unwrap();
        let err = params.id("id").unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn test_paginate_envelope() {
        let items: Vec<u32> = (1..=30).collect();
        let req = MockRequest::get("/things").with_query("page", "2");
        let Resolution::Respond(resp) = paginate(&items, &req).unwrap() else {
            panic!("expected response");
        };
        assert_eq!(resp.body["page"], 2);
        assert_eq!(resp.body["pages"], 2);
        assert_eq!(resp.body["results"], 30);
        assert_eq!(resp.body["data"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_paginate_empty_has_one_page() {
        let items: Vec<u32> = Vec::new();
        let req = MockRequest::get("/things");
        let Resolution::Respond(resp) = paginate(&items, &req).unwrap() else {
            panic!("expected response");
        };
        assert_eq!(resp.body["pages"], 1);
        assert_eq!(resp.body["data"], json!([]));
    }

    #[test]
    fn test_invalid_field_error_body() {
        let resp = HandlerError::invalid_field("label", "Label must be unique.").into_response();
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["errors"][0]["field"], "label");
    }

    #[test]
    fn test_method_matching() {
        let interceptor = Interceptor::get("/profile", |_, _| Ok(Resolution::Passthrough));
        assert!(interceptor.matches(Method::Get, "/profile").is_some());
        assert!(interceptor.matches(Method::Post, "/profile").is_none());

        let any = Interceptor::all("/profile", |_, _| Ok(Resolution::Passthrough));
        assert!(any.matches(Method::Delete, "/profile").is_some());
    }
}
