//! The installed mock layer: composed state plus interceptors.
//!
//! Dispatch order is fixed. Guard interceptors are consulted before route
//! interceptors, and within each stage the most recently registered
//! interceptor is consulted first. The first interceptor to respond wins;
//! passthrough resolutions continue the search. A request nobody answers
//! gets a 404 API error.

use regex::Regex;
use tracing::{debug, warn};

use crate::compose::ComposedMock;
use crate::interceptor::{Interceptor, MockRequest, MockResponse, RequestContext, Resolution, Stage};
use crate::state::MockState;

lazy_static::lazy_static! {
    /// API version prefix stripped before route matching.
    static ref VERSION_PREFIX: Regex = Regex::new(r"^/v4(beta)?(/|$)").unwrap();
}

/// Strip the API version prefix so routes can be written without it.
pub fn normalize_path(path: &str) -> String {
    let stripped = VERSION_PREFIX.replace(path, "/");
    if stripped.is_empty() {
        "/".to_string()
    } else {
        stripped.into_owned()
    }
}

/// A composed, dispatchable mock backend.
#[derive(Debug)]
pub struct MockLayer {
    state: MockState,
    interceptors: Vec<Interceptor>,
    preset_ids: Vec<String>,
    sequence: u64,
}

impl MockLayer {
    pub fn new(state: MockState, interceptors: Vec<Interceptor>, preset_ids: Vec<String>) -> Self {
        Self {
            state,
            interceptors,
            preset_ids,
            sequence: 0,
        }
    }

    pub fn state(&self) -> &MockState {
        &self.state
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    pub fn preset_ids(&self) -> &[String] {
        &self.preset_ids
    }

    /// Number of requests served so far.
    pub fn requests_served(&self) -> u64 {
        self.sequence
    }

    /// Serve one simulated request.
    pub fn dispatch(&mut self, mut request: MockRequest) -> MockResponse {
        self.sequence += 1;
        request.path = normalize_path(&request.path);
        let method = request.method;
        let path = request.path.clone();
        let mut ctx = RequestContext::new(request, self.sequence);

        for stage in [Stage::Guard, Stage::Route] {
            for interceptor in self.interceptors.iter().rev().filter(|i| i.stage == stage) {
                let Some(params) = interceptor.matches(method, &path) else {
                    continue;
                };
                ctx.params = params;

                match interceptor.resolve(&mut ctx, &mut self.state) {
                    Ok(Resolution::Respond(mut response)) => {
                        response.delay += ctx.delay;
                        debug!(
                            method = %method,
                            path = %path,
                            status = response.status,
                            route = interceptor.pattern.as_str(),
                            "mock request served"
                        );
                        return response;
                    }
                    Ok(Resolution::Passthrough) => continue,
                    Err(err) => {
                        warn!(method = %method, path = %path, error = %err, "mock handler failed");
                        let mut response = err.into_response();
                        response.delay += ctx.delay;
                        return response;
                    }
                }
            }
        }

        debug!(method = %method, path = %path, "no mock interceptor matched");
        let mut response = MockResponse::api_error(404, "Not found");
        response.delay += ctx.delay;
        response
    }

    /// Take the state back out of the layer.
    pub fn into_state(self) -> MockState {
        self.state
    }
}

impl From<ComposedMock> for MockLayer {
    fn from(composed: ComposedMock) -> Self {
        MockLayer::new(composed.state, composed.interceptors, composed.preset_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::{respond_ok, HandlerError};
    use serde_json::json;
    use std::time::Duration;

    fn layer(interceptors: Vec<Interceptor>) -> MockLayer {
        MockLayer::new(MockState::initialize(), interceptors, Vec::new())
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/v4/linode/instances"), "/linode/instances");
        assert_eq!(normalize_path("/v4beta/regions"), "/regions");
        assert_eq!(normalize_path("/v4"), "/");
        assert_eq!(normalize_path("/v4x/regions"), "/v4x/regions");
        assert_eq!(normalize_path("/profile"), "/profile");
    }

    #[test]
    fn test_last_registered_wins() {
        let mut layer = layer(vec![
            Interceptor::get("/profile", |_, _| respond_ok(&json!({"from": "first"}))),
            Interceptor::get("/profile", |_, _| respond_ok(&json!({"from": "second"}))),
        ]);
        let resp = layer.dispatch(MockRequest::get("/v4/profile"));
        assert_eq!(resp.body["from"], "second");
    }

    #[test]
    fn test_guard_precedes_routes() {
        let mut layer = layer(vec![
            Interceptor::all("*", |_, _| {
                Ok(Resolution::Respond(MockResponse::api_error(503, "down")))
            })
            .guard(),
            Interceptor::get("/profile", |_, _| respond_ok(&json!({}))),
        ]);
        let resp = layer.dispatch(MockRequest::get("/profile"));
        assert_eq!(resp.status, 503);
    }

    #[test]
    fn test_passthrough_accumulates_delay() {
        let mut layer = layer(vec![
            Interceptor::get("/profile", |_, _| respond_ok(&json!({"ok": true}))),
            Interceptor::all("*", |ctx, _| {
                ctx.delay += Duration::from_millis(250);
                Ok(Resolution::Passthrough)
            })
            .guard(),
        ]);
        let resp = layer.dispatch(MockRequest::get("/profile"));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.delay, Duration::from_millis(250));
    }

    #[test]
    fn test_unmatched_is_not_found() {
        let mut layer = layer(Vec::new());
        let resp = layer.dispatch(MockRequest::get("/nothing"));
        assert_eq!(resp.status, 404);
        assert_eq!(layer.requests_served(), 1);
    }

    #[test]
    fn test_handler_error_becomes_response() {
        let mut layer = layer(vec![Interceptor::get("/volumes/:id", |ctx, _| {
            let id = ctx.params.id("id")?;
            Err(HandlerError::Conflict(format!("volume {} is busy", id)))
        })]);
        let resp = layer.dispatch(MockRequest::get("/volumes/3"));
        assert_eq!(resp.status, 409);
        assert_eq!(resp.body["errors"][0]["reason"], "volume 3 is busy");
    }

    #[test]
    fn test_sequence_is_visible_to_resolvers() {
        let mut layer = layer(vec![Interceptor::get("/seq", |ctx, _| {
            respond_ok(&json!({ "sequence": ctx.sequence }))
        })]);
        layer.dispatch(MockRequest::get("/seq"));
        let resp = layer.dispatch(MockRequest::get("/seq"));
        assert_eq!(resp.body["sequence"], 2);
    }
}
