//! Handlers for extra presets.
//!
//! Extras are layered on top of a baseline, so their route interceptors
//! take precedence over the baseline's. Limit and latency extras are
//! guards because they must apply ahead of crud routes too.

use std::time::Duration;

use crate::interceptor::{paginate, respond_ok, HandlerError, Interceptor, Resolution};
use crate::state::{factories, MockState};

/// Latency added by `api:response-time`.
pub const RESPONSE_TIME: Duration = Duration::from_millis(400);

pub fn managed_enabled(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::get("/account/settings", |_, _| {
        respond_ok(&factories::account_settings(true))
    })]
}

pub fn managed_disabled(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::get("/account/settings", |_, _| {
        respond_ok(&factories::account_settings(false))
    })]
}

pub fn custom_account(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::get("/account", |_, state| {
        match &state.custom_account {
            Some(account) => respond_ok(account),
            None => respond_ok(&factories::account()),
        }
    })]
}

pub fn custom_profile(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::get("/profile", |_, state| {
        match &state.custom_profile {
            Some(profile) => respond_ok(profile),
            None => respond_ok(&factories::profile()),
        }
    })]
}

pub fn response_time(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::all("*", |ctx, _| {
        ctx.delay += RESPONSE_TIME;
        Ok(Resolution::Passthrough)
    })
    .guard()]
}

pub fn linode_limits(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::post("/linode/instances", |_, _| {
        Err(HandlerError::BadRequest(
            "Account Limit reached. Please open a support ticket.".to_string(),
        ))
    })
    .guard()]
}

pub fn lke_limits(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::post("/lke/clusters", |_, _| {
        Err(HandlerError::BadRequest(
            "Cluster limit reached. Please open a support ticket.".to_string(),
        ))
    })
    .guard()]
}

pub fn core_regions(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::get("/regions", |ctx, _| {
        paginate(&factories::core_regions(), &ctx.request)
    })]
}

pub fn core_and_distributed_regions(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::get("/regions", |ctx, _| {
        let mut regions = factories::core_regions();
        regions.extend(factories::distributed_regions());
        paginate(&regions, &ctx.request)
    })]
}

pub fn legacy_regions(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::get("/regions", |ctx, _| {
        paginate(&factories::legacy_regions(), &ctx.request)
    })]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::MockRequest;
    use crate::layer::MockLayer;
    use crate::preset::baseline;
    use serde_json::json;

    fn layer_with(state: MockState, handlers: &[crate::preset::MockHandler]) -> MockLayer {
        let interceptors = handlers.iter().flat_map(|h| h(&state)).collect();
        MockLayer::new(state, interceptors, Vec::new())
    }

    #[test]
    fn test_managed_overrides_baseline_settings() {
        let mut layer = layer_with(
            MockState::initialize(),
            &[baseline::crud_handlers, managed_enabled],
        );
        let resp = layer.dispatch(MockRequest::get("/account/settings"));
        assert_eq!(resp.body["managed"], true);
    }

    #[test]
    fn test_custom_profile_uses_state_payload() {
        let mut state = MockState::initialize();
        state.custom_profile = Some(json!({"username": "custom-user"}));
        let mut layer = layer_with(state, &[baseline::crud_handlers, custom_profile]);
        let resp = layer.dispatch(MockRequest::get("/profile"));
        assert_eq!(resp.body["username"], "custom-user");
    }

    #[test]
    fn test_custom_account_falls_back_to_fixture() {
        let mut layer = layer_with(MockState::initialize(), &[custom_account]);
        let resp = layer.dispatch(MockRequest::get("/account"));
        assert_eq!(resp.body["company"], "Example Co");
    }

    #[test]
    fn test_response_time_delays_responses() {
        let mut layer = layer_with(
            MockState::initialize(),
            &[baseline::crud_handlers, response_time],
        );
        let resp = layer.dispatch(MockRequest::get("/profile"));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.delay, RESPONSE_TIME);
    }

    #[test]
    fn test_linode_limits_reject_creation() {
        let mut layer = layer_with(MockState::initialize(), &[linode_limits]);
        let resp = layer.dispatch(MockRequest::post("/linode/instances", json!({})));
        assert_eq!(resp.status, 400);
        let resp = layer.dispatch(MockRequest::post("/lke/clusters", json!({})));
        assert_eq!(resp.status, 404);
    }

    #[test]
    fn test_distributed_regions_included() {
        let mut layer = layer_with(MockState::initialize(), &[core_and_distributed_regions]);
        let resp = layer.dispatch(MockRequest::get("/regions"));
        let expected = factories::core_regions().len() + factories::distributed_regions().len();
        assert_eq!(resp.body["results"], json!(expected));
    }
}
