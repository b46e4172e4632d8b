//! Handlers for baseline presets.
//!
//! `crud_handlers` serves account-level endpoints from the mock state. The
//! API state baselines install guard interceptors that answer every request
//! before any route is consulted.

use serde_json::{json, Value};

use crate::interceptor::{
    paginate, respond_ok, HandlerError, HandlerResult, Interceptor, Method, MockResponse,
    RequestContext, Resolution,
};
use crate::state::{factories, MockState, Region, RegionAvailability};

/// Every Nth request fails under `baseline:api-unstable`.
pub const UNSTABLE_FAILURE_INTERVAL: u64 = 3;

/// Header set on maintenance responses.
pub const MAINTENANCE_HEADER: &str = "X-Maintenance-Mode";

/// Account-level endpoints backed by the mock state.
pub fn crud_handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![
        Interceptor::get("/profile", |_, _| respond_ok(&factories::profile())),
        Interceptor::get("/account", |_, _| respond_ok(&factories::account())),
        Interceptor::get("/account/settings", |_, _| {
            respond_ok(&factories::account_settings(false))
        }),
        Interceptor::get("/regions", |ctx, state| {
            paginate(&listed_regions(state), &ctx.request)
        }),
        Interceptor::get("/regions/availability", |ctx, state| {
            paginate(&availability(state), &ctx.request)
        }),
        Interceptor::get("/regions/:id/availability", region_availability),
        Interceptor::get("/account/notifications", |ctx, state| {
            paginate(&state.notification_queue, &ctx.request)
        }),
        Interceptor::get("/account/events", list_events),
        Interceptor::post("/account/events/:id/seen", mark_events_seen),
        Interceptor::get("/networking/firewalls", |ctx, state| {
            paginate(&state.firewalls, &ctx.request)
        }),
        Interceptor::get("/networking/firewalls/:id", |ctx, state| {
            let id = ctx.params.id("id")?;
            let firewall = state
                .firewalls
                .iter()
                .find(|f| f.id == id)
                .ok_or_else(|| HandlerError::not_found("Firewall"))?;
            respond_ok(firewall)
        }),
    ]
}

/// Regions in state, or the core fixtures when none were stored.
fn listed_regions(state: &MockState) -> Vec<Region> {
    if state.regions.is_empty() {
        factories::core_regions()
    } else {
        state.regions.clone()
    }
}

/// Stored availability, or fixture availability for the listed regions.
fn availability(state: &MockState) -> Vec<RegionAvailability> {
    if state.region_availability.is_empty() {
        listed_regions(state)
            .iter()
            .flat_map(factories::region_availability)
            .collect()
    } else {
        state.region_availability.clone()
    }
}

fn region_availability(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let region = ctx
        .params
        .get("id")
        .ok_or_else(|| HandlerError::BadRequest("missing region".to_string()))?
        .to_string();
    let entries: Vec<_> = availability(state)
        .into_iter()
        .filter(|a| a.region == region)
        .collect();
    if entries.is_empty() {
        return Err(HandlerError::not_found("Region"));
    }
    respond_ok(&entries)
}

/// Events newest first.
fn list_events(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let mut events = state.event_queue.clone();
    events.sort_by(|a, b| b.id.cmp(&a.id));
    paginate(&events, &ctx.request)
}

/// Mark an event and every older event as seen.
fn mark_events_seen(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    if !state.event_queue.iter().any(|e| e.id == id) {
        return Err(HandlerError::not_found("Event"));
    }
    for event in state.event_queue.iter_mut().filter(|e| e.id <= id) {
        event.seen = true;
    }
    Ok(Resolution::Respond(MockResponse::empty()))
}

/// Fixture responses that ignore the mock state.
///
/// Writes echo the request body back with an id and are not persisted.
pub fn static_handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![
        Interceptor::new(Some(Method::Post), "*", echo_write),
        Interceptor::new(Some(Method::Put), "*", echo_write),
        Interceptor::delete("*", |_, _| Ok(Resolution::Respond(MockResponse::empty()))),
        Interceptor::get("/profile", |_, _| respond_ok(&factories::profile())),
        Interceptor::get("/account", |_, _| respond_ok(&factories::account())),
        Interceptor::get("/account/settings", |_, _| {
            respond_ok(&factories::account_settings(false))
        }),
        Interceptor::get("/regions", |ctx, _| {
            paginate(&factories::core_regions(), &ctx.request)
        }),
        Interceptor::get("/linode/instances", |ctx, _| {
            let linodes: Vec<_> = (1..=3)
                .map(|id| factories::linode(id, factories::DEFAULT_REGION))
                .collect();
            paginate(&linodes, &ctx.request)
        }),
        Interceptor::get("/linode/instances/:id", |ctx, _| {
            let id = ctx.params.id("id")?;
            respond_ok(&factories::linode(id, factories::DEFAULT_REGION))
        }),
        Interceptor::get("/domains", |ctx, _| {
            let domains: Vec<_> = (1..=3).map(factories::domain).collect();
            paginate(&domains, &ctx.request)
        }),
        Interceptor::get("/volumes", |ctx, _| {
            let volumes: Vec<_> = (1..=3)
                .map(|id| factories::volume(id, factories::DEFAULT_REGION, None))
                .collect();
            paginate(&volumes, &ctx.request)
        }),
        Interceptor::get("/networking/firewalls", |ctx, _| {
            let firewalls: Vec<_> = (1..=2).map(factories::firewall).collect();
            paginate(&firewalls, &ctx.request)
        }),
        Interceptor::get("/account/events", |ctx, _| {
            let events: Vec<Value> = Vec::new();
            paginate(&events, &ctx.request)
        }),
        Interceptor::get("/account/notifications", |ctx, _| {
            let notifications: Vec<Value> = Vec::new();
            paginate(&notifications, &ctx.request)
        }),
    ]
}

fn echo_write(ctx: &mut RequestContext, _state: &mut MockState) -> HandlerResult {
    let mut body = match &ctx.request.body {
        Value::Object(map) => Value::Object(map.clone()),
        _ => json!({}),
    };
    if let Some(map) = body.as_object_mut() {
        map.entry("id").or_insert(json!(1));
    }
    respond_ok(&body)
}

/// Legacy region catalogue layered over the static fixtures.
pub fn legacy_handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::get("/regions", |ctx, _| {
        paginate(&factories::legacy_regions(), &ctx.request)
    })]
}

pub fn account_activation_handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::all("*", |_, _| {
        Ok(Resolution::Respond(MockResponse::api_error(
            403,
            "Your account must be activated before you can use this endpoint",
        )))
    })
    .guard()]
}

pub fn api_maintenance_handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::all("*", |_, _| {
        Ok(Resolution::Respond(
            MockResponse::api_error(503, "Currently in maintenance mode.")
                .with_header(MAINTENANCE_HEADER, "all,All endpoints are temporarily down"),
        ))
    })
    .guard()]
}

pub fn api_offline_handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::all("*", |_, _| {
        Ok(Resolution::Respond(MockResponse::network_error()))
    })
    .guard()]
}

/// Fail every third request; let the rest through.
pub fn api_unstable_handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![Interceptor::all("*", |ctx, _| {
        if ctx.sequence % UNSTABLE_FAILURE_INTERVAL == 0 {
            return Ok(Resolution::Respond(MockResponse::api_error(
                500,
                "An unexpected error occurred.",
            )));
        }
        Ok(Resolution::Passthrough)
    })
    .guard()]
}
