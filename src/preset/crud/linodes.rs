//! Linodes crud preset: instances, configs and power actions.

use serde::Deserialize;
use tracing::debug;

use super::{validate_label, LabelUpdate};
use crate::interceptor::{
    paginate, respond, respond_ok, HandlerError, HandlerResult, Interceptor, MockResponse,
    RequestContext, Resolution,
};
use crate::preset::{SeedFuture, SeedOptions};
use crate::state::{factories, Collection, Config, Linode, LinodeStatus, MockState};

/// Label of the config every seeded linode boots from.
pub const DEFAULT_CONFIG_LABEL: &str = "My Debian 12 Profile";

/// Add `options.count` linodes, each with one boot config.
pub fn seed(state: MockState, options: SeedOptions) -> SeedFuture {
    Box::pin(async move { Ok::<_, anyhow::Error>(seed_linodes(state, options.count)) })
}

fn seed_linodes(mut state: MockState, count: u32) -> MockState {
    let first = state.next_id(Collection::Linodes);
    let first_config = state.next_id(Collection::LinodeConfigs);
    for offset in 0..u64::from(count) {
        let id = first + offset;
        let config_id = first_config + offset;
        state.linodes.push(factories::linode(id, factories::DEFAULT_REGION));
        state
            .linode_configs
            .push((id, factories::linode_config(config_id, DEFAULT_CONFIG_LABEL)));
    }
    debug!(count, total = state.linodes.len(), "seeded linodes");
    state
}

#[derive(Debug, Clone, Copy)]
enum PowerAction {
    Boot,
    Reboot,
    Shutdown,
}

impl PowerAction {
    fn event(&self) -> &'static str {
        match self {
            PowerAction::Boot => "linode_boot",
            PowerAction::Reboot => "linode_reboot",
            PowerAction::Shutdown => "linode_shutdown",
        }
    }

    fn resulting_status(&self) -> LinodeStatus {
        match self {
            PowerAction::Boot | PowerAction::Reboot => LinodeStatus::Running,
            PowerAction::Shutdown => LinodeStatus::Offline,
        }
    }
}

pub fn handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![
        Interceptor::get("/linode/instances", |ctx, state| {
            paginate(&state.linodes, &ctx.request)
        }),
        Interceptor::get("/linode/instances/:id", |ctx, state| {
            let id = ctx.params.id("id")?;
            respond_ok(find(state, id)?)
        }),
        Interceptor::post("/linode/instances", create_linode),
        Interceptor::put("/linode/instances/:id", update_linode),
        Interceptor::delete("/linode/instances/:id", delete_linode),
        Interceptor::post("/linode/instances/:id/boot", |ctx, state| {
            power(ctx, state, PowerAction::Boot)
        }),
        Interceptor::post("/linode/instances/:id/reboot", |ctx, state| {
            power(ctx, state, PowerAction::Reboot)
        }),
        Interceptor::post("/linode/instances/:id/shutdown", |ctx, state| {
            power(ctx, state, PowerAction::Shutdown)
        }),
        Interceptor::get("/linode/instances/:id/configs", |ctx, state| {
            let id = ctx.params.id("id")?;
            find(state, id)?;
            let configs: Vec<Config> = state
                .linode_configs
                .iter()
                .filter(|(linode_id, _)| *linode_id == id)
                .map(|(_, config)| config.clone())
                .collect();
            paginate(&configs, &ctx.request)
        }),
        Interceptor::get("/linode/instances/:id/configs/:config_id", |ctx, state| {
            let id = ctx.params.id("id")?;
            let config_id = ctx.params.id("config_id")?;
            let config = state
                .linode_configs
                .iter()
                .find(|(linode_id, c)| *linode_id == id && c.id == config_id)
                .map(|(_, c)| c)
                .ok_or_else(|| HandlerError::not_found("Config"))?;
            respond_ok(config)
        }),
        Interceptor::post("/linode/instances/:id/configs", create_config),
        Interceptor::delete("/linode/instances/:id/configs/:config_id", delete_config),
    ]
}

fn find(state: &MockState, id: u64) -> Result<&Linode, HandlerError> {
    state.linode(id).ok_or_else(|| HandlerError::not_found("Linode"))
}

#[derive(Debug, Deserialize)]
struct CreateLinode {
    label: Option<String>,
    region: Option<String>,
    #[serde(rename = "type")]
    plan: Option<String>,
    image: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn create_linode(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let body: CreateLinode = ctx.body()?;
    let region = body
        .region
        .ok_or_else(|| HandlerError::invalid_field("region", "Region is required."))?;
    let plan = body
        .plan
        .ok_or_else(|| HandlerError::invalid_field("type", "A Linode plan is required."))?;

    let id = state.next_id(Collection::Linodes);
    let label = body.label.unwrap_or_else(|| format!("linode{}", id));
    validate_label(&label)?;
    if state.linodes.iter().any(|l| l.label == label) {
        return Err(HandlerError::invalid_field("label", "Label must be unique."));
    }

    let now = factories::now_timestamp();
    let linode = Linode {
        label,
        region,
        plan,
        image: body.image,
        status: LinodeStatus::Provisioning,
        tags: body.tags,
        created: now.clone(),
        updated: now,
        ..factories::linode(id, factories::DEFAULT_REGION)
    };

    let config_id = state.next_id(Collection::LinodeConfigs);
    let mut config = factories::linode_config(config_id, DEFAULT_CONFIG_LABEL);
    config.created = linode.created.clone();
    config.updated = linode.created.clone();
    state.linode_configs.push((id, config));

    state.push_event("linode_create", Some(factories::linode_ref(&linode)));
    state.linodes.push(linode.clone());
    respond_ok(&linode)
}

fn update_linode(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let body: LabelUpdate = ctx.body()?;

    if let Some(label) = &body.label {
        validate_label(label)?;
        if state.linodes.iter().any(|l| l.id != id && &l.label == label) {
            return Err(HandlerError::invalid_field("label", "Label must be unique."));
        }
    }

    let linode = state
        .linode_mut(id)
        .ok_or_else(|| HandlerError::not_found("Linode"))?;
    if let Some(label) = body.label {
        linode.label = label;
    }
    if let Some(tags) = body.tags {
        linode.tags = tags;
    }
    linode.updated = factories::now_timestamp();
    let updated = linode.clone();

    // Keep denormalized labels in sync.
    for volume in state.volumes.iter_mut().filter(|v| v.linode_id == Some(id)) {
        volume.linode_label = Some(updated.label.clone());
    }
    state.push_event("linode_update", Some(factories::linode_ref(&updated)));
    respond_ok(&updated)
}

fn delete_linode(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let removed = state
        .remove_linode(id)
        .ok_or_else(|| HandlerError::not_found("Linode"))?;
    state.push_event("linode_delete", Some(factories::linode_ref(&removed)));
    Ok(Resolution::Respond(MockResponse::empty()))
}

fn power(ctx: &mut RequestContext, state: &mut MockState, action: PowerAction) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let linode = state
        .linode_mut(id)
        .ok_or_else(|| HandlerError::not_found("Linode"))?;

    match (action, linode.status) {
        (PowerAction::Boot, LinodeStatus::Running) => {
            return Err(HandlerError::BadRequest("Linode is already running.".to_string()));
        }
        (PowerAction::Shutdown, LinodeStatus::Offline) => {
            return Err(HandlerError::BadRequest("Linode is already offline.".to_string()));
        }
        _ => {}
    }

    linode.status = action.resulting_status();
    linode.updated = factories::now_timestamp();
    let entity = factories::linode_ref(linode);
    state.push_event(action.event(), Some(entity));
    Ok(Resolution::Respond(MockResponse::empty()))
}

#[derive(Debug, Deserialize)]
struct CreateConfig {
    label: Option<String>,
    kernel: Option<String>,
    root_device: Option<String>,
    memory_limit: Option<u32>,
}

fn create_config(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    find(state, id)?;
    let body: CreateConfig = ctx.body()?;
    let label = body
        .label
        .ok_or_else(|| HandlerError::invalid_field("label", "Label is required."))?;

    let config_id = state.next_id(Collection::LinodeConfigs);
    let now = factories::now_timestamp();
    let defaults = factories::linode_config(config_id, &label);
    let config = Config {
        kernel: body.kernel.unwrap_or(defaults.kernel.clone()),
        root_device: body.root_device.unwrap_or(defaults.root_device.clone()),
        memory_limit: body.memory_limit.unwrap_or(defaults.memory_limit),
        created: now.clone(),
        updated: now,
        ..defaults
    };
    state.linode_configs.push((id, config.clone()));
    respond(200, &config)
}

fn delete_config(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let config_id = ctx.params.id("config_id")?;
    let before = state.linode_configs.len();
    state
        .linode_configs
        .retain(|(linode_id, c)| !(*linode_id == id && c.id == config_id));
    if state.linode_configs.len() == before {
        return Err(HandlerError::not_found("Config"));
    }
    Ok(Resolution::Respond(MockResponse::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::MockRequest;
    use crate::layer::MockLayer;
    use serde_json::json;

    fn layer(count: u32) -> MockLayer {
        let state = seed_linodes(MockState::initialize(), count);
        let interceptors = handlers(&state);
        MockLayer::new(state, interceptors, Vec::new())
    }

    #[tokio::test]
    async fn test_seed_count_and_configs() {
        let state = seed(MockState::initialize(), SeedOptions { count: 4 })
            .await
            .unwrap();
        assert_eq!(state.linodes.len(), 4);
        assert_eq!(state.linode_configs.len(), 4);
        assert!(state.orphans().is_empty());
        assert!(state.duplicate_ids().is_empty());
    }

    #[test]
    fn test_seed_extends_existing_linodes() {
        let state = seed_linodes(seed_linodes(MockState::initialize(), 2), 3);
        let ids: Vec<u64> = state.linodes.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_seed_large_count() {
        let state = seed_linodes(MockState::initialize(), 20_000);
        assert_eq!(state.linodes.len(), 20_000);
        assert_eq!(state.linodes.last().unwrap().id, 20_000);
        assert_eq!(state.linode_configs.last().unwrap().1.id, 20_000);
        assert!(state.duplicate_ids().is_empty());

        let addresses: std::collections::HashSet<&str> = state
            .linodes
            .iter()
            .map(|l| l.ipv4[0].as_str())
            .collect();
        assert_eq!(addresses.len(), 20_000);
    }

    #[test]
    fn test_create_linode_persists_and_emits_event() {
        let mut layer = layer(1);
        let resp = layer.dispatch(MockRequest::post(
            "/v4/linode/instances",
            json!({"label": "web-01", "region": "eu-west", "type": "g6-nanode-1"}),
        ));
        assert_eq!(resp.status, 200, "{:?}", resp.body);
        assert_eq!(resp.body["id"], 2);
        assert_eq!(resp.body["region"], "eu-west");

        let state = layer.state();
        assert_eq!(state.linodes.len(), 2);
        assert_eq!(state.linode_configs.len(), 2);
        assert_eq!(state.event_queue[0].action, "linode_create");
    }

    #[test]
    fn test_create_linode_requires_region() {
        let mut layer = layer(0);
        let resp = layer.dispatch(MockRequest::post(
            "/linode/instances",
            json!({"type": "g6-nanode-1"}),
        ));
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["errors"][0]["field"], "region");
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut layer = layer(1);
        let resp = layer.dispatch(MockRequest::post(
            "/linode/instances",
            json!({"label": "linode-1", "region": "us-east", "type": "g6-nanode-1"}),
        ));
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["errors"][0]["field"], "label");
    }

    #[test]
    fn test_update_and_delete() {
        let mut layer = layer(2);
        let resp = layer.dispatch(MockRequest::put(
            "/linode/instances/1",
            json!({"label": "renamed"}),
        ));
        assert_eq!(resp.body["label"], "renamed");

        let resp = layer.dispatch(MockRequest::delete("/linode/instances/1"));
        assert_eq!(resp.status, 200);
        assert_eq!(layer.state().linodes.len(), 1);
        assert_eq!(layer.state().linode_configs.len(), 1);

        let resp = layer.dispatch(MockRequest::get("/linode/instances/1"));
        assert_eq!(resp.status, 404);
    }

    #[test]
    fn test_power_actions() {
        let mut layer = layer(1);
        let resp = layer.dispatch(MockRequest::post("/linode/instances/1/boot", json!({})));
        assert_eq!(resp.status, 400);

        let resp = layer.dispatch(MockRequest::post("/linode/instances/1/shutdown", json!({})));
        assert_eq!(resp.status, 200);
        assert_eq!(layer.state().linodes[0].status, LinodeStatus::Offline);

        let resp = layer.dispatch(MockRequest::post("/linode/instances/1/boot", json!({})));
        assert_eq!(resp.status, 200);
        assert_eq!(layer.state().linodes[0].status, LinodeStatus::Running);
    }

    #[test]
    fn test_configs_crud() {
        let mut layer = layer(1);
        let resp = layer.dispatch(MockRequest::post(
            "/linode/instances/1/configs",
            json!({"label": "rescue"}),
        ));
        assert_eq!(resp.status, 200);
        let config_id = resp.body["id"].as_u64().unwrap();

        let resp = layer.dispatch(MockRequest::get("/linode/instances/1/configs"));
        assert_eq!(resp.body["results"], 2);

        let path = format!("/linode/instances/1/configs/{}", config_id);
        assert_eq!(layer.dispatch(MockRequest::get(&path)).status, 200);
        assert_eq!(layer.dispatch(MockRequest::delete(&path)).status, 200);
        assert_eq!(layer.dispatch(MockRequest::get(&path)).status, 404);
    }
}
