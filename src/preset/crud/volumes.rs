//! Volumes crud preset: block storage and attachment to linodes.

use serde::Deserialize;
use tracing::debug;

use super::{referenced_linode, validate_label, LabelUpdate};
use crate::interceptor::{
    paginate, respond_ok, HandlerError, HandlerResult, Interceptor, MockResponse, RequestContext,
    Resolution,
};
use crate::preset::{SeedFuture, SeedOptions};
use crate::state::{factories, Collection, EntityRef, MockState, Volume};

/// Smallest volume size in GB accepted by the create endpoint.
pub const MIN_VOLUME_SIZE: u32 = 10;

/// Add `options.count` volumes.
///
/// The n-th new volume is attached to the n-th linode already in state, if
/// there is one. Remaining volumes are left unattached.
pub fn seed(state: MockState, options: SeedOptions) -> SeedFuture {
    Box::pin(async move { Ok::<_, anyhow::Error>(seed_volumes(state, options.count)) })
}

fn seed_volumes(mut state: MockState, count: u32) -> MockState {
    let first = state.next_id(Collection::Volumes);
    for i in 0..count as usize {
        let id = first + i as u64;
        let host = state.linodes.get(i).cloned();
        state
            .volumes
            .push(factories::volume(id, factories::DEFAULT_REGION, host.as_ref()));
    }
    debug!(count, total = state.volumes.len(), "seeded volumes");
    state
}

pub fn handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![
        Interceptor::get("/volumes", |ctx, state| paginate(&state.volumes, &ctx.request)),
        Interceptor::get("/volumes/:id", |ctx, state| {
            let id = ctx.params.id("id")?;
            respond_ok(find(state, id)?)
        }),
        Interceptor::post("/volumes", create_volume),
        Interceptor::put("/volumes/:id", update_volume),
        Interceptor::delete("/volumes/:id", delete_volume),
        Interceptor::post("/volumes/:id/attach", attach_volume),
        Interceptor::post("/volumes/:id/detach", detach_volume),
        Interceptor::get("/linode/instances/:id/volumes", |ctx, state| {
            let id = ctx.params.id("id")?;
            if state.linode(id).is_none() {
                return Err(HandlerError::not_found("Linode"));
            }
            let attached: Vec<Volume> = state
                .volumes
                .iter()
                .filter(|v| v.linode_id == Some(id))
                .cloned()
                .collect();
            paginate(&attached, &ctx.request)
        }),
    ]
}

fn find(state: &MockState, id: u64) -> Result<&Volume, HandlerError> {
    state
        .volumes
        .iter()
        .find(|v| v.id == id)
        .ok_or_else(|| HandlerError::not_found("Volume"))
}

fn volume_ref(volume: &Volume) -> EntityRef {
    factories::entity_ref(
        volume.id,
        &volume.label,
        "volume",
        format!("/v4/volumes/{}", volume.id),
    )
}

#[derive(Debug, Deserialize)]
struct CreateVolume {
    label: Option<String>,
    region: Option<String>,
    size: Option<u32>,
    linode_id: Option<u64>,
    #[serde(default)]
    tags: Vec<String>,
}

fn create_volume(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let body: CreateVolume = ctx.body()?;
    let label = body
        .label
        .ok_or_else(|| HandlerError::invalid_field("label", "Label is required."))?;
    validate_label(&label)?;
    if state.volumes.iter().any(|v| v.label == label) {
        return Err(HandlerError::invalid_field("label", "Label must be unique."));
    }
    let size = body.size.unwrap_or(20);
    if size < MIN_VOLUME_SIZE {
        return Err(HandlerError::invalid_field(
            "size",
            &format!("Size must be at least {} GB.", MIN_VOLUME_SIZE),
        ));
    }
    let host = match body.linode_id {
        Some(linode_id) => Some(referenced_linode(state, "linode_id", linode_id)?),
        None => None,
    };
    if host.is_none() && body.region.is_none() {
        return Err(HandlerError::invalid_field(
            "region",
            "Must provide a region or a Linode ID.",
        ));
    }

    let id = state.next_id(Collection::Volumes);
    let region = body
        .region
        .unwrap_or_else(|| factories::DEFAULT_REGION.to_string());
    let now = factories::now_timestamp();
    let defaults = factories::volume(id, &region, host.as_ref());
    let volume = Volume {
        label,
        size,
        tags: body.tags,
        status: "creating".to_string(),
        created: now.clone(),
        updated: now,
        ..defaults
    };
    state.push_event("volume_create", Some(volume_ref(&volume)));
    state.volumes.push(volume.clone());
    respond_ok(&volume)
}

fn update_volume(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let body: LabelUpdate = ctx.body()?;
    if let Some(label) = &body.label {
        validate_label(label)?;
        if state.volumes.iter().any(|v| v.id != id && &v.label == label) {
            return Err(HandlerError::invalid_field("label", "Label must be unique."));
        }
    }
    let volume = state
        .volume_mut(id)
        .ok_or_else(|| HandlerError::not_found("Volume"))?;
    if let Some(label) = body.label {
        volume.label = label;
    }
    if let Some(tags) = body.tags {
        volume.tags = tags;
    }
    volume.updated = factories::now_timestamp();
    let updated = volume.clone();
    state.push_event("volume_update", Some(volume_ref(&updated)));
    respond_ok(&updated)
}

fn delete_volume(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let volume = find(state, id)?;
    if volume.linode_id.is_some() {
        return Err(HandlerError::BadRequest(
            "Volume must be detached before it can be deleted.".to_string(),
        ));
    }
    let entity = volume_ref(volume);
    state.volumes.retain(|v| v.id != id);
    state.push_event("volume_delete", Some(entity));
    Ok(Resolution::Respond(MockResponse::empty()))
}

#[derive(Debug, Deserialize)]
struct AttachVolume {
    linode_id: Option<u64>,
}

fn attach_volume(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let body: AttachVolume = ctx.body()?;
    let linode_id = body
        .linode_id
        .ok_or_else(|| HandlerError::invalid_field("linode_id", "Linode ID is required."))?;
    let host = referenced_linode(state, "linode_id", linode_id)?;

    let volume = state
        .volume_mut(id)
        .ok_or_else(|| HandlerError::not_found("Volume"))?;
    if volume.linode_id.is_some_and(|current| current != linode_id) {
        return Err(HandlerError::BadRequest(
            "Volume is already attached to another Linode.".to_string(),
        ));
    }
    if volume.region != host.region {
        return Err(HandlerError::invalid_field(
            "linode_id",
            "Volume and Linode must be in the same region.",
        ));
    }
    volume.linode_id = Some(host.id);
    volume.linode_label = Some(host.label.clone());
    volume.updated = factories::now_timestamp();
    let attached = volume.clone();
    state.push_event("volume_attach", Some(volume_ref(&attached)));
    respond_ok(&attached)
}

fn detach_volume(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let volume = state
        .volume_mut(id)
        .ok_or_else(|| HandlerError::not_found("Volume"))?;
    volume.linode_id = None;
    volume.linode_label = None;
    volume.updated = factories::now_timestamp();
    let entity = volume_ref(volume);
    state.push_event("volume_detach", Some(entity));
    Ok(Resolution::Respond(MockResponse::empty()))
}
