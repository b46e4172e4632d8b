//! Placement groups crud preset.

use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

use super::{referenced_linode, validate_label, LabelUpdate};
use crate::interceptor::{
    paginate, respond_ok, HandlerError, HandlerResult, Interceptor, MockResponse, RequestContext,
    Resolution,
};
use crate::preset::{SeedFuture, SeedOptions};
use crate::state::{
    factories, Collection, EntityRef, MockState, PlacementGroup, PlacementGroupMember,
    PlacementGroupRef,
};

/// Most linodes a single group accepts.
pub const MAX_GROUP_MEMBERS: usize = 5;

/// Add `options.count` placement groups.
///
/// Linodes already in state that are not yet in a group are distributed
/// across the new groups round robin, up to [`MAX_GROUP_MEMBERS`] each.
/// Linodes beyond that capacity stay ungrouped.
pub fn seed(state: MockState, options: SeedOptions) -> SeedFuture {
    Box::pin(async move { Ok::<_, anyhow::Error>(seed_placement_groups(state, options.count)) })
}

fn seed_placement_groups(mut state: MockState, count: u32) -> MockState {
    let first = state.next_id(Collection::PlacementGroups);
    for offset in 0..u64::from(count) {
        state
            .placement_groups
            .push(factories::placement_group(first + offset, factories::DEFAULT_REGION));
    }

    if count > 0 {
        let capacity = MAX_GROUP_MEMBERS * count as usize;
        let free: Vec<u64> = state
            .linodes
            .iter()
            .filter(|l| l.placement_group.is_none())
            .map(|l| l.id)
            .take(capacity)
            .collect();
        for (i, linode_id) in free.into_iter().enumerate() {
            let group_id = first + (i as u64 % u64::from(count));
            join(&mut state, group_id, linode_id);
        }
    }
    debug!(count, total = state.placement_groups.len(), "seeded placement groups");
    state
}

/// Record membership on both sides of the relation.
fn join(state: &mut MockState, group_id: u64, linode_id: u64) {
    let Some(group) = state.placement_group_mut(group_id) else {
        return;
    };
    group.members.push(PlacementGroupMember {
        linode_id,
        is_compliant: true,
    });
    let reference = PlacementGroupRef {
        id: group.id,
        label: group.label.clone(),
    };
    if let Some(linode) = state.linode_mut(linode_id) {
        linode.placement_group = Some(reference);
    }
}

pub fn handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![
        Interceptor::get("/placement/groups", |ctx, state| {
            paginate(&state.placement_groups, &ctx.request)
        }),
        Interceptor::get("/placement/groups/:id", |ctx, state| {
            let id = ctx.params.id("id")?;
            respond_ok(find(state, id)?)
        }),
        Interceptor::post("/placement/groups", create_group),
        Interceptor::put("/placement/groups/:id", update_group),
        Interceptor::delete("/placement/groups/:id", |ctx, state| {
            let id = ctx.params.id("id")?;
            let removed = state
                .remove_placement_group(id)
                .ok_or_else(|| HandlerError::not_found("Placement Group"))?;
            state.push_event("placement_group_delete", Some(group_ref(&removed)));
            Ok(Resolution::Respond(MockResponse::empty()))
        }),
        Interceptor::post("/placement/groups/:id/assign", assign),
        Interceptor::post("/placement/groups/:id/unassign", unassign),
    ]
}

fn find(state: &MockState, id: u64) -> Result<&PlacementGroup, HandlerError> {
    state
        .placement_groups
        .iter()
        .find(|g| g.id == id)
        .ok_or_else(|| HandlerError::not_found("Placement Group"))
}

fn group_ref(group: &PlacementGroup) -> EntityRef {
    factories::entity_ref(
        group.id,
        &group.label,
        "placement_group",
        format!("/v4/placement/groups/{}", group.id),
    )
}

#[derive(Debug, Deserialize)]
struct CreateGroup {
    label: Option<String>,
    region: Option<String>,
    placement_group_type: Option<String>,
    placement_group_policy: Option<String>,
}

fn create_group(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let body: CreateGroup = ctx.body()?;
    let label = body
        .label
        .ok_or_else(|| HandlerError::invalid_field("label", "Label is required."))?;
    validate_label(&label)?;
    let region = body
        .region
        .ok_or_else(|| HandlerError::invalid_field("region", "Region is required."))?;

    let id = state.next_id(Collection::PlacementGroups);
    let defaults = factories::placement_group(id, &region);
    let group = PlacementGroup {
        label,
        placement_group_type: body
            .placement_group_type
            .unwrap_or(defaults.placement_group_type.clone()),
        placement_group_policy: body
            .placement_group_policy
            .unwrap_or(defaults.placement_group_policy.clone()),
        ..defaults
    };
    state.push_event("placement_group_create", Some(group_ref(&group)));
    state.placement_groups.push(group.clone());
    respond_ok(&group)
}

fn update_group(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let body: LabelUpdate = ctx.body()?;
    let label = body
        .label
        .ok_or_else(|| HandlerError::invalid_field("label", "Label is required."))?;
    validate_label(&label)?;

    let group = state
        .placement_group_mut(id)
        .ok_or_else(|| HandlerError::not_found("Placement Group"))?;
    group.label = label.clone();
    let updated = group.clone();
    for linode in state.linodes.iter_mut() {
        if let Some(pg) = linode.placement_group.as_mut().filter(|pg| pg.id == id) {
            pg.label = label.clone();
        }
    }
    state.push_event("placement_group_update", Some(group_ref(&updated)));
    respond_ok(&updated)
}

#[derive(Debug, Deserialize)]
struct Membership {
    #[serde(default)]
    linodes: Vec<u64>,
}

fn assign(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let body: Membership = ctx.body()?;
    let mut requested = HashSet::new();
    if let Some(repeated) = body.linodes.iter().find(|l| !requested.insert(**l)) {
        return Err(HandlerError::invalid_field(
            "linodes",
            &format!("Linode {} is listed more than once.", repeated),
        ));
    }
    let group = find(state, id)?;
    if group.members.len() + body.linodes.len() > MAX_GROUP_MEMBERS {
        return Err(HandlerError::BadRequest(format!(
            "Placement Group {} cannot hold more than {} Linodes.",
            group.label, MAX_GROUP_MEMBERS
        )));
    }

    for linode_id in &body.linodes {
        let linode = referenced_linode(state, "linodes", *linode_id)?;
        if let Some(current) = &linode.placement_group {
            return Err(HandlerError::invalid_field(
                "linodes",
                &format!(
                    "Linode {} is already assigned to Placement Group {}.",
                    linode.id, current.label
                ),
            ));
        }
    }
    for linode_id in body.linodes {
        join(state, id, linode_id);
    }

    let group = find(state, id)?.clone();
    state.push_event("placement_group_assign", Some(group_ref(&group)));
    respond_ok(&group)
}

fn unassign(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let body: Membership = ctx.body()?;
    let group = state
        .placement_group_mut(id)
        .ok_or_else(|| HandlerError::not_found("Placement Group"))?;
    group.members.retain(|m| !body.linodes.contains(&m.linode_id));
    let group = group.clone();

    for linode in state.linodes.iter_mut() {
        let in_group = linode.placement_group.as_ref().map(|pg| pg.id) == Some(id);
        if in_group && body.linodes.contains(&linode.id) {
            linode.placement_group = None;
        }
    }
    state.push_event("placement_group_unassign", Some(group_ref(&group)));
    respond_ok(&group)
}
