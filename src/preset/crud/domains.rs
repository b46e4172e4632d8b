//! Domains crud preset: domains and their DNS records.

use serde::Deserialize;
use tracing::debug;

use crate::interceptor::{
    paginate, respond_ok, HandlerError, HandlerResult, Interceptor, MockResponse, RequestContext,
    Resolution,
};
use crate::preset::{SeedFuture, SeedOptions};
use crate::state::{factories, Collection, Domain, DomainRecord, DomainType, MockState, RecordType};

/// Target for seeded A records when no linodes exist yet.
pub const FALLBACK_RECORD_TARGET: &str = "203.0.113.10";

/// Add `options.count` domains, each with an A record and an MX record.
///
/// A records point at already seeded linodes, round robin, so selecting
/// `linodes:crud` before `domains:crud` yields records that resolve to
/// those linodes.
pub fn seed(state: MockState, options: SeedOptions) -> SeedFuture {
    Box::pin(async move { Ok::<_, anyhow::Error>(seed_domains(state, options.count)) })
}

fn seed_domains(mut state: MockState, count: u32) -> MockState {
    let targets: Vec<String> = state
        .linodes
        .iter()
        .filter_map(|l| l.ipv4.first().cloned())
        .collect();

    let first = state.next_id(Collection::Domains);
    let mut record_id = state.next_id(Collection::DomainRecords);
    for i in 0..count as usize {
        let id = first + i as u64;
        let domain = factories::domain(id);

        let a_target = targets
            .get(i % targets.len().max(1))
            .cloned()
            .unwrap_or_else(|| FALLBACK_RECORD_TARGET.to_string());
        state
            .domain_records
            .push(factories::domain_record(record_id, id, RecordType::A, &a_target));
        record_id += 1;

        let mail = format!("mail.{}", domain.domain);
        state
            .domain_records
            .push(factories::domain_record(record_id, id, RecordType::MX, &mail));
        record_id += 1;

        state.domains.push(domain);
    }
    debug!(count, total = state.domains.len(), "seeded domains");
    state
}

pub fn handlers(_state: &MockState) -> Vec<Interceptor> {
    vec![
        Interceptor::get("/domains", |ctx, state| paginate(&state.domains, &ctx.request)),
        Interceptor::get("/domains/:id", |ctx, state| {
            let id = ctx.params.id("id")?;
            respond_ok(find(state, id)?)
        }),
        Interceptor::post("/domains", create_domain),
        Interceptor::put("/domains/:id", update_domain),
        Interceptor::delete("/domains/:id", |ctx, state| {
            let id = ctx.params.id("id")?;
            let removed = state
                .remove_domain(id)
                .ok_or_else(|| HandlerError::not_found("Domain"))?;
            let entity = domain_ref(&removed);
            state.push_event("domain_delete", Some(entity));
            Ok(Resolution::Respond(MockResponse::empty()))
        }),
        Interceptor::get("/domains/:id/records", |ctx, state| {
            let id = ctx.params.id("id")?;
            find(state, id)?;
            let records: Vec<DomainRecord> = state
                .domain_records
                .iter()
                .filter(|r| r.domain_id == id)
                .cloned()
                .collect();
            paginate(&records, &ctx.request)
        }),
        Interceptor::get("/domains/:id/records/:record_id", |ctx, state| {
            let id = ctx.params.id("id")?;
            let record_id = ctx.params.id("record_id")?;
            respond_ok(find_record(state, id, record_id)?)
        }),
        Interceptor::post("/domains/:id/records", create_record),
        Interceptor::put("/domains/:id/records/:record_id", update_record),
        Interceptor::delete("/domains/:id/records/:record_id", |ctx, state| {
            let id = ctx.params.id("id")?;
            let record_id = ctx.params.id("record_id")?;
            find_record(state, id, record_id)?;
            state
                .domain_records
                .retain(|r| !(r.domain_id == id && r.id == record_id));
            Ok(Resolution::Respond(MockResponse::empty()))
        }),
    ]
}

fn find(state: &MockState, id: u64) -> Result<&Domain, HandlerError> {
    state.domain(id).ok_or_else(|| HandlerError::not_found("Domain"))
}

fn find_record(state: &MockState, domain_id: u64, id: u64) -> Result<&DomainRecord, HandlerError> {
    state
        .domain_records
        .iter()
        .find(|r| r.domain_id == domain_id && r.id == id)
        .ok_or_else(|| HandlerError::not_found("Domain record"))
}

fn domain_ref(domain: &Domain) -> crate::state::EntityRef {
    factories::entity_ref(
        domain.id,
        &domain.domain,
        "domain",
        format!("/v4/domains/{}", domain.id),
    )
}

#[derive(Debug, Deserialize)]
struct CreateDomain {
    domain: Option<String>,
    #[serde(rename = "type", default = "default_domain_type")]
    domain_type: DomainType,
    soa_email: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
}

fn default_domain_type() -> DomainType {
    DomainType::Master
}

fn create_domain(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let body: CreateDomain = ctx.body()?;
    let name = body
        .domain
        .filter(|d| d.contains('.'))
        .ok_or_else(|| HandlerError::invalid_field("domain", "Domain is not valid."))?;
    if state.domains.iter().any(|d| d.domain == name) {
        return Err(HandlerError::invalid_field("domain", "Domain already exists."));
    }
    let soa_email = match (body.domain_type, body.soa_email) {
        (_, Some(email)) => email,
        (DomainType::Slave, None) => String::new(),
        (DomainType::Master, None) => {
            return Err(HandlerError::invalid_field(
                "soa_email",
                "SOA Email is required for master domains.",
            ));
        }
    };

    let id = state.next_id(Collection::Domains);
    let now = factories::now_timestamp();
    let domain = Domain {
        domain: name,
        domain_type: body.domain_type,
        soa_email,
        description: body.description,
        tags: body.tags,
        created: now.clone(),
        updated: now,
        ..factories::domain(id)
    };
    state.push_event("domain_create", Some(domain_ref(&domain)));
    state.domains.push(domain.clone());
    respond_ok(&domain)
}

#[derive(Debug, Deserialize)]
struct UpdateDomain {
    soa_email: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
}

fn update_domain(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let id = ctx.params.id("id")?;
    let body: UpdateDomain = ctx.body()?;
    let domain = state
        .domains
        .iter_mut()
        .find(|d| d.id == id)
        .ok_or_else(|| HandlerError::not_found("Domain"))?;

    if let Some(email) = body.soa_email {
        domain.soa_email = email;
    }
    if let Some(description) = body.description {
        domain.description = description;
    }
    if let Some(tags) = body.tags {
        domain.tags = tags;
    }
    domain.updated = factories::now_timestamp();
    let updated = domain.clone();
    state.push_event("domain_update", Some(domain_ref(&updated)));
    respond_ok(&updated)
}

#[derive(Debug, Deserialize)]
struct RecordBody {
    #[serde(rename = "type")]
    record_type: Option<RecordType>,
    name: Option<String>,
    target: Option<String>,
    ttl_sec: Option<u32>,
    priority: Option<u32>,
    weight: Option<u32>,
    port: Option<u32>,
}

fn create_record(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let domain_id = ctx.params.id("id")?;
    find(state, domain_id)?;
    let body: RecordBody = ctx.body()?;
    let record_type = body
        .record_type
        .ok_or_else(|| HandlerError::invalid_field("type", "Record type is required."))?;
    let target = body
        .target
        .ok_or_else(|| HandlerError::invalid_field("target", "Target is required."))?;

    let id = state.next_id(Collection::DomainRecords);
    let now = factories::now_timestamp();
    let defaults = factories::domain_record(id, domain_id, record_type, &target);
    let record = DomainRecord {
        name: body.name.unwrap_or(defaults.name.clone()),
        ttl_sec: body.ttl_sec.unwrap_or(defaults.ttl_sec),
        priority: body.priority.unwrap_or(defaults.priority),
        weight: body.weight.unwrap_or(defaults.weight),
        port: body.port.unwrap_or(defaults.port),
        created: now.clone(),
        updated: now,
        ..defaults
    };
    state.domain_records.push(record.clone());
    respond_ok(&record)
}

fn update_record(ctx: &mut RequestContext, state: &mut MockState) -> HandlerResult {
    let domain_id = ctx.params.id("id")?;
    let record_id = ctx.params.id("record_id")?;
    let body: RecordBody = ctx.body()?;
    let record = state
        .domain_records
        .iter_mut()
        .find(|r| r.domain_id == domain_id && r.id == record_id)
        .ok_or_else(|| HandlerError::not_found("Domain record"))?;

    if let Some(name) = body.name {
        record.name = name;
    }
    if let Some(target) = body.target {
        record.target = target;
    }
    if let Some(ttl) = body.ttl_sec {
        record.ttl_sec = ttl;
    }
    if let Some(priority) = body.priority {
        record.priority = priority;
    }
    record.updated = factories::now_timestamp();
    respond_ok(&*record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::MockRequest;
    use crate::layer::MockLayer;
    use serde_json::json;

    fn layer(count: u32) -> MockLayer {
        let state = seed_domains(MockState::initialize(), count);
        let interceptors = handlers(&state);
        MockLayer::new(state, interceptors, Vec::new())
    }

    #[test]
    fn test_seed_without_linodes_uses_fallback_target() {
        let state = seed_domains(MockState::initialize(), 2);
        assert_eq!(state.domains.len(), 2);
        assert_eq!(state.domain_records.len(), 4);
        let a = state
            .domain_records
            .iter()
            .find(|r| r.record_type == RecordType::A)
            .unwrap();
        assert_eq!(a.target, FALLBACK_RECORD_TARGET);
        assert!(state.orphans().is_empty());
    }

    #[test]
    fn test_seed_targets_existing_linodes() {
        let mut state = MockState::initialize();
        state.linodes.push(factories::linode(1, "us-east"));
        state.linodes.push(factories::linode(2, "us-east"));
        let state = seed_domains(state, 3);

        let targets: Vec<&str> = state
            .domain_records
            .iter()
            .filter(|r| r.record_type == RecordType::A)
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(targets, vec!["10.0.0.2", "10.0.0.3", "10.0.0.2"]);
    }

    #[test]
    fn test_create_domain_validation() {
        let mut layer = layer(0);
        let resp = layer.dispatch(MockRequest::post("/domains", json!({"domain": "example.org"})));
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body["errors"][0]["field"], "soa_email");

        let resp = layer.dispatch(MockRequest::post(
            "/domains",
            json!({"domain": "example.org", "soa_email": "ops@example.org"}),
        ));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["type"], "master");

        let resp = layer.dispatch(MockRequest::post(
            "/domains",
            json!({"domain": "example.org", "soa_email": "ops@example.org"}),
        ));
        assert_eq!(resp.status, 400);
    }

    #[test]
    fn test_delete_domain_removes_records() {
        let mut layer = layer(2);
        let resp = layer.dispatch(MockRequest::delete("/domains/1"));
        assert_eq!(resp.status, 200);
        assert!(layer.state().domain_records.iter().all(|r| r.domain_id == 2));
        assert_eq!(layer.dispatch(MockRequest::get("/domains/1/records")).status, 404);
    }

    #[test]
    fn test_record_crud() {
        let mut layer = layer(1);
        let resp = layer.dispatch(MockRequest::post(
            "/domains/1/records",
            json!({"type": "TXT", "name": "_verify", "target": "token"}),
        ));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["name"], "_verify");
        assert!(resp.body.get("domain_id").is_none());
        let record_id = resp.body["id"].as_u64().unwrap();

        let path = format!("/domains/1/records/{}", record_id);
        let resp = layer.dispatch(MockRequest::put(&path, json!({"target": "other"})));
        assert_eq!(resp.body["target"], "other");

        assert_eq!(layer.dispatch(MockRequest::delete(&path)).status, 200);
        let resp = layer.dispatch(MockRequest::get("/domains/1/records"));
        assert_eq!(resp.body["results"], 2);
    }
}
