//! Deterministic builders for synthetic resources.
//!
//! Seeders and static handlers build entities through these functions so
//! that the same id always yields the same entity.

use serde_json::{json, Value};

use super::entities::*;

/// Region used when a request or seeder does not name one.
pub const DEFAULT_REGION: &str = "us-east";

/// Plan used when a request or seeder does not name one.
pub const DEFAULT_PLAN: &str = "g6-standard-1";

/// Username attached to generated events and ticket replies.
pub const MOCK_USERNAME: &str = "mock-user";

/// Fixed timestamp for seeded entities, offset by id so ordering is stable.
pub fn seed_timestamp(id: u64) -> String {
    let day = (id % 28) + 1;
    let minute = id % 60;
    format!("2024-01-{:02}T12:{:02}:00", day, minute)
}

/// Wall clock timestamp for entities created by request handlers.
pub fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// IPv4 address from the 10.0.0.0/8 private range, unique per id.
///
/// Host octets stay within 1..=254, so ids map to distinct addresses up
/// to `254 * 256 * 256`.
pub fn ipv4_for(id: u64) -> String {
    let host = (id % 254) + 1;
    let subnet = (id / 254) % 256;
    let block = (id / (254 * 256)) % 256;
    format!("10.{}.{}.{}", block, subnet, host)
}

pub fn linode(id: u64, region: &str) -> Linode {
    Linode {
        id,
        label: format!("linode-{}", id),
        region: region.to_string(),
        plan: DEFAULT_PLAN.to_string(),
        image: Some("linode/debian12".to_string()),
        status: LinodeStatus::Running,
        ipv4: vec![ipv4_for(id)],
        tags: Vec::new(),
        placement_group: None,
        created: seed_timestamp(id),
        updated: seed_timestamp(id),
    }
}

pub fn linode_config(id: u64, label: &str) -> Config {
    Config {
        id,
        label: label.to_string(),
        kernel: "linode/grub2".to_string(),
        root_device: "/dev/sda".to_string(),
        memory_limit: 0,
        created: seed_timestamp(id),
        updated: seed_timestamp(id),
    }
}

pub fn domain(id: u64) -> Domain {
    let name = format!("domain-{}.example.com", id);
    Domain {
        id,
        soa_email: format!("admin@{}", name),
        domain: name,
        domain_type: DomainType::Master,
        status: "active".to_string(),
        description: String::new(),
        tags: Vec::new(),
        created: seed_timestamp(id),
        updated: seed_timestamp(id),
    }
}

pub fn domain_record(id: u64, domain_id: u64, record_type: RecordType, target: &str) -> DomainRecord {
    let (name, priority) = match record_type {
        RecordType::MX => (String::new(), 10),
        RecordType::A | RecordType::AAAA => ("www".to_string(), 0),
        _ => (format!("record-{}", id), 0),
    };
    DomainRecord {
        id,
        domain_id,
        name,
        record_type,
        target: target.to_string(),
        ttl_sec: 300,
        priority,
        weight: 0,
        port: 0,
        created: seed_timestamp(id),
        updated: seed_timestamp(id),
    }
}

pub fn volume(id: u64, region: &str, attached_to: Option<&Linode>) -> Volume {
    let label = format!("volume-{}", id);
    Volume {
        id,
        filesystem_path: format!("/dev/disk/by-id/scsi-0Linode_Volume_{}", label),
        label,
        size: 20,
        region: attached_to
            .map(|l| l.region.clone())
            .unwrap_or_else(|| region.to_string()),
        status: "active".to_string(),
        linode_id: attached_to.map(|l| l.id),
        linode_label: attached_to.map(|l| l.label.clone()),
        tags: Vec::new(),
        created: seed_timestamp(id),
        updated: seed_timestamp(id),
    }
}

pub fn firewall(id: u64) -> Firewall {
    Firewall {
        id,
        label: format!("firewall-{}", id),
        status: "enabled".to_string(),
        rules: FirewallRules {
            inbound_policy: "DROP".to_string(),
            outbound_policy: "ACCEPT".to_string(),
        },
        entities: Vec::new(),
        created: seed_timestamp(id),
        updated: seed_timestamp(id),
    }
}

pub fn placement_group(id: u64, region: &str) -> PlacementGroup {
    PlacementGroup {
        id,
        label: format!("pg-{}", id),
        region: region.to_string(),
        placement_group_type: "anti_affinity:local".to_string(),
        placement_group_policy: "strict".to_string(),
        is_compliant: true,
        members: Vec::new(),
    }
}

pub fn support_ticket(id: u64, entity: Option<EntityRef>) -> SupportTicket {
    SupportTicket {
        id,
        summary: format!("Support ticket {}", id),
        description: format!("Details for support ticket {}.", id),
        status: TicketStatus::Open,
        entity,
        closable: true,
        opened: seed_timestamp(id),
        updated: seed_timestamp(id),
        closed: None,
        updated_by: MOCK_USERNAME.to_string(),
    }
}

pub fn support_reply(id: u64, ticket_id: u64) -> SupportReply {
    SupportReply {
        id,
        ticket_id,
        description: "Thanks for reaching out, we are looking into it.".to_string(),
        from_linode: true,
        created: seed_timestamp(id),
        created_by: "support".to_string(),
    }
}

pub fn event(id: u64, action: &str, entity: Option<EntityRef>) -> Event {
    Event {
        id,
        action: action.to_string(),
        entity,
        status: "finished".to_string(),
        percent_complete: 100,
        seen: false,
        read: false,
        username: MOCK_USERNAME.to_string(),
        created: now_timestamp(),
    }
}

pub fn entity_ref(id: u64, label: &str, entity_type: &str, url: String) -> EntityRef {
    EntityRef {
        id,
        label: label.to_string(),
        entity_type: entity_type.to_string(),
        url,
    }
}

pub fn linode_ref(linode: &Linode) -> EntityRef {
    entity_ref(
        linode.id,
        &linode.label,
        "linode",
        format!("/v4/linode/instances/{}", linode.id),
    )
}

pub fn profile() -> Value {
    json!({
        "username": MOCK_USERNAME,
        "email": "mock-user@example.com",
        "restricted": false,
        "two_factor_auth": false,
        "timezone": "UTC",
        "uid": 1,
        "authorized_keys": [],
    })
}

pub fn account() -> Value {
    json!({
        "company": "Example Co",
        "email": "billing@example.com",
        "first_name": "Mock",
        "last_name": "User",
        "country": "US",
        "balance": 0,
        "active_since": "2024-01-01T00:00:00",
        "capabilities": [
            "Linodes",
            "NodeBalancers",
            "Block Storage",
            "Object Storage",
            "Kubernetes",
            "Cloud Firewall",
            "Placement Group",
        ],
    })
}

pub fn account_settings(managed: bool) -> Value {
    json!({
        "managed": managed,
        "longview_subscription": null,
        "network_helper": true,
        "backups_enabled": false,
        "object_storage": "disabled",
    })
}

fn region(id: &str, label: &str, country: &str, site_type: SiteType, capabilities: &[&str]) -> Region {
    Region {
        id: id.to_string(),
        label: label.to_string(),
        country: country.to_string(),
        site_type,
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        status: "ok".to_string(),
    }
}

const CORE_CAPABILITIES: &[&str] = &[
    "Linodes",
    "Block Storage",
    "Cloud Firewall",
    "Placement Group",
    "Kubernetes",
    "Vlans",
];

const DISTRIBUTED_CAPABILITIES: &[&str] = &["Linodes", "Cloud Firewall", "Distributed Plans"];

pub fn core_regions() -> Vec<Region> {
    vec![
        region("us-east", "Newark, NJ", "us", SiteType::Core, CORE_CAPABILITIES),
        region("us-central", "Dallas, TX", "us", SiteType::Core, CORE_CAPABILITIES),
        region("us-west", "Fremont, CA", "us", SiteType::Core, CORE_CAPABILITIES),
        region("eu-west", "London, UK", "gb", SiteType::Core, CORE_CAPABILITIES),
        region("fr-par", "Paris, FR", "fr", SiteType::Core, CORE_CAPABILITIES),
        region("ap-south", "Singapore, SG", "sg", SiteType::Core, CORE_CAPABILITIES),
    ]
}

pub fn distributed_regions() -> Vec<Region> {
    vec![
        region("us-den-edge-1", "Denver, CO", "us", SiteType::Distributed, DISTRIBUTED_CAPABILITIES),
        region("de-ham-edge-1", "Hamburg, DE", "de", SiteType::Distributed, DISTRIBUTED_CAPABILITIES),
        region("jp-tyo-edge-1", "Tokyo, JP", "jp", SiteType::Distributed, DISTRIBUTED_CAPABILITIES),
    ]
}

/// Plans reported by region availability fixtures.
pub const AVAILABILITY_PLANS: &[&str] = &[
    "g6-nanode-1",
    DEFAULT_PLAN,
    "g6-dedicated-2",
    "g1-gpu-rtx6000-1",
];

/// Availability of every fixture plan in a region.
///
/// GPU plans are only offered in core regions.
pub fn region_availability(region: &Region) -> Vec<RegionAvailability> {
    AVAILABILITY_PLANS
        .iter()
        .map(|plan| RegionAvailability {
            region: region.id.clone(),
            plan: plan.to_string(),
            available: region.site_type == SiteType::Core || !plan.starts_with("g1-gpu"),
        })
        .collect()
}

/// Region catalogue from before placement groups and distributed sites existed.
pub fn legacy_regions() -> Vec<Region> {
    const LEGACY_CAPABILITIES: &[&str] = &["Linodes", "Block Storage", "NodeBalancers"];
    vec![
        region("us-east", "Newark, NJ", "us", SiteType::Core, LEGACY_CAPABILITIES),
        region("us-central", "Dallas, TX", "us", SiteType::Core, LEGACY_CAPABILITIES),
        region("us-west", "Fremont, CA", "us", SiteType::Core, LEGACY_CAPABILITIES),
        region("us-southeast", "Atlanta, GA", "us", SiteType::Core, LEGACY_CAPABILITIES),
        region("eu-central", "Frankfurt, DE", "de", SiteType::Core, LEGACY_CAPABILITIES),
        region("ap-northeast", "Tokyo, JP", "jp", SiteType::Core, LEGACY_CAPABILITIES),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linode_is_deterministic() {
        assert_eq!(linode(4, DEFAULT_REGION), linode(4, DEFAULT_REGION));
        assert_eq!(linode(4, DEFAULT_REGION).ipv4, vec!["10.0.0.5".to_string()]);
    }

    #[test]
    fn test_ipv4_unique_past_one_subnet() {
        assert_eq!(ipv4_for(253), "10.0.0.254");
        assert_eq!(ipv4_for(254), "10.0.1.1");
        assert_eq!(ipv4_for(254 * 256), "10.1.0.1");

        let addresses: std::collections::HashSet<String> = (1..=2000).map(ipv4_for).collect();
        assert_eq!(addresses.len(), 2000);
    }

    #[test]
    fn test_volume_inherits_linode_region() {
        let host = linode(1, "eu-west");
        let vol = volume(9, DEFAULT_REGION, Some(&host));
        assert_eq!(vol.region, "eu-west");
        assert_eq!(vol.linode_id, Some(1));
        assert_eq!(vol.linode_label.as_deref(), Some("linode-1"));
    }

    #[test]
    fn test_region_sets_do_not_overlap_by_site_type() {
        assert!(core_regions().iter().all(|r| r.site_type == SiteType::Core));
        assert!(distributed_regions()
            .iter()
            .all(|r| r.site_type == SiteType::Distributed));
    }
}
