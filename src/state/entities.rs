//! Resource shapes served by the simulated API.
//!
//! These are a working subset of the provider's public schema: enough for
//! the handlers to create, list and relate resources, serialized with the
//! same field names the real API returns.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinodeStatus {
    Provisioning,
    Booting,
    Running,
    Rebooting,
    ShuttingDown,
    Offline,
}

/// Lightweight reference to a placement group, embedded in a linode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroupRef {
    pub id: u64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Linode {
    pub id: u64,
    pub label: String,
    pub region: String,
    #[serde(rename = "type")]
    pub plan: String,
    pub image: Option<String>,
    pub status: LinodeStatus,
    pub ipv4: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub placement_group: Option<PlacementGroupRef>,
    pub created: String,
    pub updated: String,
}

/// A boot configuration profile. Stored in state paired with its linode id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub id: u64,
    pub label: String,
    pub kernel: String,
    pub root_device: String,
    pub memory_limit: u32,
    pub created: String,
    pub updated: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    Master,
    Slave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: u64,
    pub domain: String,
    #[serde(rename = "type")]
    pub domain_type: DomainType,
    pub status: String,
    pub soa_email: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created: String,
    pub updated: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    MX,
    TXT,
    SRV,
    CAA,
    NS,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub id: u64,
    /// Owning domain. Not part of the public record payload.
    #[serde(skip_serializing, default)]
    pub domain_id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub target: String,
    pub ttl_sec: u32,
    pub priority: u32,
    pub weight: u32,
    pub port: u32,
    pub created: String,
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: u64,
    pub label: String,
    pub size: u32,
    pub region: String,
    pub status: String,
    pub linode_id: Option<u64>,
    pub linode_label: Option<String>,
    pub filesystem_path: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created: String,
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRules {
    pub inbound_policy: String,
    pub outbound_policy: String,
}

/// A device protected by a firewall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallDevice {
    pub id: u64,
    pub label: String,
    #[serde(rename = "type")]
    pub device_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Firewall {
    pub id: u64,
    pub label: String,
    pub status: String,
    pub rules: FirewallRules,
    pub entities: Vec<FirewallDevice>,
    pub created: String,
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroupMember {
    pub linode_id: u64,
    pub is_compliant: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementGroup {
    pub id: u64,
    pub label: String,
    pub region: String,
    pub placement_group_type: String,
    pub placement_group_policy: String,
    pub is_compliant: bool,
    pub members: Vec<PlacementGroupMember>,
}

/// Reference to the entity an event, notification or ticket is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: u64,
    pub label: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub notification_type: String,
    pub label: String,
    pub message: String,
    pub severity: String,
    pub entity: Option<EntityRef>,
    pub when: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub action: String,
    pub entity: Option<EntityRef>,
    pub status: String,
    pub percent_complete: u8,
    pub seen: bool,
    pub read: bool,
    pub username: String,
    pub created: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    New,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: u64,
    pub summary: String,
    pub description: String,
    pub status: TicketStatus,
    pub entity: Option<EntityRef>,
    pub closable: bool,
    pub opened: String,
    pub updated: String,
    pub closed: Option<String>,
    pub updated_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportReply {
    pub id: u64,
    /// Owning ticket. Not part of the public reply payload.
    #[serde(skip_serializing, default)]
    pub ticket_id: u64,
    pub description: String,
    pub from_linode: bool,
    pub created: String,
    pub created_by: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    Core,
    Distributed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub label: String,
    pub country: String,
    pub site_type: SiteType,
    pub capabilities: Vec<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionAvailability {
    pub region: String,
    pub plan: String,
    pub available: bool,
}
