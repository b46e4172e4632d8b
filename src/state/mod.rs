//! In-memory snapshot of every simulated resource.
//!
//! A [`MockState`] is an owned value. Composition creates it, seeders
//! transform it, and the installed layer lends it mutably to interceptors
//! while a request is being served. Nothing else holds a reference to it.

pub mod entities;
pub mod factories;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

pub use entities::*;

/// Collections that carry synthetic numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Linodes,
    LinodeConfigs,
    Domains,
    DomainRecords,
    Volumes,
    Firewalls,
    PlacementGroups,
    Events,
    SupportTickets,
    SupportReplies,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Linodes => "linodes",
            Collection::LinodeConfigs => "linode_configs",
            Collection::Domains => "domains",
            Collection::DomainRecords => "domain_records",
            Collection::Volumes => "volumes",
            Collection::Firewalls => "firewalls",
            Collection::PlacementGroups => "placement_groups",
            Collection::Events => "event_queue",
            Collection::SupportTickets => "support_tickets",
            Collection::SupportReplies => "support_replies",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reference from one entity to another that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanRef {
    pub collection: Collection,
    pub id: u64,
    pub missing: Collection,
    pub missing_id: u64,
}

impl std::fmt::Display for OrphanRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} references missing {} {}",
            self.collection, self.id, self.missing, self.missing_id
        )
    }
}

/// Stateful data shared among mock interceptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockState {
    pub domain_records: Vec<DomainRecord>,
    pub domains: Vec<Domain>,
    pub event_queue: Vec<Event>,
    pub firewalls: Vec<Firewall>,
    /// Configs paired with the id of the linode that owns them.
    pub linode_configs: Vec<(u64, Config)>,
    pub linodes: Vec<Linode>,
    pub notification_queue: Vec<Notification>,
    pub placement_groups: Vec<PlacementGroup>,
    pub region_availability: Vec<RegionAvailability>,
    pub regions: Vec<Region>,
    pub support_replies: Vec<SupportReply>,
    pub support_tickets: Vec<SupportTicket>,
    pub volumes: Vec<Volume>,
    /// Operator supplied account payload served by `account:custom`.
    #[serde(default)]
    pub custom_account: Option<Value>,
    /// Operator supplied profile payload served by `profile:custom`.
    #[serde(default)]
    pub custom_profile: Option<Value>,
}

impl MockState {
    /// Create a state with every collection empty.
    pub fn initialize() -> Self {
        Self::default()
    }

    /// Discard all data, returning to a freshly initialized state.
    pub fn reset(&mut self) {
        *self = Self::initialize();
    }

    /// Next free id for a collection: one past the current maximum.
    pub fn next_id(&self, collection: Collection) -> u64 {
        self.ids(collection).into_iter().max().unwrap_or(0) + 1
    }

    /// All ids currently present in a collection, in storage order.
    pub fn ids(&self, collection: Collection) -> Vec<u64> {
        match collection {
            Collection::Linodes => self.linodes.iter().map(|e| e.id).collect(),
            Collection::LinodeConfigs => self.linode_configs.iter().map(|(_, c)| c.id).collect(),
            Collection::Domains => self.domains.iter().map(|e| e.id).collect(),
            Collection::DomainRecords => self.domain_records.iter().map(|e| e.id).collect(),
            Collection::Volumes => self.volumes.iter().map(|e| e.id).collect(),
            Collection::Firewalls => self.firewalls.iter().map(|e| e.id).collect(),
            Collection::PlacementGroups => self.placement_groups.iter().map(|e| e.id).collect(),
            Collection::Events => self.event_queue.iter().map(|e| e.id).collect(),
            Collection::SupportTickets => self.support_tickets.iter().map(|e| e.id).collect(),
            Collection::SupportReplies => self.support_replies.iter().map(|e| e.id).collect(),
        }
    }

    /// Collections containing the same id more than once.
    pub fn duplicate_ids(&self) -> Vec<(Collection, u64)> {
        let all = [
            Collection::Linodes,
            Collection::LinodeConfigs,
            Collection::Domains,
            Collection::DomainRecords,
            Collection::Volumes,
            Collection::Firewalls,
            Collection::PlacementGroups,
            Collection::Events,
            Collection::SupportTickets,
            Collection::SupportReplies,
        ];

        let mut duplicates = Vec::new();
        for collection in all {
            let mut seen = HashSet::new();
            for id in self.ids(collection) {
                if !seen.insert(id) {
                    duplicates.push((collection, id));
                }
            }
        }
        duplicates
    }

    /// Every foreign key that points at a missing entity.
    pub fn orphans(&self) -> Vec<OrphanRef> {
        let linodes: HashSet<u64> = self.linodes.iter().map(|l| l.id).collect();
        let domains: HashSet<u64> = self.domains.iter().map(|d| d.id).collect();
        let tickets: HashSet<u64> = self.support_tickets.iter().map(|t| t.id).collect();
        let groups: HashSet<u64> = self.placement_groups.iter().map(|g| g.id).collect();

        let mut orphans = Vec::new();
        let mut check = |collection, id, missing, missing_id, present: &HashSet<u64>| {
            if !present.contains(&missing_id) {
                orphans.push(OrphanRef {
                    collection,
                    id,
                    missing,
                    missing_id,
                });
            }
        };

        for record in &self.domain_records {
            check(
                Collection::DomainRecords,
                record.id,
                Collection::Domains,
                record.domain_id,
                &domains,
            );
        }
        for (linode_id, config) in &self.linode_configs {
            check(
                Collection::LinodeConfigs,
                config.id,
                Collection::Linodes,
                *linode_id,
                &linodes,
            );
        }
        for volume in &self.volumes {
            if let Some(linode_id) = volume.linode_id {
                check(Collection::Volumes, volume.id, Collection::Linodes, linode_id, &linodes);
            }
        }
        for reply in &self.support_replies {
            check(
                Collection::SupportReplies,
                reply.id,
                Collection::SupportTickets,
                reply.ticket_id,
                &tickets,
            );
        }
        for group in &self.placement_groups {
            for member in &group.members {
                check(
                    Collection::PlacementGroups,
                    group.id,
                    Collection::Linodes,
                    member.linode_id,
                    &linodes,
                );
            }
        }
        for linode in &self.linodes {
            if let Some(pg) = &linode.placement_group {
                check(Collection::Linodes, linode.id, Collection::PlacementGroups, pg.id, &groups);
            }
        }
        for firewall in &self.firewalls {
            for device in firewall.entities.iter().filter(|d| d.device_type == "linode") {
                check(Collection::Firewalls, firewall.id, Collection::Linodes, device.id, &linodes);
            }
        }

        orphans
    }

    /// Number of entries in each collection, keyed by collection name.
    pub fn collection_sizes(&self) -> BTreeMap<String, usize> {
        let mut sizes = BTreeMap::new();
        sizes.insert("domain_records".to_string(), self.domain_records.len());
        sizes.insert("domains".to_string(), self.domains.len());
        sizes.insert("event_queue".to_string(), self.event_queue.len());
        sizes.insert("firewalls".to_string(), self.firewalls.len());
        sizes.insert("linode_configs".to_string(), self.linode_configs.len());
        sizes.insert("linodes".to_string(), self.linodes.len());
        sizes.insert("notification_queue".to_string(), self.notification_queue.len());
        sizes.insert("placement_groups".to_string(), self.placement_groups.len());
        sizes.insert("region_availability".to_string(), self.region_availability.len());
        sizes.insert("regions".to_string(), self.regions.len());
        sizes.insert("support_replies".to_string(), self.support_replies.len());
        sizes.insert("support_tickets".to_string(), self.support_tickets.len());
        sizes.insert("volumes".to_string(), self.volumes.len());
        sizes
    }

    /// Append an event for an action taken against an entity.
    pub fn push_event(&mut self, action: &str, entity: Option<EntityRef>) -> u64 {
        let id = self.next_id(Collection::Events);
        self.event_queue.push(factories::event(id, action, entity));
        id
    }

    pub fn linode(&self, id: u64) -> Option<&Linode> {
        self.linodes.iter().find(|l| l.id == id)
    }

    pub fn linode_mut(&mut self, id: u64) -> Option<&mut Linode> {
        self.linodes.iter_mut().find(|l| l.id == id)
    }

    pub fn domain(&self, id: u64) -> Option<&Domain> {
        self.domains.iter().find(|d| d.id == id)
    }

    pub fn volume_mut(&mut self, id: u64) -> Option<&mut Volume> {
        self.volumes.iter_mut().find(|v| v.id == id)
    }

    pub fn placement_group_mut(&mut self, id: u64) -> Option<&mut PlacementGroup> {
        self.placement_groups.iter_mut().find(|g| g.id == id)
    }

    pub fn support_ticket_mut(&mut self, id: u64) -> Option<&mut SupportTicket> {
        self.support_tickets.iter_mut().find(|t| t.id == id)
    }

    /// Remove a linode and everything that depends on it.
    ///
    /// Configs are deleted, volumes are detached, and placement group and
    /// firewall memberships are dropped.
    pub fn remove_linode(&mut self, id: u64) -> Option<Linode> {
        let index = self.linodes.iter().position(|l| l.id == id)?;
        let removed = self.linodes.remove(index);

        self.linode_configs.retain(|(linode_id, _)| *linode_id != id);
        for volume in self.volumes.iter_mut().filter(|v| v.linode_id == Some(id)) {
            volume.linode_id = None;
            volume.linode_label = None;
        }
        for group in &mut self.placement_groups {
            group.members.retain(|m| m.linode_id != id);
        }
        for firewall in &mut self.firewalls {
            firewall
                .entities
                .retain(|d| !(d.device_type == "linode" && d.id == id));
        }

        Some(removed)
    }

    /// Remove a domain together with its records.
    pub fn remove_domain(&mut self, id: u64) -> Option<Domain> {
        let index = self.domains.iter().position(|d| d.id == id)?;
        self.domain_records.retain(|r| r.domain_id != id);
        Some(self.domains.remove(index))
    }

    /// Remove a placement group, clearing the reference on its members.
    pub fn remove_placement_group(&mut self, id: u64) -> Option<PlacementGroup> {
        let index = self.placement_groups.iter().position(|g| g.id == id)?;
        for linode in &mut self.linodes {
            if linode.placement_group.as_ref().map(|pg| pg.id) == Some(id) {
                linode.placement_group = None;
            }
        }
        Some(self.placement_groups.remove(index))
    }
}
