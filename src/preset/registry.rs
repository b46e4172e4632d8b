//! Static catalogue of every available preset.
//!
//! The catalogue is built once and never modified. Display order is
//! declaration order within each category.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

use super::{
    baseline, crud, extra, BaselineGroup, BaselinePreset, CrudGroup, CrudPreset, ExtraGroup,
    ExtraGroupKind, ExtraPreset, MockHandler, MockPreset, MockSeeder, PresetCategory, PresetInfo,
};

lazy_static::lazy_static! {
    /// Preset ids are `namespace:name`, lowercase with dashes.
    static ref PRESET_ID: Regex = Regex::new(r"^[a-z]+(-[a-z]+)*:[a-z]+(-[a-z]+)*$").unwrap();
}

static GLOBAL: Lazy<PresetRegistry> = Lazy::new(|| PresetRegistry::from_catalogue(catalogue()));

/// Errors raised by registry lookups and construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("preset not found: {0}")]
    NotFound(String),
    #[error("duplicate preset id: {0}")]
    DuplicateId(String),
    #[error("malformed preset id {0:?}, expected namespace:name")]
    MalformedId(String),
}

/// Read-only collection of presets indexed by id.
#[derive(Clone)]
pub struct PresetRegistry {
    presets: Vec<MockPreset>,
    index: HashMap<&'static str, usize>,
}

impl PresetRegistry {
    /// Build a registry, rejecting malformed or duplicate ids.
    pub fn new(presets: Vec<MockPreset>) -> Result<Self, RegistryError> {
        let mut index = HashMap::new();
        for (i, preset) in presets.iter().enumerate() {
            if !is_valid_id(preset.id()) {
                return Err(RegistryError::MalformedId(preset.id().to_string()));
            }
            if index.insert(preset.id(), i).is_some() {
                return Err(RegistryError::DuplicateId(preset.id().to_string()));
            }
        }
        Ok(Self { presets, index })
    }

    /// Build from the built-in catalogue, whose ids are checked by tests.
    fn from_catalogue(presets: Vec<MockPreset>) -> Self {
        let index = presets
            .iter()
            .enumerate()
            .map(|(i, preset)| (preset.id(), i))
            .collect();
        Self { presets, index }
    }

    /// The built-in catalogue.
    pub fn global() -> &'static PresetRegistry {
        &GLOBAL
    }

    pub fn get_by_id(&self, id: &str) -> Result<&MockPreset, RegistryError> {
        self.index
            .get(id)
            .map(|i| &self.presets[*i])
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn all(&self) -> &[MockPreset] {
        &self.presets
    }

    pub fn list(&self, category: PresetCategory) -> Vec<&MockPreset> {
        self.presets
            .iter()
            .filter(|p| p.category() == category)
            .collect()
    }

    pub fn list_baseline(&self) -> Vec<&MockPreset> {
        self.list(PresetCategory::Baseline)
    }

    pub fn list_extra(&self) -> Vec<&MockPreset> {
        self.list(PresetCategory::Extra)
    }

    pub fn list_crud(&self) -> Vec<&MockPreset> {
        self.list(PresetCategory::Crud)
    }

    /// Presets of a category grouped by display group, in declaration order.
    pub fn grouped(&self, category: PresetCategory) -> Vec<(&'static str, Vec<&MockPreset>)> {
        let mut groups: Vec<(&'static str, Vec<&MockPreset>)> = Vec::new();
        for preset in self.list(category) {
            match groups.iter_mut().find(|(name, _)| *name == preset.group()) {
                Some((_, members)) => members.push(preset),
                None => groups.push((preset.group(), vec![preset])),
            }
        }
        groups
    }
}

/// Whether a string is a well-formed preset id.
pub fn is_valid_id(id: &str) -> bool {
    PRESET_ID.is_match(id)
}

const fn info(
    id: &'static str,
    label: &'static str,
    desc: Option<&'static str>,
    handlers: &'static [MockHandler],
) -> PresetInfo {
    PresetInfo {
        id,
        label,
        desc,
        handlers,
    }
}

fn baseline_preset(group: BaselineGroup, info: PresetInfo) -> MockPreset {
    MockPreset::Baseline(BaselinePreset { info, group })
}

fn extra_preset(group: ExtraGroup, kind: ExtraGroupKind, info: PresetInfo) -> MockPreset {
    MockPreset::Extra(ExtraPreset {
        info,
        group,
        kind,
        can_update_count: false,
    })
}

fn crud_preset(group: CrudGroup, seeder: MockSeeder, info: PresetInfo) -> MockPreset {
    MockPreset::Crud(CrudPreset {
        info,
        group,
        seeder: Some(seeder),
        can_update_count: true,
    })
}

const BASELINE_CRUD: &[MockHandler] = &[baseline::crud_handlers];
const LEGACY: &[MockHandler] = &[baseline::static_handlers, baseline::legacy_handlers];
const STATIC_MOCKING: &[MockHandler] = &[baseline::static_handlers];
const ACCOUNT_ACTIVATION: &[MockHandler] =
    &[baseline::account_activation_handlers];
const API_MAINTENANCE: &[MockHandler] = &[baseline::api_maintenance_handlers];
const API_OFFLINE: &[MockHandler] = &[baseline::api_offline_handlers];
const API_UNSTABLE: &[MockHandler] =
    &[baseline::crud_handlers, baseline::api_unstable_handlers];
const MANAGED_ENABLED: &[MockHandler] = &[extra::managed_enabled];
const MANAGED_DISABLED: &[MockHandler] = &[extra::managed_disabled];
const CUSTOM_ACCOUNT: &[MockHandler] = &[extra::custom_account];
const RESPONSE_TIME: &[MockHandler] = &[extra::response_time];
const LINODE_LIMITS: &[MockHandler] = &[extra::linode_limits];
const LKE_LIMITS: &[MockHandler] = &[extra::lke_limits];
const CUSTOM_PROFILE: &[MockHandler] = &[extra::custom_profile];
const CORE_REGIONS: &[MockHandler] = &[extra::core_regions];
const CORE_AND_DISTRIBUTED_REGIONS: &[MockHandler] =
    &[extra::core_and_distributed_regions];
const LEGACY_REGIONS: &[MockHandler] = &[extra::legacy_regions];
const LINODES_CRUD: &[MockHandler] = &[crud::linodes::handlers];
const DOMAINS_CRUD: &[MockHandler] = &[crud::domains::handlers];
const VOLUMES_CRUD: &[MockHandler] = &[crud::volumes::handlers];
const PLACEMENT_GROUPS_CRUD: &[MockHandler] = &[crud::placement_groups::handlers];
const SUPPORT_TICKETS_CRUD: &[MockHandler] = &[crud::support_tickets::handlers];

/// Every built-in preset in display order.
pub fn catalogue() -> Vec<MockPreset> {
    vec![
        // Baselines
        baseline_preset(
            BaselineGroup::General,
            info(
                "baseline:crud",
                "CRUD",
                Some("Stateful mocks backed by the session's mock state"),
                BASELINE_CRUD,
            ),
        ),
        baseline_preset(
            BaselineGroup::General,
            info(
                "baseline:legacy",
                "Legacy",
                Some("Static fixtures with the legacy region catalogue"),
                LEGACY,
            ),
        ),
        baseline_preset(
            BaselineGroup::General,
            info(
                "baseline:static-mocking",
                "Static Mocking",
                Some("Fixed fixture responses; writes are echoed and not persisted"),
                STATIC_MOCKING,
            ),
        ),
        baseline_preset(
            BaselineGroup::AccountState,
            info(
                "baseline:account-activation",
                "Account Activation Pending",
                Some("Every request is rejected until the account is activated"),
                ACCOUNT_ACTIVATION,
            ),
        ),
        baseline_preset(
            BaselineGroup::ApiState,
            info(
                "baseline:api-maintenance",
                "API Maintenance Mode",
                Some("Every request fails with a maintenance response"),
                API_MAINTENANCE,
            ),
        ),
        baseline_preset(
            BaselineGroup::ApiState,
            info(
                "baseline:api-offline",
                "API Offline",
                Some("Every request fails with a network error"),
                API_OFFLINE,
            ),
        ),
        baseline_preset(
            BaselineGroup::ApiState,
            info(
                "baseline:api-unstable",
                "API Unstable",
                Some("CRUD mocks where every third request fails"),
                API_UNSTABLE,
            ),
        ),
        // Extras
        extra_preset(
            ExtraGroup::Managed,
            ExtraGroupKind::Select,
            info(
                "account:managed-enabled",
                "Managed Enabled",
                Some("Account has Linode Managed enabled"),
                MANAGED_ENABLED,
            ),
        ),
        extra_preset(
            ExtraGroup::Managed,
            ExtraGroupKind::Select,
            info(
                "account:managed-disabled",
                "Managed Disabled",
                Some("Account has Linode Managed disabled"),
                MANAGED_DISABLED,
            ),
        ),
        extra_preset(
            ExtraGroup::Account,
            ExtraGroupKind::Account,
            info(
                "account:custom",
                "Custom Account",
                Some("Serve the operator supplied account payload"),
                CUSTOM_ACCOUNT,
            ),
        ),
        extra_preset(
            ExtraGroup::Api,
            ExtraGroupKind::Checkbox,
            info(
                "api:response-time",
                "Response Time",
                Some("Add latency to every response"),
                RESPONSE_TIME,
            ),
        ),
        extra_preset(
            ExtraGroup::Limits,
            ExtraGroupKind::Checkbox,
            info(
                "limits:linode-limits",
                "Linode Limits",
                Some("Linode creation fails with an account limit error"),
                LINODE_LIMITS,
            ),
        ),
        extra_preset(
            ExtraGroup::Limits,
            ExtraGroupKind::Checkbox,
            info(
                "limits:lke-limits",
                "LKE Limits",
                Some("Kubernetes cluster creation fails with an account limit error"),
                LKE_LIMITS,
            ),
        ),
        extra_preset(
            ExtraGroup::Profile,
            ExtraGroupKind::Profile,
            info(
                "profile:custom",
                "Custom Profile",
                Some("Serve the operator supplied profile payload"),
                CUSTOM_PROFILE,
            ),
        ),
        extra_preset(
            ExtraGroup::Regions,
            ExtraGroupKind::Select,
            info(
                "regions:core-only",
                "Core Regions",
                Some("Only core compute regions"),
                CORE_REGIONS,
            ),
        ),
        extra_preset(
            ExtraGroup::Regions,
            ExtraGroupKind::Select,
            info(
                "regions:core-and-distributed",
                "Core and Distributed Regions",
                Some("Core regions plus distributed compute sites"),
                CORE_AND_DISTRIBUTED_REGIONS,
            ),
        ),
        extra_preset(
            ExtraGroup::Regions,
            ExtraGroupKind::Select,
            info(
                "regions:legacy",
                "Legacy Regions",
                Some("Region catalogue without newer capabilities"),
                LEGACY_REGIONS,
            ),
        ),
        // Crud
        crud_preset(
            CrudGroup::Linodes,
            MockSeeder::new(crud::linodes::seed),
            info(
                "linodes:crud",
                "Linodes CRUD",
                Some("Stateful linodes with configs and power actions"),
                LINODES_CRUD,
            ),
        ),
        crud_preset(
            CrudGroup::Domains,
            MockSeeder::new(crud::domains::seed),
            info(
                "domains:crud",
                "Domains CRUD",
                Some("Stateful domains and domain records"),
                DOMAINS_CRUD,
            ),
        ),
        crud_preset(
            CrudGroup::Volumes,
            MockSeeder::new(crud::volumes::seed),
            info(
                "volumes:crud",
                "Volumes CRUD",
                Some("Stateful block storage volumes with attach and detach"),
                VOLUMES_CRUD,
            ),
        ),
        crud_preset(
            CrudGroup::PlacementGroups,
            MockSeeder::new(crud::placement_groups::seed),
            info(
                "placement-groups:crud",
                "Placement Groups CRUD",
                Some("Stateful placement groups with linode assignment"),
                PLACEMENT_GROUPS_CRUD,
            ),
        ),
        crud_preset(
            CrudGroup::SupportTickets,
            MockSeeder::new(crud::support_tickets::seed),
            info(
                "support-tickets:crud",
                "Support Tickets CRUD",
                Some("Stateful support tickets and replies"),
                SUPPORT_TICKETS_CRUD,
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalogue_is_valid() {
        let registry = PresetRegistry::new(catalogue());
        assert!(registry.is_ok(), "{:?}", registry.err());
    }

    #[test]
    fn test_category_listing_order() {
        let registry = PresetRegistry::global();
        let baseline: Vec<_> = registry.list_baseline().iter().map(|p| p.id()).collect();
        assert_eq!(baseline[0], "baseline:crud");
        assert_eq!(baseline.len(), 7);
        assert_eq!(registry.list_extra().len(), 10);
        let crud: Vec<_> = registry.list_crud().iter().map(|p| p.id()).collect();
        assert_eq!(
            crud,
            vec![
                "linodes:crud",
                "domains:crud",
                "volumes:crud",
                "placement-groups:crud",
                "support-tickets:crud",
            ]
        );
    }

    #[test]
    fn test_get_by_id() {
        let registry = PresetRegistry::global();
        let preset = registry.get_by_id("linodes:crud").unwrap();
        assert_eq!(preset.category(), PresetCategory::Crud);
        assert!(preset.seeder().is_some());
        assert!(preset.can_update_count());

        assert_eq!(
            registry.get_by_id("nope:missing").unwrap_err(),
            RegistryError::NotFound("nope:missing".to_string())
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut presets = catalogue();
        presets.push(presets[0]);
        assert_eq!(
            PresetRegistry::new(presets).err(),
            Some(RegistryError::DuplicateId("baseline:crud".to_string()))
        );
    }

    #[test]
    fn test_malformed_id_rejected() {
        let presets = vec![baseline_preset(
            BaselineGroup::General,
            info("no-namespace", "Bad", None, &[]),
        )];
        assert!(matches!(
            PresetRegistry::new(presets),
            Err(RegistryError::MalformedId(_))
        ));
    }

    #[test]
    fn test_grouped_preserves_declaration_order() {
        let registry = PresetRegistry::global();
        let groups = registry.grouped(PresetCategory::Baseline);
        let names: Vec<_> = groups.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["General", "Account State", "API State"]);
        assert_eq!(groups[2].1.len(), 3);
    }

    #[test]
    fn test_id_format() {
        assert!(is_valid_id("placement-groups:crud"));
        assert!(is_valid_id("regions:core-and-distributed"));
        assert!(!is_valid_id("Baseline:crud"));
        assert!(!is_valid_id("baseline:"));
    }
}
