//! Mock presets: named bundles of handlers and optional seed data.
//!
//! A preset belongs to exactly one category. Baseline presets describe the
//! overall API behaviour and exactly one is active at a time. Extra presets
//! tweak individual endpoints. Crud presets simulate a resource family and
//! may carry a seeder that populates the state before handlers are built.

pub mod baseline;
pub mod crud;
pub mod extra;
mod registry;

pub use registry::{catalogue, PresetRegistry, RegistryError};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::interceptor::Interceptor;
use crate::state::MockState;

/// Builds request interceptors from the current mock state.
pub type MockHandler = fn(&MockState) -> Vec<Interceptor>;

/// Future returned by a seed function.
pub type SeedFuture = BoxFuture<'static, anyhow::Result<MockState>>;

/// Transforms the mock state for one crud preset.
pub type SeedFn = fn(MockState, SeedOptions) -> SeedFuture;

/// Number of entities a count-adjustable seeder generates by default.
pub const DEFAULT_SEED_COUNT: u32 = 3;

/// Parameters handed to a seeder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    pub count: u32,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            count: DEFAULT_SEED_COUNT,
        }
    }
}

/// Seed function attached to a crud preset.
#[derive(Clone, Copy)]
pub struct MockSeeder {
    pub seed: SeedFn,
    pub default_count: u32,
}

impl MockSeeder {
    pub const fn new(seed: SeedFn) -> Self {
        Self {
            seed,
            default_count: DEFAULT_SEED_COUNT,
        }
    }

    /// Run the seeder against a state.
    pub async fn run(&self, state: MockState, options: SeedOptions) -> anyhow::Result<MockState> {
        (self.seed)(state, options).await
    }
}

impl std::fmt::Debug for MockSeeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSeeder")
            .field("default_count", &self.default_count)
            .finish_non_exhaustive()
    }
}

/// Preset category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetCategory {
    Baseline,
    Extra,
    Crud,
}

impl PresetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetCategory::Baseline => "baseline",
            PresetCategory::Extra => "extra",
            PresetCategory::Crud => "crud",
        }
    }
}

impl std::fmt::Display for PresetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaselineGroup {
    #[serde(rename = "API State")]
    ApiState,
    #[serde(rename = "Account State")]
    AccountState,
    #[serde(rename = "General")]
    General,
}

impl BaselineGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaselineGroup::ApiState => "API State",
            BaselineGroup::AccountState => "Account State",
            BaselineGroup::General => "General",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraGroup {
    #[serde(rename = "API")]
    Api,
    Account,
    Capabilities,
    Limits,
    Managed,
    Profile,
    Regions,
}

impl ExtraGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtraGroup::Api => "API",
            ExtraGroup::Account => "Account",
            ExtraGroup::Capabilities => "Capabilities",
            ExtraGroup::Limits => "Limits",
            ExtraGroup::Managed => "Managed",
            ExtraGroup::Profile => "Profile",
            ExtraGroup::Regions => "Regions",
        }
    }
}

/// How an extra group is presented to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraGroupKind {
    Account,
    Checkbox,
    Profile,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrudGroup {
    Domains,
    Linodes,
    #[serde(rename = "Placement Groups")]
    PlacementGroups,
    #[serde(rename = "Support Tickets")]
    SupportTickets,
    Volumes,
}

impl CrudGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudGroup::Domains => "Domains",
            CrudGroup::Linodes => "Linodes",
            CrudGroup::PlacementGroups => "Placement Groups",
            CrudGroup::SupportTickets => "Support Tickets",
            CrudGroup::Volumes => "Volumes",
        }
    }
}

/// Fields shared by every preset.
#[derive(Clone, Copy)]
pub struct PresetInfo {
    /// Namespaced id, e.g. `linodes:crud`.
    pub id: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Description of the preset and its purpose.
    pub desc: Option<&'static str>,
    /// Handler factories, invoked in order.
    pub handlers: &'static [MockHandler],
}

#[derive(Clone, Copy)]
pub struct BaselinePreset {
    pub info: PresetInfo,
    pub group: BaselineGroup,
}

#[derive(Clone, Copy)]
pub struct ExtraPreset {
    pub info: PresetInfo,
    pub group: ExtraGroup,
    pub kind: ExtraGroupKind,
    pub can_update_count: bool,
}

#[derive(Clone, Copy)]
pub struct CrudPreset {
    pub info: PresetInfo,
    pub group: CrudGroup,
    pub seeder: Option<MockSeeder>,
    pub can_update_count: bool,
}

/// A preset descriptor of any category.
#[derive(Clone, Copy)]
pub enum MockPreset {
    Baseline(BaselinePreset),
    Extra(ExtraPreset),
    Crud(CrudPreset),
}

impl MockPreset {
    fn info(&self) -> &PresetInfo {
        match self {
            MockPreset::Baseline(p) => &p.info,
            MockPreset::Extra(p) => &p.info,
            MockPreset::Crud(p) => &p.info,
        }
    }

    pub fn id(&self) -> &'static str {
        self.info().id
    }

    pub fn label(&self) -> &'static str {
        self.info().label
    }

    pub fn desc(&self) -> Option<&'static str> {
        self.info().desc
    }

    pub fn handlers(&self) -> &'static [MockHandler] {
        self.info().handlers
    }

    pub fn category(&self) -> PresetCategory {
        match self {
            MockPreset::Baseline(_) => PresetCategory::Baseline,
            MockPreset::Extra(_) => PresetCategory::Extra,
            MockPreset::Crud(_) => PresetCategory::Crud,
        }
    }

    /// Display group the preset belongs to.
    pub fn group(&self) -> &'static str {
        match self {
            MockPreset::Baseline(p) => p.group.as_str(),
            MockPreset::Extra(p) => p.group.as_str(),
            MockPreset::Crud(p) => p.group.as_str(),
        }
    }

    /// Whether the operator may override the seeded entity count.
    pub fn can_update_count(&self) -> bool {
        match self {
            MockPreset::Baseline(_) => false,
            MockPreset::Extra(p) => p.can_update_count,
            MockPreset::Crud(p) => p.can_update_count,
        }
    }

    pub fn seeder(&self) -> Option<&MockSeeder> {
        match self {
            MockPreset::Crud(p) => p.seeder.as_ref(),
            _ => None,
        }
    }

    /// Invoke every handler factory against the state, in order.
    pub fn build_interceptors(&self, state: &MockState) -> Vec<Interceptor> {
        self.handlers()
            .iter()
            .flat_map(|handler| handler(state))
            .collect()
    }
}

impl std::fmt::Debug for MockPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPreset")
            .field("id", &self.id())
            .field("category", &self.category())
            .field("group", &self.group())
            .field("handlers", &self.handlers().len())
            .field("seeder", &self.seeder().is_some())
            .finish()
    }
}
