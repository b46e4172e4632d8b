//! Composition engine that turns a preset selection into a mock layer.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::interceptor::Interceptor;
use crate::preset::{MockPreset, PresetCategory, PresetRegistry, SeedOptions};
use crate::state::MockState;

/// Errors that abort a composition. No partial layer is ever produced.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("unknown preset: {id}")]
    UnknownPreset { id: String },

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("seeder for {preset_id} failed")]
    SeederFailure {
        preset_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("activation {generation} was superseded by a newer one")]
    Superseded { generation: u64 },
}

/// The presets an operator has chosen, with per-preset overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Selected preset ids, in the order the operator picked them.
    pub preset_ids: Vec<String>,
    /// Seed count overrides keyed by preset id.
    pub counts: BTreeMap<String, u32>,
    pub custom_account: Option<Value>,
    pub custom_profile: Option<Value>,
}

impl Selection {
    pub fn new<I, S>(preset_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preset_ids: preset_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append a preset id.
    pub fn with_preset(mut self, id: &str) -> Self {
        self.preset_ids.push(id.to_string());
        self
    }

    /// Override the seed count for a preset.
    pub fn with_count(mut self, id: &str, count: u32) -> Self {
        self.counts.insert(id.to_string(), count);
        self
    }

    pub fn with_custom_account(mut self, account: Value) -> Self {
        self.custom_account = Some(account);
        self
    }

    pub fn with_custom_profile(mut self, profile: Value) -> Self {
        self.custom_profile = Some(profile);
        self
    }
}

/// Result of a successful composition, ready to be installed.
#[derive(Debug)]
pub struct ComposedMock {
    pub state: MockState,
    pub interceptors: Vec<Interceptor>,
    /// Active preset ids: the baseline first, then extras and cruds.
    pub preset_ids: Vec<String>,
}

/// Composes selections against a preset registry.
pub struct Composer<'r> {
    registry: &'r PresetRegistry,
}

impl<'r> Composer<'r> {
    pub fn new(registry: &'r PresetRegistry) -> Self {
        Self { registry }
    }

    /// Build the state and interceptors for a selection.
    ///
    /// Crud seeders run sequentially in selection order, so each one sees
    /// the entities produced by the seeders before it. Handlers are built
    /// from the final state: baseline first, then extras, then cruds.
    pub async fn compose(&self, selection: &Selection) -> Result<ComposedMock, ComposeError> {
        let presets = self.resolve(selection)?;
        let (baseline, extras, cruds) = partition(&presets, selection)?;
        validate_counts(&presets, selection)?;

        // Fresh state for every composition
        let mut state = MockState::initialize();
        state.custom_account = selection.custom_account.clone();
        state.custom_profile = selection.custom_profile.clone();

        // Seed crud data
        for preset in &cruds {
            let Some(seeder) = preset.seeder() else {
                continue;
            };
            let count = selection
                .counts
                .get(preset.id())
                .copied()
                .unwrap_or(seeder.default_count);
            debug!(preset = preset.id(), count, "running seeder");
            state = seeder
                .run(state, SeedOptions { count })
                .await
                .map_err(|source| ComposeError::SeederFailure {
                    preset_id: preset.id().to_string(),
                    source,
                })?;
        }

        // Build interceptors against the final state
        let ordered: Vec<&MockPreset> = std::iter::once(baseline)
            .chain(extras.iter().copied())
            .chain(cruds.iter().copied())
            .collect();
        let interceptors: Vec<Interceptor> = ordered
            .iter()
            .flat_map(|preset| preset.build_interceptors(&state))
            .collect();
        let preset_ids: Vec<String> = ordered.iter().map(|p| p.id().to_string()).collect();

        info!(
            presets = ?preset_ids,
            interceptors = interceptors.len(),
            "composed mock layer"
        );
        Ok(ComposedMock {
            state,
            interceptors,
            preset_ids,
        })
    }

    fn resolve(&self, selection: &Selection) -> Result<Vec<&'r MockPreset>, ComposeError> {
        let mut seen = HashSet::new();
        let mut presets = Vec::with_capacity(selection.preset_ids.len());
        for id in &selection.preset_ids {
            let preset = self
                .registry
                .get_by_id(id)
                .map_err(|_| ComposeError::UnknownPreset { id: id.clone() })?;
            if !seen.insert(id.as_str()) {
                return Err(ComposeError::InvalidSelection(format!(
                    "preset {} selected more than once",
                    id
                )));
            }
            presets.push(preset);
        }
        Ok(presets)
    }
}

type Partitioned<'a> = (&'a MockPreset, Vec<&'a MockPreset>, Vec<&'a MockPreset>);

fn partition<'a>(
    presets: &[&'a MockPreset],
    selection: &Selection,
) -> Result<Partitioned<'a>, ComposeError> {
    let baselines: Vec<&MockPreset> = presets
        .iter()
        .copied()
        .filter(|p| p.category() == PresetCategory::Baseline)
        .collect();
    let baseline = match baselines.as_slice() {
        [one] => *one,
        [] => {
            return Err(ComposeError::InvalidSelection(
                "exactly one baseline preset is required, none selected".to_string(),
            ));
        }
        many => {
            let ids: Vec<&str> = many.iter().map(|p| p.id()).collect();
            return Err(ComposeError::InvalidSelection(format!(
                "exactly one baseline preset is required, got {}",
                ids.join(", ")
            )));
        }
    };

    let by_category = |category| {
        presets
            .iter()
            .copied()
            .filter(move |p| p.category() == category)
            .collect::<Vec<_>>()
    };
    debug!(selected = selection.preset_ids.len(), baseline = baseline.id(), "selection resolved");
    Ok((
        baseline,
        by_category(PresetCategory::Extra),
        by_category(PresetCategory::Crud),
    ))
}

fn validate_counts(presets: &[&MockPreset], selection: &Selection) -> Result<(), ComposeError> {
    for (id, count) in &selection.counts {
        let preset = presets
            .iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| {
                ComposeError::InvalidSelection(format!("count given for unselected preset {}", id))
            })?;
        if !preset.can_update_count() {
            return Err(ComposeError::InvalidSelection(format!(
                "preset {} does not accept a count",
                id
            )));
        }
        if *count == 0 {
            return Err(ComposeError::InvalidSelection(format!(
                "count for {} must be positive",
                id
            )));
        }
    }
    Ok(())
}
