//! Output formatting for activation results and the preset catalogue.
//!
//! Supports two output formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: structured output for programmatic consumption

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::layer::MockLayer;
use crate::preset::{PresetCategory, PresetRegistry};

/// Summary of an installed mock layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationReport {
    pub version: String,
    /// Activation generation that produced the layer.
    pub generation: u64,
    pub presets: Vec<ReportPreset>,
    pub interceptors: usize,
    /// Entity count per state collection.
    pub collections: BTreeMap<String, usize>,
    /// Dangling references found in the composed state.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orphans: Vec<String>,
}

/// One active preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPreset {
    pub id: String,
    pub label: String,
    pub category: PresetCategory,
}

impl ActivationReport {
    /// Summarise a layer. Presets the registry does not know are skipped.
    pub fn new(generation: u64, layer: &MockLayer, registry: &PresetRegistry) -> Self {
        let presets = layer
            .preset_ids()
            .iter()
            .filter_map(|id| registry.get_by_id(id).ok())
            .map(|p| ReportPreset {
                id: p.id().to_string(),
                label: p.label().to_string(),
                category: p.category(),
            })
            .collect();

        let state = layer.state();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generation,
            presets,
            interceptors: layer.interceptor_count(),
            collections: state.collection_sizes(),
            orphans: state.orphans().iter().map(ToString::to_string).collect(),
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render in pretty (human-readable) format.
    pub fn render_pretty(&self) -> String {
        let mut out = String::new();

        // Header
        let _ = writeln!(out);
        let _ = writeln!(out, "  {} v{}", "cloudmock".cyan().bold(), self.version);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  {}{}  {}{}",
            "Generation: ".dimmed(),
            self.generation,
            "Interceptors: ".dimmed(),
            self.interceptors
        );
        let _ = writeln!(out);

        // Presets
        let _ = writeln!(out, "  {} ({}):", "Presets".bold(), self.presets.len());
        for preset in &self.presets {
            let _ = writeln!(
                out,
                "    {} {:<32} {}",
                category_tag(preset.category),
                preset.id,
                preset.label.dimmed()
            );
        }
        let _ = writeln!(out);

        // Non-empty collections
        let populated: Vec<(&String, &usize)> =
            self.collections.iter().filter(|(_, n)| **n > 0).collect();
        if !populated.is_empty() {
            let _ = writeln!(out, "  {}", "State:".bold());
            for (name, count) in populated {
                let _ = writeln!(out, "    {:<20} {:>4}", name, count);
            }
            let _ = writeln!(out);
        }

        if !self.orphans.is_empty() {
            let _ = writeln!(out, "  {} ({}):", "Orphans".red(), self.orphans.len());
            for orphan in &self.orphans {
                let _ = writeln!(out, "    {}", orphan);
            }
            let _ = writeln!(out);
        }
        out
    }

    pub fn write_pretty(&self) {
        print!("{}", self.render_pretty());
    }

    pub fn write_json(&self) -> anyhow::Result<()> {
        println!("{}", self.to_json()?);
        Ok(())
    }
}

fn category_tag(category: PresetCategory) -> ColoredString {
    match category {
        PresetCategory::Baseline => "BASE ".cyan(),
        PresetCategory::Extra => "EXTRA".yellow(),
        PresetCategory::Crud => "CRUD ".green(),
    }
}

/// Render every preset in a registry, grouped by category and display group.
pub fn render_catalogue(registry: &PresetRegistry) -> String {
    let mut out = String::new();
    for category in [PresetCategory::Baseline, PresetCategory::Extra, PresetCategory::Crud] {
        let _ = writeln!(out, "  {}", category.as_str().to_uppercase().bold());
        for (group, presets) in registry.grouped(category) {
            let _ = writeln!(out, "    {}", group.dimmed());
            for preset in presets {
                let count = if preset.can_update_count() {
                    " [count]".dimmed().to_string()
                } else {
                    String::new()
                };
                let _ = writeln!(out, "      {:<32} {}{}", preset.id(), preset.label(), count);
            }
        }
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{factories, MockState};

    fn layer() -> MockLayer {
        let mut state = MockState::initialize();
        state.linodes.push(factories::linode(1, factories::DEFAULT_REGION));
        MockLayer::new(
            state,
            Vec::new(),
            vec!["baseline:crud".to_string(), "linodes:crud".to_string()],
        )
    }

    #[test]
    fn test_report_summarises_layer() {
        let report = ActivationReport::new(3, &layer(), PresetRegistry::global());
        assert_eq!(report.generation, 3);
        assert_eq!(report.presets.len(), 2);
        assert_eq!(report.presets[1].category, PresetCategory::Crud);
        assert_eq!(report.collections["linodes"], 1);
        assert!(report.orphans.is_empty());
    }

    #[test]
    fn test_json_roundtrip_fields() {
        let report = ActivationReport::new(1, &layer(), PresetRegistry::global());
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["presets"][0]["id"], "baseline:crud");
        assert_eq!(value["presets"][0]["category"], "baseline");
        assert!(value.get("orphans").is_none());
    }

    #[test]
    fn test_pretty_lists_populated_collections() {
        colored::control::set_override(false);
        let text = ActivationReport::new(1, &layer(), PresetRegistry::global()).render_pretty();
        assert!(text.contains("linodes:crud"));
        assert!(text.contains("linodes"));
        assert!(!text.contains("volumes"));
    }

    #[test]
    fn test_catalogue_lists_every_preset() {
        colored::control::set_override(false);
        let registry = PresetRegistry::global();
        let text = render_catalogue(registry);
        for preset in registry.all() {
            assert!(text.contains(preset.id()), "missing {}", preset.id());
        }
        assert!(text.contains("API State"));
    }
}
