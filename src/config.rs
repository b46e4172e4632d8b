//! Mock configuration file.
//!
//! A configuration names the presets to activate and any per-preset
//! overrides, e.g.
//!
//! ```yaml
//! baseline: baseline:crud
//! presets: ["linodes:crud", "domains:crud"]
//! counts:
//!   linodes:crud: 7
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::compose::Selection;
use crate::logging::LogConfig;
use crate::preset::{PresetCategory, PresetRegistry};

/// Top-level mock configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MockConfig {
    /// Baseline preset id.
    #[serde(default)]
    pub baseline: Option<String>,
    /// Extra and crud preset ids, in activation order.
    #[serde(default)]
    pub presets: Vec<String>,
    /// Seed count overrides keyed by preset id.
    #[serde(default)]
    pub counts: BTreeMap<String, u32>,
    /// Payload served by `account:custom`.
    #[serde(default)]
    pub custom_account: Option<Value>,
    /// Payload served by `profile:custom`.
    #[serde(default)]
    pub custom_profile: Option<Value>,
    #[serde(default)]
    pub log: LogConfig,
}

impl MockConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        let config: MockConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// The baseline, falling back to `baseline:crud`.
    pub fn baseline_id(&self) -> &str {
        self.baseline.as_deref().unwrap_or(DEFAULT_BASELINE)
    }

    /// Selection equivalent to this configuration.
    pub fn to_selection(&self) -> Selection {
        let mut preset_ids = vec![self.baseline_id().to_string()];
        preset_ids.extend(self.presets.iter().cloned());
        Selection {
            preset_ids,
            counts: self.counts.clone(),
            custom_account: self.custom_account.clone(),
            custom_profile: self.custom_profile.clone(),
        }
    }
}

/// Baseline used when a configuration does not name one.
pub const DEFAULT_BASELINE: &str = "baseline:crud";

/// Validate a configuration against a registry.
pub fn validate(config: &MockConfig, registry: &PresetRegistry) -> anyhow::Result<()> {
    // Validate baseline
    let baseline = registry
        .get_by_id(config.baseline_id())
        .map_err(|e| anyhow::anyhow!("invalid baseline: {}", e))?;
    if baseline.category() != PresetCategory::Baseline {
        anyhow::bail!("{} is not a baseline preset", baseline.id());
    }

    // Validate presets resolve and are not baselines
    for id in &config.presets {
        let preset = registry
            .get_by_id(id)
            .map_err(|e| anyhow::anyhow!("invalid presets entry: {}", e))?;
        if preset.category() == PresetCategory::Baseline {
            anyhow::bail!(
                "{} is a baseline preset, set it with the baseline key instead",
                id
            );
        }
    }

    // Validate counts
    for (id, count) in &config.counts {
        if !config.presets.contains(id) {
            anyhow::bail!("count given for {}, which is not in presets", id);
        }
        if *count == 0 {
            anyhow::bail!("count for {} must be positive", id);
        }
        if let Ok(preset) = registry.get_by_id(id) {
            if !preset.can_update_count() {
                anyhow::bail!("preset {} does not accept a count", id);
            }
        }
    }

    // Custom payloads must be objects
    for (key, payload) in [
        ("custom_account", &config.custom_account),
        ("custom_profile", &config.custom_profile),
    ] {
        if let Some(value) = payload {
            if !value.is_object() {
                anyhow::bail!("{} must be a mapping", key);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
baseline: baseline:crud
presets:
  - linodes:crud
  - domains:crud
counts:
  linodes:crud: 7
custom_profile:
  username: yaml-user
log:
  level: debug
  format: json
"#;
        let config = MockConfig::parse_str(yaml).unwrap();
        assert_eq!(config.presets.len(), 2);
        assert_eq!(config.counts["linodes:crud"], 7);
        assert_eq!(config.custom_profile.as_ref().unwrap()["username"], "yaml-user");
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(validate(&config, PresetRegistry::global()).is_ok());

        let selection = config.to_selection();
        assert_eq!(
            selection.preset_ids,
            vec!["baseline:crud", "linodes:crud", "domains:crud"]
        );
    }

    #[test]
    fn test_parse_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "presets: [\"volumes:crud\"]").unwrap();
        let config = MockConfig::parse_file(file.path()).unwrap();
        assert_eq!(config.baseline_id(), DEFAULT_BASELINE);
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn test_parse_file_missing() {
        assert!(MockConfig::parse_file("/nonexistent/cloudmock.yaml").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_entries() {
        let registry = PresetRegistry::global();
        let cases = [
            "baseline: linodes:crud",
            "presets:\n  - baseline:legacy",
            "presets:\n  - nope:nothing",
            "counts:\n  linodes:crud: 2",
            "presets:\n  - linodes:crud\ncounts:\n  linodes:crud: 0",
            "presets:\n  - api:response-time\ncounts:\n  api:response-time: 2",
            "custom_account: [1, 2]",
        ];
        for yaml in cases {
            let config = MockConfig::parse_str(yaml).unwrap();
            assert!(validate(&config, registry).is_err(), "accepted {:?}", yaml);
        }
    }
}
