use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::features::placement::{Platform, PlacementPolicy};

pub const DEFAULT_SOURCE_URL: &str = "http://samples.leanpub.com/thereactnativebook-sample.pdf";

/// Runtime settings handed over by the host in the `init` command.
/// Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub source_url: String,
    pub source_file_name: String,
    pub documents_dir: PathBuf,
    pub platform: Platform,
    /// Replaces the built-in policy for the named platform.
    pub policies: HashMap<Platform, PlacementPolicy>,
    pub network_timeout_secs: u64,
    pub log_level: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            source_file_name: "document.pdf".to_string(),
            documents_dir: std::env::temp_dir().join("signpad"),
            platform: Platform::current(),
            policies: HashMap::new(),
            network_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }
}

impl SigningConfig {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, String> {
        serde_json::from_value(value.clone()).map_err(|e| format!("config_invalid:{e}"))
    }

    pub fn active_policy(&self) -> PlacementPolicy {
        self.policies
            .get(&self.platform)
            .copied()
            .unwrap_or_else(|| self.platform.policy())
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs.max(1))
    }

    /// Stem used for signed copies, derived from the source file name.
    pub fn output_stem(&self) -> &str {
        self.source_file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&self.source_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::placement::VerticalReference;
    use serde_json::json;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = SigningConfig::from_json(&json!({})).unwrap();
        assert_eq!(cfg.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(cfg.network_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.output_stem(), "document");
    }

    #[test]
    fn policy_override_replaces_builtin() {
        let cfg = SigningConfig::from_json(&json!({
            "platform": "ios",
            "policies": {
                "ios": {
                    "centering_offset_x": 0.0,
                    "vertical_bias_offset": 0.0,
                    "vertical_reference": { "fixed": 600.0 },
                    "inset_x": 0.0,
                    "inset_y": 0.0,
                    "box_width": 80.0,
                    "box_height": 40.0
                }
            }
        }))
        .unwrap();
        let policy = cfg.active_policy();
        assert_eq!(policy.vertical_reference, VerticalReference::Fixed(600.0));
        assert_eq!(policy.box_width, 80.0);
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let err = SigningConfig::from_json(&json!({ "platform": "web" })).unwrap_err();
        assert!(err.starts_with("config_invalid"));
    }
}
