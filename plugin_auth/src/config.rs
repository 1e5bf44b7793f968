//! Configuration types and loading.
//!
//! The tool manifest is declarative: each entry names a plugin key, the
//! credentials it needs and the static input its constructor receives.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    auth::{EnvironmentSnapshot, USER_PROVIDED},
    catalog::AuthFieldSpec,
    error::PluginAuthResult,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolgateConfig {
    /// Environment value meaning "users supply this secret themselves"
    #[serde(default = "default_user_provided_sentinel")]
    pub user_provided_sentinel: String,

    /// Tool manifest, in catalog order
    #[serde(default)]
    pub tools: Vec<ToolManifestEntry>,
}

/// One tool definition in the manifest.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolManifestEntry {
    pub plugin_key: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: String,

    /// Credentials the tool needs; empty means no auth
    #[serde(default)]
    pub auth_config: Vec<AuthFieldSpec>,

    /// Static constructor input
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
}

fn default_user_provided_sentinel() -> String {
    USER_PROVIDED.to_string()
}

impl Default for ToolgateConfig {
    fn default() -> Self {
        Self {
            user_provided_sentinel: default_user_provided_sentinel(),
            tools: Vec::new(),
        }
    }
}

impl ToolgateConfig {
    /// Load configuration from a YAML file
    pub async fn from_file(path: &str) -> PluginAuthResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> PluginAuthResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Snapshot the process environment with this config's sentinel applied.
    pub fn environment(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot::from_process()
            .with_user_provided_sentinel(self.user_provided_sentinel.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_minimal_config() {
        let config = ToolgateConfig::from_yaml("tools: []").expect("Failed to parse YAML");
        assert!(config.tools.is_empty());
        assert_eq!(config.user_provided_sentinel, "user_provided");
    }

    #[test]
    fn test_yaml_full_config() {
        let yaml = r#"
user_provided_sentinel: byo

tools:
  - plugin_key: calculator
    name: Calculator
    description: Perform simple arithmetic

  - plugin_key: google
    name: Google
    description: Search the web
    auth_config:
      - auth_field: GOOGLE_CSE_ID
        label: Google CSE ID
      - auth_field: "GOOGLE_SEARCH_API_KEY||GOOGLE_API_KEY"
        label: Google API Key
        description: Key with Custom Search enabled
    config:
      safe_search: true
      region: us
"#;

        let config = ToolgateConfig::from_yaml(yaml).expect("Failed to parse YAML");
        assert_eq!(config.user_provided_sentinel, "byo");
        assert_eq!(config.tools.len(), 2);

        let calculator = &config.tools[0];
        assert_eq!(calculator.plugin_key, "calculator");
        assert!(calculator.auth_config.is_empty());
        assert!(calculator.config.is_empty());

        let google = &config.tools[1];
        assert_eq!(google.name.as_deref(), Some("Google"));
        assert_eq!(google.auth_config.len(), 2);
        assert_eq!(google.auth_config[1].auth_field.len(), 2);
        assert_eq!(google.config.get("region"), Some(&serde_json::json!("us")));
    }

    #[test]
    fn test_yaml_rejects_blank_alias() {
        let yaml = r#"
tools:
  - plugin_key: broken
    auth_config:
      - auth_field: "KEY||"
"#;
        assert!(ToolgateConfig::from_yaml(yaml).is_err());
    }

    #[tokio::test]
    async fn test_from_file_missing() {
        let result = ToolgateConfig::from_file("/nonexistent/toolgate.yaml").await;
        assert!(matches!(result, Err(crate::error::PluginAuthError::Io(_))));
    }
}
