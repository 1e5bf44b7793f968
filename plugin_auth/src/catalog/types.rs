//! Core types for the tool catalog.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    auth::{AuthFieldGroup, AuthRequirement},
    tool::ToolConstructor,
};

/// One credential a tool asks the user for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFieldSpec {
    /// Alias group; `A||B` in manifests.
    pub auth_field: AuthFieldGroup,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub description: String,
}

impl AuthFieldSpec {
    pub fn new(auth_field: AuthFieldGroup) -> Self {
        Self {
            label: auth_field.primary().to_string(),
            auth_field,
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Manifests may omit `label`; fall back to the primary field name.
    fn with_default_label(mut self) -> Self {
        if self.label.trim().is_empty() {
            self.label = self.auth_field.primary().to_string();
        }
        self
    }
}

/// Catalog entry: what a plugin key needs and how to build it.
#[derive(Clone)]
pub struct ToolRecord {
    pub plugin_key: String,
    pub name: String,
    pub description: String,
    pub auth_config: Vec<AuthFieldSpec>,
    /// Static constructor input.
    pub config: Map<String, Value>,
    requirement: AuthRequirement,
    constructor: Arc<dyn ToolConstructor>,
}

impl ToolRecord {
    pub fn new(plugin_key: impl Into<String>, constructor: Arc<dyn ToolConstructor>) -> Self {
        let plugin_key = plugin_key.into();
        Self {
            name: plugin_key.clone(),
            plugin_key,
            description: String::new(),
            auth_config: Vec::new(),
            config: Map::new(),
            requirement: AuthRequirement::none(),
            constructor,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_auth_field(mut self, spec: AuthFieldSpec) -> Self {
        self.auth_config.push(spec.with_default_label());
        self.requirement = requirement_of(&self.auth_config);
        self
    }

    #[must_use]
    pub fn with_auth_config(mut self, auth_config: Vec<AuthFieldSpec>) -> Self {
        self.requirement = requirement_of(&auth_config);
        self.auth_config = auth_config
            .into_iter()
            .map(AuthFieldSpec::with_default_label)
            .collect();
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = config;
        self
    }

    pub fn requirement(&self) -> &AuthRequirement {
        &self.requirement
    }

    pub fn requires_auth(&self) -> bool {
        !self.requirement.is_empty()
    }

    pub fn constructor(&self) -> &Arc<dyn ToolConstructor> {
        &self.constructor
    }
}

fn requirement_of(auth_config: &[AuthFieldSpec]) -> AuthRequirement {
    AuthRequirement::new(auth_config.iter().map(|s| s.auth_field.clone()).collect())
}

impl fmt::Debug for ToolRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRecord")
            .field("plugin_key", &self.plugin_key)
            .field("name", &self.name)
            .field("auth_config", &self.auth_config)
            .finish_non_exhaustive()
    }
}
