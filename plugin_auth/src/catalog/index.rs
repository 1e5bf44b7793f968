//! Immutable tool catalog.
//!
//! Built once at startup and shared by reference. Lookup is by plugin key;
//! iteration follows declaration order.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tracing::{debug, info};

use super::types::ToolRecord;
use crate::{
    config::ToolgateConfig,
    error::{PluginAuthError, PluginAuthResult},
    tool::{ManifestTool, ToolConstructor},
};

/// Native constructors by plugin key, used when building from a manifest.
#[derive(Default, Clone)]
pub struct ConstructorRegistry {
    constructors: HashMap<String, Arc<dyn ToolConstructor>>,
}

impl ConstructorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, plugin_key: impl Into<String>, ctor: Arc<dyn ToolConstructor>) -> Self {
        self.register(plugin_key, ctor);
        self
    }

    pub fn register(&mut self, plugin_key: impl Into<String>, ctor: Arc<dyn ToolConstructor>) {
        self.constructors.insert(plugin_key.into(), ctor);
    }

    pub fn get(&self, plugin_key: &str) -> Option<&Arc<dyn ToolConstructor>> {
        self.constructors.get(plugin_key)
    }
}

/// Read-only registry of [`ToolRecord`]s.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    records: Vec<ToolRecord>,
    by_key: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Build from manifest entries, binding each to its registered
    /// constructor or to [`ManifestTool`] when none is registered.
    pub fn from_manifest(
        config: &ToolgateConfig,
        constructors: &ConstructorRegistry,
    ) -> PluginAuthResult<Self> {
        let mut builder = Self::builder();

        for entry in &config.tools {
            let name = entry.name.clone().unwrap_or_else(|| entry.plugin_key.clone());
            let constructor = match constructors.get(&entry.plugin_key) {
                Some(ctor) => ctor.clone(),
                None => {
                    debug!(
                        plugin_key = %entry.plugin_key,
                        "No native constructor registered, using manifest tool"
                    );
                    ManifestTool::constructor(&name, &entry.description)
                }
            };

            builder = builder.with_record(
                ToolRecord::new(&entry.plugin_key, constructor)
                    .with_name(name)
                    .with_description(&entry.description)
                    .with_auth_config(entry.auth_config.clone())
                    .with_config(entry.config.clone()),
            )?;
        }

        let catalog = builder.build();
        info!("Loaded tool catalog with {} tools", catalog.len());
        Ok(catalog)
    }

    pub fn get(&self, plugin_key: &str) -> Option<&ToolRecord> {
        self.by_key.get(plugin_key).map(|&i| &self.records[i])
    }

    pub fn contains(&self, plugin_key: &str) -> bool {
        self.by_key.contains_key(plugin_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolRecord> {
        self.records.iter()
    }

    pub fn plugin_keys(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.plugin_key.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every distinct alias any tool needs, in first-seen order.
    pub fn auth_fields(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .flat_map(|r| r.requirement().groups())
            .flat_map(|g| g.aliases())
            .filter(|alias| seen.insert(*alias))
            .collect()
    }
}

#[derive(Default)]
pub struct CatalogBuilder {
    catalog: ToolCatalog,
}

impl CatalogBuilder {
    /// Add a record. Duplicate plugin keys are a configuration error.
    pub fn with_record(mut self, record: ToolRecord) -> PluginAuthResult<Self> {
        if self.catalog.by_key.contains_key(&record.plugin_key) {
            return Err(PluginAuthError::config(format!(
                "duplicate plugin key '{}'",
                record.plugin_key
            )));
        }

        self.catalog
            .by_key
            .insert(record.plugin_key.clone(), self.catalog.records.len());
        self.catalog.records.push(record);
        Ok(self)
    }

    pub fn build(self) -> ToolCatalog {
        self.catalog
    }
}
