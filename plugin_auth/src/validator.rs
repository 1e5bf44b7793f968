//! Decides which requested tools a user can use right now.

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::{auth::CredentialResolver, catalog::ToolCatalog, error::PluginAuthResult, user::UserId};

/// Filters requested plugin keys down to the usable ones.
///
/// Unknown keys are dropped, tools without auth always pass, and tools with
/// auth pass iff every field group resolves. Tools are checked concurrently;
/// output keeps input order.
#[derive(Debug, Clone)]
pub struct ToolValidator {
    catalog: Arc<ToolCatalog>,
    resolver: CredentialResolver,
}

impl ToolValidator {
    pub fn new(catalog: Arc<ToolCatalog>, resolver: CredentialResolver) -> Self {
        Self { catalog, resolver }
    }

    /// Usable subset of `plugin_keys`, in input order.
    ///
    /// Duplicates in the input are kept as-is. A credential store failure is
    /// returned as an error rather than dropping the tool.
    pub async fn validate<S: AsRef<str>>(
        &self,
        user: &UserId,
        plugin_keys: &[S],
    ) -> PluginAuthResult<Vec<String>> {
        if plugin_keys.is_empty() {
            return Ok(Vec::new());
        }

        let checks = plugin_keys
            .iter()
            .map(|key| self.is_valid(user, key.as_ref()));
        let results = join_all(checks).await;

        let mut valid = Vec::with_capacity(plugin_keys.len());
        for (key, result) in plugin_keys.iter().zip(results) {
            if result? {
                valid.push(key.as_ref().to_string());
            }
        }

        debug!(
            user_id = %user,
            requested = plugin_keys.len(),
            valid = valid.len(),
            "Validated tools"
        );
        Ok(valid)
    }

    /// Whether a single tool is usable for `user`.
    pub async fn is_valid(&self, user: &UserId, plugin_key: &str) -> PluginAuthResult<bool> {
        let Some(record) = self.catalog.get(plugin_key) else {
            debug!(plugin_key, "Unknown tool requested");
            return Ok(false);
        };

        if !record.requires_auth() {
            return Ok(true);
        }

        self.resolver
            .is_satisfied(user, record.requirement())
            .await
    }
}
