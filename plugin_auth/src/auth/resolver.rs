//! Two-tier credential resolution.
//!
//! Lookup order for one [`AuthFieldGroup`]:
//! 1. Environment snapshot, each alias in declared order (synchronous)
//! 2. Credential store, each alias in declared order (async, only if 1 missed)
//! 3. Absent
//!
//! The first non-empty value wins in both tiers.

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::{debug, warn};

use super::{
    env::EnvironmentSnapshot,
    field::{AuthFieldGroup, AuthRequirement},
    secret::SecretValue,
};
use crate::{error::PluginAuthResult, store::CredentialStore, user::UserId};

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Store,
}

/// A value found for one group, with the alias that matched.
#[derive(Debug, Clone)]
pub struct ResolvedValue {
    pub field: String,
    pub value: SecretValue,
    pub source: CredentialSource,
}

/// Values for every group of a requirement, keyed by primary field name.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCredentials {
    values: HashMap<String, ResolvedValue>,
}

impl ResolvedCredentials {
    pub fn get(&self, primary: &str) -> Option<&SecretValue> {
        self.values.get(primary).map(|r| &r.value)
    }

    pub fn source(&self, primary: &str) -> Option<CredentialSource> {
        self.values.get(primary).map(|r| r.source)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(primary field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SecretValue)> {
        self.values.iter().map(|(k, r)| (k.as_str(), &r.value))
    }
}

/// Outcome of resolving a whole [`AuthRequirement`].
#[derive(Debug, Clone)]
pub enum RequirementResolution {
    Satisfied(ResolvedCredentials),
    /// First group that resolved to nothing.
    Missing { field: AuthFieldGroup },
}

impl RequirementResolution {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, RequirementResolution::Satisfied(_))
    }
}

/// Resolves auth field groups for a user: environment first, store second.
#[derive(Clone)]
pub struct CredentialResolver {
    env: Arc<EnvironmentSnapshot>,
    store: Arc<dyn CredentialStore>,
}

impl fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("env_vars", &self.env.len())
            .finish_non_exhaustive()
    }
}

impl CredentialResolver {
    pub fn new(env: Arc<EnvironmentSnapshot>, store: Arc<dyn CredentialStore>) -> Self {
        Self { env, store }
    }

    pub fn environment(&self) -> &EnvironmentSnapshot {
        &self.env
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Environment tier only. Never suspends, never touches the store.
    pub fn resolve_from_env(&self, group: &AuthFieldGroup) -> Option<ResolvedValue> {
        group.aliases().find_map(|alias| {
            self.env.get(alias).map(|value| ResolvedValue {
                field: alias.to_string(),
                value: SecretValue::new(value),
                source: CredentialSource::Environment,
            })
        })
    }

    /// Resolve one group for `user`.
    ///
    /// Returns `Ok(None)` when neither tier has a value. Store failures are
    /// returned as errors, not treated as absent.
    pub async fn resolve(
        &self,
        user: &UserId,
        group: &AuthFieldGroup,
    ) -> PluginAuthResult<Option<ResolvedValue>> {
        if let Some(resolved) = self.resolve_from_env(group) {
            debug!(field = %resolved.field, "Credential resolved from environment");
            return Ok(Some(resolved));
        }

        for alias in group.aliases() {
            let stored = self.store.get(user, alias).await.map_err(|e| {
                warn!(user_id = %user, field = alias, error = %e, "Credential store lookup failed");
                e
            })?;

            if let Some(value) = stored.filter(|v| !v.is_empty()) {
                debug!(user_id = %user, field = alias, "Credential resolved from store");
                return Ok(Some(ResolvedValue {
                    field: alias.to_string(),
                    value,
                    source: CredentialSource::Store,
                }));
            }
        }

        debug!(user_id = %user, field = %group, "Credential not configured");
        Ok(None)
    }

    /// Resolve every group in order, stopping at the first missing one.
    pub async fn resolve_requirement(
        &self,
        user: &UserId,
        requirement: &AuthRequirement,
    ) -> PluginAuthResult<RequirementResolution> {
        let mut resolved = ResolvedCredentials::default();

        for group in requirement.groups() {
            match self.resolve(user, group).await? {
                Some(value) => {
                    resolved.values.insert(group.primary().to_string(), value);
                }
                None => {
                    return Ok(RequirementResolution::Missing {
                        field: group.clone(),
                    })
                }
            }
        }

        Ok(RequirementResolution::Satisfied(resolved))
    }

    /// True iff every group of `requirement` resolves for `user`.
    pub async fn is_satisfied(
        &self,
        user: &UserId,
        requirement: &AuthRequirement,
    ) -> PluginAuthResult<bool> {
        Ok(self
            .resolve_requirement(user, requirement)
            .await?
            .is_satisfied())
    }

    /// Persist a user-supplied value under every alias of `group`.
    pub async fn store_credential(
        &self,
        user: &UserId,
        group: &AuthFieldGroup,
        plugin_key: &str,
        value: SecretValue,
    ) -> PluginAuthResult<()> {
        self.store.set(user, group, plugin_key, value).await?;
        Ok(())
    }

    /// Delete every alias of `group` for `user`.
    pub async fn remove_credential(
        &self,
        user: &UserId,
        group: &AuthFieldGroup,
    ) -> PluginAuthResult<()> {
        for alias in group.aliases() {
            self.store.delete(user, alias).await?;
        }
        Ok(())
    }
}
