//! Read-only snapshot of process-wide configuration.
//!
//! The resolver never reads `std::env` directly; it is handed a snapshot at
//! construction so lookups stay synchronous and tests stay deterministic.

use std::collections::HashMap;

/// Value operators put in the environment to say "each user brings their own key".
pub const USER_PROVIDED: &str = "user_provided";

#[derive(Debug, Clone)]
pub struct EnvironmentSnapshot {
    vars: HashMap<String, String>,
    user_provided_sentinel: String,
}

impl Default for EnvironmentSnapshot {
    fn default() -> Self {
        Self {
            vars: HashMap::new(),
            user_provided_sentinel: USER_PROVIDED.to_string(),
        }
    }
}

impl EnvironmentSnapshot {
    /// Empty snapshot; every lookup falls through to the credential store.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        Self::from_pairs(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_user_provided_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.user_provided_sentinel = sentinel.into();
        self
    }

    /// Value for `name` if set to something usable.
    ///
    /// Empty values and the user-provided sentinel count as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty() && *v != self.user_provided_sentinel)
    }

    /// True if `name` is explicitly marked as user-provided.
    pub fn is_user_provided(&self, name: &str) -> bool {
        self.vars
            .get(name)
            .is_some_and(|v| *v == self.user_provided_sentinel)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
