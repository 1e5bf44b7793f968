//! Per-user credential storage.
//!
//! The store is an external collaborator: its persistence and encryption are
//! not this crate's concern. Resolution only needs get/set/delete by field.

pub mod memory;

use async_trait::async_trait;

pub use memory::{InMemoryCredentialStore, StoredCredential};

use crate::{
    auth::{AuthFieldGroup, SecretValue},
    error::StoreError,
    user::UserId,
};

/// Encrypted per-user key/value store keyed by `(user, field name)`.
///
/// Implementations decide their own consistency; concurrent reads must be
/// safe and concurrent writes to the same field resolve last-writer-wins.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns `Ok(None)` when the user has no value for `field`, and `Err`
    /// only for infrastructure failures.
    async fn get(&self, user: &UserId, field: &str) -> Result<Option<SecretValue>, StoreError>;

    /// Store `value` under every alias of `group`.
    async fn set(
        &self,
        user: &UserId,
        group: &AuthFieldGroup,
        plugin_key: &str,
        value: SecretValue,
    ) -> Result<(), StoreError>;

    async fn delete(&self, user: &UserId, field: &str) -> Result<(), StoreError>;

    /// Remove every field written on behalf of `plugin_key`. Returns the count.
    async fn delete_plugin(&self, user: &UserId, plugin_key: &str) -> Result<usize, StoreError>;

    /// Remove all of a user's credentials, e.g. on account deletion.
    async fn delete_user(&self, user: &UserId) -> Result<usize, StoreError>;
}
