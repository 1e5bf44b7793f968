//! In-process credential store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::CredentialStore;
use crate::{
    auth::{AuthFieldGroup, SecretValue},
    error::StoreError,
    user::UserId,
};

/// One stored field value.
#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub plugin_key: String,
    pub value: SecretValue,
    pub updated_at: DateTime<Utc>,
}

/// Thread-safe credential store backed by a [`DashMap`].
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    entries: DashMap<(UserId, String), StoredCredential>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored entry with metadata, if any.
    pub fn entry(&self, user: &UserId, field: &str) -> Option<StoredCredential> {
        self.entries
            .get(&(user.clone(), field.to_string()))
            .map(|e| e.value().clone())
    }

    /// Field names stored for `user`, sorted.
    pub fn fields_for(&self, user: &UserId) -> Vec<String> {
        let mut fields: Vec<String> = self
            .entries
            .iter()
            .filter(|e| &e.key().0 == user)
            .map(|e| e.key().1.clone())
            .collect();
        fields.sort();
        fields
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, user: &UserId, field: &str) -> Result<Option<SecretValue>, StoreError> {
        Ok(self
            .entries
            .get(&(user.clone(), field.to_string()))
            .map(|e| e.value.clone()))
    }

    async fn set(
        &self,
        user: &UserId,
        group: &AuthFieldGroup,
        plugin_key: &str,
        value: SecretValue,
    ) -> Result<(), StoreError> {
        if value.expose().trim().is_empty() {
            return Err(StoreError::InvalidValue(format!(
                "empty value for '{}'",
                group
            )));
        }

        let updated_at = Utc::now();
        for alias in group.aliases() {
            self.entries.insert(
                (user.clone(), alias.to_string()),
                StoredCredential {
                    plugin_key: plugin_key.to_string(),
                    value: value.clone(),
                    updated_at,
                },
            );
        }

        debug!(
            user_id = %user,
            plugin_key,
            aliases = group.len(),
            "Stored credential"
        );
        Ok(())
    }

    async fn delete(&self, user: &UserId, field: &str) -> Result<(), StoreError> {
        self.entries.remove(&(user.clone(), field.to_string()));
        Ok(())
    }

    async fn delete_plugin(&self, user: &UserId, plugin_key: &str) -> Result<usize, StoreError> {
        let before = self.entries.len();
        self.entries
            .retain(|(u, _), stored| !(u == user && stored.plugin_key == plugin_key));
        Ok(before - self.entries.len())
    }

    async fn delete_user(&self, user: &UserId) -> Result<usize, StoreError> {
        let before = self.entries.len();
        self.entries.retain(|(u, _), _| u != user);
        Ok(before - self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(s: &str) -> AuthFieldGroup {
        AuthFieldGroup::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_set_fans_out_to_aliases() {
        let store = InMemoryCredentialStore::new();
        let user = UserId::from("u1");

        store
            .set(&user, &group("A||B||C"), "tool", SecretValue::from("secret"))
            .await
            .unwrap();

        for field in ["A", "B", "C"] {
            let value = store.get(&user, field).await.unwrap().unwrap();
            assert_eq!(value.expose(), "secret");
        }
        assert_eq!(store.fields_for(&user), vec!["A", "B", "C"]);
        assert_eq!(store.entry(&user, "B").unwrap().plugin_key, "tool");
    }

    #[tokio::test]
    async fn test_values_are_per_user() {
        let store = InMemoryCredentialStore::new();
        store
            .set(&"u1".into(), &group("KEY"), "tool", "one".into())
            .await
            .unwrap();

        assert!(store.get(&"u2".into(), "KEY").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = InMemoryCredentialStore::new();
        let user = UserId::from("u1");
        store.set(&user, &group("KEY"), "t", "old".into()).await.unwrap();
        store.set(&user, &group("KEY"), "t", "new".into()).await.unwrap();

        assert_eq!(store.get(&user, "KEY").await.unwrap().unwrap().expose(), "new");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_blank_value() {
        let store = InMemoryCredentialStore::new();
        let result = store
            .set(&"u1".into(), &group("KEY"), "t", "  ".into())
            .await;
        assert!(matches!(result, Err(StoreError::InvalidValue(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_plugin_and_user() {
        let store = InMemoryCredentialStore::new();
        let u1 = UserId::from("u1");
        let u2 = UserId::from("u2");
        store.set(&u1, &group("A||B"), "alpha", "x".into()).await.unwrap();
        store.set(&u1, &group("C"), "gamma", "y".into()).await.unwrap();
        store.set(&u2, &group("A"), "alpha", "z".into()).await.unwrap();

        assert_eq!(store.delete_plugin(&u1, "alpha").await.unwrap(), 2);
        assert_eq!(store.fields_for(&u1), vec!["C"]);
        assert!(store.get(&u2, "A").await.unwrap().is_some());

        assert_eq!(store.delete_user(&u1).await.unwrap(), 1);
        assert!(store.fields_for(&u1).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_single_field() {
        let store = InMemoryCredentialStore::new();
        let user = UserId::from("u1");
        store.set(&user, &group("A||B"), "t", "v".into()).await.unwrap();
        store.delete(&user, "A").await.unwrap();

        assert!(store.get(&user, "A").await.unwrap().is_none());
        assert!(store.get(&user, "B").await.unwrap().is_some());
    }
}
