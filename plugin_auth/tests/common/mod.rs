//! Common test utilities for plugin-auth tests

#![allow(dead_code)]

use std::{
    any::Any,
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use plugin_auth::{
    AuthFieldGroup, AuthFieldSpec, BoxError, CredentialResolver, CredentialStore,
    EnvironmentSnapshot, InMemoryCredentialStore, SecretValue, StoreError, Tool, ToolCatalog,
    ToolInput, ToolLoader, ToolRecord, ToolSpec, ToolValidator, UserId,
};

/// Store wrapper that counts reads.
#[derive(Default)]
pub struct SpyStore {
    inner: InMemoryCredentialStore,
    gets: AtomicUsize,
}

impl SpyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for SpyStore {
    async fn get(&self, user: &UserId, field: &str) -> Result<Option<SecretValue>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(user, field).await
    }

    async fn set(
        &self,
        user: &UserId,
        group: &AuthFieldGroup,
        plugin_key: &str,
        value: SecretValue,
    ) -> Result<(), StoreError> {
        self.inner.set(user, group, plugin_key, value).await
    }

    async fn delete(&self, user: &UserId, field: &str) -> Result<(), StoreError> {
        self.inner.delete(user, field).await
    }

    async fn delete_plugin(&self, user: &UserId, plugin_key: &str) -> Result<usize, StoreError> {
        self.inner.delete_plugin(user, plugin_key).await
    }

    async fn delete_user(&self, user: &UserId) -> Result<usize, StoreError> {
        self.inner.delete_user(user).await
    }
}

/// Store that answers each field after its own delay and logs completions.
#[derive(Default)]
pub struct SlowStore {
    inner: InMemoryCredentialStore,
    delays: HashMap<String, Duration>,
    completed: Mutex<Vec<String>>,
}

impl SlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, field: &str, delay: Duration) -> Self {
        self.delays.insert(field.to_string(), delay);
        self
    }

    /// Fields in the order their lookups finished.
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().clone()
    }
}

#[async_trait]
impl CredentialStore for SlowStore {
    async fn get(&self, user: &UserId, field: &str) -> Result<Option<SecretValue>, StoreError> {
        if let Some(delay) = self.delays.get(field) {
            tokio::time::sleep(*delay).await;
        }
        let value = self.inner.get(user, field).await;
        self.completed.lock().push(field.to_string());
        value
    }

    async fn set(
        &self,
        user: &UserId,
        group: &AuthFieldGroup,
        plugin_key: &str,
        value: SecretValue,
    ) -> Result<(), StoreError> {
        self.inner.set(user, group, plugin_key, value).await
    }

    async fn delete(&self, user: &UserId, field: &str) -> Result<(), StoreError> {
        self.inner.delete(user, field).await
    }

    async fn delete_plugin(&self, user: &UserId, plugin_key: &str) -> Result<usize, StoreError> {
        self.inner.delete_plugin(user, plugin_key).await
    }

    async fn delete_user(&self, user: &UserId) -> Result<usize, StoreError> {
        self.inner.delete_user(user).await
    }
}

/// Store whose backend is always down.
pub struct OfflineStore;

#[async_trait]
impl CredentialStore for OfflineStore {
    async fn get(&self, _: &UserId, _: &str) -> Result<Option<SecretValue>, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn set(
        &self,
        _: &UserId,
        _: &AuthFieldGroup,
        _: &str,
        _: SecretValue,
    ) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn delete(&self, _: &UserId, _: &str) -> Result<(), StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn delete_plugin(&self, _: &UserId, _: &str) -> Result<usize, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }

    async fn delete_user(&self, _: &UserId) -> Result<usize, StoreError> {
        Err(StoreError::unavailable("connection refused"))
    }
}

/// Arithmetic tool with no credentials.
pub struct Calculator {
    pub spec: Option<ToolSpec>,
}

impl Tool for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Useful for getting the result of a math expression"
    }

    fn spec(&self) -> Option<ToolSpec> {
        self.spec.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Tool holding an API key it was built with.
pub struct KeyedTool {
    pub name: String,
    pub api_key: String,
}

impl Tool for KeyedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Calls an external API"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, thiserror::Error)]
#[error("endpoint rejected the key")]
pub struct RejectedKey;

pub fn calculator_ctor(input: ToolInput) -> Result<Box<dyn Tool>, BoxError> {
    let spec = input.use_specs.then(|| {
        ToolSpec::new("calculator", "Evaluate a math expression").with_parameters(
            serde_json::json!({
                "type": "object",
                "properties": { "input": { "type": "string" } },
                "required": ["input"]
            }),
        )
    });
    Ok(Box::new(Calculator { spec }))
}

/// Constructor reading the credential stored under `field`.
pub fn keyed_ctor(field: &'static str) -> Arc<dyn plugin_auth::ToolConstructor> {
    Arc::new(move |input: ToolInput| -> Result<Box<dyn Tool>, BoxError> {
        let api_key = input
            .credential(field)
            .ok_or_else(|| format!("constructor called without {field}"))?
            .to_string();
        Ok(Box::new(KeyedTool {
            name: input.plugin_key.clone(),
            api_key,
        }))
    })
}

pub fn group(s: &str) -> AuthFieldGroup {
    AuthFieldGroup::parse(s).unwrap()
}

/// calculator (no auth), wolfram (WOLFRAM_APP_ID), google (two groups),
/// dalle (aliased key), flaky (constructor always fails).
pub fn sample_catalog() -> Arc<ToolCatalog> {
    let records = vec![
        ToolRecord::new("calculator", Arc::new(calculator_ctor)).with_name("Calculator"),
        ToolRecord::new("wolfram", keyed_ctor("WOLFRAM_APP_ID"))
            .with_name("Wolfram")
            .with_auth_field(AuthFieldSpec::new(group("WOLFRAM_APP_ID")).with_label("Wolfram App ID")),
        ToolRecord::new("google", keyed_ctor("GOOGLE_API_KEY"))
            .with_name("Google")
            .with_auth_field(AuthFieldSpec::new(group("GOOGLE_CSE_ID")))
            .with_auth_field(AuthFieldSpec::new(group("GOOGLE_API_KEY"))),
        ToolRecord::new("dalle", keyed_ctor("DALLE3_API_KEY"))
            .with_name("DALL-E")
            .with_auth_field(AuthFieldSpec::new(group("DALLE3_API_KEY||DALLE_API_KEY||OPENAI_API_KEY"))),
        ToolRecord::new(
            "flaky",
            Arc::new(|_input: ToolInput| -> Result<Box<dyn Tool>, BoxError> {
                Err(RejectedKey.into())
            }),
        ),
    ];

    let mut builder = ToolCatalog::builder();
    for record in records {
        builder = builder.with_record(record).unwrap();
    }
    Arc::new(builder.build())
}

pub struct Harness {
    pub validator: ToolValidator,
    pub loader: ToolLoader,
    pub resolver: CredentialResolver,
}

pub fn harness(env: &[(&str, &str)], store: Arc<dyn CredentialStore>) -> Harness {
    let env = Arc::new(EnvironmentSnapshot::from_pairs(env.iter().copied()));
    let resolver = CredentialResolver::new(env, store);
    let catalog = sample_catalog();
    Harness {
        validator: ToolValidator::new(catalog.clone(), resolver.clone()),
        loader: ToolLoader::new(catalog, resolver.clone()),
        resolver,
    }
}
