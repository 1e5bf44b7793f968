//! Tool credential resolution and lazy tool loading.
//!
//! ## Modules
//!
//! - [`auth`]: auth field groups, environment snapshot, credential resolver
//! - [`store`]: per-user credential storage interface
//! - [`catalog`]: immutable registry of tool records
//! - [`validator`]: which requested tools a user can use now
//! - [`loader`]: deferred tool initializers
//!
//! ## Resolution order
//!
//! For each auth field group, the environment snapshot is checked first (every
//! alias, declared order) and the credential store only if that misses.

// Shared types
pub mod config;
pub mod error;
pub mod tool;
pub mod user;

// Subsystems
pub mod auth;
pub mod catalog;
pub mod loader;
pub mod store;
pub mod validator;

pub use auth::{
    AuthFieldGroup, AuthRequirement, CredentialResolver, CredentialSource, EnvironmentSnapshot,
    RequirementResolution, ResolvedCredentials, SecretValue,
};
pub use catalog::{AuthFieldSpec, ConstructorRegistry, ToolCatalog, ToolRecord};
pub use config::{ToolManifestEntry, ToolgateConfig};
pub use error::{BoxError, PluginAuthError, PluginAuthResult, StoreError};
pub use loader::{LoadOptions, ToolInitializer, ToolLoader};
pub use store::{CredentialStore, InMemoryCredentialStore};
pub use tool::{
    FunctionDefinition, FunctionTool, LoadedTool, ManifestTool, ModelHandle, Tool,
    ToolConstructor, ToolInput, ToolSpec,
};
pub use user::UserId;
pub use validator::ToolValidator;
