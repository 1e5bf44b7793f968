//! Credential model and resolution.

pub mod env;
pub mod field;
pub mod resolver;
pub mod secret;

pub use env::{EnvironmentSnapshot, USER_PROVIDED};
pub use field::{AuthFieldGroup, AuthRequirement, ALIAS_DELIMITER};
pub use resolver::{
    CredentialResolver, CredentialSource, RequirementResolution, ResolvedCredentials,
    ResolvedValue,
};
pub use secret::SecretValue;
