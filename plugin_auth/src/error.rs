//! Plugin auth error types.
//!
//! Defines error variants for credential resolution, tool construction,
//! credential store access and configuration.

use thiserror::Error;

/// Boxed error returned by tool constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type PluginAuthResult<T> = Result<T, PluginAuthError>;

#[derive(Debug, Error)]
pub enum PluginAuthError {
    /// An auth field group resolved to nothing when a tool was initialized.
    ///
    /// `field` carries the `||`-joined alias list so callers can tell the user
    /// which credential to configure.
    #[error("Missing credential '{field}' for tool '{plugin_key}'")]
    CredentialUnavailable { plugin_key: String, field: String },

    /// The tool constructor failed. Passed through untouched.
    #[error(transparent)]
    Construction(BoxError),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl PluginAuthError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True when the failure means "the user has not configured this secret".
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, PluginAuthError::CredentialUnavailable { .. })
    }
}

/// Errors raised by a [`CredentialStore`](crate::store::CredentialStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached (I/O, decryption service, database).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid credential value: {0}")]
    InvalidValue(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
