//! Tool instances and the constructors that build them.
//!
//! What a tool does once built is outside this crate. The loader only needs
//! to hand a constructor its resolved credentials and get back something that
//! implements [`Tool`].

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{auth::SecretValue, error::BoxError, user::UserId};

/// Opaque model/context handle passed through to constructors.
pub type ModelHandle = Arc<dyn Any + Send + Sync>;

/// Description of a tool for downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: empty_parameters(),
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

fn empty_parameters() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {}
    })
}

/// A constructed, ready-to-use tool.
pub trait Tool: Any + Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Attached spec, if the tool was built with specs enabled.
    fn spec(&self) -> Option<ToolSpec> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Everything a constructor receives.
#[derive(Clone)]
pub struct ToolInput {
    pub plugin_key: String,
    pub user_id: UserId,
    /// Static tool config with per-call options applied on top.
    pub config: Map<String, Value>,
    /// Resolved secrets keyed by primary field name.
    pub credentials: HashMap<String, SecretValue>,
    pub use_specs: bool,
    pub model: Option<ModelHandle>,
}

impl ToolInput {
    pub fn new(plugin_key: impl Into<String>, user_id: UserId) -> Self {
        Self {
            plugin_key: plugin_key.into(),
            user_id,
            config: Map::new(),
            credentials: HashMap::new(),
            use_specs: false,
            model: None,
        }
    }

    pub fn credential(&self, field: &str) -> Option<&str> {
        self.credentials.get(field).map(SecretValue::expose)
    }

    /// Credential named `key`, else the string config value. Credentials win.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.credential(key)
            .or_else(|| self.config.get(key).and_then(Value::as_str))
    }
}

impl fmt::Debug for ToolInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&String> = self.credentials.keys().collect();
        fields.sort();
        f.debug_struct("ToolInput")
            .field("plugin_key", &self.plugin_key)
            .field("user_id", &self.user_id)
            .field("config", &self.config)
            .field("credentials", &fields)
            .field("use_specs", &self.use_specs)
            .field("model", &self.model.as_ref().map(|_| "<model>"))
            .finish()
    }
}

/// Builds a tool from resolved input. Errors pass through the loader untouched.
pub trait ToolConstructor: Send + Sync {
    fn construct(&self, input: ToolInput) -> Result<Box<dyn Tool>, BoxError>;
}

impl<F> ToolConstructor for F
where
    F: Fn(ToolInput) -> Result<Box<dyn Tool>, BoxError> + Send + Sync,
{
    fn construct(&self, input: ToolInput) -> Result<Box<dyn Tool>, BoxError> {
        self(input)
    }
}

/// OpenAI-style function definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Function-calling adapter around a tool instance.
pub struct FunctionTool {
    inner: Box<dyn Tool>,
}

impl FunctionTool {
    pub fn new(inner: Box<dyn Tool>) -> Self {
        Self { inner }
    }

    pub fn tool(&self) -> &dyn Tool {
        self.inner.as_ref()
    }

    pub fn definition(&self) -> FunctionDefinition {
        match self.inner.spec() {
            Some(spec) => FunctionDefinition {
                name: spec.name,
                description: spec.description,
                parameters: spec.parameters,
            },
            None => FunctionDefinition {
                name: self.inner.name().to_string(),
                description: self.inner.description().to_string(),
                parameters: empty_parameters(),
            },
        }
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.inner.name())
            .finish()
    }
}

/// What an initializer hands back.
pub enum LoadedTool {
    Raw(Box<dyn Tool>),
    Function(FunctionTool),
}

impl LoadedTool {
    pub fn tool(&self) -> &dyn Tool {
        match self {
            LoadedTool::Raw(tool) => tool.as_ref(),
            LoadedTool::Function(function) => function.tool(),
        }
    }

    pub fn name(&self) -> &str {
        self.tool().name()
    }

    pub fn is_function(&self) -> bool {
        matches!(self, LoadedTool::Function(_))
    }

    pub fn downcast_ref<T: Tool>(&self) -> Option<&T> {
        self.tool().as_any().downcast_ref::<T>()
    }

    pub fn as_function(&self) -> Option<&FunctionTool> {
        match self {
            LoadedTool::Function(function) => Some(function),
            LoadedTool::Raw(_) => None,
        }
    }
}

impl fmt::Debug for LoadedTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadedTool::Raw(tool) => f.debug_tuple("Raw").field(&tool.name()).finish(),
            LoadedTool::Function(function) => f.debug_tuple("Function").field(function).finish(),
        }
    }
}

/// Tool built from manifest metadata alone.
///
/// Used for catalog entries that have no native constructor registered. It
/// records which credential fields it was given, never their values.
#[derive(Debug, Clone)]
pub struct ManifestTool {
    pub plugin_key: String,
    pub name: String,
    pub description: String,
    pub credential_fields: Vec<String>,
    spec: Option<ToolSpec>,
}

impl ManifestTool {
    pub fn constructor(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Arc<dyn ToolConstructor> {
        let name = name.into();
        let description = description.into();
        Arc::new(move |input: ToolInput| -> Result<Box<dyn Tool>, BoxError> {
            let mut credential_fields: Vec<String> = input.credentials.keys().cloned().collect();
            credential_fields.sort();
            let spec = input
                .use_specs
                .then(|| ToolSpec::new(&input.plugin_key, &description));
            Ok(Box::new(ManifestTool {
                plugin_key: input.plugin_key,
                name: name.clone(),
                description: description.clone(),
                credential_fields,
                spec,
            }))
        })
    }
}

impl Tool for ManifestTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn spec(&self) -> Option<ToolSpec> {
        self.spec.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
