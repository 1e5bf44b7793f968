//! Lazy tool loading.
//!
//! [`ToolLoader::load`] only decides which initializers exist, based on
//! catalog membership. Credential lookup and construction happen when an
//! initializer is invoked, and again on every invocation.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    auth::{AuthFieldGroup, AuthRequirement, CredentialResolver, RequirementResolution},
    catalog::{ToolCatalog, ToolRecord},
    error::{PluginAuthError, PluginAuthResult},
    tool::{FunctionTool, LoadedTool, ModelHandle, ToolConstructor, ToolInput},
    user::UserId,
};

/// Plugin key given to initializers built outside the catalog.
pub const CUSTOM_PLUGIN_KEY: &str = "custom";

/// Per-call loading options. Each flag is independent.
#[derive(Clone, Default)]
pub struct LoadOptions {
    /// Wrap instances in the function-calling adapter.
    pub functions: bool,
    /// Ask constructors to attach tool specs.
    pub use_specs: bool,
    /// Passed to constructors as-is.
    pub model: Option<ModelHandle>,
    /// Extra constructor input; overrides record config on conflicts.
    pub options: Map<String, Value>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_functions(mut self, functions: bool) -> Self {
        self.functions = functions;
        self
    }

    #[must_use]
    pub fn with_specs(mut self, use_specs: bool) -> Self {
        self.use_specs = use_specs;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: ModelHandle) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("functions", &self.functions)
            .field("use_specs", &self.use_specs)
            .field("model", &self.model.as_ref().map(|_| "<model>"))
            .field("options", &self.options)
            .finish()
    }
}

/// Deferred constructor for one tool, bound to one user.
#[derive(Clone)]
pub struct ToolInitializer {
    plugin_key: String,
    user: UserId,
    requirement: AuthRequirement,
    constructor: Arc<dyn ToolConstructor>,
    config: Map<String, Value>,
    functions: bool,
    use_specs: bool,
    model: Option<ModelHandle>,
    resolver: CredentialResolver,
}

impl ToolInitializer {
    fn from_record(
        user: &UserId,
        record: &ToolRecord,
        options: &LoadOptions,
        resolver: CredentialResolver,
    ) -> Self {
        Self {
            plugin_key: record.plugin_key.clone(),
            user: user.clone(),
            requirement: record.requirement().clone(),
            constructor: record.constructor().clone(),
            config: record.config.clone(),
            functions: false,
            use_specs: false,
            model: None,
            resolver,
        }
        .with_options(options)
    }

    /// Apply loading options; per-call options override static config.
    #[must_use]
    pub fn with_options(mut self, options: &LoadOptions) -> Self {
        for (key, value) in &options.options {
            self.config.insert(key.clone(), value.clone());
        }
        self.functions = options.functions;
        self.use_specs = options.use_specs;
        self.model = options.model.clone();
        self
    }

    #[must_use]
    pub fn with_plugin_key(mut self, plugin_key: impl Into<String>) -> Self {
        self.plugin_key = plugin_key.into();
        self
    }

    pub fn plugin_key(&self) -> &str {
        &self.plugin_key
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn requirement(&self) -> &AuthRequirement {
        &self.requirement
    }

    /// Resolve credentials and build the tool.
    ///
    /// Fails with [`PluginAuthError::CredentialUnavailable`] if any field
    /// group is unresolved; the constructor is not called in that case.
    /// Constructor errors come back as [`PluginAuthError::Construction`].
    pub async fn invoke(&self) -> PluginAuthResult<LoadedTool> {
        let credentials = match self
            .resolver
            .resolve_requirement(&self.user, &self.requirement)
            .await?
        {
            RequirementResolution::Satisfied(credentials) => credentials,
            RequirementResolution::Missing { field } => {
                debug!(
                    user_id = %self.user,
                    plugin_key = %self.plugin_key,
                    field = %field,
                    "Tool initialization blocked on missing credential"
                );
                return Err(PluginAuthError::CredentialUnavailable {
                    plugin_key: self.plugin_key.clone(),
                    field: field.to_string(),
                });
            }
        };

        let input = ToolInput {
            plugin_key: self.plugin_key.clone(),
            user_id: self.user.clone(),
            config: self.config.clone(),
            credentials: credentials
                .iter()
                .map(|(field, value)| (field.to_string(), value.clone()))
                .collect(),
            use_specs: self.use_specs,
            model: self.model.clone(),
        };

        let tool = self
            .constructor
            .construct(input)
            .map_err(PluginAuthError::Construction)?;

        debug!(plugin_key = %self.plugin_key, "Tool initialized");
        Ok(if self.functions {
            LoadedTool::Function(FunctionTool::new(tool))
        } else {
            LoadedTool::Raw(tool)
        })
    }
}

impl fmt::Debug for ToolInitializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolInitializer")
            .field("plugin_key", &self.plugin_key)
            .field("user", &self.user)
            .field("requirement", &self.requirement)
            .field("functions", &self.functions)
            .field("use_specs", &self.use_specs)
            .finish_non_exhaustive()
    }
}

/// Produces [`ToolInitializer`]s for requested plugin keys.
#[derive(Debug, Clone)]
pub struct ToolLoader {
    catalog: Arc<ToolCatalog>,
    resolver: CredentialResolver,
}

impl ToolLoader {
    pub fn new(catalog: Arc<ToolCatalog>, resolver: CredentialResolver) -> Self {
        Self { catalog, resolver }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// One initializer per requested key found in the catalog.
    ///
    /// Unknown keys are left out. No credentials are looked up here.
    pub fn load<S: AsRef<str>>(
        &self,
        user: &UserId,
        plugin_keys: &[S],
        options: &LoadOptions,
    ) -> HashMap<String, ToolInitializer> {
        let mut initializers = HashMap::with_capacity(plugin_keys.len());

        for key in plugin_keys {
            let key = key.as_ref();
            if initializers.contains_key(key) {
                continue;
            }
            match self.catalog.get(key) {
                Some(record) => {
                    initializers.insert(
                        key.to_string(),
                        ToolInitializer::from_record(user, record, options, self.resolver.clone()),
                    );
                }
                None => debug!(plugin_key = key, "Skipping unknown tool"),
            }
        }

        info!(
            user_id = %user,
            requested = plugin_keys.len(),
            loaded = initializers.len(),
            "Prepared tool initializers"
        );
        initializers
    }

    /// Build every requested tool now, in request order.
    ///
    /// Unknown keys are skipped and repeated keys are built once. The first
    /// failure is returned unchanged; later tools are not built.
    pub async fn load_tools<S: AsRef<str>>(
        &self,
        user: &UserId,
        plugin_keys: &[S],
        options: &LoadOptions,
    ) -> PluginAuthResult<Vec<LoadedTool>> {
        let initializers = self.load(user, plugin_keys, options);
        let mut built = HashSet::with_capacity(initializers.len());
        let mut tools = Vec::with_capacity(initializers.len());

        for key in plugin_keys {
            let key = key.as_ref();
            let Some(initializer) = initializers.get(key) else {
                continue;
            };
            if built.insert(key) {
                tools.push(initializer.invoke().await?);
            }
        }

        Ok(tools)
    }

    /// Initializer for a caller-supplied constructor and field list.
    pub fn initializer_for(
        &self,
        user: &UserId,
        fields: Vec<AuthFieldGroup>,
        constructor: Arc<dyn ToolConstructor>,
    ) -> ToolInitializer {
        ToolInitializer {
            plugin_key: CUSTOM_PLUGIN_KEY.to_string(),
            user: user.clone(),
            requirement: AuthRequirement::new(fields),
            constructor,
            config: Map::new(),
            functions: false,
            use_specs: false,
            model: None,
            resolver: self.resolver.clone(),
        }
    }
}
