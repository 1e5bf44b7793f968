//! `toolgate`: check which configured tools a user can run, and build them.
//!
//! Credentials passed with `--credential` are written to an in-memory store
//! for the user before the command runs. Everything else comes from the
//! process environment.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use plugin_auth::{
    AuthFieldGroup, ConstructorRegistry, CredentialResolver, InMemoryCredentialStore, LoadOptions,
    PluginAuthError, SecretValue, ToolCatalog, ToolLoader, ToolValidator, ToolgateConfig, UserId,
};
use tracing::{debug, warn};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Plugin key recorded for seeded credentials no catalog tool asks for.
const CLI_PLUGIN_KEY: &str = "cli";

#[derive(Parser, Debug)]
#[command(
    name = "toolgate",
    about = "Resolve per-user tool credentials and load tools",
    version
)]
struct Cli {
    /// Tool manifest (YAML)
    #[arg(
        long,
        short,
        env = "TOOLGATE_CONFIG",
        default_value = "tools.yaml",
        global = true
    )]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print which requested tools the user can use right now
    Validate(RequestArgs),

    /// Build every requested tool and report the ones that fail
    Load {
        #[command(flatten)]
        request: RequestArgs,

        /// Wrap tools in the function-calling adapter
        #[arg(long)]
        functions: bool,

        /// Ask constructors to attach tool specs
        #[arg(long)]
        use_specs: bool,
    },

    /// List every auth field and whether the environment covers it
    Doctor,
}

#[derive(Args, Debug)]
struct RequestArgs {
    #[arg(long, default_value = "local")]
    user: String,

    /// Plugin keys, comma separated
    #[arg(long, value_delimiter = ',', required_unless_present = "all")]
    tools: Vec<String>,

    /// Request every tool in the catalog
    #[arg(long, conflicts_with = "tools")]
    all: bool,

    /// Seed the user's store; FIELD may be any alias of a tool's field
    #[arg(
        long = "credential",
        value_name = "FIELD=VALUE",
        value_parser = parse_credential
    )]
    credentials: Vec<(String, String)>,
}

fn parse_credential(s: &str) -> Result<(String, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("empty field name in '{s}'"));
    }
    Ok((field.to_string(), value.to_string()))
}

fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .try_init();
}

/// Catalog plus resolver, built once from the manifest.
struct Gate {
    catalog: Arc<ToolCatalog>,
    resolver: CredentialResolver,
}

impl Gate {
    async fn open(path: &str) -> Result<Self> {
        let config = ToolgateConfig::from_file(path)
            .await
            .with_context(|| format!("Failed to load tool manifest from {path}"))?;
        let catalog = ToolCatalog::from_manifest(&config, &ConstructorRegistry::new())?;
        let resolver = CredentialResolver::new(
            Arc::new(config.environment()),
            Arc::new(InMemoryCredentialStore::new()),
        );
        Ok(Self {
            catalog: Arc::new(catalog),
            resolver,
        })
    }

    /// Write each `FIELD=VALUE` under the full alias group of the tool that
    /// declares `FIELD`, so every alias sees it.
    async fn seed(&self, user: &UserId, credentials: &[(String, String)]) -> Result<()> {
        for (field, value) in credentials {
            let declared = self.catalog.iter().find_map(|record| {
                record
                    .requirement()
                    .groups()
                    .iter()
                    .find(|group| group.contains(field))
                    .map(|group| (record.plugin_key.as_str(), group.clone()))
            });

            let (plugin_key, group) = match declared {
                Some(found) => found,
                None => (CLI_PLUGIN_KEY, AuthFieldGroup::parse(field)?),
            };

            debug!(user_id = %user, plugin_key, field = %group, "Seeding credential");
            self.resolver
                .store_credential(user, &group, plugin_key, SecretValue::new(value.as_str()))
                .await?;
        }
        Ok(())
    }

    fn requested(&self, request: &RequestArgs) -> Vec<String> {
        if request.all {
            self.catalog
                .plugin_keys()
                .into_iter()
                .map(String::from)
                .collect()
        } else {
            request.tools.clone()
        }
    }
}

async fn validate(gate: &Gate, request: &RequestArgs) -> Result<()> {
    let user = UserId::new(request.user.as_str());
    gate.seed(&user, &request.credentials).await?;

    let requested = gate.requested(request);
    let validator = ToolValidator::new(gate.catalog.clone(), gate.resolver.clone());
    let valid = validator.validate(&user, &requested).await?;

    for key in &requested {
        let status = if valid.contains(key) {
            "valid"
        } else if gate.catalog.contains(key) {
            "unavailable"
        } else {
            "unknown"
        };
        println!("{key}\t{status}");
    }
    Ok(())
}

async fn load(gate: &Gate, request: &RequestArgs, options: LoadOptions) -> Result<()> {
    let user = UserId::new(request.user.as_str());
    gate.seed(&user, &request.credentials).await?;

    let requested = gate.requested(request);
    let loader = ToolLoader::new(gate.catalog.clone(), gate.resolver.clone());
    let initializers = loader.load(&user, &requested, &options);

    let mut failed = 0usize;
    for key in &requested {
        let Some(initializer) = initializers.get(key) else {
            println!("{key}\tunknown");
            continue;
        };

        match initializer.invoke().await {
            Ok(tool) => match tool.as_function() {
                Some(function) => {
                    let definition = serde_json::to_string(&function.definition())?;
                    println!("{key}\tok\t{definition}");
                }
                None => println!("{key}\tok\t{}", tool.name()),
            },
            Err(PluginAuthError::CredentialUnavailable { field, .. }) => {
                failed += 1;
                println!("{key}\tmissing\t{field}");
            }
            Err(e) => {
                failed += 1;
                warn!(plugin_key = %key, error = %e, "Tool initialization failed");
                println!("{key}\terror\t{e}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} tool(s) could not be initialized");
    }
    Ok(())
}

fn doctor(gate: &Gate) {
    let env = gate.resolver.environment();
    for field in gate.catalog.auth_fields() {
        let status = if env.get(field).is_some() {
            "set"
        } else if env.is_user_provided(field) {
            "user_provided"
        } else {
            "unset"
        };
        println!("{field}\t{status}");
    }

    for record in gate.catalog.iter().filter(|r| r.requires_auth()) {
        let from_env = record
            .requirement()
            .groups()
            .iter()
            .all(|group| gate.resolver.resolve_from_env(group).is_some());
        if !from_env {
            println!("{}\tneeds user credentials", record.plugin_key);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let gate = Gate::open(&cli.config).await?;

    match cli.command {
        Command::Validate(request) => validate(&gate, &request).await,
        Command::Load {
            request,
            functions,
            use_specs,
        } => {
            let options = LoadOptions::new()
                .with_functions(functions)
                .with_specs(use_specs);
            load(&gate, &request, options).await
        }
        Command::Doctor => {
            doctor(&gate);
            Ok(())
        }
    }
}
