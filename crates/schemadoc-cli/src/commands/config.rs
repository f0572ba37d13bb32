//! Config command - View and manage configuration
//!
//! Provides commands for viewing and modifying SchemaDoc configuration:
//! - Show every value with the layer it came from
//! - Get and set single values (local or global)
//! - Create default config files and show their paths

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use schemadoc_config::{ConfigLoader, LogFormat, SchemaDocConfig};
use serde::Serialize;

use super::{load_config, print_info, resolve_project};
use crate::GlobalOptions;

/// Config management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show all configuration values with their sources
    Show(ShowArgs),

    /// Get a specific configuration value
    Get(GetArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Create a default configuration file
    Init(InitArgs),

    /// Show configuration file paths
    Path(PathArgs),
}

/// Arguments for the show command
#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Show only effective values (hide sources)
    #[arg(long)]
    effective: bool,
}

/// Arguments for the get command
#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Configuration key (e.g., "build.wrap_width")
    key: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Arguments for the set command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., "build.wrap_width")
    key: String,

    /// Value to set
    value: String,

    /// Set in global config (~/.schemadoc/config.toml) instead of local
    #[arg(long)]
    global: bool,
}

/// Arguments for the init command
#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Create the global config (~/.schemadoc/config.toml) instead of local
    #[arg(long)]
    global: bool,
}

/// Arguments for the path command
#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Configuration value with source information
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue {
    /// Configuration key
    pub key: String,
    /// Current value
    pub value: serde_json::Value,
    /// Source of this value (default, global, local)
    pub source: String,
}

/// Configuration paths
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    /// Global config file path
    pub global: Option<PathBuf>,
    /// Local config file path
    pub local: PathBuf,
    /// Whether global config exists
    pub global_exists: bool,
    /// Whether local config exists
    pub local_exists: bool,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Show(args) => execute_show(args, global),
        ConfigCommand::Get(args) => execute_get(args, global),
        ConfigCommand::Set(args) => execute_set(args, global),
        ConfigCommand::Init(args) => execute_init(args, global),
        ConfigCommand::Path(args) => execute_path(args, global),
    }
}

fn execute_show(args: ShowArgs, global: GlobalOptions) -> Result<()> {
    let project = resolve_project(&global)?;
    let mut loader = ConfigLoader::new();

    let default_config = SchemaDocConfig::default();
    let global_config = loader.load_global()?.unwrap_or_default();
    let effective = load_config(&global, &project)?;

    if args.effective {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&effective)?);
        } else {
            print!("{}", toml::to_string_pretty(&effective)?);
        }
        return Ok(());
    }

    let values = collect_config_values(&default_config, &global_config, &effective)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    println!("SchemaDoc Configuration");
    println!("=======================\n");
    if let Some(gp) = loader.global_config_path() {
        let status = if gp.exists() { "" } else { " (not found)" };
        println!("Global config: {}{}", gp.display(), status);
    }
    let lp = loader.local_config_path(&project);
    let status = if lp.exists() { "" } else { " (not found)" };
    println!("Local config:  {}{}", lp.display(), status);
    if let Some(ref explicit) = global.config {
        println!("Config file:   {} (replaces local)", explicit.display());
    }

    let mut section = "";
    for value in &values {
        let (head, field) = value.key.split_once('.').unwrap_or(("", value.key.as_str()));
        if head != section {
            println!("\n[{}]", head);
            section = head;
        }
        let source = match value.source.as_str() {
            "default" => String::new(),
            other => format!(" ({})", other),
        };
        println!("  {} = {}{}", field, value.value, source);
    }

    Ok(())
}

fn execute_get(args: GetArgs, global: GlobalOptions) -> Result<()> {
    let project = resolve_project(&global)?;
    let config = load_config(&global, &project)?;

    let value = get_config_value(&config, &args.key)
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", args.key))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        match value {
            serde_json::Value::String(s) => println!("{}", s),
            serde_json::Value::Bool(b) => println!("{}", b),
            serde_json::Value::Number(n) => println!("{}", n),
            serde_json::Value::Null => println!("null"),
            other => println!("{}", serde_json::to_string_pretty(&other)?),
        }
    }

    Ok(())
}

fn execute_set(args: SetArgs, global: GlobalOptions) -> Result<()> {
    let project = resolve_project(&global)?;
    let mut loader = ConfigLoader::new();

    let mut config = if args.global {
        loader.load_global()?.unwrap_or_default()
    } else {
        loader.load_local(&project)?.unwrap_or_default()
    };

    set_config_value(&mut config, &args.key, &args.value)
        .with_context(|| format!("Failed to set configuration key: {}", args.key))?;
    config.validate().context("Invalid configuration")?;

    if args.global {
        loader.save_global(&config)?;
        println!("Set {} = {} in global config", args.key, args.value);
    } else {
        loader.save_local(&project, &config)?;
        println!("Set {} = {} in local config", args.key, args.value);
    }

    Ok(())
}

fn execute_init(args: InitArgs, global: GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let path = if args.global {
        loader.init_global()?
    } else {
        let project = resolve_project(&global)?;
        loader.init_local(&project)?
    };

    print_info(&format!("Configuration file: {}", path.display()), global.quiet);
    Ok(())
}

fn execute_path(args: PathArgs, global: GlobalOptions) -> Result<()> {
    let project = resolve_project(&global)?;
    let loader = ConfigLoader::new();
    let paths = config_paths(&loader, &project);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else {
        println!("Configuration Paths");
        println!("===================\n");

        if let Some(ref gp) = paths.global {
            let status = if paths.global_exists {
                "exists"
            } else {
                "not found"
            };
            println!("Global: {} ({})", gp.display(), status);
        } else {
            println!("Global: not available (no home directory)");
        }

        let status = if paths.local_exists {
            "exists"
        } else {
            "not found"
        };
        println!("Local:  {} ({})", paths.local.display(), status);
    }

    Ok(())
}

fn config_paths(loader: &ConfigLoader, project: &Path) -> ConfigPaths {
    let global = loader.global_config_path();
    let local = loader.local_config_path(project);
    ConfigPaths {
        global_exists: global.as_ref().map(|p| p.exists()).unwrap_or(false),
        local_exists: local.exists(),
        global,
        local,
    }
}

/// Get a configuration value by key path
fn get_config_value(config: &SchemaDocConfig, key: &str) -> Option<serde_json::Value> {
    let json = serde_json::to_value(config).ok()?;

    let mut current = &json;
    for part in key.split('.') {
        current = current.get(part)?;
    }

    Some(current.clone())
}

/// Set a configuration value by key path
fn set_config_value(config: &mut SchemaDocConfig, key: &str, value: &str) -> Result<()> {
    match key {
        // Source
        "source.database" => {
            config.source.database = Some(PathBuf::from(value));
            config.source.snapshot = None;
        }
        "source.snapshot" => {
            config.source.snapshot = Some(PathBuf::from(value));
            config.source.database = None;
        }

        // Catalog
        "catalog.dialect" => config.catalog.dialect = value.parse()?,
        "catalog.file" => config.catalog.file = Some(PathBuf::from(value)),

        // Build
        "build.wrap_width" => config.build.wrap_width = value.parse()?,
        "build.wrap_break" => config.build.wrap_break = unescape(value),
        "build.duplicate_policy" => config.build.duplicate_policy = value.parse()?,

        // Output
        "output.path" => config.output.path = PathBuf::from(value),
        "output.pretty" => config.output.pretty = value.parse()?,

        // Logging
        "logging.level" => config.logging.level = value.to_lowercase(),
        "logging.format" => {
            config.logging.format = match value.to_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => anyhow::bail!("unknown log format '{}'. Valid values: text, json", other),
            }
        }

        _ => anyhow::bail!("Unknown or read-only configuration key: {}", key),
    }

    Ok(())
}

/// Shell-friendly escapes for break sequences (`\r`, `\n`, `\t`)
fn unescape(value: &str) -> String {
    value
        .replace("\\r", "\r")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}

/// Collect configuration values with source information
fn collect_config_values(
    default: &SchemaDocConfig,
    global: &SchemaDocConfig,
    effective: &SchemaDocConfig,
) -> Result<Vec<ConfigValue>> {
    let default_json = serde_json::to_value(default)?;
    let global_json = serde_json::to_value(global)?;
    let effective_json = serde_json::to_value(effective)?;

    let mut values = Vec::new();
    flatten_config("", &effective_json, &global_json, &default_json, &mut values);
    Ok(values)
}

/// Recursively flatten config into key-value pairs with sources
fn flatten_config(
    prefix: &str,
    effective: &serde_json::Value,
    global: &serde_json::Value,
    default: &serde_json::Value,
    values: &mut Vec<ConfigValue>,
) {
    match effective {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                let new_prefix = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };

                let global_val = global.get(key).unwrap_or(&serde_json::Value::Null);
                let default_val = default.get(key).unwrap_or(&serde_json::Value::Null);

                flatten_config(&new_prefix, value, global_val, default_val, values);
            }
        }
        _ => {
            let source = if effective != default && effective != global {
                "local"
            } else if global != default {
                "global"
            } else {
                "default"
            };

            values.push(ConfigValue {
                key: prefix.to_string(),
                value: effective.clone(),
                source: source.to_string(),
            });
        }
    }
}
