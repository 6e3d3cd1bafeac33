#![deny(unsafe_code)]

//! tagtree CLI: browse a tagged resource catalog from the terminal.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tagtree_config::AppConfig;
use tagtree_core::build_info;
use tagtree_core::{FilterOp, Loader, Query, Registry, Relation};

/// tagtree: resolve and browse a tag-inherited resource catalog.
#[derive(Parser)]
#[command(name = "tagtree", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "tagtree.toml")]
    config: PathBuf,

    /// Catalog file or URL, overriding `registry.source`.
    #[arg(short, long)]
    source: Option<String>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Catalog(CatalogCommand),

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Subcommands that read a loaded catalog.
#[derive(Subcommand)]
enum CatalogCommand {
    /// List root resources.
    Roots,

    /// Show the resolved view of one resource.
    Show {
        /// Resource key.
        key: String,
    },

    /// List the configurable fields of a resource with their values.
    Fields {
        /// Resource key.
        key: String,
    },

    /// List resources carrying the given tags.
    Filter {
        /// Tags to match.
        tags: Vec<String>,

        /// How tags combine: "and" or "or".
        #[arg(long, default_value = "and")]
        op: String,

        /// Tag set to test: "ancestors", "parents" or "children".
        #[arg(long, default_value = "ancestors")]
        relation: String,
    },

    /// Print the resource tree from the roots down.
    Tree,

    /// Report dangling tags and truncated cycles.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, found) = load_config(&cli.config).await?;
    let config = apply_source(config, cli.source.as_deref())?;

    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    debug!(version = %build_info::version_string(), "tagtree starting");
    if !found {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    let command = match cli.command {
        Commands::Config { show } => return cmd_config(&cli.config, &config, show),
        Commands::Catalog(command) => command,
    };

    let registry = Loader::from_config(&config.registry)?
        .open(&config.registry.source)
        .await
        .with_context(|| format!("loading catalog from '{}'", config.registry.source))?;

    match command {
        CatalogCommand::Roots => cmd_roots(&registry),
        CatalogCommand::Show { key } => cmd_show(&registry, &key)?,
        CatalogCommand::Fields { key } => cmd_fields(&registry, &key)?,
        CatalogCommand::Filter { tags, op, relation } => {
            cmd_filter(&registry, tags, &op, &relation)?
        }
        CatalogCommand::Tree => cmd_tree(&registry),
        CatalogCommand::Check => cmd_check(&registry)?,
    }

    Ok(())
}

fn display_name<'a>(registry: &'a Registry, key: &'a str) -> &'a str {
    registry.record(key).and_then(|r| r.name()).unwrap_or(key)
}

fn require_key(registry: &Registry, key: &str) -> Result<()> {
    if !registry.contains(key) {
        bail!("'{key}' is not in the catalog");
    }
    Ok(())
}

fn cmd_roots(registry: &Registry) {
    for key in registry.roots() {
        println!("{key}\t{}", display_name(registry, key));
    }
}

fn cmd_show(registry: &Registry, key: &str) -> Result<()> {
    require_key(registry, key)?;

    println!("{} ({key})", display_name(registry, key));
    println!("parents:   {}", registry.parents(key).join(", "));
    println!("children:  {}", registry.children(key).join(", "));
    println!("ancestors: {}", registry.ancestors(key).join(", "));
    println!("fields:    {}", registry.props(key).join(", "));

    if let Some(view) = registry.flat(key) {
        println!("{}", serde_json::to_string_pretty(&view.attributes)?);
    }
    Ok(())
}

fn cmd_fields(registry: &Registry, key: &str) -> Result<()> {
    require_key(registry, key)?;

    for (name, value) in registry.field_values(key) {
        println!("{name} = {}", serde_json::to_string(value)?);
    }
    Ok(())
}

fn cmd_filter(registry: &Registry, tags: Vec<String>, op: &str, relation: &str) -> Result<()> {
    let relation: Relation = relation.parse()?;

    let result = match op.parse::<FilterOp>() {
        Ok(op) => registry.query(&Query::new(tags, op).on(relation), None),
        Err(_) => registry.filter_str(&tags, op, None),
    };

    for key in result.keys() {
        println!("{key}\t{}", display_name(registry, key));
    }
    Ok(())
}

fn cmd_tree(registry: &Registry) {
    let lines = registry.gather_reduce(registry.roots(), |key, children: Vec<String>, depth| {
        let mut out = format!("{}{}\n", "  ".repeat(depth), display_name(registry, key));
        out.extend(children);
        out
    });
    print!("{}", lines.concat());
}

fn cmd_check(registry: &Registry) -> Result<()> {
    let diagnostics = registry.diagnostics();
    for diagnostic in diagnostics {
        println!("{diagnostic}");
    }

    if !diagnostics.is_empty() {
        bail!("{} problem(s) found in catalog", diagnostics.len());
    }
    println!("Catalog with {} resources is consistent.", registry.index().len());
    Ok(())
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let toml_str =
            toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

/// Apply the `--source` override and validate the result.
fn apply_source(mut config: AppConfig, source: Option<&str>) -> Result<AppConfig> {
    if let Some(source) = source {
        config.registry.source = source.to_string();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if path.exists() {
        let config = AppConfig::load(path)
            .await
            .with_context(|| format!("loading config from '{}'", path.display()))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}
