//! Init command - write a `.rita.yaml` tailored to the repository layout

use clap::Args;
use miette::{IntoDiagnostic, WrapErr};
use rita_core::{EnvironmentConfig, RitaConfig};
use std::path::Path;

use crate::display;
use crate::error::{CliError, Result};
use crate::util::Context;

/// Directory holding one subdirectory per environment
const APPS_ROOT: &str = "kubernetes/argocd/applications";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(short, long)]
    force: bool,

    /// Charts directory, relative to the repository root
    #[arg(long)]
    charts: Option<String>,

    /// OCI registry charts are published to
    #[arg(long)]
    registry: Option<String>,
}

/// Aliases given to conventionally named environments
fn default_aliases(env: &str) -> Vec<String> {
    match env {
        "dev" => vec!["development".to_string()],
        "prod" => vec!["production".to_string()],
        "stg" => vec!["staging".to_string()],
        _ => Vec::new(),
    }
}

/// Configuration inferred from the directories under `root`
///
/// Every `kubernetes/argocd/applications/<env>/templates` directory becomes
/// an environment; with none found the defaults are kept.
pub fn detect_config(root: &Path) -> RitaConfig {
    let mut config = RitaConfig::default();

    let mut environments: Vec<EnvironmentConfig> = std::fs::read_dir(root.join(APPS_ROOT))
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().join("templates").is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .map(|name| {
            let mut env =
                EnvironmentConfig::with_path(&name, format!("{}/{}/templates", APPS_ROOT, name));
            env.aliases = default_aliases(&name);
            env
        })
        .collect();
    environments.sort_by(|a, b| a.name.cmp(&b.name));

    if !environments.is_empty() {
        config.environments = environments;
    }
    config
}

pub fn run(ctx: &Context, args: InitArgs) -> Result<()> {
    let workspace = ctx.unchecked_workspace()?;
    let path = workspace.config_file();
    if path.exists() && !args.force {
        return Err(CliError::config(
            format!("Configuration file already exists: {}", path.display()),
            Some("Use --force to overwrite the existing configuration".to_string()),
        ));
    }

    let mut config = detect_config(&workspace.root);
    if let Some(charts) = args.charts {
        config.charts.path = charts;
    }
    if let Some(registry) = args.registry {
        config.charts.registry = registry;
    }

    display::header("RITA project initialization");
    display::key_value("Repository", workspace.root.display());
    display::key_value("Charts", &config.charts.path);
    display::key_value("Registry", &config.charts.registry);
    for env in &config.environments {
        let found = env.paths.iter().all(|p| workspace.root.join(p).is_dir());
        let marker = if found { "" } else { " (not found yet)" };
        display::key_value(
            &format!("Environment {}", env.name),
            format!("{}{}", env.paths.join(", "), marker),
        );
    }
    println!();

    config
        .save_to(&path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    display::success(format!("Created {}", path.display()));
    display::hint("Check it with: rita config check");
    Ok(())
}
