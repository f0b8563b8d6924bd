//! Config commands - create, show and check `.rita.yaml`, discover the layout

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, WrapErr};
use rita_core::application::{FileFilter, discover_applications};
use rita_core::config::default_yaml;
use rita_core::values::find_chart;
use std::path::PathBuf;

use crate::display::{self, ValidationReport};
use crate::error::{CliError, Result};
use crate::util::Context;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Write a configuration file with every default spelled out
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,

    /// Check the configuration for mistakes
    Check,

    /// Show detected environments and local charts
    Discover {
        /// List the ArgoCD applications below this directory instead
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

pub fn run(ctx: &Context, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init { force } => init(ctx, force),
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => {
            let workspace = ctx.unchecked_workspace()?;
            println!("{}", workspace.config_file().display());
            Ok(())
        }
        ConfigCommand::Check => check(ctx),
        ConfigCommand::Discover { path } => match path {
            Some(path) => discover_path(ctx, &path),
            None => discover(ctx),
        },
    }
}

fn init(ctx: &Context, force: bool) -> Result<()> {
    let workspace = ctx.unchecked_workspace()?;
    let path = workspace.config_file();
    if path.exists() && !force {
        return Err(CliError::config(
            format!("{} already exists", path.display()),
            Some("Use --force to overwrite".to_string()),
        ));
    }

    std::fs::write(&path, default_yaml()?)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    display::success(format!("Created {}", path.display()));
    Ok(())
}

fn show(ctx: &Context) -> Result<()> {
    let workspace = ctx.unchecked_workspace()?;
    match &workspace.config_path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no configuration file found, using defaults"),
    }
    print!("{}", workspace.config.to_yaml()?);
    Ok(())
}

fn check(ctx: &Context) -> Result<()> {
    let workspace = ctx.unchecked_workspace()?;
    let file = display::display_path(&workspace, &workspace.config_file());

    let mut report = ValidationReport::new();
    for issue in workspace.config.validate() {
        report.add(issue.severity.into(), &file, "", &issue.message);
    }

    for env in &workspace.config.environments {
        for path in workspace.search_paths(&env.name) {
            if !path.is_dir() {
                report.add(
                    display::Severity::Warning,
                    &file,
                    &format!("environments.{}", env.name),
                    &format!("path not found: {}", display::display_path(&workspace, &path)),
                );
            }
        }
    }
    report.validated_count = 1;

    if workspace.config_path.is_none() {
        display::step("No configuration file found, checking defaults");
    }
    report.display();
    println!();
    report.print_summary();

    if report.has_errors() {
        let (errors, _) = report.summary();
        return Err(CliError::config(
            format!("Configuration has {} error(s)", errors),
            None,
        ));
    }
    Ok(())
}

fn discover(ctx: &Context) -> Result<()> {
    let workspace = ctx.unchecked_workspace()?;
    let source = if workspace.config_path.is_none() {
        "defaults"
    } else if workspace.config.environments.is_empty() {
        "auto-discovered"
    } else {
        "configured"
    };

    let envs = workspace.environment_names()?;
    display::header(format!("Environments ({}, {})", envs.len(), source));
    if envs.is_empty() {
        display::warning("No environments found");
        display::hint("Run: rita init");
    }
    for env in &envs {
        let apps = workspace.applications(env)?;
        let paths: Vec<String> = workspace
            .search_paths(env)
            .iter()
            .map(|p| display::display_path(&workspace, p))
            .collect();
        println!(
            "  {}  {} application(s)  {}",
            style(env).cyan(),
            apps.len(),
            style(paths.join(", ")).dim()
        );
    }

    let charts = workspace.local_charts()?;
    println!();
    display::header(format!(
        "Local charts ({}) in {}",
        charts.len(),
        display::display_path(&workspace, &workspace.charts_dir())
    ));
    for chart in &charts {
        match find_chart(chart) {
            Some(registered) => println!(
                "  {}  {}",
                style(chart).cyan(),
                style(format!("values model {}", registered.model)).dim()
            ),
            None => println!("  {}", style(chart).cyan()),
        }
    }
    Ok(())
}

fn discover_path(ctx: &Context, path: &std::path::Path) -> Result<()> {
    let workspace = ctx.unchecked_workspace()?;
    let dir = workspace.root.join(path);
    if !dir.is_dir() {
        return Err(CliError::config(
            format!("Path does not exist: {}", dir.display()),
            None,
        ));
    }

    let filter = FileFilter::new(&[], &[])?;
    let apps = discover_applications(
        std::slice::from_ref(&dir),
        &filter,
        &workspace.root,
        &workspace.charts_dir(),
    )?;
    if apps.is_empty() {
        println!("No ArgoCD applications found in {}", display::display_path(&workspace, &dir));
        return Ok(());
    }

    display::header(format!(
        "Applications in {} ({})",
        display::display_path(&workspace, &dir),
        apps.len()
    ));
    display::app_table(&apps);
    Ok(())
}
