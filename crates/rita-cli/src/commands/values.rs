//! Values commands - inspect and fetch default values of external charts

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, WrapErr};
use rita_core::{Application, Workspace};
use rita_kube::{Helm, SystemRunner, is_oci_registry, resolve_registry_credentials};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::display;
use crate::error::{CliError, Result};
use crate::util::{self, Context};

/// Suffix of fetched values files, ignored by `render` and removed by `values clean`
const TEMP_VALUES_SUFFIX: &str = ".temp.yaml";

#[derive(Subcommand)]
pub enum ValuesCommand {
    /// List applications that use external charts
    List {
        /// Environment (name or alias)
        #[arg(short, long, default_value = "dev")]
        env: String,

        /// List every environment
        #[arg(long)]
        all_envs: bool,
    },

    /// List published versions of an application's chart
    Versions {
        /// Application name
        #[arg(short, long)]
        app: String,

        /// Environment (name or alias)
        #[arg(short, long, default_value = "dev")]
        env: String,

        /// Maximum number of versions
        #[arg(short = 'n', long = "max", default_value_t = 20)]
        max: usize,
    },

    /// Fetch the default values.yaml of an application's chart
    Fetch {
        /// Application name
        #[arg(short, long)]
        app: String,

        /// Environment (name or alias)
        #[arg(short, long, default_value = "dev")]
        env: String,

        /// Chart version (defaults to the application's targetRevision)
        #[arg(short, long = "version")]
        chart_version: Option<String>,

        /// Destination file (defaults to `<first values file>.temp.yaml`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove fetched `*.temp.yaml` files
    Clean {
        /// Directory to search, relative to the repository root
        #[arg(short, long, default_value = "kubernetes")]
        path: PathBuf,

        /// Show what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(ctx: &Context, command: ValuesCommand) -> Result<()> {
    match command {
        ValuesCommand::List { env, all_envs } => list(ctx, &env, all_envs),
        ValuesCommand::Versions { app, env, max } => versions(ctx, &app, &env, max),
        ValuesCommand::Fetch {
            app,
            env,
            chart_version,
            output,
        } => fetch(ctx, &app, &env, chart_version.as_deref(), output),
        ValuesCommand::Clean { path, dry_run } => clean(ctx, &path, dry_run),
    }
}

fn list(ctx: &Context, env: &str, all_envs: bool) -> Result<()> {
    let workspace = ctx.workspace()?;
    for env in util::selected_envs(&workspace, env, all_envs)? {
        let external: Vec<Application> = workspace
            .applications(&env)?
            .into_iter()
            .filter(|a| a.has_chart() && !a.is_local_chart)
            .collect();
        if external.is_empty() {
            display::warning(format!("No external chart applications in {}", env));
            continue;
        }
        display::header(format!("External chart applications in {}", env));
        display::app_table(&external);
    }
    Ok(())
}

/// Application with a Helm chart, looked up in an environment
fn chart_app(workspace: &Workspace, env: &str, name: &str) -> Result<Application> {
    let env = workspace.resolve_env(env)?;
    let app = workspace.application(&env, name)?;
    if !app.has_chart() {
        return Err(CliError::usage(
            format!("Application '{}' has no Helm chart source", name),
            "values commands only apply to Helm-based applications",
        ));
    }
    Ok(app)
}

/// Log in to the chart's OCI registry when credentials are configured
fn login_if_configured(helm: &Helm<'_>, runner: &SystemRunner, workspace: &Workspace, repo: &str) {
    if !is_oci_registry(repo) {
        return;
    }
    if let Some(creds) = resolve_registry_credentials(runner, &workspace.config, repo) {
        helm.ensure_registry_auth(repo, &creds.username, &creds.password);
    }
}

fn versions(ctx: &Context, name: &str, env: &str, max: usize) -> Result<()> {
    let workspace = ctx.workspace()?;
    let app = chart_app(&workspace, env, name)?;

    display::header(format!("Versions of {}", app.chart_name));
    display::key_value("Repository", &app.chart_repo);
    display::key_value("Current version", &app.chart_version);
    println!();

    let runner = SystemRunner::new();
    let helm = Helm::new(&runner);
    let work = TempDir::new()?;
    let spinner = util::spinner("Searching repository...");
    let result = helm.search_versions(&app.chart_repo, &app.chart_name, max, work.path());
    spinner.finish_and_clear();

    let versions = result?;
    if versions.is_empty() {
        display::warning("No versions found");
        return Ok(());
    }
    for version in versions {
        if version == app.chart_version {
            println!("  {} {}", version, style("← current").green());
        } else {
            println!("  {}", version);
        }
    }
    Ok(())
}

/// `values/dev.yaml` -> `values/dev.temp.yaml`
fn temp_values_path(values_file: &Path) -> PathBuf {
    let stem = values_file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "values".to_string());
    values_file.with_file_name(format!("{}{}", stem, TEMP_VALUES_SUFFIX))
}

fn fetch(
    ctx: &Context,
    name: &str,
    env: &str,
    version: Option<&str>,
    output: Option<PathBuf>,
) -> Result<()> {
    let workspace = ctx.workspace()?;
    let app = chart_app(&workspace, env, name)?;
    let version = version.unwrap_or(&app.chart_version).to_string();

    let first_values = app.values_files.first().map(|v| workspace.root.join(v));
    let dest = match (output, &first_values) {
        (Some(path), _) => path,
        (None, Some(values)) => temp_values_path(values),
        (None, None) => {
            return Err(CliError::usage(
                format!("Application '{}' has no values files", app.name),
                "Choose a destination with --output",
            ));
        }
    };

    display::header(format!("Fetching values for {}", app.chart_name));
    display::key_value("Application", &app.name);
    display::key_value(
        "Source file",
        display::display_path(&workspace, &app.source_file),
    );
    display::key_value("Repository", &app.chart_repo);
    display::key_value("Version", &version);
    display::key_value("Output", dest.display());
    println!();

    let runner = SystemRunner::new();
    let helm = Helm::new(&runner);
    login_if_configured(&helm, &runner, &workspace, &app.chart_repo);

    let work = TempDir::new()?;
    let spinner = util::spinner(format!("Pulling {}:{}...", app.chart_name, version));
    let result = helm.show_values(&app.chart_repo, &app.chart_name, &version, work.path());
    spinner.finish_and_clear();
    let values = result?;

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&dest, values)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {}", dest.display()))?;

    display::success(format!("Values saved to {}", dest.display()));
    if let Some(values) = first_values {
        display::hint(format!("Compare with: diff {} {}", values.display(), dest.display()));
    }
    Ok(())
}

fn clean(ctx: &Context, path: &Path, dry_run: bool) -> Result<()> {
    let workspace = ctx.workspace()?;
    let dir = workspace.root.join(path);
    if !dir.is_dir() {
        display::warning(format!("Path not found: {}", dir.display()));
        return Ok(());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&dir).sort_by_file_name() {
        let entry = entry.map_err(|e| CliError::Io {
            message: e.to_string(),
        })?;
        if entry.file_type().is_file()
            && entry.file_name().to_string_lossy().ends_with(TEMP_VALUES_SUFFIX)
        {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        println!("No {} files found", TEMP_VALUES_SUFFIX);
        return Ok(());
    }

    for file in &files {
        let shown = display::display_path(&workspace, file);
        if dry_run {
            println!("Would delete: {}", shown);
        } else {
            std::fs::remove_file(file)?;
            println!("Deleted: {}", shown);
        }
    }

    println!();
    if dry_run {
        println!("{} file(s) would be deleted", files.len());
    } else {
        display::success(format!("Deleted {} file(s)", files.len()));
    }
    Ok(())
}
