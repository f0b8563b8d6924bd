//! Render commands - render ArgoCD applications and diff the results

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, WrapErr};
use rita_core::manifest::{DEFAULT_MAX_DIFF_LINES, read_combined};
use rita_core::{Application, DiffOutcome, DiffReport, ManifestDiff, Workspace, find_affected_apps};
use rita_kube::{Git, Renderer, SystemRunner};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::display;
use crate::error::{CliError, Result};
use crate::util::{self, Context};

#[derive(Subcommand)]
pub enum RenderCommand {
    /// List ArgoCD applications that can be rendered
    List {
        /// Environment (name or alias)
        #[arg(short, long, default_value = "dev")]
        env: String,

        /// List every environment
        #[arg(long)]
        all_envs: bool,
    },

    /// Render applications into the output directory
    Apply {
        /// Environment (name or alias)
        #[arg(short, long, default_value = "dev")]
        env: String,

        /// Render every environment
        #[arg(long)]
        all_envs: bool,

        /// Only applications whose name contains this text
        #[arg(short, long)]
        app: Option<String>,

        /// Show what would be rendered
        #[arg(long)]
        dry_run: bool,

        /// Also render applications using external charts
        #[arg(long)]
        include_external: bool,

        /// Also render Applications and ApplicationSets found in the output
        #[arg(short, long)]
        recursive: bool,
    },

    /// Diff freshly rendered manifests against the rendered baseline
    Diff {
        /// Environment (name or alias); all environments when omitted
        #[arg(short, long)]
        env: Option<String>,

        /// Only applications whose name contains this text
        #[arg(short, long)]
        app: Option<String>,

        /// Only applications affected by `git diff BASE...HEAD`
        #[arg(short, long)]
        base: Option<String>,

        /// Print a GitHub-flavoured markdown summary
        #[arg(long, conflicts_with = "json")]
        github: bool,

        /// Print a JSON summary
        #[arg(long)]
        json: bool,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Lines shown per resource before truncating
        #[arg(long, default_value_t = DEFAULT_MAX_DIFF_LINES)]
        max_lines: usize,

        /// Include Applications and ApplicationSets found in the output
        #[arg(short, long)]
        recursive: bool,
    },

    /// Remove rendered manifests
    Clean {
        /// Only this environment
        #[arg(short, long)]
        env: Option<String>,

        /// Remove the whole output directory
        #[arg(long)]
        all: bool,

        /// Show what would be removed
        #[arg(long)]
        dry_run: bool,
    },
}

pub fn run(ctx: &Context, command: RenderCommand) -> Result<()> {
    match command {
        RenderCommand::List { env, all_envs } => list(ctx, &env, all_envs),
        RenderCommand::Apply {
            env,
            all_envs,
            app,
            dry_run,
            include_external,
            recursive,
        } => apply(
            ctx,
            &ApplyOptions {
                env,
                all_envs,
                filter: app,
                dry_run,
                include_external,
                recursive,
            },
        ),
        RenderCommand::Diff {
            env,
            app,
            base,
            github,
            json,
            output,
            max_lines,
            recursive,
        } => diff(
            ctx,
            &DiffOptions {
                env,
                app,
                base,
                github,
                json,
                output,
                max_lines,
                recursive,
            },
        ),
        RenderCommand::Clean { env, all, dry_run } => clean(ctx, env.as_deref(), all, dry_run),
    }
}

fn list(ctx: &Context, env: &str, all_envs: bool) -> Result<()> {
    let workspace = ctx.workspace()?;
    for env in util::selected_envs(&workspace, env, all_envs)? {
        let apps = workspace.applications(&env)?;
        if apps.is_empty() {
            display::warning(format!("No applications found in {}", style(&env).bold()));
            continue;
        }
        display::header(format!("Applications in {} ({})", env, apps.len()));
        display::app_table(&apps);
    }
    Ok(())
}

struct ApplyOptions {
    env: String,
    all_envs: bool,
    filter: Option<String>,
    dry_run: bool,
    include_external: bool,
    recursive: bool,
}

fn apply(ctx: &Context, opts: &ApplyOptions) -> Result<()> {
    let workspace = ctx.workspace()?;
    let runner = SystemRunner::new();
    let renderer = Renderer::new(&runner, &workspace);
    let local_only = workspace.config.render.local_charts_only && !opts.include_external;
    let dry_run = opts.dry_run;

    let mut rendered = 0;
    let mut failed = 0;

    for env in util::selected_envs(&workspace, &opts.env, opts.all_envs)? {
        display::header(format!("Rendering {}", env));
        let apps = util::filter_apps(workspace.applications(&env)?, opts.filter.as_deref());
        let (apps, skipped): (Vec<Application>, Vec<Application>) = apps
            .into_iter()
            .partition(|a| util::renders_by_default(a, local_only));

        if apps.is_empty() {
            display::warning(format!("No applications to render in {}", env));
        }

        for app in &apps {
            let output_dir = workspace.rendered_dir(&env, &app.name);
            let shown = display::display_path(&workspace, &output_dir);
            if dry_run {
                display::step(format!("Would render {} → {}", app.name, shown));
                continue;
            }

            let spinner = util::spinner(format!("Rendering {}...", app.name));
            let result = render_app(&renderer, app, &output_dir, opts.recursive);
            spinner.finish_and_clear();

            match result {
                Ok(summary) => {
                    display::success(format!(
                        "{} → {} {}",
                        app.name,
                        shown,
                        style(format!("({})", summary)).dim()
                    ));
                    for error in &summary.nested_errors {
                        display::warning(format!("{} nested: {}", app.name, error));
                    }
                    rendered += 1;
                }
                Err(e) => {
                    display::failure(format!("{}: {}", app.name, e));
                    failed += 1;
                }
            }
        }

        if !skipped.is_empty() {
            println!(
                "  {}",
                style(format!(
                    "{} external-chart application(s) skipped (use --include-external)",
                    skipped.len()
                ))
                .dim()
            );
        }
    }

    if dry_run {
        return Ok(());
    }
    println!();
    if failed > 0 {
        return Err(CliError::render(format!(
            "{} application(s) failed to render, {} succeeded",
            failed, rendered
        )));
    }
    display::success(format!("Rendered {} application(s)", rendered));
    Ok(())
}

fn render_app(
    renderer: &Renderer<'_>,
    app: &Application,
    output_dir: &Path,
    recursive: bool,
) -> rita_kube::Result<rita_kube::RenderSummary> {
    if output_dir.exists() {
        std::fs::remove_dir_all(output_dir)?;
    }
    if recursive {
        renderer.render_nested_to_dir(app, output_dir)
    } else {
        renderer.render_to_dir(app, output_dir)
    }
}

struct DiffOptions {
    env: Option<String>,
    app: Option<String>,
    base: Option<String>,
    github: bool,
    json: bool,
    output: Option<PathBuf>,
    max_lines: usize,
    recursive: bool,
}

/// Applications to diff, per environment
fn diff_targets(
    workspace: &Workspace,
    envs: &[String],
    filter: Option<&str>,
    changed_files: Option<&[String]>,
) -> Result<Vec<(String, Application)>> {
    let local_only = workspace.config.render.local_charts_only;
    let mut targets = Vec::new();
    for env in envs {
        let apps: Vec<Application> = util::filter_apps(workspace.applications(env)?, filter)
            .into_iter()
            .filter(|a| util::renders_by_default(a, local_only))
            .collect();
        let apps = match changed_files {
            Some(files) => find_affected_apps(files, &apps, &workspace.config.charts.path)
                .into_iter()
                .cloned()
                .collect(),
            None => apps,
        };
        targets.extend(apps.into_iter().map(|app| (env.clone(), app)));
    }
    Ok(targets)
}

fn diff_app(
    workspace: &Workspace,
    renderer: &Renderer<'_>,
    differ: &ManifestDiff,
    env: &str,
    app: &Application,
    recursive: bool,
) -> DiffOutcome {
    let current = if recursive {
        renderer.render_nested(app).map(|tree| {
            for error in tree.all_errors() {
                tracing::warn!(app = %app.name, %error, "nested application not rendered");
            }
            tree.combined()
        })
    } else {
        renderer.render(app).map(|rendered| rendered.stream)
    };
    let current = match current {
        Ok(stream) => stream,
        Err(e) => return DiffOutcome::Failed(e.to_string()),
    };
    let baseline = match read_combined(&workspace.rendered_dir(env, &app.name)) {
        Ok(baseline) => baseline,
        Err(e) => return DiffOutcome::Failed(e.to_string()),
    };

    let new_app = baseline.is_none();
    match differ.render(baseline.as_deref().unwrap_or_default(), &current) {
        Some(diff) => DiffOutcome::Changed { diff, new_app },
        None => DiffOutcome::Unchanged,
    }
}

fn diff(ctx: &Context, opts: &DiffOptions) -> Result<()> {
    let started = Instant::now();
    let workspace = ctx.workspace()?;
    let runner = SystemRunner::new();
    let renderer = Renderer::new(&runner, &workspace);
    let differ = ManifestDiff::new(opts.max_lines);

    let envs = match &opts.env {
        Some(env) => vec![workspace.resolve_env(env)?],
        None => workspace.environment_names()?,
    };

    let mut report = DiffReport::default();
    let changed_files = match &opts.base {
        Some(base) => {
            let files = Git::new(&runner, &workspace.root).changed_files_under(base, &workspace.root)?;
            eprintln!(
                "{} {} file(s) changed since {}",
                style("→").blue(),
                files.len(),
                base
            );
            Some(files)
        }
        None => None,
    };

    let targets = diff_targets(
        &workspace,
        &envs,
        opts.app.as_deref(),
        changed_files.as_deref(),
    )?;
    if let Some(files) = changed_files {
        report.changed_files = files;
    }
    if targets.is_empty() && opts.app.is_some() && opts.base.is_none() {
        return Err(CliError::config(
            format!(
                "No application matching '{}' in {}",
                opts.app.as_deref().unwrap_or_default(),
                envs.join(", ")
            ),
            Some("List applications with: rita render list --all-envs".to_string()),
        ));
    }

    let interactive = !opts.github && !opts.json && opts.output.is_none();
    let spinner = util::spinner(format!("Diffing {} application(s)...", targets.len()));
    for (env, app) in &targets {
        spinner.set_message(format!("Diffing {}/{}...", env, app.name));
        let outcome = diff_app(&workspace, &renderer, &differ, env, app, opts.recursive);
        if interactive {
            spinner.suspend(|| print_outcome(env, &app.name, &outcome));
        }
        report.push(env, &app.name, outcome);
    }
    spinner.finish_and_clear();
    let elapsed = started.elapsed();

    if interactive {
        println!();
        let changed = report.changed().count();
        if report.has_errors() {
            display::warning(format!("Completed with errors in {}", util::format_duration(elapsed)));
        } else if changed > 0 {
            display::step(format!(
                "Changes detected in {} application(s) ({})",
                changed,
                util::format_duration(elapsed)
            ));
        } else {
            display::success(format!("No changes detected ({})", util::format_duration(elapsed)));
        }
    } else {
        let content = if opts.json {
            let mut json = serde_json::to_string_pretty(&report.to_json(elapsed)).into_diagnostic()?;
            json.push('\n');
            json
        } else if opts.github {
            report.to_markdown(elapsed)
        } else {
            display::plain_report(&report)
        };
        match &opts.output {
            Some(path) => {
                std::fs::write(path, &content)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
                eprintln!("{} Report written to {}", style("✓").green(), path.display());
            }
            None => print!("{}", content),
        }
    }

    if report.has_errors() {
        return Err(CliError::render(format!(
            "{} application(s) could not be rendered",
            report.failed().count()
        )));
    }
    Ok(())
}

fn print_outcome(env: &str, app: &str, outcome: &DiffOutcome) {
    let id = format!("{}/{}", env, app);
    match outcome {
        DiffOutcome::Unchanged => display::success(format!("{} unchanged", id)),
        DiffOutcome::Changed { diff, new_app } => {
            let label = if *new_app { " (no baseline)" } else { "" };
            println!("{} {} has changes{}", style("⚡").yellow(), style(&id).bold(), label);
            display::colored_diff(diff);
            println!();
        }
        DiffOutcome::Failed(message) => display::failure(format!("{}: {}", id, message)),
    }
}

fn clean(ctx: &Context, env: Option<&str>, all: bool, dry_run: bool) -> Result<()> {
    let workspace = ctx.workspace()?;
    let root = workspace.rendered_root();

    let target = match (env, all) {
        (_, true) => root.clone(),
        (Some(env), false) => root.join(workspace.config.canonical_env_name(env)),
        (None, false) => {
            return Err(CliError::usage(
                "Nothing to clean",
                "Specify --env ENV or --all",
            ));
        }
    };

    let shown = display::display_path(&workspace, &target);
    if !target.exists() {
        println!("Nothing to remove: {} does not exist", shown);
        return Ok(());
    }
    if dry_run {
        display::step(format!("Would remove {}", shown));
        return Ok(());
    }

    std::fs::remove_dir_all(&target)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to remove {}", target.display()))?;
    display::success(format!("Removed {}", shown));
    Ok(())
}
