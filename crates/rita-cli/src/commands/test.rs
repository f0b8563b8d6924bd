//! Test commands - lint, template and deploy charts on a kind cluster

use clap::{Args, Subcommand};
use console::style;
use rita_kube::smoke::{self, ChartTestResult, ChartUnderTest, ClusterDisposition, KindCluster};
use rita_kube::{Kind, SystemRunner};
use std::path::PathBuf;

use crate::display;
use crate::error::{CliError, Result};
use crate::util::{self, Context};

/// Namespace used when testing a chart directly
const DEFAULT_TEST_NAMESPACE: &str = "default";

/// Either a chart directory or an application using a local chart
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Chart name under the charts directory
    #[arg(short, long)]
    chart: Option<String>,

    /// ArgoCD application using a local chart
    #[arg(short, long)]
    app: Option<String>,
}

#[derive(Subcommand)]
pub enum TestCommand {
    /// Check that helm, kubectl and kind are installed
    Check,

    /// Create or delete a kind cluster for testing
    Cluster {
        /// Cluster name (defaults to test.kind_cluster_name)
        #[arg(short, long)]
        name: Option<String>,

        /// Delete the cluster instead of creating it
        #[arg(long)]
        delete: bool,
    },

    /// Lint and template a chart without a cluster
    DryRun {
        #[command(flatten)]
        target: TargetArgs,

        /// Environment used for application lookup
        #[arg(short, long, default_value = "dev")]
        env: String,

        /// Extra values files (chart targets only)
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,
    },

    /// Install a chart into a kind cluster and wait for its pods
    Deploy {
        #[command(flatten)]
        target: TargetArgs,

        /// Environment used for application lookup
        #[arg(short, long, default_value = "dev")]
        env: String,

        /// kind cluster (defaults to test.kind_cluster_name)
        #[arg(long)]
        cluster: Option<String>,

        /// Create the cluster when it does not exist
        #[arg(long)]
        create_cluster: bool,

        /// Delete the cluster after a successful run (only when this run created it)
        #[arg(long)]
        cleanup: bool,

        /// Install timeout in seconds (defaults to test.timeout_seconds)
        #[arg(long)]
        timeout: Option<u64>,
    },
}

pub fn run(ctx: &Context, command: TestCommand) -> Result<()> {
    match command {
        TestCommand::Check => check(),
        TestCommand::Cluster { name, delete } => cluster(ctx, name, delete),
        TestCommand::DryRun { target, env, values } => dry_run(ctx, &target, &env, values),
        TestCommand::Deploy {
            target,
            env,
            cluster,
            create_cluster,
            cleanup,
            timeout,
        } => deploy(
            ctx,
            &target,
            &env,
            DeployOptions {
                cluster,
                create_cluster,
                cleanup,
                timeout,
            },
        ),
    }
}

fn check() -> Result<()> {
    let runner = SystemRunner::new();
    let checks = smoke::check_tools(&runner);
    for check in &checks {
        if check.available {
            display::success(format!("{} is installed", check.tool));
        } else {
            display::failure(format!("{} is not installed", check.tool));
            display::hint(check.tool.install_hint());
        }
    }

    let missing: Vec<String> = checks
        .iter()
        .filter(|c| !c.available)
        .map(|c| c.tool.to_string())
        .collect();
    println!();
    if !missing.is_empty() {
        return Err(CliError::tool(
            format!("Missing tools: {}", missing.join(", ")),
            "Install them to enable chart testing",
        ));
    }
    println!("All tools installed. Ready for testing!");
    Ok(())
}

fn cluster(ctx: &Context, name: Option<String>, delete: bool) -> Result<()> {
    let workspace = ctx.workspace()?;
    let name = name.unwrap_or_else(|| workspace.config.test.kind_cluster_name.clone());
    let runner = SystemRunner::new();
    let kind = Kind::new(&runner);

    if delete {
        if kind.delete_cluster(&name)? {
            display::success(format!("Deleted kind cluster '{}'", name));
        } else {
            println!("Cluster '{}' doesn't exist.", name);
        }
        return Ok(());
    }

    let spinner = util::spinner(format!("Creating kind cluster '{}'...", name));
    let result = kind.create_cluster(&name, "60s");
    spinner.finish_and_clear();
    if result? {
        display::success(format!("Created kind cluster '{}'", name));
    } else {
        println!("Cluster '{}' already exists.", name);
        display::hint(format!("Delete with: rita test cluster --name {} --delete", name));
    }
    Ok(())
}

/// Build the install target from `--chart` or `--app`
fn resolve_target(
    ctx: &Context,
    target: &TargetArgs,
    env: &str,
    extra_values: Vec<PathBuf>,
) -> Result<ChartUnderTest> {
    let workspace = ctx.workspace()?;

    if let Some(chart) = &target.chart {
        let dir = workspace.chart_dir(chart);
        if !dir.is_dir() {
            return Err(CliError::validation_with_help(
                format!("Chart not found: {}", dir.display()),
                "Run: rita schema list",
            ));
        }
        return Ok(ChartUnderTest {
            chart: dir,
            release: chart.clone(),
            namespace: DEFAULT_TEST_NAMESPACE.to_string(),
            values_files: extra_values,
        });
    }

    let Some(name) = &target.app else {
        return Err(CliError::usage(
            "Must specify either --chart or --app",
            "Example: rita test dry-run -c web-service",
        ));
    };
    let env = workspace.resolve_env(env)?;
    let app = workspace.application(&env, name)?;
    if !app.is_local_chart {
        return Err(CliError::usage(
            format!("Application '{}' uses an external chart", name),
            "Only applications backed by a chart in this repository can be tested",
        ));
    }

    let dir = workspace.chart_dir(app.local_chart_name());
    if !dir.is_dir() {
        return Err(CliError::validation(format!(
            "Chart not found: {}",
            dir.display()
        )));
    }
    let mut values_files: Vec<PathBuf> = app
        .values_files
        .iter()
        .map(|v| workspace.root.join(v))
        .collect();
    values_files.extend(extra_values);

    Ok(ChartUnderTest {
        chart: dir,
        release: app.release_name.clone(),
        namespace: app.namespace.clone(),
        values_files,
    })
}

fn print_result(result: &ChartTestResult) {
    if result.success {
        display::success(format!("{}: {}", result.chart_name, result.message));
    } else {
        display::failure(format!("{}: {}", result.chart_name, result.message));
    }
    println!("  Duration: {}", util::format_duration(result.duration));
    if let Some(details) = &result.details {
        println!();
        println!("{}", details);
    }
}

fn dry_run(ctx: &Context, target: &TargetArgs, env: &str, values: Vec<PathBuf>) -> Result<()> {
    let target = resolve_target(ctx, target, env, values)?;
    let runner = SystemRunner::new();

    let spinner = util::spinner(format!("Linting {}...", target.chart.display()));
    let result = smoke::dry_run_test(&runner, &target);
    spinner.finish_and_clear();

    print_result(&result);
    if !result.success {
        return Err(CliError::render(format!(
            "Dry-run of {} failed",
            result.chart_name
        )));
    }
    Ok(())
}

struct DeployOptions {
    cluster: Option<String>,
    create_cluster: bool,
    cleanup: bool,
    timeout: Option<u64>,
}

fn deploy(ctx: &Context, target: &TargetArgs, env: &str, opts: DeployOptions) -> Result<()> {
    let target = resolve_target(ctx, target, env, Vec::new())?;
    let workspace = ctx.workspace()?;

    let mut settings = workspace.config.test.clone();
    if opts.cleanup {
        settings.cleanup_on_success = true;
    }
    let cluster_name = opts
        .cluster
        .unwrap_or_else(|| settings.kind_cluster_name.clone());
    let timeout = opts.timeout.unwrap_or(settings.timeout_seconds);
    let pre_install: Vec<PathBuf> = settings
        .pre_install_manifests
        .iter()
        .map(|m| workspace.root.join(m))
        .collect();

    let runner = SystemRunner::new();
    let spinner = util::spinner(format!("Preparing kind cluster '{}'...", cluster_name));
    let provisioned = KindCluster::provision(&runner, &cluster_name, opts.create_cluster, &settings);
    spinner.finish_and_clear();
    let cluster = provisioned?;
    if cluster.created() {
        display::step(format!("Created kind cluster '{}'", cluster.name()));
    }

    display::step(format!(
        "Deploying {} as {} in {}",
        style(target.chart.display()).cyan(),
        target.release,
        target.namespace
    ));
    let spinner = util::spinner("Installing and waiting for pods...");
    let result = smoke::deployment_test(&runner, &cluster.context(), &target, timeout, &pre_install);
    spinner.finish_and_clear();
    print_result(&result);

    let name = cluster.name().to_string();
    let created = cluster.created();
    match cluster.finish(result.success)? {
        ClusterDisposition::Deleted => display::step(format!("Deleted kind cluster '{}'", name)),
        ClusterDisposition::AlreadyGone => {
            display::hint(format!("Kind cluster '{}' was already removed", name))
        }
        ClusterDisposition::Kept => {
            if opts.cleanup && !created {
                display::hint(format!(
                    "Kept kind cluster '{}': it existed before this run",
                    name
                ));
            }
            if !result.success {
                display::hint(format!(
                    "Release left installed for inspection in cluster '{}'",
                    name
                ));
            }
        }
    }

    if !result.success {
        return Err(CliError::other(format!(
            "Deployment test of {} failed",
            result.chart_name
        )));
    }
    Ok(())
}
