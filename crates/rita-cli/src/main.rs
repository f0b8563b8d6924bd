//! RITA - Render It Then Argue
//!
//! Helm chart workflow for ArgoCD repositories: value schemas, manifest
//! rendering and diffs, registry logins and kind-based chart tests.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;
mod error;
mod exit_codes;
mod logging;
mod util;

use commands::auth::AuthCommand;
use commands::chart::ChartCommand;
use commands::config::ConfigCommand;
use commands::init::InitArgs;
use commands::render::RenderCommand;
use commands::schema::SchemaCommand;
use commands::test::TestCommand;
use commands::values::ValuesCommand;
use util::Context;

#[derive(Parser)]
#[command(name = "rita")]
#[command(author = "RITA Contributors")]
#[command(version)]
#[command(about = "Render It Then Argue - Helm chart workflow for ArgoCD repositories", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file (defaults to the nearest .rita.yaml)
    #[arg(long, global = true, env = "RITA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and validate values.schema.json files
    #[command(subcommand)]
    Schema(SchemaCommand),

    /// Render ArgoCD applications to manifests and diff them
    #[command(subcommand)]
    Render(RenderCommand),

    /// Inspect and fetch values of external charts
    #[command(subcommand)]
    Values(ValuesCommand),

    /// Log in to OCI registries
    #[command(subcommand)]
    Auth(AuthCommand),

    /// Manage the .rita.yaml configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Test charts with helm lint/template or on a kind cluster
    #[command(subcommand)]
    Test(TestCommand),

    /// Create charts
    #[command(subcommand)]
    Chart(ChartCommand),

    /// Initialize a .rita.yaml for this repository
    Init(InitArgs),

    /// The story behind the name
    Lore,
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    logging::init(cli.debug);

    let ctx = Context { config: cli.config };

    let result = match cli.command {
        Commands::Schema(command) => commands::schema::run(&ctx, command),
        Commands::Render(command) => commands::render::run(&ctx, command),
        Commands::Values(command) => commands::values::run(&ctx, command),
        Commands::Auth(command) => commands::auth::run(&ctx, command),
        Commands::Config(command) => commands::config::run(&ctx, command),
        Commands::Test(command) => commands::test::run(&ctx, command),
        Commands::Chart(command) => commands::chart::run(&ctx, command),
        Commands::Init(args) => commands::init::run(&ctx, args),
        Commands::Lore => commands::lore::run(),
    };

    let code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}
