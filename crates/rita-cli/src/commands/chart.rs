//! Chart commands - scaffold new charts

use clap::Subcommand;
use console::style;
use rita_core::scaffold::{self, ScaffoldOptions};
use std::path::PathBuf;

use crate::display;
use crate::error::Result;
use crate::util::Context;

#[derive(Subcommand)]
pub enum ChartCommand {
    /// Create a new chart with a values model stub
    New {
        /// Chart name (lowercase, hyphen separated)
        name: String,

        /// Chart description
        #[arg(short, long, default_value = "A Helm chart for Kubernetes")]
        description: String,

        /// Maintainer name
        #[arg(short = 'm', long = "maintainer", default_value = "developer")]
        maintainer: String,

        /// Maintainer email
        #[arg(long, default_value = "developer@example.com")]
        email: String,

        /// Directory for the values model stub (not written when omitted)
        #[arg(long, value_name = "DIR")]
        schema_out: Option<PathBuf>,
    },
}

pub fn run(ctx: &Context, command: ChartCommand) -> Result<()> {
    match command {
        ChartCommand::New {
            name,
            description,
            maintainer,
            email,
            schema_out,
        } => {
            let mut options = ScaffoldOptions::new(&name);
            options.description = description;
            options.maintainer_name = maintainer;
            options.maintainer_email = email;
            new_chart(ctx, &options, schema_out)
        }
    }
}

fn new_chart(ctx: &Context, options: &ScaffoldOptions, schema_out: Option<PathBuf>) -> Result<()> {
    let workspace = ctx.workspace()?;
    let charts_dir = workspace.charts_dir();
    let files = scaffold::scaffold_chart(&charts_dir, options)?;

    let chart_dir = charts_dir.join(&options.name);
    display::success(format!(
        "Created chart {} at {}",
        style(&options.name).cyan(),
        display::display_path(&workspace, &chart_dir)
    ));
    for file in &files {
        println!("  {}", file);
    }

    let struct_name = scaffold::to_struct_name(&options.name);
    match schema_out {
        Some(dir) => {
            let stub = scaffold::write_model_stub(&dir, &options.name)?;
            display::success(format!("Created values model {}", stub.display()));
            display::header("Next steps");
            println!(
                "  1. Declare `pub mod {};` next to the other value models",
                scaffold::to_module_name(&options.name)
            );
            println!("  2. Register it in REGISTERED_CHARTS:");
            println!("       {}", style(scaffold::registry_entry(&options.name)).dim());
            println!("  3. Generate the schema: rita schema apply -c {}", options.name);
        }
        None => {
            display::header("Next steps");
            println!(
                "  1. Write a {} model (use --schema-out DIR to get a stub)",
                struct_name
            );
            println!("  2. Register it in REGISTERED_CHARTS");
            println!("  3. Generate the schema: rita schema apply -c {}", options.name);
        }
    }
    Ok(())
}
