//! Schema commands - generate and check `values.schema.json` files

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, WrapErr};
use rita_core::schema::{self, SCHEMA_FILE_NAME, load_values_file};
use rita_core::values::get_chart;
use rita_core::{REGISTERED_CHARTS, RegisteredChart, SchemaValidator};
use serde_json::json;
use std::path::PathBuf;

use crate::display::{self, ValidationReport};
use crate::error::{CliError, Result};
use crate::util::Context;

#[derive(Subcommand)]
pub enum SchemaCommand {
    /// List charts with a values model
    List,

    /// Print the generated JSON Schema
    Show {
        /// Only this chart
        #[arg(short, long)]
        chart: Option<String>,

        /// Leave descriptions without type prefixes
        #[arg(long)]
        no_types: bool,
    },

    /// Write values.schema.json into chart directories
    Apply {
        /// Only this chart
        #[arg(short, long)]
        chart: Option<String>,

        /// Show what would be written
        #[arg(long)]
        dry_run: bool,

        /// Leave descriptions without type prefixes
        #[arg(long)]
        no_types: bool,
    },

    /// Fail when a schema file differs from the generated one
    Check {
        /// Only this chart
        #[arg(short, long)]
        chart: Option<String>,

        /// Compare against schemas written with --no-types
        #[arg(long)]
        no_types: bool,
    },

    /// Validate values files against a chart's schema
    Validate {
        /// Chart whose model to validate against
        #[arg(short, long)]
        chart: String,

        /// Values files (YAML or JSON)
        #[arg(required = true)]
        values: Vec<PathBuf>,

        /// Output validation results as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(ctx: &Context, command: SchemaCommand) -> Result<()> {
    match command {
        SchemaCommand::List => list(ctx),
        SchemaCommand::Show { chart, no_types } => show(chart.as_deref(), no_types),
        SchemaCommand::Apply {
            chart,
            dry_run,
            no_types,
        } => apply(ctx, chart.as_deref(), dry_run, no_types),
        SchemaCommand::Check { chart, no_types } => check(ctx, chart.as_deref(), no_types),
        SchemaCommand::Validate {
            chart,
            values,
            json,
        } => validate(&chart, &values, json),
    }
}

fn selected(chart: Option<&str>) -> Result<Vec<&'static RegisteredChart>> {
    match chart {
        Some(name) => Ok(vec![get_chart(name)?]),
        None => Ok(REGISTERED_CHARTS.iter().collect()),
    }
}

fn list(ctx: &Context) -> Result<()> {
    let workspace = ctx.workspace()?;
    display::header("Charts with values models");

    let width = REGISTERED_CHARTS.iter().map(|c| c.name.len()).max().unwrap_or(0);
    for chart in REGISTERED_CHARTS {
        let dir = workspace.chart_dir(chart.name);
        let status = if !dir.is_dir() {
            style("no chart directory").yellow().to_string()
        } else if dir.join(SCHEMA_FILE_NAME).is_file() {
            style("schema present").green().to_string()
        } else {
            style("schema missing").dim().to_string()
        };
        println!(
            "  {:<width$}  {:<26} {}",
            style(chart.name).cyan(),
            chart.model,
            status,
            width = width
        );
    }
    Ok(())
}

fn show(chart: Option<&str>, no_types: bool) -> Result<()> {
    let charts = selected(chart)?;
    let multiple = charts.len() > 1;
    for chart in charts {
        if multiple {
            println!("{}", style(format!("# {}", chart.name)).bold());
        }
        print!("{}", schema::render_schema(chart, !no_types)?);
    }
    Ok(())
}

fn apply(ctx: &Context, chart: Option<&str>, dry_run: bool, no_types: bool) -> Result<()> {
    let workspace = ctx.workspace()?;
    let mut written = 0;

    for chart in selected(chart)? {
        let dir = workspace.chart_dir(chart.name);
        if !dir.is_dir() {
            display::warning(format!(
                "Chart directory not found: {}",
                display::display_path(&workspace, &dir)
            ));
            continue;
        }

        let path = dir.join(SCHEMA_FILE_NAME);
        let shown = display::display_path(&workspace, &path);
        let content = schema::render_schema(chart, !no_types)?;

        if dry_run {
            display::step(format!("Would write {} ({} bytes)", shown, content.len()));
            continue;
        }
        if schema::is_up_to_date(chart, &path, !no_types)? {
            println!("  {} {}", style("unchanged").dim(), shown);
            continue;
        }

        std::fs::write(&path, content)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        display::success(format!("Generated {}", shown));
        written += 1;
    }

    if !dry_run {
        println!();
        println!("{} schema file(s) written", written);
    }
    Ok(())
}

fn check(ctx: &Context, chart: Option<&str>, no_types: bool) -> Result<()> {
    let workspace = ctx.workspace()?;
    let mut outdated = Vec::new();

    for chart in selected(chart)? {
        let dir = workspace.chart_dir(chart.name);
        if !dir.is_dir() {
            continue;
        }
        let path = dir.join(SCHEMA_FILE_NAME);
        let shown = display::display_path(&workspace, &path);
        if schema::is_up_to_date(chart, &path, !no_types)? {
            display::success(format!("{} is up to date", shown));
        } else {
            display::failure(format!("{} is out of date", shown));
            outdated.push(chart.name);
        }
    }

    if outdated.is_empty() {
        return Ok(());
    }
    Err(CliError::validation_with_help(
        format!("{} schema file(s) out of date: {}", outdated.len(), outdated.join(", ")),
        "Run: rita schema apply",
    ))
}

fn validate(chart_name: &str, files: &[PathBuf], json: bool) -> Result<()> {
    let chart = get_chart(chart_name)?;
    let validator = SchemaValidator::for_chart(chart)?;
    let mut report = ValidationReport::new();

    for file in files {
        let values = load_values_file(file)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to load {}", file.display()))?;
        let result = validator.validate(&values);
        for error in &result.errors {
            report.add_error(&file.display().to_string(), &error.path, &error.message);
        }
        report.validated_count += 1;
    }

    if json {
        let output = json!({
            "valid": !report.has_errors(),
            "chart": chart.name,
            "files": report.validated_count,
            "issues": report.issues,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).map_err(|e| CliError::internal(e.to_string()))?
        );
    } else if report.has_errors() {
        report.display();
        println!();
        report.print_summary();
    } else {
        for file in files {
            display::success(format!("{} is valid for chart '{}'", file.display(), chart.name));
        }
    }

    if report.has_errors() {
        let (errors, _) = report.summary();
        return Err(CliError::validation(format!(
            "{} error(s) against the '{}' schema",
            errors, chart.name
        )));
    }
    Ok(())
}
