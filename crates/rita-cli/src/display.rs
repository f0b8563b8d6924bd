//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Validation issues grouped by file
//! - Application tables
//! - Coloured manifest diffs

use console::style;
use rita_core::{Application, DiffOutcome, DiffReport, IssueSeverity, Workspace};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl From<IssueSeverity> for Severity {
    fn from(severity: IssueSeverity) -> Self {
        match severity {
            IssueSeverity::Error => Severity::Error,
            IssueSeverity::Warning => Severity::Warning,
        }
    }
}

/// A validation issue with location information
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub file: String,
    pub path: String,
    pub message: String,
}

/// Grouped validation results for display
#[derive(Debug, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub validated_count: usize,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue of the given severity
    pub fn add(&mut self, severity: Severity, file: &str, path: &str, message: &str) {
        self.issues.push(ValidationIssue {
            severity,
            file: file.to_string(),
            path: path.to_string(),
            message: message.to_string(),
        });
    }

    /// Add an error
    pub fn add_error(&mut self, file: &str, path: &str, message: &str) {
        self.add(Severity::Error, file, path, message);
    }

    /// Display issues grouped by file
    pub fn display(&self) {
        let mut by_file: BTreeMap<&str, Vec<&ValidationIssue>> = BTreeMap::new();
        for issue in &self.issues {
            by_file.entry(&issue.file).or_default().push(issue);
        }

        for (file, issues) in by_file {
            println!();
            println!("{}", style(file).cyan().bold());

            for issue in issues {
                let icon = match issue.severity {
                    Severity::Error => style("✗").red(),
                    Severity::Warning => style("⚠").yellow(),
                };

                let path_display = if issue.path.is_empty() {
                    String::new()
                } else {
                    format!(" at {}", style(&issue.path).dim())
                };

                println!("  {} {}{}", icon, issue.message, path_display);
            }
        }
    }

    /// Get summary counts
    pub fn summary(&self) -> (usize, usize) {
        let errors = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        (errors, self.issues.len() - errors)
    }

    /// Print summary line
    pub fn print_summary(&self) {
        let (errors, warnings) = self.summary();
        if errors > 0 {
            println!(
                "{} Validation failed: {} error(s), {} warning(s)",
                style("✗").red().bold(),
                errors,
                warnings
            );
        } else if warnings > 0 {
            println!(
                "{} Validation passed with {} warning(s)",
                style("⚠").yellow().bold(),
                warnings
            );
        } else {
            println!("{} Validation passed!", style("✓").green().bold());
        }
    }

    /// Check if there are any errors (not warnings)
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

pub fn header(title: impl Display) {
    println!();
    println!("{}", style(title).bold().underlined());
}

pub fn success(message: impl Display) {
    println!("{} {}", style("✓").green(), message);
}

pub fn step(message: impl Display) {
    println!("{} {}", style("→").blue(), message);
}

pub fn warning(message: impl Display) {
    println!("{} {}", style("⚠").yellow(), message);
}

pub fn failure(message: impl Display) {
    println!("{} {}", style("✗").red(), message);
}

pub fn hint(message: impl Display) {
    println!("  {} {}", style("hint:").blue(), message);
}

pub fn key_value(key: &str, value: impl Display) {
    println!("  {:<18} {}", style(format!("{}:", key)).dim(), value);
}

/// Where an application's manifests come from, as shown in tables
pub fn app_source(app: &Application) -> String {
    if !app.has_chart() {
        return app.source_kinds();
    }
    if app.is_local_chart {
        "local".to_string()
    } else {
        "external".to_string()
    }
}

/// One table row per application
pub fn app_table(apps: &[Application]) {
    let width = apps.iter().map(|a| a.name.len()).max().unwrap_or(0).max(4);
    println!(
        "  {:<width$}  {:<22} {:<10} {:<18} {:<10} {}",
        style("NAME").bold(),
        style("CHART").bold(),
        style("VERSION").bold(),
        style("NAMESPACE").bold(),
        style("SOURCE").bold(),
        style("VALUES").bold(),
        width = width,
    );
    for app in apps {
        let chart = if app.has_chart() { app.chart_name.as_str() } else { "-" };
        let version = if app.has_chart() { app.chart_version.as_str() } else { "-" };
        println!(
            "  {:<width$}  {:<22} {:<10} {:<18} {:<10} {}",
            style(&app.name).cyan(),
            chart,
            version,
            app.namespace,
            app_source(app),
            app.values_files.len(),
            width = width,
        );
    }
}

/// Print a diff with `+`/`-`/`@@` lines coloured
pub fn colored_diff(diff: &str) {
    for line in diff.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", style(line).bold());
        } else if line.starts_with('+') {
            println!("{}", style(line).green());
        } else if line.starts_with('-') {
            println!("{}", style(line).red());
        } else if line.starts_with("@@") {
            println!("{}", style(line).cyan());
        } else {
            println!("{}", line);
        }
    }
}

/// Plain-text rendition of a diff report, for `--output` without `--github`
pub fn plain_report(report: &DiffReport) -> String {
    let mut out = String::new();
    for result in &report.results {
        let id = format!("{}/{}", result.env, result.app);
        match &result.outcome {
            DiffOutcome::Unchanged => out.push_str(&format!("= {} unchanged\n", id)),
            DiffOutcome::Changed { diff, new_app } => {
                let label = if *new_app { " (new)" } else { "" };
                out.push_str(&format!("~ {} has changes{}\n", id, label));
                out.push_str(diff.trim_end());
                out.push_str("\n\n");
            }
            DiffOutcome::Failed(message) => out.push_str(&format!("! {}: {}\n", id, message)),
        }
    }
    out
}

/// Path shown to the user: relative to the workspace root when possible
pub fn display_path(workspace: &Workspace, path: &std::path::Path) -> String {
    workspace.relative(path).display().to_string()
}
