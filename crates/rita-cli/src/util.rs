//! Shared utility functions for CLI commands

use indicatif::{ProgressBar, ProgressStyle};
use rita_core::{Application, Workspace};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit `--config` file
    pub config: Option<PathBuf>,
}

impl Context {
    /// Workspace governing the current directory
    ///
    /// Fails when the configuration has errors; see [`Self::unchecked_workspace`].
    pub fn workspace(&self) -> Result<Workspace> {
        let workspace = self.unchecked_workspace()?;
        workspace.config.ensure_valid()?;
        Ok(workspace)
    }

    /// Workspace without validating its configuration, for the `config` commands
    pub fn unchecked_workspace(&self) -> Result<Workspace> {
        let cwd = std::env::current_dir()?;
        Ok(Workspace::discover(&cwd, self.config.as_deref())?)
    }
}

/// Spinner on stderr; hidden automatically when stderr is not a terminal
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Format a duration as seconds with two decimals, or minutes past a minute
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 60.0 {
        let whole = duration.as_secs();
        format!("{}m{:02}s", whole / 60, whole % 60)
    } else {
        format!("{:.2}s", secs)
    }
}

/// Environments selected by `--env` / `--all-envs`, resolved to canonical names
pub fn selected_envs(workspace: &Workspace, env: &str, all_envs: bool) -> Result<Vec<String>> {
    if all_envs || env == "all" {
        return Ok(workspace.environment_names()?);
    }
    Ok(vec![workspace.resolve_env(env)?])
}

/// Keep applications whose name contains `filter` (case-insensitive)
pub fn filter_apps(apps: Vec<Application>, filter: Option<&str>) -> Vec<Application> {
    match filter {
        Some(filter) => {
            let filter = filter.to_lowercase();
            apps.into_iter()
                .filter(|a| a.name.to_lowercase().contains(&filter))
                .collect()
        }
        None => apps,
    }
}

/// Whether an application is rendered under the `local_charts_only` policy
pub fn renders_by_default(app: &Application, local_charts_only: bool) -> bool {
    !local_charts_only || !app.has_chart() || app.is_local_chart
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str, chart: &str, local: bool) -> Application {
        Application {
            name: name.to_string(),
            chart_name: chart.to_string(),
            is_local_chart: local,
            ..Application::default()
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(0)), "0.00s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
    }

    #[test]
    fn test_filter_apps_is_case_insensitive_substring() {
        let apps = vec![
            app("billing-api", "web-service", true),
            app("Billing-Worker", "web-service", true),
            app("frontend", "web-service", true),
        ];
        let names: Vec<String> = filter_apps(apps.clone(), Some("billing"))
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["billing-api", "Billing-Worker"]);
        assert_eq!(filter_apps(apps, None).len(), 3);
    }

    #[test]
    fn test_renders_by_default() {
        let local = app("api", "web-service", true);
        let external = app("redis", "redis", false);
        let kustomize = app("crds", "", false);

        assert!(renders_by_default(&local, true));
        assert!(!renders_by_default(&external, true));
        assert!(renders_by_default(&external, false));
        assert!(renders_by_default(&kustomize, true));
    }
}
