//! Repository workspace: a root directory bound to its configuration

use std::path::{Path, PathBuf};

use crate::application::{Application, FileFilter, discover_applications};
use crate::config::{CONFIG_FILE_NAME, EnvironmentConfig, RitaConfig};
use crate::error::{CoreError, Result};

/// Conventional location of an environment's ArgoCD applications
const DEFAULT_APPS_ROOT: &str = "kubernetes/argocd/applications";

/// A repository root together with its loaded configuration
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: RitaConfig,
    pub config_path: Option<PathBuf>,
}

impl Workspace {
    /// Create a workspace from an explicit root and configuration
    pub fn new(root: impl Into<PathBuf>, config: RitaConfig) -> Self {
        Self {
            root: root.into(),
            config,
            config_path: None,
        }
    }

    /// Locate the workspace governing `start`
    ///
    /// With an explicit configuration file the root is that file's directory.
    /// Otherwise the root is the directory holding the nearest
    /// `.rita.yaml`, then the nearest git checkout, then `start` itself.
    pub fn discover(start: &Path, explicit_config: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_config {
            let config = RitaConfig::load_from(path)?;
            let root = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| start.to_path_buf());
            return Ok(Self {
                root,
                config,
                config_path: Some(path.to_path_buf()),
            });
        }

        let (config, config_path) = RitaConfig::discover(start)?;
        let root = match &config_path {
            Some(path) => path.parent().unwrap_or(start).to_path_buf(),
            None => start
                .ancestors()
                .find(|dir| dir.join(".git").exists())
                .unwrap_or(start)
                .to_path_buf(),
        };

        Ok(Self {
            root,
            config,
            config_path,
        })
    }

    /// Path of the configuration file, existing or not
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| self.root.join(CONFIG_FILE_NAME))
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.root.join(&self.config.charts.path)
    }

    pub fn chart_dir(&self, chart: &str) -> PathBuf {
        self.charts_dir().join(chart)
    }

    /// Names of local chart directories (those holding a `Chart.yaml`), sorted
    pub fn local_charts(&self) -> Result<Vec<String>> {
        let dir = self.charts_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.path().join("Chart.yaml").is_file() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Root directory of rendered manifests
    pub fn rendered_root(&self) -> PathBuf {
        self.root.join(&self.config.render.output_path)
    }

    /// Rendered output directory of one application
    pub fn rendered_dir(&self, env: &str, app: &str) -> PathBuf {
        self.rendered_root().join(env).join(app)
    }

    /// Environments known to this workspace
    ///
    /// Configured environments win; otherwise (with auto-discovery enabled)
    /// every `kubernetes/argocd/applications/<env>/templates` directory counts.
    pub fn environment_names(&self) -> Result<Vec<String>> {
        if !self.config.environments.is_empty() || !self.config.auto_discover {
            return Ok(self.config.environment_names());
        }

        let apps_root = self.root.join(DEFAULT_APPS_ROOT);
        if !apps_root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&apps_root)? {
            let entry = entry?;
            if entry.path().join("templates").is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Resolve a user-supplied environment name to its canonical form
    ///
    /// Unconfigured names are accepted when their conventional directory exists.
    pub fn resolve_env(&self, name: &str) -> Result<String> {
        if let Some(env) = self.config.resolve_environment(name) {
            return Ok(env.name.clone());
        }
        if self.default_search_path(name).is_dir() {
            return Ok(name.to_string());
        }
        Err(CoreError::UnknownEnvironment {
            name: name.to_string(),
            available: self.environment_names()?,
        })
    }

    fn default_search_path(&self, env: &str) -> PathBuf {
        self.root.join(DEFAULT_APPS_ROOT).join(env).join("templates")
    }

    /// Environment settings, falling back to the conventional layout
    pub fn environment(&self, env: &str) -> EnvironmentConfig {
        self.config
            .resolve_environment(env)
            .cloned()
            .unwrap_or_else(|| {
                EnvironmentConfig::with_path(
                    env,
                    format!("{}/{}/templates", DEFAULT_APPS_ROOT, env),
                )
            })
    }

    /// Absolute search paths of an environment
    pub fn search_paths(&self, env: &str) -> Vec<PathBuf> {
        self.environment(env)
            .paths
            .iter()
            .map(|p| self.root.join(p))
            .collect()
    }

    /// All applications of an environment, sorted by name
    pub fn applications(&self, env: &str) -> Result<Vec<Application>> {
        let environment = self.environment(env);
        let filter = FileFilter::new(&environment.include_patterns, &environment.exclude_patterns)?;
        discover_applications(
            &self.search_paths(env),
            &filter,
            &self.root,
            &self.charts_dir(),
        )
    }

    /// Look up one application by name
    pub fn application(&self, env: &str, name: &str) -> Result<Application> {
        let apps = self.applications(env)?;
        let available = apps.iter().map(|a| a.name.clone()).collect();
        apps.into_iter()
            .find(|a| a.name == name)
            .ok_or_else(|| CoreError::ApplicationNotFound {
                name: name.to_string(),
                available,
            })
    }

    /// Make a path relative to the repository root for display
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_app(dir: &Path, name: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join(format!("{}.yaml", name)),
            format!(
                "kind: Application\nmetadata:\n  name: {}\nspec:\n  source:\n    repoURL: ghcr.io/x\n    chart: {}\n",
                name, name
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_discover_prefers_config_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "render:\n  output_path: out\n").unwrap();
        let nested = dir.path().join("charts/app");
        std::fs::create_dir_all(&nested).unwrap();

        let ws = Workspace::discover(&nested, None).unwrap();
        assert_eq!(ws.root, dir.path());
        assert_eq!(ws.rendered_dir("dev", "api"), dir.path().join("out/dev/api"));
        assert_eq!(ws.config_file(), dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_discover_falls_back_to_git_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("sub");
        std::fs::create_dir_all(&nested).unwrap();

        let ws = Workspace::discover(&nested, None).unwrap();
        assert_eq!(ws.root, dir.path());
        assert!(ws.config_path.is_none());
        assert_eq!(ws.config.environment_names(), vec!["dev", "prod"]);
    }

    #[test]
    fn test_auto_discovered_environments() {
        let dir = TempDir::new().unwrap();
        write_app(&dir.path().join("kubernetes/argocd/applications/qa/templates"), "api");
        write_app(&dir.path().join("kubernetes/argocd/applications/dev/templates"), "web");

        let config = RitaConfig::from_yaml("auto_discover: true\n").unwrap();
        let ws = Workspace::new(dir.path(), config);
        assert_eq!(ws.environment_names().unwrap(), vec!["dev", "qa"]);
        assert_eq!(ws.resolve_env("qa").unwrap(), "qa");
        assert!(matches!(
            ws.resolve_env("staging"),
            Err(CoreError::UnknownEnvironment { .. })
        ));

        let apps = ws.applications("qa").unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "api");
    }

    #[test]
    fn test_application_lookup() {
        let dir = TempDir::new().unwrap();
        let apps_dir = dir.path().join("kubernetes/argocd/applications/dev/templates");
        write_app(&apps_dir, "backend");
        write_app(&apps_dir, "frontend");
        std::fs::create_dir_all(dir.path().join("charts/backend")).unwrap();
        std::fs::write(dir.path().join("charts/backend/Chart.yaml"), "name: backend\n").unwrap();

        let ws = Workspace::new(dir.path(), RitaConfig::default());
        assert_eq!(ws.local_charts().unwrap(), vec!["backend"]);

        let app = ws.application("dev", "backend").unwrap();
        assert!(app.is_local_chart);

        match ws.application("dev", "backnd") {
            Err(CoreError::ApplicationNotFound { available, .. }) => {
                assert_eq!(available, vec!["backend", "frontend"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
