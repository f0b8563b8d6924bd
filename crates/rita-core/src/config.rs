//! Project configuration (`.rita.yaml`)
//!
//! The configuration is optional: when no file can be found every command
//! runs against [`RitaConfig::default`]. Fields missing from a file take
//! their documented defaults, so a file only needs to list what it overrides.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{CoreError, Result};

/// Name of the configuration file looked up from the working directory upwards
pub const CONFIG_FILE_NAME: &str = ".rita.yaml";

/// Docker Hub answers on several hostnames that all refer to the same registry
const DOCKER_HUB_DOMAINS: &[&str] = &["docker.io", "registry-1.docker.io", "index.docker.io"];

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))$")
        .expect("environment reference pattern is valid")
});

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RitaConfig {
    /// Discover environments from the repository layout when none are configured
    pub auto_discover: bool,

    /// Configured environments. An explicit file without this key has none.
    #[serde(default)]
    pub environments: Vec<EnvironmentConfig>,

    pub charts: ChartConfig,

    pub render: RenderConfig,

    pub test: ChartTestConfig,

    pub registries: Vec<RegistryConfig>,
}

impl Default for RitaConfig {
    fn default() -> Self {
        Self {
            auto_discover: true,
            environments: vec![
                EnvironmentConfig::with_path("dev", "kubernetes/argocd/applications/dev/templates"),
                EnvironmentConfig::with_path(
                    "prod",
                    "kubernetes/argocd/applications/prod/templates",
                ),
            ],
            charts: ChartConfig::default(),
            render: RenderConfig::default(),
            test: ChartTestConfig::default(),
            registries: Vec::new(),
        }
    }
}

/// A named set of ArgoCD application search paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub name: String,
    pub paths: Vec<String>,
    pub aliases: Vec<String>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            paths: Vec::new(),
            aliases: Vec::new(),
            include_patterns: vec!["**/*.yaml".to_string(), "**/*.yml".to_string()],
            exclude_patterns: vec![
                "**/secrets/**".to_string(),
                "**/kustomization.yaml".to_string(),
            ],
        }
    }
}

impl EnvironmentConfig {
    /// Environment with a single search path and default patterns
    pub fn with_path(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paths: vec![path.into()],
            ..Self::default()
        }
    }

    /// Whether `name` is this environment's name or one of its aliases (case-insensitive)
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Where charts live and where they are published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub path: String,
    pub registry: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            path: "charts".to_string(),
            registry: "ghcr.io/SMLoureiro".to_string(),
        }
    }
}

/// Manifest rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory (relative to the repository root) receiving rendered manifests
    pub output_path: String,

    /// Only render applications whose chart lives in this repository
    pub local_charts_only: bool,

    /// Branch used as the baseline for `render diff`
    pub compare_branch: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output_path: "rendered".to_string(),
            local_charts_only: true,
            compare_branch: "main".to_string(),
        }
    }
}

/// Ephemeral cluster test settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartTestConfig {
    pub kind_cluster_name: String,
    pub timeout_seconds: u64,
    pub cleanup_on_success: bool,
    pub cleanup_on_failure: bool,

    /// Manifests applied to the cluster before any chart is installed
    pub pre_install_manifests: Vec<String>,
}

impl Default for ChartTestConfig {
    fn default() -> Self {
        Self {
            kind_cluster_name: "rita-test".to_string(),
            timeout_seconds: 300,
            cleanup_on_success: true,
            cleanup_on_failure: false,
            pre_install_manifests: Vec::new(),
        }
    }
}

/// Credentials for an OCI registry
///
/// `username` and `password` accept literal values as well as `$VAR` or
/// `${VAR}` references resolved from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// AWS Secrets Manager secret holding `username` and `password`/`accessToken`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_secret_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_profile: Option<String>,
}

impl RegistryConfig {
    /// Username after environment resolution
    pub fn resolved_username(&self) -> Option<String> {
        self.username.as_deref().and_then(resolve_env_var)
    }

    /// Password after environment resolution
    pub fn resolved_password(&self) -> Option<String> {
        self.password.as_deref().and_then(resolve_env_var)
    }

    /// Whether this entry applies to `url`
    pub fn matches_url(&self, url: &str) -> bool {
        let wanted = normalize_registry_url(url);
        let configured = normalize_registry_url(&self.url);
        if configured.is_empty() {
            return false;
        }

        let docker = |u: &str| DOCKER_HUB_DOMAINS.iter().any(|d| u.starts_with(d));
        if docker(&wanted) && docker(&configured) {
            return true;
        }

        wanted.contains(&configured) || configured.contains(&wanted)
    }
}

/// Severity of a configuration issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// A problem found by [`RitaConfig::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

impl ConfigIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            message: message.into(),
        }
    }
}

impl RitaConfig {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|source| CoreError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse configuration from YAML text. An empty document is an empty mapping.
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return serde_yaml::from_str("{}");
        }
        serde_yaml::from_str(content)
    }

    /// Find and load the configuration governing `start`
    ///
    /// Returns the defaults (and no path) when no file exists.
    pub fn discover(start: &Path) -> Result<(Self, Option<PathBuf>)> {
        match find_config_file(start) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                let config = Self::load_from(&path)?;
                Ok((config, Some(path)))
            }
            None => {
                tracing::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
                Ok((Self::default(), None))
            }
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Find an environment by name or alias (case-insensitive)
    pub fn resolve_environment(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.environments.iter().find(|env| env.matches(name))
    }

    /// Canonical name for an environment, or the input when it is not configured
    pub fn canonical_env_name(&self, name: &str) -> String {
        self.resolve_environment(name)
            .map(|env| env.name.clone())
            .unwrap_or_else(|| name.to_string())
    }

    /// Names of all configured environments
    pub fn environment_names(&self) -> Vec<String> {
        self.environments.iter().map(|e| e.name.clone()).collect()
    }

    /// Registry entry whose URL matches `url`
    pub fn registry_for(&self, url: &str) -> Option<&RegistryConfig> {
        self.registries.iter().find(|r| r.matches_url(url))
    }

    /// Check the configuration for mistakes that would only show up later
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        let mut seen: Vec<String> = Vec::new();

        for env in &self.environments {
            if env.name.trim().is_empty() {
                issues.push(ConfigIssue::error("Environment with an empty name"));
            }

            for key in std::iter::once(&env.name).chain(env.aliases.iter()) {
                let key = key.to_lowercase();
                if seen.contains(&key) {
                    issues.push(ConfigIssue::error(format!(
                        "Environment name or alias '{}' is defined more than once",
                        key
                    )));
                } else {
                    seen.push(key);
                }
            }

            if env.paths.is_empty() {
                issues.push(ConfigIssue::warning(format!(
                    "Environment '{}' has no paths",
                    env.name
                )));
            }

            for pattern in env.include_patterns.iter().chain(&env.exclude_patterns) {
                if let Err(e) = glob::Pattern::new(pattern) {
                    issues.push(ConfigIssue::error(format!(
                        "Environment '{}': invalid pattern '{}': {}",
                        env.name, pattern, e
                    )));
                }
            }
        }

        if self.environments.is_empty() && !self.auto_discover {
            issues.push(ConfigIssue::warning(
                "No environments configured and auto_discover is disabled",
            ));
        }

        for registry in &self.registries {
            if registry.url.trim().is_empty() {
                issues.push(ConfigIssue::error("Registry entry without a url"));
            }
            if registry.username.is_some() != registry.password.is_some() {
                issues.push(ConfigIssue::warning(format!(
                    "Registry '{}' sets only one of username/password",
                    registry.url
                )));
            }
        }

        if self.test.timeout_seconds == 0 {
            issues.push(ConfigIssue::error("test.timeout_seconds must be greater than 0"));
        }

        issues
    }

    /// Fail with [`CoreError::InvalidConfig`] when [`validate`](Self::validate)
    /// reports errors. Warnings are ignored.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|issue| issue.severity == IssueSeverity::Error)
            .map(|issue| issue.message)
            .collect();
        if errors.is_empty() {
            return Ok(());
        }
        Err(CoreError::InvalidConfig {
            message: errors.join("; "),
        })
    }
}

/// Walk from `start` up to the filesystem root looking for [`CONFIG_FILE_NAME`]
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// YAML of the default configuration, as written by `rita config init`
pub fn default_yaml() -> Result<String> {
    RitaConfig::default().to_yaml()
}

/// Resolve `$VAR` / `${VAR}` against the process environment
///
/// Plain values are returned unchanged; a reference to an unset variable
/// resolves to `None`.
///
/// Only a value that is entirely one reference is resolved. A `$` that is not
/// followed by a valid variable name (`$1abc`, `$-x`, a lone `$`, `${}`) is
/// literal text, so secrets that happen to start with `$` are kept as written.
pub fn resolve_env_var(value: &str) -> Option<String> {
    match ENV_REFERENCE.captures(value) {
        Some(caps) => {
            let name = caps.get(1).or_else(|| caps.get(2))?.as_str();
            std::env::var(name).ok()
        }
        None => Some(value.to_string()),
    }
}

/// Lowercased registry host/path without scheme or trailing slash
pub fn normalize_registry_url(url: &str) -> String {
    let url = url.trim();
    let url = url
        .strip_prefix("oci://")
        .or_else(|| url.strip_prefix("https://"))
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    url.trim_end_matches('/').to_lowercase()
}
