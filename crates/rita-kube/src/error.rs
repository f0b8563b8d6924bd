//! Error types for rita-kube

use rita_core::CoreError;
use thiserror::Error;

/// Result type for rita-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while driving external tools
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Binary missing from PATH
    #[error("`{tool}` was not found in PATH\nHint: {hint}")]
    ToolNotFound { tool: String, hint: String },

    /// Process could not be started
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Process exited unsuccessfully; `stderr` is the tool's own output
    #[error("`{command}` failed (exit code {}):\n{stderr}", code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Tool output could not be interpreted
    #[error("unexpected output from `{command}`: {message}")]
    InvalidOutput { command: String, message: String },

    /// Local chart directory missing
    #[error("chart not found: {path}")]
    ChartNotFound { path: String },

    /// Values file referenced by an application is missing
    #[error("values file not found: {path}")]
    ValuesFileNotFound { path: String },

    /// `helm pull` succeeded but nothing was extracted
    #[error("chart '{chart}' was pulled but no chart directory was found in {dir}")]
    ChartNotExtracted { chart: String, dir: String },

    /// Plain manifest directory missing or without YAML files
    #[error("no YAML manifests found in {path}")]
    ManifestsNotFound { path: String },

    /// Application has nothing that can be rendered
    #[error("application '{name}' has no renderable source")]
    NothingToRender { name: String },

    /// Credentials could not be resolved for a registry
    #[error("no credentials available for registry '{registry}'")]
    MissingCredentials { registry: String },

    /// Versions cannot be listed for OCI registries
    #[error("OCI registries do not support version listing; pass --version explicitly")]
    VersionListingUnsupported,

    /// kind cluster missing and creation not requested
    #[error("kind cluster '{name}' does not exist")]
    ClusterNotFound { name: String },

    /// Pods did not become ready in time
    #[error("pods in namespace '{namespace}' did not become ready: {message}")]
    PodsNotReady { namespace: String, message: String },

    /// Core error (configuration, manifests)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Directory traversal error
    #[error("directory traversal failed: {0}")]
    Walk(#[from] walkdir::Error),
}

