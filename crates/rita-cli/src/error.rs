//! CLI error types with exit code handling
//!
//! Library errors are mapped onto a small set of diagnostics, each carrying
//! the exit code the process terminates with.

use miette::Diagnostic;
use rita_core::CoreError;
use rita_core::suggestions::suggestion_help;
use rita_kube::KubeError;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Values or schema validation failed
    #[error("Validation failed: {message}")]
    #[diagnostic(code(rita::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// An application could not be rendered
    #[error("Render error: {message}")]
    #[diagnostic(code(rita::cli::render))]
    Render {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Configuration, environment or application lookup failed
    #[error("Configuration error: {message}")]
    #[diagnostic(code(rita::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// External tool missing or failed; `message` carries its stderr
    #[error("{message}")]
    #[diagnostic(code(rita::cli::tool))]
    Tool {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid combination of arguments
    #[error("{message}")]
    #[diagnostic(code(rita::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(rita::cli::io))]
    Io { message: String },

    /// Wrapped error for passthrough (stores the formatted message)
    #[error("{message}")]
    #[diagnostic(code(rita::cli::error))]
    Other { message: String },

    /// Internal error (unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(rita::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Render { .. } => exit_codes::RENDER_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Tool { .. } => exit_codes::TOOL_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a render error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
            help: None,
        }
    }

    /// Create a configuration error with optional help text
    pub fn config(message: impl Into<String>, help: Option<String>) -> Self {
        Self::Config {
            message: message.into(),
            help,
        }
    }

    /// Create an external tool error with help text
    pub fn tool(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Tool {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a usage error (invalid argument combination)
    pub fn usage(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an error with the generic exit code
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<miette::Report> for CliError {
    fn from(err: miette::Report) -> Self {
        let message = err
            .chain()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(": ");
        if err.chain().any(|e| e.is::<std::io::Error>()) {
            CliError::Io { message }
        } else {
            CliError::Other { message }
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match &err {
            CoreError::UnknownEnvironment { name, available } => {
                CliError::config(message, suggestion_help("environments", name, available))
            }
            CoreError::ApplicationNotFound { name, available } => {
                CliError::config(message, suggestion_help("applications", name, available))
            }
            CoreError::UnknownChart { name, available } => CliError::Validation {
                help: suggestion_help("charts", name, available),
                message,
            },
            CoreError::ConfigParse { .. }
            | CoreError::InvalidConfig { .. }
            | CoreError::InvalidPattern(_) => {
                CliError::config(message, Some("Run: rita config check".to_string()))
            }
            CoreError::ChartNotFound { .. }
            | CoreError::ChartExists { .. }
            | CoreError::InvalidChartName { .. } => CliError::validation(message),
            CoreError::Io(_) | CoreError::Walk(_) => CliError::Io { message },
            _ => CliError::other(message),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::Core(core) => core.into(),
            KubeError::Io(io) => io.into(),
            KubeError::ToolNotFound { tool, hint } => CliError::Tool {
                message: format!("`{}` was not found in PATH", tool),
                help: Some(hint),
            },
            KubeError::ClusterNotFound { ref name } => CliError::tool(
                err.to_string(),
                format!("Create it with: rita test cluster --name {}", name),
            ),
            KubeError::MissingCredentials { .. } => CliError::usage(
                err.to_string(),
                "Pass --username/--password, set GITHUB_USERNAME/GITHUB_TOKEN or run: gh auth login",
            ),
            KubeError::VersionListingUnsupported => CliError::usage(
                err.to_string(),
                "Pass the chart version explicitly with --version",
            ),
            KubeError::ValuesFileNotFound { .. }
            | KubeError::ChartNotFound { .. }
            | KubeError::ChartNotExtracted { .. }
            | KubeError::ManifestsNotFound { .. }
            | KubeError::NothingToRender { .. } => CliError::render(err.to_string()),
            other => CliError::Tool {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use miette::{IntoDiagnostic, WrapErr};

    #[test]
    fn test_unknown_environment_suggests() {
        let err: CliError = CoreError::UnknownEnvironment {
            name: "prd".to_string(),
            available: vec!["dev".to_string(), "prod".to_string()],
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
        match err {
            CliError::Config { help, .. } => {
                assert_eq!(help.as_deref(), Some("Did you mean 'prod'?"))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_tool_errors_keep_stderr() {
        let err: CliError = KubeError::CommandFailed {
            command: "helm template api ./chart".to_string(),
            code: Some(1),
            stderr: "Error: parse error in deployment.yaml".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::TOOL_ERROR);
        assert!(err.to_string().contains("parse error in deployment.yaml"));
    }

    #[test]
    fn test_missing_credentials_is_usage_error() {
        let err: CliError = KubeError::MissingCredentials {
            registry: "ghcr.io".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::USAGE_ERROR);
        assert!(err.to_string().contains("'ghcr.io'"));
    }

    #[test]
    fn test_render_errors() {
        let err: CliError = KubeError::ValuesFileNotFound {
            path: "values/dev.yaml".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::RENDER_ERROR);
    }

    #[test]
    fn test_wrapped_io_error_keeps_io_exit_code() {
        let report = std::fs::read_to_string("/definitely/not/here")
            .into_diagnostic()
            .wrap_err("Failed to read values")
            .unwrap_err();
        let err = CliError::from(report);
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
        assert!(err.to_string().starts_with("IO error: Failed to read values: "));
    }
}
