//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    // ===== Configuration Errors =====
    #[error("Failed to parse {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Unknown environment '{name}'")]
    UnknownEnvironment { name: String, available: Vec<String> },

    // ===== Chart Errors =====
    #[error("No values model registered for chart '{name}'")]
    UnknownChart { name: String, available: Vec<String> },

    #[error("Chart not found: {path}")]
    ChartNotFound { path: String },

    #[error("Chart directory already exists: {path}")]
    ChartExists { path: String },

    #[error("Invalid chart name '{name}': {reason}")]
    InvalidChartName { name: String, reason: String },

    // ===== Schema Errors =====
    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },

    // ===== Application Errors =====
    #[error("Application not found: {name}")]
    ApplicationNotFound { name: String, available: Vec<String> },

    #[error("Invalid glob pattern: {0}")]
    InvalidPattern(#[from] glob::PatternError),

    // ===== Passthrough =====
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory traversal failed: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
