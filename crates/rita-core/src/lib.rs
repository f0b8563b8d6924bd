//! RITA Core - types shared by the RITA command line tool
//!
//! This crate has no knowledge of external binaries; everything here works
//! on files and in-memory values:
//! - `config`: the optional `.rita.yaml` project configuration
//! - `workspace`: repository root, environments and application discovery
//! - `values`: declarative chart value models
//! - `schema`: JSON Schema generation and validation
//! - `manifest`: rendered manifest grouping and diffing
//! - `scaffold`: new chart boilerplate

pub mod application;
pub mod config;
pub mod error;
pub mod manifest;
pub mod scaffold;
pub mod schema;
pub mod suggestions;
pub mod values;
pub mod workspace;

pub use application::{Application, ApplicationSet, NestedResources, find_affected_apps};
pub use config::{
    CONFIG_FILE_NAME, ChartConfig, ChartTestConfig, ConfigIssue, EnvironmentConfig,
    IssueSeverity, RegistryConfig, RenderConfig, RitaConfig,
};
pub use error::{CoreError, Result};
pub use manifest::{AppDiff, DiffOutcome, DiffReport, ManifestDiff};
pub use schema::{SchemaValidator, ValidationErrorInfo, ValidationResult};
pub use values::{REGISTERED_CHARTS, RegisteredChart};
pub use workspace::Workspace;
