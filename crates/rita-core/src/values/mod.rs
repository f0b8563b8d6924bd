//! Declarative chart value models
//!
//! Each chart with a schema is described by a Rust type deriving
//! [`JsonSchema`]. Doc comments become schema descriptions and `Default`
//! implementations become schema defaults. To add a chart, define its values
//! type in a module here and append it to [`REGISTERED_CHARTS`].

pub mod app_stack;
pub mod base;
pub mod feature_deployment;
pub mod kubernetes;
pub mod web_service;

use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

pub use app_stack::{AppStackValues, GlobalValues, StackComponent};
pub use base::{
    AutoscalingConfig, BaseChartValues, EnvFromExternalSecretsConfig, HttpProbe, IngressConfig,
    IngressHost, IngressHostPath, ProbeConfig, ServiceConfig, StoreRefConfig,
};
pub use feature_deployment::{FeatureDeploymentValues, FeatureImages, FeatureVersions};
pub use kubernetes::{
    ContainerImage, EnvVar, ExternalSecret, ExternalSecretConfig, PodResources, PullPolicy,
    ResourceRequirements, SecretRef, ServiceAccount, VolumeMount,
};
pub use web_service::WebServiceValues;

/// A chart whose values schema is generated from a Rust type
#[derive(Debug, Clone, Copy)]
pub struct RegisteredChart {
    /// Chart directory name
    pub name: &'static str,

    /// Name of the values type, shown by `schema list`
    pub model: &'static str,

    schema: fn() -> RootSchema,
    defaults: fn() -> JsonValue,
}

impl RegisteredChart {
    const fn of<T>(name: &'static str, model: &'static str) -> Self
    where
        T: JsonSchema + Default + Serialize,
    {
        Self {
            name,
            model,
            schema: root_schema::<T>,
            defaults: default_values::<T>,
        }
    }

    /// JSON Schema of the values type
    pub fn schema(&self) -> RootSchema {
        (self.schema)()
    }

    /// Default values as JSON
    pub fn defaults(&self) -> JsonValue {
        (self.defaults)()
    }
}

fn root_schema<T: JsonSchema>() -> RootSchema {
    schemars::schema_for!(T)
}

fn default_values<T: Default + Serialize>() -> JsonValue {
    serde_json::to_value(T::default()).unwrap_or(JsonValue::Null)
}

/// Charts with a values model, sorted by name
pub const REGISTERED_CHARTS: &[RegisteredChart] = &[
    RegisteredChart::of::<AppStackValues>("app-stack", "AppStackValues"),
    RegisteredChart::of::<FeatureDeploymentValues>("feature-deployment", "FeatureDeploymentValues"),
    RegisteredChart::of::<WebServiceValues>("web-service", "WebServiceValues"),
];

/// Names of all registered charts, sorted
pub fn registered_chart_names() -> Vec<&'static str> {
    REGISTERED_CHARTS.iter().map(|c| c.name).collect()
}

/// Look up a registered chart
pub fn find_chart(name: &str) -> Option<&'static RegisteredChart> {
    REGISTERED_CHARTS.iter().find(|c| c.name == name)
}

/// Look up a registered chart, failing with the list of known charts
pub fn get_chart(name: &str) -> Result<&'static RegisteredChart> {
    find_chart(name).ok_or_else(|| CoreError::UnknownChart {
        name: name.to_string(),
        available: registered_chart_names()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}
