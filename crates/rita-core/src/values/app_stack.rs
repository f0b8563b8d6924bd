//! `app-stack` umbrella chart: backend, frontend and gateway subcharts

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::base::BaseChartValues;

/// Values visible to every subchart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalValues {
    /// Environment name (`dev`, `prod`, ...)
    pub environment: String,

    /// Base domain for ingress hosts
    pub domain: String,

    /// Labels added to every resource
    pub common_labels: BTreeMap<String, String>,
}

/// A toggleable subchart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct StackComponent {
    /// Deploy this component
    pub enabled: bool,

    #[serde(flatten)]
    pub values: BaseChartValues,
}

impl StackComponent {
    fn enabled() -> Self {
        Self {
            enabled: true,
            values: BaseChartValues::default(),
        }
    }

    fn disabled() -> Self {
        Self {
            enabled: false,
            values: BaseChartValues::default(),
        }
    }
}

impl Default for StackComponent {
    fn default() -> Self {
        Self::enabled()
    }
}

/// Values of the `app-stack` chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppStackValues {
    /// Shared values (`global` in Helm)
    #[serde(rename = "global")]
    pub global_values: GlobalValues,

    /// API backend
    pub backend: StackComponent,

    /// Web frontend
    pub frontend: StackComponent,

    /// API gateway in front of the backend
    pub gateway: StackComponent,
}

impl Default for AppStackValues {
    fn default() -> Self {
        Self {
            global_values: GlobalValues::default(),
            backend: StackComponent::enabled(),
            frontend: StackComponent::enabled(),
            gateway: StackComponent::disabled(),
        }
    }
}
