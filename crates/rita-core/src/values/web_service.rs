//! `web-service` chart: a single HTTP workload

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::base::{BaseChartValues, EnvFromExternalSecretsConfig};
use super::kubernetes::{EnvVar, ExternalSecretConfig, VolumeMount};

/// Values of the `web-service` chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WebServiceValues {
    #[serde(flatten)]
    pub base: BaseChartValues,

    /// Extra environment variables of the main container
    pub env: Vec<EnvVar>,

    /// Secrets injected into the environment through `envFrom`
    pub env_from_external_secrets: EnvFromExternalSecretsConfig,

    /// ExternalSecret resources created by the chart
    pub external_secrets: ExternalSecretConfig,

    /// Typed volume mounts appended to `volumeMounts`
    pub extra_volume_mounts: Vec<VolumeMount>,
}
