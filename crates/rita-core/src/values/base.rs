//! Building blocks of a conventional `helm create`-style chart

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::kubernetes::{ContainerImage, ServiceAccount};

/// Kubernetes Service exposing the pods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service type: `ClusterIP`, `NodePort` or `LoadBalancer`
    #[serde(rename = "type")]
    pub service_type: String,

    /// Port exposed by the Service
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_type: "ClusterIP".to_string(),
            port: 8000,
        }
    }
}

/// Path routing rule of an Ingress host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct IngressHostPath {
    /// URL path prefix
    pub path: String,

    /// `Prefix`, `Exact` or `ImplementationSpecific`
    pub path_type: String,
}

impl Default for IngressHostPath {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            path_type: "ImplementationSpecific".to_string(),
        }
    }
}

/// Host served by the Ingress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct IngressHost {
    /// Fully qualified host name
    pub host: String,

    /// Path rules for this host
    pub paths: Vec<IngressHostPath>,
}

impl Default for IngressHost {
    fn default() -> Self {
        Self {
            host: "chart-example.local".to_string(),
            paths: vec![IngressHostPath::default()],
        }
    }
}

/// Ingress resource settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct IngressConfig {
    /// Create an Ingress resource
    pub enabled: bool,

    /// IngressClass name. Empty uses the cluster default.
    pub class_name: String,

    /// Controller specific annotations
    pub annotations: BTreeMap<String, String>,

    /// Hosts and their path rules
    pub hosts: Vec<IngressHost>,

    /// TLS blocks (`secretName`, `hosts`)
    pub tls: Vec<BTreeMap<String, JsonValue>>,
}

/// HTTP GET probe target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HttpProbe {
    /// Request path
    pub path: String,

    /// Port name or number
    pub port: String,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self {
            path: "/alive".to_string(),
            port: "http".to_string(),
        }
    }
}

/// Liveness or readiness probe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeConfig {
    /// HTTP check performed by the kubelet
    pub http_get: HttpProbe,
}

/// HorizontalPodAutoscaler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoscalingConfig {
    /// Create a HorizontalPodAutoscaler. `replicaCount` is ignored when enabled.
    pub enabled: bool,

    pub min_replicas: u32,

    pub max_replicas: u32,

    /// Average CPU utilization target, in percent
    #[serde(rename = "targetCPUUtilizationPercentage")]
    pub target_cpu_utilization_percentage: u32,

    /// Average memory utilization target, in percent
    #[serde(
        rename = "targetMemoryUtilizationPercentage",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_memory_utilization_percentage: Option<u32>,
}

impl Default for AutoscalingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_replicas: 1,
            max_replicas: 100,
            target_cpu_utilization_percentage: 80,
            target_memory_utilization_percentage: None,
        }
    }
}

/// Reference to a SecretStore or ClusterSecretStore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StoreRefConfig {
    /// Store name
    pub name: String,

    /// `SecretStore` (namespaced) or `ClusterSecretStore`
    pub kind: String,
}

impl Default for StoreRefConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            kind: "ClusterSecretStore".to_string(),
        }
    }
}

/// Inject external secrets into the container environment via `envFrom`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct EnvFromExternalSecretsConfig {
    pub enabled: bool,

    /// How often secrets are re-synced, e.g. `10m` or `1h`
    pub refresh_interval: String,

    /// Store the secrets are read from
    pub store_ref: StoreRefConfig,

    /// Names of the secrets in the external store
    pub external_secret_names: Vec<String>,
}

impl Default for EnvFromExternalSecretsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval: "10m".to_string(),
            store_ref: StoreRefConfig::default(),
            external_secret_names: Vec::new(),
        }
    }
}

/// Values shared by most single-workload charts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct BaseChartValues {
    /// Number of pod replicas when autoscaling is disabled
    pub replica_count: u32,

    /// Container image
    pub image: ContainerImage,

    /// Secrets used to pull from private registries, e.g. `[{name: ghcr-pull}]`
    pub image_pull_secrets: Vec<BTreeMap<String, String>>,

    /// Replaces the chart name in generated resource names
    pub name_override: String,

    /// Replaces the full generated resource name
    pub fullname_override: String,

    /// Service account settings
    pub service_account: ServiceAccount,

    /// Extra pod annotations
    pub pod_annotations: BTreeMap<String, String>,

    /// Extra pod labels
    pub pod_labels: BTreeMap<String, String>,

    /// Pod-level security context
    pub pod_security_context: BTreeMap<String, JsonValue>,

    /// Container-level security context
    pub security_context: BTreeMap<String, JsonValue>,

    /// Service settings
    pub service: ServiceConfig,

    /// Ingress settings
    pub ingress: IngressConfig,

    /// Container resources (`requests`, `limits`)
    pub resources: BTreeMap<String, JsonValue>,

    /// Liveness probe
    pub liveness_probe: ProbeConfig,

    /// Readiness probe
    pub readiness_probe: ProbeConfig,

    /// Autoscaling settings
    pub autoscaling: AutoscalingConfig,

    /// Additional pod volumes
    pub volumes: Vec<BTreeMap<String, JsonValue>>,

    /// Additional container volume mounts
    pub volume_mounts: Vec<BTreeMap<String, JsonValue>>,

    /// Node labels constraining scheduling
    pub node_selector: BTreeMap<String, String>,

    /// Pod tolerations
    pub tolerations: Vec<BTreeMap<String, JsonValue>>,

    /// Pod affinity rules
    pub affinity: BTreeMap<String, JsonValue>,

    /// Extra manifests rendered as-is alongside the chart
    pub extra_objects: Vec<JsonValue>,
}

impl Default for BaseChartValues {
    fn default() -> Self {
        Self {
            replica_count: 1,
            image: ContainerImage::new("nginx"),
            image_pull_secrets: Vec::new(),
            name_override: String::new(),
            fullname_override: String::new(),
            service_account: ServiceAccount::default(),
            pod_annotations: BTreeMap::new(),
            pod_labels: BTreeMap::new(),
            pod_security_context: BTreeMap::new(),
            security_context: BTreeMap::new(),
            service: ServiceConfig::default(),
            ingress: IngressConfig::default(),
            resources: BTreeMap::new(),
            liveness_probe: ProbeConfig::default(),
            readiness_probe: ProbeConfig::default(),
            autoscaling: AutoscalingConfig::default(),
            volumes: Vec::new(),
            volume_mounts: Vec::new(),
            node_selector: BTreeMap::new(),
            tolerations: Vec::new(),
            affinity: BTreeMap::new(),
            extra_objects: Vec::new(),
        }
    }
}
