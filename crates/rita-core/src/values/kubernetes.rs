//! Kubernetes primitives shared by chart value models

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// When the kubelet pulls the container image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PullPolicy {
    Always,
    #[default]
    IfNotPresent,
    Never,
}

fn default_tag() -> String {
    "latest".to_string()
}

/// Container image reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContainerImage {
    /// Image repository without tag, e.g. `ghcr.io/org/api`
    pub repository: String,

    /// Image tag. Prefer immutable tags (version or commit SHA) outside development.
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Image pull policy
    #[serde(default)]
    pub pull_policy: PullPolicy,

    /// Image digest (`sha256:...`). Takes precedence over the tag when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ContainerImage {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: default_tag(),
            pull_policy: PullPolicy::default(),
            digest: None,
        }
    }
}

/// CPU and memory quantities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceRequirements {
    /// CPU quantity, e.g. `100m` or `1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    /// Memory quantity, e.g. `128Mi` or `1Gi`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Resource requests and limits of a container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PodResources {
    /// Guaranteed resources used for scheduling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceRequirements>,

    /// Upper bound enforced by the kubelet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceRequirements>,
}

/// Service account used by the pods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ServiceAccount {
    /// Create a dedicated service account
    pub create: bool,

    /// Service account name. Generated from the release name when empty.
    pub name: String,

    /// Mount the service account token into pods
    pub automount: bool,

    /// Annotations, e.g. `eks.amazonaws.com/role-arn` for IRSA
    pub annotations: BTreeMap<String, String>,
}

impl Default for ServiceAccount {
    fn default() -> Self {
        Self {
            create: true,
            name: String::new(),
            automount: true,
            annotations: BTreeMap::new(),
        }
    }
}

/// Reference to a key of a Kubernetes Secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SecretRef {
    /// Secret name
    pub name: String,

    /// Key inside the secret. The whole secret is used when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Container environment variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Variable name
    pub name: String,

    /// Literal value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Value source (`secretKeyRef`, `configMapKeyRef`, `fieldRef`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<BTreeMap<String, serde_json::Value>>,
}

fn default_refresh_interval() -> String {
    "10m".to_string()
}

/// Secret synced from an external store by the External Secrets Operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecret {
    /// Name of the secret in the external store
    pub name: String,

    /// How often the operator re-reads the external secret
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: String,
}

/// External Secrets Operator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ExternalSecretConfig {
    /// Create ExternalSecret resources
    pub enabled: bool,

    /// Default refresh interval for all secrets
    pub refresh_interval: String,

    /// SecretStore reference (`name` and `kind`)
    pub store_ref: BTreeMap<String, String>,

    /// Secrets to sync
    pub external_secret_names: Vec<String>,
}

impl Default for ExternalSecretConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            refresh_interval: default_refresh_interval(),
            store_ref: BTreeMap::from([
                ("kind".to_string(), "ClusterSecretStore".to_string()),
                ("name".to_string(), "default".to_string()),
            ]),
            external_secret_names: Vec::new(),
        }
    }
}

/// Volume mounted into a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    /// Name of a volume declared in `volumes`
    pub name: String,

    /// Absolute path inside the container
    pub mount_path: String,

    #[serde(default)]
    pub read_only: bool,

    /// Mount a single file or subdirectory of the volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}
