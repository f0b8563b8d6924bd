//! `feature-deployment` chart: short-lived preview environments per branch

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::kubernetes::{ContainerImage, PodResources};

/// Chart versions pulled into a preview environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FeatureVersions {
    /// Version of the shared configuration chart
    pub config: String,

    /// Version of the application stack chart
    pub stack: String,
}

impl Default for FeatureVersions {
    fn default() -> Self {
        Self {
            config: "0.1.0".to_string(),
            stack: "0.1.0".to_string(),
        }
    }
}

/// Images deployed into a preview environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FeatureImages {
    /// Backend image, usually tagged with the branch commit
    pub backend: ContainerImage,

    /// Frontend image, usually tagged with the branch commit
    pub frontend: ContainerImage,
}

impl Default for FeatureImages {
    fn default() -> Self {
        Self {
            backend: ContainerImage::new("ghcr.io/smloureiro/backend"),
            frontend: ContainerImage::new("ghcr.io/smloureiro/frontend"),
        }
    }
}

/// Values of the `feature-deployment` chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureDeploymentValues {
    /// Identifier of the branch, used as namespace suffix and host prefix
    pub branch_id: String,

    /// Base domain the preview host is created under
    pub domain: String,

    /// Delete the environment after this many hours without updates (0 disables)
    pub ttl_hours: u32,

    /// Chart versions
    pub versions: FeatureVersions,

    /// Images
    pub images: FeatureImages,

    /// Resources applied to every preview workload
    pub resources: PodResources,
}

impl Default for FeatureDeploymentValues {
    fn default() -> Self {
        Self {
            branch_id: "test-1".to_string(),
            domain: "preview.example.com".to_string(),
            ttl_hours: 72,
            versions: FeatureVersions::default(),
            images: FeatureImages::default(),
            resources: PodResources::default(),
        }
    }
}
