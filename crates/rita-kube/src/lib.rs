//! RITA Kube - drives the external tools behind RITA
//!
//! Every binary (helm, kubectl, kind, git and the cloud CLIs) is invoked
//! through a [`CommandRunner`]; [`SystemRunner`] spawns real processes.
//!
//! - `helm`, `kind`, `kubectl`, `git`: typed command wrappers
//! - `credentials`: registry credentials from CLIs, secrets and config
//! - `render`: render ArgoCD applications to manifest directories
//! - `smoke`: chart tests against an ephemeral kind cluster

pub mod credentials;
pub mod error;
pub mod git;
pub mod helm;
pub mod kind;
pub mod kubectl;
pub mod process;
pub mod render;
pub mod smoke;

pub use credentials::{Credentials, DockerAuthStatus, resolve_registry_credentials};
pub use error::{KubeError, Result};
pub use git::Git;
pub use helm::{Helm, InstallOptions, is_oci_registry, registry_host};
pub use kind::Kind;
pub use kubectl::Kubectl;
pub use process::{CommandRunner, SystemRunner, Tool, ToolCommand, ToolOutput};
pub use render::{ChartOrigin, RenderSummary, Renderer};
pub use smoke::{ChartTestResult, ChartUnderTest, ClusterDisposition, KindCluster};
