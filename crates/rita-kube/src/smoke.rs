//! Chart smoke tests against an ephemeral kind cluster

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rita_core::ChartTestConfig;
use tracing::{info, warn};

use crate::error::{KubeError, Result};
use crate::helm::{Helm, InstallOptions};
use crate::kind::{Kind, context_name};
use crate::kubectl::Kubectl;
use crate::process::{CommandRunner, Tool, ToolCommand};

/// Seconds to wait for pods after `helm install --wait` returned
const POD_READY_TIMEOUT_SECS: u64 = 60;

/// Log lines collected per container when a deployment fails
const FAILURE_LOG_TAIL: u32 = 100;

/// Outcome of testing one chart
#[derive(Debug, Clone)]
pub struct ChartTestResult {
    pub chart_name: String,
    pub success: bool,
    pub message: String,
    pub duration: Duration,
    /// Pod status and logs gathered on failure
    pub details: Option<String>,
}

impl ChartTestResult {
    fn passed(chart_name: &str, message: impl Into<String>, started: Instant) -> Self {
        Self {
            chart_name: chart_name.to_string(),
            success: true,
            message: message.into(),
            duration: started.elapsed(),
            details: None,
        }
    }

    fn failed(chart_name: &str, message: impl Into<String>, started: Instant) -> Self {
        Self {
            chart_name: chart_name.to_string(),
            success: false,
            message: message.into(),
            duration: started.elapsed(),
            details: None,
        }
    }
}

/// Availability of one required tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    pub tool: Tool,
    pub available: bool,
}

/// Probe helm, kubectl and kind with their version commands
pub fn check_tools(runner: &dyn CommandRunner) -> Vec<ToolCheck> {
    [
        (Tool::Helm, vec!["version"]),
        (Tool::Kubectl, vec!["version", "--client"]),
        (Tool::Kind, vec!["version"]),
    ]
    .into_iter()
    .map(|(tool, args)| ToolCheck {
        tool,
        available: runner.succeeds(&ToolCommand::new(tool).args(args)),
    })
    .collect()
}

fn chart_label(chart: &Path) -> String {
    chart
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| chart.display().to_string())
}

/// What to install for a test
#[derive(Debug, Clone)]
pub struct ChartUnderTest {
    pub chart: PathBuf,
    pub release: String,
    pub namespace: String,
    pub values_files: Vec<PathBuf>,
}

impl ChartUnderTest {
    fn missing_values(&self) -> Option<&Path> {
        self.values_files
            .iter()
            .find(|f| !f.is_file())
            .map(PathBuf::as_path)
    }
}

/// Lint and template a chart without touching a cluster
pub fn dry_run_test(runner: &dyn CommandRunner, target: &ChartUnderTest) -> ChartTestResult {
    let started = Instant::now();
    let name = chart_label(&target.chart);

    if let Some(missing) = target.missing_values() {
        return ChartTestResult::failed(
            &name,
            format!("values file not found: {}", missing.display()),
            started,
        );
    }

    let helm = Helm::new(runner);
    if let Err(e) = helm.lint(&target.chart, &target.values_files) {
        return ChartTestResult::failed(&name, format!("lint failed: {}", e), started);
    }

    let cwd = target.chart.parent().unwrap_or(Path::new("."));
    match helm.template(
        &target.release,
        &target.chart,
        &target.namespace,
        &target.values_files,
        cwd,
    ) {
        Ok(_) => ChartTestResult::passed(&name, "chart templates valid (dry-run)", started),
        Err(e) => ChartTestResult::failed(&name, format!("template failed: {}", e), started),
    }
}

/// Install a chart into a cluster, wait for its pods, then uninstall it
///
/// On failure the release is left installed for inspection and the pod
/// status plus recent logs are attached to the result.
pub fn deployment_test(
    runner: &dyn CommandRunner,
    kube_context: &str,
    target: &ChartUnderTest,
    timeout_secs: u64,
    pre_install_manifests: &[PathBuf],
) -> ChartTestResult {
    let started = Instant::now();
    let name = chart_label(&target.chart);
    let helm = Helm::new(runner).with_kube_context(kube_context);
    let kubectl = Kubectl::new(runner).with_context(kube_context);

    for manifest in pre_install_manifests {
        if let Err(e) = kubectl.apply_file(manifest, None) {
            return ChartTestResult::failed(
                &name,
                format!("failed to apply {}: {}", manifest.display(), e),
                started,
            );
        }
    }

    let mut install = InstallOptions::new(&target.release, &target.chart, &target.namespace);
    install.values_files = target.values_files.clone();
    install.timeout = format!("{}s", timeout_secs);
    if let Err(e) = helm.install(&install) {
        return ChartTestResult::failed(&name, format!("installation failed: {}", e), started);
    }

    if let Err(e) = kubectl.wait_pods_ready(&target.namespace, POD_READY_TIMEOUT_SECS) {
        let mut details = String::new();
        if let Ok(status) = kubectl.pod_summary(&target.namespace) {
            details.push_str("Pod status:\n");
            details.push_str(&status);
        }
        if let Ok(logs) = kubectl.release_logs(&target.namespace, &target.release, FAILURE_LOG_TAIL) {
            details.push_str("\nPod logs:\n");
            details.push_str(&logs);
        }
        let mut result = ChartTestResult::failed(&name, e.to_string(), started);
        result.details = (!details.is_empty()).then_some(details);
        return result;
    }

    if let Err(e) = helm.uninstall(&target.release, &target.namespace) {
        warn!(release = %target.release, error = %e, "uninstall after successful test failed");
    }
    ChartTestResult::passed(&name, "chart deployed and verified", started)
}

/// A kind cluster provisioned (or reused) for a test run
///
/// Call [`KindCluster::finish`] with the run's outcome to apply the cleanup
/// policy. Only clusters created by this guard are ever deleted.
pub struct KindCluster<'a> {
    runner: &'a dyn CommandRunner,
    name: String,
    created: bool,
    cleanup_on_success: bool,
    cleanup_on_failure: bool,
}

/// What [`KindCluster::finish`] did with the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterDisposition {
    Deleted,
    Kept,
    /// Cleanup was due but the cluster had already been removed
    AlreadyGone,
}

impl<'a> KindCluster<'a> {
    /// Reuse `name` when it exists; otherwise create it if `create` is set
    pub fn provision(
        runner: &'a dyn CommandRunner,
        name: &str,
        create: bool,
        settings: &ChartTestConfig,
    ) -> Result<Self> {
        let kind = Kind::new(runner);
        let created = if kind.cluster_exists(name)? {
            info!(cluster = name, "using existing kind cluster");
            false
        } else if create {
            kind.create_cluster(name, "60s")?
        } else {
            return Err(KubeError::ClusterNotFound {
                name: name.to_string(),
            });
        };

        Ok(Self {
            runner,
            name: name.to_string(),
            created,
            cleanup_on_success: settings.cleanup_on_success,
            cleanup_on_failure: settings.cleanup_on_failure,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created(&self) -> bool {
        self.created
    }

    /// kubeconfig context of the cluster
    pub fn context(&self) -> String {
        context_name(&self.name)
    }

    /// Apply the cleanup policy for a run that ended with `success`
    pub fn finish(self, success: bool) -> Result<ClusterDisposition> {
        let cleanup = if success {
            self.cleanup_on_success
        } else {
            self.cleanup_on_failure
        };
        if !(cleanup && self.created) {
            return Ok(ClusterDisposition::Kept);
        }
        if Kind::new(self.runner).delete_cluster(&self.name)? {
            Ok(ClusterDisposition::Deleted)
        } else {
            warn!(cluster = %self.name, "kind cluster disappeared before cleanup");
            Ok(ClusterDisposition::AlreadyGone)
        }
    }
}
