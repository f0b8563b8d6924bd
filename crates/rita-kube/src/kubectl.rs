//! kubectl wrapper

use std::path::Path;

use tracing::debug;

use crate::error::{KubeError, Result};
use crate::process::{CommandRunner, Tool, ToolCommand};

pub struct Kubectl<'a> {
    runner: &'a dyn CommandRunner,
    context: Option<String>,
}

impl<'a> Kubectl<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            context: None,
        }
    }

    /// Pin every command to a kubeconfig context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn command(&self) -> ToolCommand {
        let cmd = ToolCommand::new(Tool::Kubectl);
        match &self.context {
            Some(ctx) => cmd.args(["--context", ctx.as_str()]),
            None => cmd,
        }
    }

    pub fn is_available(&self) -> bool {
        self.runner
            .succeeds(&ToolCommand::new(Tool::Kubectl).args(["version", "--client"]))
    }

    /// `kubectl apply -f`
    pub fn apply_file(&self, manifest: &Path, namespace: Option<&str>) -> Result<String> {
        let mut cmd = self.command().arg("apply").arg("-f").path_arg(manifest);
        if let Some(ns) = namespace {
            cmd = cmd.args(["--namespace", ns]);
        }
        self.runner.run(&cmd)
    }

    /// Block until every pod in `namespace` is Ready
    pub fn wait_pods_ready(&self, namespace: &str, timeout_secs: u64) -> Result<()> {
        let cmd = self.command().args([
            "wait".to_string(),
            "pods".to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            "--for=condition=Ready".to_string(),
            format!("--timeout={}s", timeout_secs),
            "--all".to_string(),
        ]);
        self.runner.run(&cmd).map(|_| ()).map_err(|e| match e {
            KubeError::CommandFailed { stderr, .. } => KubeError::PodsNotReady {
                namespace: namespace.to_string(),
                message: stderr,
            },
            other => other,
        })
    }

    /// `kubectl get pods -o wide`, for failure reports
    pub fn pod_summary(&self, namespace: &str) -> Result<String> {
        self.runner.run(
            &self
                .command()
                .args(["get", "pods", "--namespace", namespace, "-o", "wide"]),
        )
    }

    /// Recent logs of all containers belonging to a helm release
    pub fn release_logs(&self, namespace: &str, release: &str, tail: u32) -> Result<String> {
        let cmd = self.command().args([
            "logs".to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            "-l".to_string(),
            format!("app.kubernetes.io/instance={}", release),
            "--all-containers".to_string(),
            format!("--tail={}", tail),
        ]);
        self.runner.run(&cmd)
    }

    /// Build a kustomization, falling back to a standalone `kustomize` binary
    pub fn kustomize(&self, dir: &Path) -> Result<String> {
        let via_kubectl = ToolCommand::new(Tool::Kubectl).arg("kustomize").path_arg(dir);
        match self.runner.run(&via_kubectl) {
            Ok(out) => Ok(out),
            Err(KubeError::ToolNotFound { .. }) => {
                debug!("kubectl not found, trying kustomize");
                self.runner
                    .run(&ToolCommand::new(Tool::Kustomize).arg("build").path_arg(dir))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ToolOutput;
    use crate::process::testing::RecordingRunner;

    #[test]
    fn test_context_is_prefixed() {
        let runner = RecordingRunner::new();
        let kubectl = Kubectl::new(&runner).with_context("kind-smoke");
        kubectl
            .apply_file(Path::new("crds.yaml"), Some("test"))
            .unwrap();
        assert_eq!(
            runner.command_lines(),
            vec!["kubectl --context kind-smoke apply -f crds.yaml --namespace test"]
        );
    }

    #[test]
    fn test_wait_failure_maps_to_pods_not_ready() {
        let runner = RecordingRunner::new()
            .respond("kubectl wait", ToolOutput::failed(1, "timed out waiting"));
        let err = Kubectl::new(&runner).wait_pods_ready("ns", 30).unwrap_err();
        match err {
            KubeError::PodsNotReady { namespace, message } => {
                assert_eq!(namespace, "ns");
                assert_eq!(message, "timed out waiting");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            runner.command_lines()[0],
            "kubectl wait pods --namespace ns --for=condition=Ready --timeout=30s --all"
        );
    }

    #[test]
    fn test_kustomize_falls_back_to_standalone_binary() {
        let runner = RecordingRunner::new()
            .without(Tool::Kubectl)
            .respond("kustomize build", ToolOutput::ok("kind: ConfigMap\n"));
        let out = Kubectl::new(&runner).kustomize(Path::new("overlays/dev")).unwrap();
        assert_eq!(out, "kind: ConfigMap\n");
        assert_eq!(runner.command_lines(), vec!["kustomize build overlays/dev"]);
    }

    #[test]
    fn test_release_logs_selector() {
        let runner = RecordingRunner::new();
        Kubectl::new(&runner).release_logs("ns", "smoke", 100).unwrap();
        assert_eq!(
            runner.command_lines(),
            vec!["kubectl logs --namespace ns -l app.kubernetes.io/instance=smoke --all-containers --tail=100"]
        );
    }
}
