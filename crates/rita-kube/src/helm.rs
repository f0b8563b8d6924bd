//! Helm CLI wrapper

use std::path::{Path, PathBuf};

use semver::Version;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{KubeError, Result};
use crate::process::{CommandRunner, Tool, ToolCommand};

/// Name of the throwaway repository added for traditional chart repos
const TEMP_REPO_NAME: &str = "rita-temp-repo";

/// Directory holding the isolated helm repository config inside a pull destination
pub const HELM_HOME_DIR: &str = ".rita-helm";

/// Hosts that only serve charts over OCI
const OCI_INDICATORS: &[&str] = &[
    "ghcr.io",
    "gcr.io",
    "azurecr.io",
    "dkr.ecr.",
    "pkg.dev",
    "docker.io",
    "registry.io",
    "quay.io",
];

/// Patterns that identify classic index.yaml repositories
const TRADITIONAL_INDICATORS: &[&str] = &[
    "github.io",
    "charts.",
    "/charts",
    "/helm",
    "hub.jupyter.org",
    "tigera.io",
];

/// Whether a chart repository URL refers to an OCI registry
pub fn is_oci_registry(repo: &str) -> bool {
    if repo.starts_with("oci://") {
        return true;
    }
    if TRADITIONAL_INDICATORS.iter().any(|p| repo.contains(p)) {
        return false;
    }
    OCI_INDICATORS.iter().any(|p| repo.contains(p))
}

/// Host part of a registry URL: `oci://ghcr.io/org/charts` -> `ghcr.io`
pub fn registry_host(repo: &str) -> &str {
    let without_scheme = repo
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(repo);
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
}

/// Locate the directory `helm pull --untar` extracted into `dest`
pub fn find_extracted_chart(dest: &Path, chart: &str) -> Result<PathBuf> {
    let chart_name = chart.rsplit('/').next().unwrap_or(chart);
    let direct = dest.join(chart_name);
    if direct.is_dir() {
        return Ok(direct);
    }

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dest)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir() && path.file_name().is_some_and(|name| name != HELM_HOME_DIR)
        })
        .collect();
    dirs.sort();

    dirs.into_iter()
        .next()
        .ok_or_else(|| KubeError::ChartNotExtracted {
            chart: chart.to_string(),
            dir: dest.display().to_string(),
        })
}

/// Arguments for `helm install`
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub release: String,
    pub chart: PathBuf,
    pub namespace: String,
    pub values_files: Vec<PathBuf>,
    pub set_values: Vec<(String, String)>,
    pub timeout: String,
    pub dry_run: bool,
}

impl InstallOptions {
    pub fn new(release: impl Into<String>, chart: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            release: release.into(),
            chart: chart.into(),
            namespace: namespace.into(),
            values_files: Vec::new(),
            set_values: Vec::new(),
            timeout: "5m".to_string(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    version: String,
}

/// Thin typed layer over the `helm` binary
pub struct Helm<'a> {
    runner: &'a dyn CommandRunner,
    kube_context: Option<String>,
}

impl<'a> Helm<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            kube_context: None,
        }
    }

    /// Target a kubeconfig context for commands that talk to a cluster
    pub fn with_kube_context(mut self, context: impl Into<String>) -> Self {
        self.kube_context = Some(context.into());
        self
    }

    fn command(&self) -> ToolCommand {
        ToolCommand::new(Tool::Helm)
    }

    fn cluster_command(&self) -> ToolCommand {
        match &self.kube_context {
            Some(ctx) => self.command().args(["--kube-context", ctx.as_str()]),
            None => self.command(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.runner.is_available(Tool::Helm)
    }

    /// Render a chart to a manifest stream
    ///
    /// Values files are applied in order; later files win.
    pub fn template(
        &self,
        release: &str,
        chart: &Path,
        namespace: &str,
        values_files: &[PathBuf],
        cwd: &Path,
    ) -> Result<String> {
        let mut cmd = self
            .command()
            .args(["template", release])
            .path_arg(chart)
            .args(["--namespace", namespace, "--skip-schema-validation"]);
        for file in values_files {
            cmd = cmd.arg("--values").path_arg(file);
        }
        cmd = cmd.arg("--include-crds").current_dir(cwd);
        self.runner.run(&cmd)
    }

    /// `helm lint` on a chart directory
    pub fn lint(&self, chart: &Path, values_files: &[PathBuf]) -> Result<String> {
        let mut cmd = self.command().arg("lint").path_arg(chart);
        for file in values_files {
            cmd = cmd.arg("--values").path_arg(file);
        }
        self.runner.run(&cmd)
    }

    /// `helm install ... --wait`; with `dry_run` nothing reaches the cluster
    pub fn install(&self, opts: &InstallOptions) -> Result<String> {
        let mut cmd = self
            .cluster_command()
            .args(["install", opts.release.as_str()])
            .path_arg(&opts.chart)
            .args(["--namespace", opts.namespace.as_str(), "--create-namespace"]);
        for file in &opts.values_files {
            cmd = cmd.arg("--values").path_arg(file);
        }
        for (key, value) in &opts.set_values {
            cmd = cmd.arg("--set").arg(format!("{}={}", key, value));
        }
        cmd = cmd.args(["--wait", "--timeout", opts.timeout.as_str()]);
        if opts.dry_run {
            cmd = cmd.arg("--dry-run");
        }
        self.runner.run(&cmd)
    }

    pub fn uninstall(&self, release: &str, namespace: &str) -> Result<()> {
        self.runner.run(
            &self
                .cluster_command()
                .args(["uninstall", release, "--namespace", namespace]),
        )?;
        Ok(())
    }

    /// `helm dependency build` inside a chart directory
    pub fn dependency_build(&self, chart_dir: &Path) -> Result<()> {
        self.runner.run(
            &self
                .command()
                .args(["dependency", "build"])
                .path_arg(chart_dir),
        )?;
        Ok(())
    }

    /// Pull and extract a chart from an OCI registry into `dest`
    pub fn pull_oci(&self, repo: &str, chart: &str, version: &str, dest: &Path) -> Result<PathBuf> {
        let base = repo.trim_end_matches('/');
        let reference = if base.starts_with("oci://") {
            format!("{}/{}", base, chart)
        } else {
            format!("oci://{}/{}", base, chart)
        };
        self.runner.run(
            &self
                .command()
                .args(["pull", reference.as_str(), "--version", version, "--destination"])
                .path_arg(dest)
                .arg("--untar"),
        )?;
        find_extracted_chart(dest, chart)
    }

    /// Pull and extract a chart from a classic repository into `dest`
    ///
    /// The repository is registered in an isolated helm config under `dest`
    /// so the user's repository list is left untouched.
    pub fn pull_repo(&self, repo_url: &str, chart: &str, version: &str, dest: &Path) -> Result<PathBuf> {
        let home = dest.join(HELM_HOME_DIR);
        self.add_temp_repo(repo_url, &home)?;
        let reference = format!("{}/{}", TEMP_REPO_NAME, chart);
        let cmd = self
            .isolated(&home)
            .args(["pull", reference.as_str(), "--version", version, "--destination"])
            .path_arg(dest)
            .arg("--untar");
        self.runner.run(&cmd)?;
        find_extracted_chart(dest, chart)
    }

    /// Pull a chart from whichever kind of repository `repo` is
    pub fn pull(&self, repo: &str, chart: &str, version: &str, dest: &Path) -> Result<PathBuf> {
        if is_oci_registry(repo) {
            self.pull_oci(repo, chart, version, dest)
        } else {
            self.pull_repo(repo, chart, version, dest)
        }
    }

    /// Default `values.yaml` of a published chart version
    pub fn show_values(&self, repo: &str, chart: &str, version: &str, work_dir: &Path) -> Result<String> {
        let chart_dir = self.pull(repo, chart, version, work_dir)?;
        let values = chart_dir.join("values.yaml");
        if !values.is_file() {
            return Err(KubeError::ValuesFileNotFound {
                path: values.display().to_string(),
            });
        }
        Ok(std::fs::read_to_string(values)?)
    }

    /// Published versions of a chart, newest first
    ///
    /// `work_dir` holds the isolated repository config.
    pub fn search_versions(
        &self,
        repo: &str,
        chart: &str,
        limit: usize,
        work_dir: &Path,
    ) -> Result<Vec<String>> {
        if is_oci_registry(repo) {
            return Err(KubeError::VersionListingUnsupported);
        }
        let home = work_dir.join(HELM_HOME_DIR);
        self.add_temp_repo(repo, &home)?;

        let reference = format!("{}/{}", TEMP_REPO_NAME, chart);
        let cmd = self
            .isolated(&home)
            .args(["search", "repo", reference.as_str(), "--versions", "-o", "json"]);
        let out = self.runner.run(&cmd)?;
        let entries: Vec<SearchEntry> =
            serde_json::from_str(out.trim()).map_err(|e| KubeError::InvalidOutput {
                command: cmd.to_string(),
                message: e.to_string(),
            })?;

        let mut versions: Vec<String> = entries.into_iter().map(|e| e.version).collect();
        versions.sort_by(|a, b| compare_versions(b, a));
        versions.dedup();
        versions.truncate(limit);
        Ok(versions)
    }

    /// Log in to an OCI registry, passing the password on stdin
    pub fn registry_login(&self, host: &str, username: &str, password: &str) -> Result<()> {
        self.runner.run(
            &self
                .command()
                .args(["registry", "login", host, "--username", username, "--password-stdin"])
                .stdin(password),
        )?;
        debug!(host, "helm registry login succeeded");
        Ok(())
    }

    pub fn registry_logout(&self, host: &str) -> Result<()> {
        self.runner
            .run(&self.command().args(["registry", "logout", host]))?;
        Ok(())
    }

    /// Best-effort login; failures are logged and swallowed
    pub fn ensure_registry_auth(&self, repo: &str, username: &str, password: &str) -> bool {
        let host = registry_host(repo);
        match self.registry_login(host, username, password) {
            Ok(()) => true,
            Err(e) => {
                warn!(host, error = %e, "registry login failed");
                false
            }
        }
    }

    fn isolated(&self, home: &Path) -> ToolCommand {
        self.command()
            .env(
                "HELM_REPOSITORY_CONFIG",
                home.join("repositories.yaml").to_string_lossy(),
            )
            .env("HELM_REPOSITORY_CACHE", home.join("cache").to_string_lossy())
    }

    fn add_temp_repo(&self, url: &str, home: &Path) -> Result<()> {
        std::fs::create_dir_all(home.join("cache"))?;
        self.runner.run(
            &self
                .isolated(home)
                .args(["repo", "add", TEMP_REPO_NAME, url, "--force-update"]),
        )?;
        self.runner
            .run(&self.isolated(home).args(["repo", "update", TEMP_REPO_NAME]))?;
        Ok(())
    }
}

/// Semver-aware ordering; unparseable versions sort below parseable ones
fn compare_versions(a: &str, b: &str) -> std::cmp::Ordering {
    let parse = |v: &str| Version::parse(v.trim_start_matches('v')).ok();
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Greater,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ToolOutput;
    use crate::process::testing::RecordingRunner;

    #[test]
    fn test_oci_detection() {
        assert!(is_oci_registry("oci://anything.example.com/charts"));
        assert!(is_oci_registry("ghcr.io/smloureiro"));
        // classic patterns win over registry hosts
        assert!(!is_oci_registry("ghcr.io/smloureiro/charts"));
        assert!(is_oci_registry("123456789.dkr.ecr.eu-west-1.amazonaws.com"));
        assert!(is_oci_registry("europe-docker.pkg.dev/project/repo"));
        assert!(!is_oci_registry("https://prometheus-community.github.io/helm-charts"));
        assert!(!is_oci_registry("https://charts.bitnami.com/bitnami"));
        assert!(!is_oci_registry("https://example.com/repo"));
    }

    #[test]
    fn test_registry_host() {
        assert_eq!(registry_host("oci://ghcr.io/org/charts"), "ghcr.io");
        assert_eq!(registry_host("ghcr.io/org"), "ghcr.io");
        assert_eq!(registry_host("https://quay.io"), "quay.io");
    }

    #[test]
    fn test_template_arguments() {
        let runner = RecordingRunner::new().respond("helm template", ToolOutput::ok("kind: Service\n"));
        let helm = Helm::new(&runner);
        let out = helm
            .template(
                "api",
                Path::new("charts/web-service"),
                "backend",
                &[PathBuf::from("values/dev.yaml")],
                Path::new("/repo"),
            )
            .unwrap();
        assert_eq!(out, "kind: Service\n");

        let calls = runner.calls();
        assert_eq!(
            calls[0].to_string(),
            "helm template api charts/web-service --namespace backend --skip-schema-validation --values values/dev.yaml --include-crds"
        );
        assert_eq!(calls[0].get_current_dir(), Some(Path::new("/repo")));
    }

    #[test]
    fn test_install_arguments() {
        let runner = RecordingRunner::new();
        let mut opts = InstallOptions::new("smoke", "charts/app", "rita-test");
        opts.set_values.push(("image.tag".into(), "dev".into()));
        opts.dry_run = true;
        Helm::new(&runner).install(&opts).unwrap();
        assert_eq!(
            runner.command_lines(),
            vec![
                "helm install smoke charts/app --namespace rita-test --create-namespace --set image.tag=dev --wait --timeout 5m --dry-run"
            ]
        );
    }

    #[test]
    fn test_kube_context_only_on_cluster_commands() {
        let runner = RecordingRunner::new();
        let helm = Helm::new(&runner).with_kube_context("kind-smoke");
        helm.uninstall("smoke", "rita-test").unwrap();
        helm.lint(Path::new("charts/app"), &[]).unwrap();
        assert_eq!(
            runner.command_lines(),
            vec![
                "helm --kube-context kind-smoke uninstall smoke --namespace rita-test",
                "helm lint charts/app",
            ]
        );
    }

    #[test]
    fn test_pull_oci_does_not_double_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("web-service")).unwrap();
        let runner = RecordingRunner::new();
        let helm = Helm::new(&runner);

        let chart = helm
            .pull_oci("oci://ghcr.io/org/charts/", "web-service", "1.0.0", dir.path())
            .unwrap();
        assert_eq!(chart, dir.path().join("web-service"));
        helm.pull_oci("ghcr.io/org/charts", "web-service", "1.0.0", dir.path())
            .unwrap();

        let lines = runner.command_lines();
        assert!(lines[0].starts_with("helm pull oci://ghcr.io/org/charts/web-service --version 1.0.0"));
        assert!(lines[1].starts_with("helm pull oci://ghcr.io/org/charts/web-service --version 1.0.0"));
    }

    #[test]
    fn test_pull_repo_uses_isolated_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("redis")).unwrap();
        let runner = RecordingRunner::new();
        Helm::new(&runner)
            .pull("https://charts.bitnami.com/bitnami", "redis", "18.0.0", dir.path())
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].to_string().starts_with("helm repo add rita-temp-repo https://charts.bitnami.com/bitnami"));
        assert_eq!(calls[1].to_string(), "helm repo update rita-temp-repo");
        assert!(calls[2].to_string().starts_with("helm pull rita-temp-repo/redis --version 18.0.0"));
        for call in &calls {
            let keys: Vec<&str> = call.get_env().iter().map(|(k, _)| k.as_str()).collect();
            assert_eq!(keys, vec!["HELM_REPOSITORY_CONFIG", "HELM_REPOSITORY_CACHE"]);
        }
    }

    #[test]
    fn test_show_values_reads_pulled_chart() {
        let dir = tempfile::tempdir().unwrap();
        let chart = dir.path().join("web-service");
        std::fs::create_dir(&chart).unwrap();
        std::fs::write(chart.join("values.yaml"), "replicaCount: 1\n").unwrap();

        let runner = RecordingRunner::new();
        let values = Helm::new(&runner)
            .show_values("oci://ghcr.io/org", "web-service", "1.2.0", dir.path())
            .unwrap();
        assert_eq!(values, "replicaCount: 1\n");
    }

    #[test]
    fn test_find_extracted_chart_skips_helm_home() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(HELM_HOME_DIR)).unwrap();
        assert!(matches!(
            find_extracted_chart(dir.path(), "org/thing"),
            Err(KubeError::ChartNotExtracted { .. })
        ));
        std::fs::create_dir(dir.path().join("renamed")).unwrap();
        assert_eq!(
            find_extracted_chart(dir.path(), "org/thing").unwrap(),
            dir.path().join("renamed")
        );
    }

    #[test]
    fn test_search_versions_sorted_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"[{"name":"rita-temp-repo/redis","version":"1.9.0"},
                       {"name":"rita-temp-repo/redis","version":"1.10.0"},
                       {"name":"rita-temp-repo/redis","version":"0.2.1"}]"#;
        let runner = RecordingRunner::new().respond("helm search repo", ToolOutput::ok(json));
        let versions = Helm::new(&runner)
            .search_versions("https://charts.example.com", "redis", 2, dir.path())
            .unwrap();
        assert_eq!(versions, vec!["1.10.0", "1.9.0"]);
    }

    #[test]
    fn test_search_versions_rejects_oci() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RecordingRunner::new();
        let err = Helm::new(&runner)
            .search_versions("oci://ghcr.io/org", "app", 10, dir.path())
            .unwrap_err();
        assert!(matches!(err, KubeError::VersionListingUnsupported));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_registry_login_failure_is_soft() {
        let runner = RecordingRunner::new()
            .respond("helm registry login", ToolOutput::failed(1, "denied"));
        let helm = Helm::new(&runner);
        assert!(!helm.ensure_registry_auth("oci://ghcr.io/org", "me", "token"));
        let calls = runner.calls();
        assert_eq!(
            calls[0].to_string(),
            "helm registry login ghcr.io --username me --password-stdin"
        );
        assert_eq!(calls[0].get_stdin(), Some("token"));
    }
}
