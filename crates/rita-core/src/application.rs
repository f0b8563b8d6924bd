//! ArgoCD Application discovery
//!
//! Applications are read from the environment search paths. Only the
//! information needed to render an application locally is kept: the chart
//! source, values files, inline values and any Kustomize or plain-manifest
//! sources.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as YamlValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;

/// Prefix ArgoCD uses for values files taken from a `ref: values` source
const VALUES_REF_PREFIX: &str = "$values/";

const KUSTOMIZATION_FILES: &[&str] = &["kustomization.yaml", "kustomization.yml", "Kustomization"];

/// A single ArgoCD Application
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Application {
    pub name: String,

    /// Repository URL of the Helm source
    pub chart_repo: String,

    /// Chart name as written in the Helm source (may contain `/`)
    pub chart_name: String,

    pub chart_version: String,

    /// Values files relative to the repository root
    pub values_files: Vec<String>,

    pub namespace: String,

    pub release_name: String,

    /// Whether the chart exists under the local charts directory
    pub is_local_chart: bool,

    pub source_file: PathBuf,

    /// Inline values (`helm.valuesObject`)
    pub values_object: Option<serde_json::Value>,

    /// Kustomize directory, relative to the repository root
    pub kustomize_path: Option<String>,

    /// Directory of plain manifests, relative to the repository root
    pub plain_manifests_path: Option<String>,
}

impl Application {
    /// Last path segment of the chart name, the directory name of a local chart
    pub fn local_chart_name(&self) -> &str {
        self.chart_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.chart_name)
    }

    /// Whether this application has a Helm chart source
    pub fn has_chart(&self) -> bool {
        !self.chart_name.is_empty()
    }

    /// Short description of the source kinds, e.g. `helm+kustomize`
    pub fn source_kinds(&self) -> String {
        let mut kinds = Vec::new();
        if self.has_chart() {
            kinds.push("helm");
        }
        if self.kustomize_path.is_some() {
            kinds.push("kustomize");
        }
        if self.plain_manifests_path.is_some() {
            kinds.push("manifests");
        }
        kinds.join("+")
    }
}

/// Parse the first `kind: Application` document of a file
///
/// Files that cannot be read or parsed, and files without an Application,
/// yield `None`: application directories routinely contain other manifests.
pub fn parse_application(path: &Path, repo_root: &Path, charts_dir: &Path) -> Option<Application> {
    let content = std::fs::read_to_string(path).ok()?;
    let doc = find_application_document(&content)?;
    from_document(&doc, path, repo_root, charts_dir)
}

fn find_application_document(content: &str) -> Option<YamlValue> {
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = match YamlValue::deserialize(document) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparsable YAML");
                return None;
            }
        };
        if value.get("kind").and_then(YamlValue::as_str) == Some("Application") {
            return Some(value);
        }
    }
    None
}

fn str_at<'a>(value: &'a YamlValue, key: &str) -> Option<&'a str> {
    value.get(key).and_then(YamlValue::as_str)
}

fn from_document(
    doc: &YamlValue,
    source_file: &Path,
    repo_root: &Path,
    charts_dir: &Path,
) -> Option<Application> {
    let name = doc
        .get("metadata")
        .and_then(|m| str_at(m, "name"))?
        .to_string();
    let spec = doc.get("spec")?;

    let namespace = spec
        .get("destination")
        .and_then(|d| str_at(d, "namespace"))
        .unwrap_or("default")
        .to_string();

    let sources: Vec<&YamlValue> = match spec.get("sources").and_then(YamlValue::as_sequence) {
        Some(list) => list.iter().collect(),
        None => spec.get("source").into_iter().collect(),
    };

    let helm_source = sources.iter().find(|s| s.get("chart").is_some());

    let mut kustomize_path = None;
    let mut plain_manifests_path = None;
    for source in sources
        .iter()
        .filter(|s| s.get("path").is_some() && s.get("ref").is_none())
    {
        let Some(path) = str_at(source, "path") else {
            continue;
        };
        let dir = repo_root.join(path);
        if KUSTOMIZATION_FILES.iter().any(|f| dir.join(f).is_file()) {
            kustomize_path.get_or_insert_with(|| path.to_string());
        } else {
            plain_manifests_path.get_or_insert_with(|| path.to_string());
        }
    }

    if helm_source.is_none() && kustomize_path.is_none() && plain_manifests_path.is_none() {
        return None;
    }

    let mut app = Application {
        release_name: name.clone(),
        name,
        chart_repo: String::new(),
        chart_name: String::new(),
        chart_version: String::new(),
        values_files: Vec::new(),
        namespace,
        is_local_chart: false,
        source_file: source_file.to_path_buf(),
        values_object: None,
        kustomize_path,
        plain_manifests_path,
    };

    if let Some(source) = helm_source {
        app.chart_repo = str_at(source, "repoURL").unwrap_or_default().to_string();
        app.chart_name = str_at(source, "chart").unwrap_or_default().to_string();
        app.chart_version = str_at(source, "targetRevision")
            .unwrap_or("latest")
            .to_string();

        if let Some(helm) = source.get("helm") {
            if let Some(release) = str_at(helm, "releaseName") {
                app.release_name = release.to_string();
            }
            app.values_files = helm
                .get("valueFiles")
                .and_then(YamlValue::as_sequence)
                .map(|files| {
                    files
                        .iter()
                        .filter_map(YamlValue::as_str)
                        .map(|f| f.strip_prefix(VALUES_REF_PREFIX).unwrap_or(f).to_string())
                        .collect()
                })
                .unwrap_or_default();
            app.values_object = helm
                .get("valuesObject")
                .and_then(|v| serde_json::to_value(v).ok());
        }

        app.is_local_chart = charts_dir.join(app.local_chart_name()).is_dir();
    }

    Some(app)
}

fn is_argo_kind(doc: &YamlValue, kind: &str) -> bool {
    str_at(doc, "kind") == Some(kind)
        && str_at(doc, "apiVersion").is_some_and(|v| v.contains("argoproj.io"))
}

/// An ArgoCD ApplicationSet with its list generators expanded
///
/// Only `list` generators are expanded; other generators depend on cluster
/// or SCM state and are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationSet {
    pub name: String,

    /// Template parameters, one map per list element
    pub elements: Vec<BTreeMap<String, String>>,

    template: YamlValue,
}

impl ApplicationSet {
    /// Read an `ApplicationSet` document, `None` for any other document
    pub fn parse(doc: &YamlValue) -> Option<Self> {
        if !is_argo_kind(doc, "ApplicationSet") {
            return None;
        }
        let name = doc
            .get("metadata")
            .and_then(|m| str_at(m, "name"))
            .unwrap_or_default()
            .to_string();
        let spec = doc.get("spec")?;

        let mut elements = Vec::new();
        for generator in spec
            .get("generators")
            .and_then(YamlValue::as_sequence)
            .into_iter()
            .flatten()
        {
            let Some(list) = generator.get("list") else {
                tracing::debug!(appset = %name, "skipping non-list generator");
                continue;
            };
            for element in list
                .get("elements")
                .and_then(YamlValue::as_sequence)
                .into_iter()
                .flatten()
            {
                let mut params = BTreeMap::new();
                flatten_parameters(element, "", &mut params);
                elements.push(params);
            }
        }

        Some(Self {
            name,
            elements,
            template: spec.get("template").cloned().unwrap_or(YamlValue::Null),
        })
    }

    /// One Application per element, with `{{param}}` placeholders substituted
    ///
    /// An element's `name` parameter names the Application when the template
    /// sets no `metadata.name`.
    pub fn applications(
        &self,
        source_file: &Path,
        repo_root: &Path,
        charts_dir: &Path,
    ) -> Vec<Application> {
        self.elements
            .iter()
            .filter_map(|params| {
                let template = substitute_yaml(&self.template, params);
                let mut metadata = template
                    .get("metadata")
                    .cloned()
                    .unwrap_or_else(|| YamlValue::Mapping(Mapping::new()));
                if str_at(&metadata, "name").is_none() {
                    if let (Some(map), Some(name)) = (metadata.as_mapping_mut(), params.get("name")) {
                        map.insert("name".into(), name.as_str().into());
                    }
                }

                let mut doc = Mapping::new();
                doc.insert("kind".into(), "Application".into());
                doc.insert("metadata".into(), metadata);
                doc.insert(
                    "spec".into(),
                    template.get("spec").cloned().unwrap_or(YamlValue::Null),
                );
                let app = from_document(&YamlValue::Mapping(doc), source_file, repo_root, charts_dir);
                if app.is_none() {
                    tracing::debug!(appset = %self.name, ?params, "element produced no renderable application");
                }
                app
            })
            .collect()
    }
}

fn flatten_parameters(value: &YamlValue, prefix: &str, out: &mut BTreeMap<String, String>) {
    match value {
        YamlValue::Mapping(map) => {
            for (key, child) in map {
                let Some(key) = key.as_str() else { continue };
                let key = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_parameters(child, &key, out);
            }
        }
        YamlValue::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        YamlValue::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        YamlValue::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        _ => {}
    }
}

/// Replace `{{param}}`, `{{ param }}` and `{{.param}}` with parameter values
///
/// Unknown parameters are left as written.
pub fn substitute_parameters(text: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        let key = rest[start + 2..start + 2 + len].trim();
        let key = key.strip_prefix('.').unwrap_or(key);
        out.push_str(&rest[..start]);
        match params.get(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + len + 2]),
        }
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    out
}

fn substitute_yaml(value: &YamlValue, params: &BTreeMap<String, String>) -> YamlValue {
    match value {
        YamlValue::String(s) => YamlValue::String(substitute_parameters(s, params)),
        YamlValue::Sequence(items) => {
            YamlValue::Sequence(items.iter().map(|v| substitute_yaml(v, params)).collect())
        }
        YamlValue::Mapping(map) => YamlValue::Mapping(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_yaml(v, params)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// ArgoCD resources found in a rendered stream (the app-of-apps pattern)
#[derive(Debug, Clone, Default)]
pub struct NestedResources {
    pub applications: Vec<Application>,
    pub application_sets: Vec<ApplicationSet>,
}

impl NestedResources {
    /// Scan `stream` for `Application` and `ApplicationSet` documents
    ///
    /// Unparsable streams yield nothing. `source_file` is recorded on every
    /// application found, typically the file of the parent application.
    pub fn scan(stream: &str, source_file: &Path, repo_root: &Path, charts_dir: &Path) -> Self {
        let mut found = Self::default();
        for document in serde_yaml::Deserializer::from_str(stream) {
            let Ok(doc) = YamlValue::deserialize(document) else {
                return Self::default();
            };
            if is_argo_kind(&doc, "Application") {
                if let Some(app) = from_document(&doc, source_file, repo_root, charts_dir) {
                    found.applications.push(app);
                }
            } else if let Some(set) = ApplicationSet::parse(&doc) {
                found.application_sets.push(set);
            }
        }
        found
    }

    /// Applications and the expansion of every ApplicationSet, in document order
    pub fn expand(&self, source_file: &Path, repo_root: &Path, charts_dir: &Path) -> Vec<Application> {
        let mut apps = self.applications.clone();
        for set in &self.application_sets {
            apps.extend(set.applications(source_file, repo_root, charts_dir));
        }
        apps
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty() && self.application_sets.is_empty()
    }
}

/// Include/exclude filter applied to candidate application files
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Vec<glob::Pattern>,
    exclude: Vec<glob::Pattern>,
}

impl FileFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<glob::Pattern>> {
            patterns
                .iter()
                .map(|p| glob::Pattern::new(p).map_err(Into::into))
                .collect()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Match a path given relative to the parent of the search directory,
    /// so that `**/` patterns always have a directory to anchor on
    pub fn accepts(&self, relative: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| p.matches(relative));
        included && !self.exclude.iter().any(|p| p.matches(relative))
    }
}

/// Discover applications below `search_paths`, sorted by name
pub fn discover_applications(
    search_paths: &[PathBuf],
    filter: &FileFilter,
    repo_root: &Path,
    charts_dir: &Path,
) -> Result<Vec<Application>> {
    let mut apps = Vec::new();

    for search_path in search_paths {
        if !search_path.is_dir() {
            tracing::debug!(path = %search_path.display(), "search path does not exist");
            continue;
        }
        let anchor = search_path.parent().unwrap_or(search_path);

        for entry in WalkDir::new(search_path).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(anchor)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            if !filter.accepts(&relative) {
                continue;
            }
            if let Some(app) = parse_application(entry.path(), repo_root, charts_dir) {
                tracing::debug!(app = %app.name, file = %relative, "found application");
                apps.push(app);
            }
        }
    }

    apps.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(apps)
}

/// Applications touched by a set of changed files (paths relative to the repo root)
pub fn find_affected_apps<'a>(
    changed_files: &[String],
    apps: &'a [Application],
    charts_path: &str,
) -> Vec<&'a Application> {
    let charts_prefix = format!("{}/", charts_path.trim_end_matches('/'));

    apps.iter()
        .filter(|app| {
            changed_files.iter().any(|file| {
                let chart_changed = app.is_local_chart
                    && file.starts_with(&format!("{}{}/", charts_prefix, app.local_chart_name()));
                let app_dir_changed = file.starts_with(&format!("kubernetes/{}/", app.name));
                let values_changed = app.values_files.iter().any(|v| v == file);
                let source_changed = [&app.kustomize_path, &app.plain_manifests_path]
                    .into_iter()
                    .flatten()
                    .any(|dir| file.starts_with(&format!("{}/", dir.trim_end_matches('/'))));
                chart_changed || app_dir_changed || values_changed || source_changed
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELM_APP: &str = r#"
apiVersion: argoproj.io/v1alpha1
kind: Application
metadata:
  name: backend
  namespace: argocd
spec:
  destination:
    namespace: apps
  sources:
    - repoURL: ghcr.io/smloureiro/charts
      chart: charts/web-service
      targetRevision: 1.2.0
      helm:
        releaseName: backend-release
        valueFiles:
          - $values/kubernetes/backend/values-dev.yaml
        valuesObject:
          replicaCount: 2
    - repoURL: https://github.com/smloureiro/deploy
      ref: values
"#;

    fn layout() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("charts/web-service")).unwrap();
        dir
    }

    #[test]
    fn test_parse_helm_application() {
        let dir = layout();
        let file = dir.path().join("backend.yaml");
        std::fs::write(&file, HELM_APP).unwrap();

        let app = parse_application(&file, dir.path(), &dir.path().join("charts")).unwrap();
        assert_eq!(app.name, "backend");
        assert_eq!(app.namespace, "apps");
        assert_eq!(app.chart_name, "charts/web-service");
        assert_eq!(app.local_chart_name(), "web-service");
        assert_eq!(app.chart_version, "1.2.0");
        assert_eq!(app.release_name, "backend-release");
        assert_eq!(app.values_files, vec!["kubernetes/backend/values-dev.yaml"]);
        assert_eq!(app.values_object.as_ref().unwrap()["replicaCount"], 2);
        assert!(app.is_local_chart);
        assert_eq!(app.source_kinds(), "helm");
    }

    #[test]
    fn test_parse_defaults_and_single_source() {
        let dir = layout();
        let file = dir.path().join("redis.yaml");
        std::fs::write(
            &file,
            r#"
kind: ConfigMap
metadata:
  name: not-an-app
---
kind: Application
metadata:
  name: redis
spec:
  source:
    repoURL: https://charts.bitnami.com/bitnami
    chart: redis
"#,
        )
        .unwrap();

        let app = parse_application(&file, dir.path(), &dir.path().join("charts")).unwrap();
        assert_eq!(app.name, "redis");
        assert_eq!(app.namespace, "default");
        assert_eq!(app.chart_version, "latest");
        assert_eq!(app.release_name, "redis");
        assert!(!app.is_local_chart);
    }

    #[test]
    fn test_parse_kustomize_and_plain_sources() {
        let dir = layout();
        std::fs::create_dir_all(dir.path().join("kubernetes/crds")).unwrap();
        std::fs::write(dir.path().join("kubernetes/crds/kustomization.yaml"), "").unwrap();
        std::fs::create_dir_all(dir.path().join("kubernetes/extra")).unwrap();

        let file = dir.path().join("infra.yaml");
        std::fs::write(
            &file,
            r#"
kind: Application
metadata:
  name: infra
spec:
  sources:
    - repoURL: https://github.com/smloureiro/deploy
      path: kubernetes/crds
    - repoURL: https://github.com/smloureiro/deploy
      path: kubernetes/extra
"#,
        )
        .unwrap();

        let app = parse_application(&file, dir.path(), &dir.path().join("charts")).unwrap();
        assert!(!app.has_chart());
        assert_eq!(app.kustomize_path.as_deref(), Some("kubernetes/crds"));
        assert_eq!(app.plain_manifests_path.as_deref(), Some("kubernetes/extra"));
        assert_eq!(app.source_kinds(), "kustomize+manifests");
    }

    #[test]
    fn test_unparsable_or_foreign_files_are_skipped() {
        let dir = layout();
        let charts = dir.path().join("charts");

        let templated = dir.path().join("templated.yaml");
        std::fs::write(&templated, "kind: Application\nmetadata: {{ .Values.x }\n").unwrap();
        assert!(parse_application(&templated, dir.path(), &charts).is_none());

        let no_source = dir.path().join("empty.yaml");
        std::fs::write(&no_source, "kind: Application\nmetadata:\n  name: x\nspec: {}\n").unwrap();
        assert!(parse_application(&no_source, dir.path(), &charts).is_none());
    }

    #[test]
    fn test_discover_honours_patterns_and_sorts() {
        let dir = layout();
        let apps_dir = dir.path().join("apps/dev/templates");
        std::fs::create_dir_all(apps_dir.join("secrets")).unwrap();

        let app = |name: &str| {
            format!(
                "kind: Application\nmetadata:\n  name: {}\nspec:\n  source:\n    chart: web-service\n",
                name
            )
        };
        std::fs::write(apps_dir.join("zeta.yaml"), app("zeta")).unwrap();
        std::fs::write(apps_dir.join("alpha.yml"), app("alpha")).unwrap();
        std::fs::write(apps_dir.join("notes.txt"), app("ignored-ext")).unwrap();
        std::fs::write(apps_dir.join("secrets/hidden.yaml"), app("hidden")).unwrap();

        let filter = FileFilter::new(
            &["**/*.yaml".to_string(), "**/*.yml".to_string()],
            &["**/secrets/**".to_string()],
        )
        .unwrap();
        let apps = discover_applications(
            &[apps_dir, dir.path().join("missing")],
            &filter,
            dir.path(),
            &dir.path().join("charts"),
        )
        .unwrap();

        let names: Vec<&str> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(apps.iter().all(|a| a.is_local_chart));
    }

    #[test]
    fn test_find_affected_apps() {
        let dir = layout();
        let file = dir.path().join("backend.yaml");
        std::fs::write(&file, HELM_APP).unwrap();
        let backend = parse_application(&file, dir.path(), &dir.path().join("charts")).unwrap();

        let mut frontend = backend.clone();
        frontend.name = "frontend".to_string();
        frontend.chart_name = "redis".to_string();
        frontend.is_local_chart = false;
        frontend.values_files = vec![];

        let apps = vec![backend, frontend];

        let changed = vec!["charts/web-service/templates/deployment.yaml".to_string()];
        let affected = find_affected_apps(&changed, &apps, "charts");
        assert_eq!(affected.len(), 1);
        assert_eq!(affected[0].name, "backend");

        let changed = vec!["kubernetes/frontend/config.yaml".to_string()];
        let affected = find_affected_apps(&changed, &apps, "charts");
        assert_eq!(affected[0].name, "frontend");

        let changed = vec!["kubernetes/backend/values-dev.yaml".to_string()];
        assert_eq!(find_affected_apps(&changed, &apps, "charts").len(), 1);

        let changed = vec!["README.md".to_string()];
        assert!(find_affected_apps(&changed, &apps, "charts").is_empty());
    }

    const APP_OF_APPS: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
---
apiVersion: app.k8s.io/v1beta1
kind: Application
metadata:
  name: not-argo
---
apiVersion: argoproj.io/v1alpha1
kind: Application
metadata:
  name: child
spec:
  destination:
    namespace: child-ns
  source:
    repoURL: ghcr.io/acme/charts
    chart: charts/web-service
    targetRevision: 1.0.0
---
apiVersion: argoproj.io/v1alpha1
kind: ApplicationSet
metadata:
  name: stack
spec:
  generators:
    - list:
        elements:
          - name: api
            version: 1.2.0
            tier: { replicas: 3 }
          - name: worker
            version: 2.0.0
    - clusters: {}
  template:
    metadata:
      name: '{{name}}'
    spec:
      destination:
        namespace: 'stack-{{ name }}'
      sources:
        - repoURL: ghcr.io/acme/charts
          chart: charts/{{.name}}
          targetRevision: '{{version}}'
          helm:
            releaseName: '{{name}}-{{unknown}}'
            valueFiles:
              - $values/kubernetes/{{name}}/values.yaml
"#;

    #[test]
    fn test_substitute_parameters() {
        let params: BTreeMap<String, String> = [("name", "api"), ("tier.replicas", "3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(substitute_parameters("{{name}}-{{ .tier.replicas }}", &params), "api-3");
        assert_eq!(substitute_parameters("{{missing}}/{{name}}", &params), "{{missing}}/api");
        assert_eq!(substitute_parameters("open {{name", &params), "open {{name");
    }

    #[test]
    fn test_scan_nested_resources() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("charts/web-service")).unwrap();
        let source = dir.path().join("apps/root.yaml");
        let charts = dir.path().join("charts");

        let nested = NestedResources::scan(APP_OF_APPS, &source, dir.path(), &charts);
        assert!(!nested.is_empty());
        assert_eq!(nested.applications.len(), 1);
        assert_eq!(nested.applications[0].name, "child");
        assert!(nested.applications[0].is_local_chart);
        assert_eq!(nested.application_sets.len(), 1);
        assert_eq!(nested.application_sets[0].elements.len(), 2);
        assert_eq!(nested.application_sets[0].elements[0]["tier.replicas"], "3");

        let apps = nested.expand(&source, dir.path(), &charts);
        let names: Vec<&str> = apps.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["child", "api", "worker"]);

        let api = &apps[1];
        assert_eq!(api.namespace, "stack-api");
        assert_eq!(api.chart_name, "charts/api");
        assert_eq!(api.chart_version, "1.2.0");
        assert_eq!(api.release_name, "api-{{unknown}}");
        assert_eq!(api.values_files, vec!["kubernetes/api/values.yaml"]);
        assert_eq!(api.source_file, source);
        assert!(!api.is_local_chart);
        assert_eq!(apps[2].chart_version, "2.0.0");
    }

    #[test]
    fn test_application_set_name_from_element() {
        let doc: YamlValue = serde_yaml::from_str(
            r#"
apiVersion: argoproj.io/v1alpha1
kind: ApplicationSet
metadata:
  name: jobs
spec:
  generators:
    - list:
        elements:
          - name: nightly
  template:
    spec:
      source:
        repoURL: ghcr.io/acme/charts
        chart: cronjob
"#,
        )
        .unwrap();
        let set = ApplicationSet::parse(&doc).unwrap();
        let apps = set.applications(Path::new("a.yaml"), Path::new("/repo"), Path::new("/repo/charts"));
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "nightly");
        assert_eq!(apps[0].chart_version, "latest");
    }

    #[test]
    fn test_scan_unparsable_stream() {
        let nested = NestedResources::scan("a: [1", Path::new("a.yaml"), Path::new("."), Path::new("charts"));
        assert!(nested.is_empty());
    }
}
