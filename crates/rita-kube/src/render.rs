//! Manifest rendering for ArgoCD applications
//!
//! An application may combine a Helm chart, a Kustomize directory and a
//! directory of plain manifests; each source is rendered and the results are
//! joined into a single stream.
//!
//! Applications that produce further ArgoCD Applications or ApplicationSets
//! (app-of-apps) can be rendered recursively with [`Renderer::render_nested`].

use std::fmt;
use std::path::{Path, PathBuf};

use rita_core::manifest::{ALL_MANIFESTS_FILE, write_rendered};
use rita_core::{Application, NestedResources, Workspace};
use serde::Deserialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::credentials::resolve_registry_credentials;
use crate::error::{KubeError, Result};
use crate::helm::{Helm, is_oci_registry};
use crate::kubectl::Kubectl;
use crate::process::CommandRunner;

/// File holding an application's inline `valuesObject` during rendering
const VALUES_OBJECT_FILE: &str = "values-object.yaml";

/// Depth at which nested applications stop being expanded; the root is depth 0
pub const MAX_NESTING_DEPTH: usize = 5;

#[derive(Debug, Default, Deserialize)]
struct ChartMetadata {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    dependencies: Vec<ChartDependency>,
}

#[derive(Debug, Deserialize)]
struct ChartDependency {
    #[serde(default)]
    repository: Option<String>,
}

fn read_chart_metadata(chart_dir: &Path) -> Option<ChartMetadata> {
    let content = std::fs::read_to_string(chart_dir.join("Chart.yaml")).ok()?;
    serde_yaml::from_str(&content).ok()
}

/// `version` field of a chart's `Chart.yaml`
pub fn local_chart_version(chart_dir: &Path) -> Option<String> {
    read_chart_metadata(chart_dir).and_then(|meta| meta.version)
}

/// Whether `charts/` already holds packaged dependencies
pub fn has_packaged_dependencies(chart_dir: &Path) -> bool {
    std::fs::read_dir(chart_dir.join("charts"))
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.path().extension().is_some_and(|ext| ext == "tgz"))
        })
        .unwrap_or(false)
}

fn copy_dir(source: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Copy `file://` dependencies next to a copied chart, recursively
///
/// Dependency paths are resolved against the chart's original location, so
/// `file://../postgresql` keeps working from the temporary copy.
fn copy_file_dependencies(original: &Path, temp_root: &Path) -> Result<()> {
    let Some(meta) = read_chart_metadata(original) else {
        return Ok(());
    };
    for dep in meta.dependencies {
        let Some(relative) = dep
            .repository
            .as_deref()
            .and_then(|r| r.strip_prefix("file://"))
        else {
            continue;
        };
        let Ok(source) = original.join(relative).canonicalize() else {
            continue;
        };
        let Some(name) = source.file_name() else {
            continue;
        };
        let dest = temp_root.join(name);
        if source.is_dir() && !dest.exists() {
            debug!(dependency = %source.display(), "copying file dependency");
            copy_dir(&source, &dest)?;
            copy_file_dependencies(&source, temp_root)?;
        }
    }
    Ok(())
}

/// Where the chart used for rendering came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartOrigin {
    /// Working copy under the charts directory
    Local { version: String },
    /// Pulled from an OCI registry
    Oci { version: String },
    /// Pulled from a classic Helm repository
    Repository { version: String },
}

impl fmt::Display for ChartOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartOrigin::Local { version } => write!(f, "local chart v{}", version),
            ChartOrigin::Oci { version } => write!(f, "pulled from OCI v{}", version),
            ChartOrigin::Repository { version } => write!(f, "pulled from Helm repo v{}", version),
        }
    }
}

/// A chart ready for `helm template`, living in a temporary directory
pub struct PreparedChart {
    pub path: PathBuf,
    pub origin: ChartOrigin,
}

/// Result of rendering one application
#[derive(Debug)]
pub struct Rendered {
    pub stream: String,
    /// Set when a Helm source was rendered
    pub origin: Option<ChartOrigin>,
}

/// Summary of rendering one application to disk
#[derive(Debug)]
pub struct RenderSummary {
    /// Documents written, nested applications included
    pub documents: usize,
    pub origin: Option<ChartOrigin>,
    /// Nested applications rendered, at any depth
    pub nested: usize,
    /// `app: message` for each nested application that could not be rendered
    pub nested_errors: Vec<String>,
}

impl fmt::Display for RenderSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} resources", self.documents)?;
        if let Some(origin) = &self.origin {
            write!(f, " ({})", origin)?;
        }
        if self.nested > 0 {
            write!(f, ", {} nested application(s)", self.nested)?;
        }
        Ok(())
    }
}

/// An application rendered together with the applications it produces
#[derive(Debug)]
pub struct NestedRender {
    pub name: String,
    pub rendered: Rendered,
    pub children: Vec<NestedRender>,
    /// `app: message` for nested applications of this node that failed
    pub errors: Vec<String>,
}

impl NestedRender {
    /// This application's stream followed by every nested stream, depth first
    ///
    /// Each nested stream starts with a `# === name ===` comment.
    pub fn combined(&self) -> String {
        if self.children.is_empty() {
            return self.rendered.stream.clone();
        }
        let mut parts = vec![self.rendered.stream.trim_end().to_string()];
        for child in &self.children {
            parts.push(format!("# === {} ===\n{}", child.name, child.combined().trim_end()));
        }
        let mut out = parts.join("\n---\n");
        out.push('\n');
        out
    }

    /// Nested applications rendered below this one, at any depth
    pub fn nested_count(&self) -> usize {
        self.children.iter().map(|c| 1 + c.nested_count()).sum()
    }

    /// Errors of this node and every nested node
    pub fn all_errors(&self) -> Vec<String> {
        let mut errors = self.errors.clone();
        for child in &self.children {
            errors.extend(child.all_errors());
        }
        errors
    }

    /// Write per-kind files, one subdirectory per nested application, and
    /// the combined stream as `_all.yaml`. Returns the document count.
    pub fn write_to(&self, dir: &Path) -> Result<usize> {
        let mut documents = write_rendered(&self.rendered.stream, dir)?;
        for child in &self.children {
            documents += child.write_to(&dir.join(&child.name))?;
        }
        if !self.children.is_empty() {
            std::fs::write(dir.join(ALL_MANIFESTS_FILE), self.combined())?;
        }
        Ok(documents)
    }
}

/// Names of nested applications become directory names
fn is_valid_nested_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// Renders applications of a workspace
pub struct Renderer<'a> {
    runner: &'a dyn CommandRunner,
    workspace: &'a Workspace,
}

impl<'a> Renderer<'a> {
    pub fn new(runner: &'a dyn CommandRunner, workspace: &'a Workspace) -> Self {
        Self { runner, workspace }
    }

    fn helm(&self) -> Helm<'a> {
        Helm::new(self.runner)
    }

    /// Make the chart of `app` available under `temp`
    ///
    /// A local chart whose `Chart.yaml` version equals the application's
    /// target revision is rendered from the working copy; any other version
    /// is pulled from the registry the application points at.
    pub fn prepare_chart(&self, app: &Application, temp: &Path) -> Result<PreparedChart> {
        if app.is_local_chart {
            let local_dir = self.workspace.chart_dir(app.local_chart_name());
            let local_version = local_chart_version(&local_dir);
            if local_version.as_deref() == Some(app.chart_version.as_str()) {
                return self.prepare_local(app, &local_dir, temp);
            }
            debug!(
                app = %app.name,
                local = ?local_version,
                wanted = %app.chart_version,
                "local chart version differs, pulling published chart"
            );
            self.login_for(&app.chart_repo);
            let path = self.helm().pull_oci(
                &app.chart_repo,
                app.local_chart_name(),
                &app.chart_version,
                temp,
            )?;
            return Ok(PreparedChart {
                path,
                origin: ChartOrigin::Oci {
                    version: app.chart_version.clone(),
                },
            });
        }

        let version = app.chart_version.clone();
        if is_oci_registry(&app.chart_repo) {
            self.login_for(&app.chart_repo);
            let path = self
                .helm()
                .pull_oci(&app.chart_repo, &app.chart_name, &version, temp)?;
            Ok(PreparedChart {
                path,
                origin: ChartOrigin::Oci { version },
            })
        } else {
            let path = self
                .helm()
                .pull_repo(&app.chart_repo, &app.chart_name, &version, temp)?;
            Ok(PreparedChart {
                path,
                origin: ChartOrigin::Repository { version },
            })
        }
    }

    fn prepare_local(&self, app: &Application, local_dir: &Path, temp: &Path) -> Result<PreparedChart> {
        if !local_dir.join("Chart.yaml").is_file() {
            return Err(KubeError::ChartNotFound {
                path: local_dir.display().to_string(),
            });
        }
        let copy = temp.join(app.local_chart_name());
        copy_dir(local_dir, &copy)?;
        copy_file_dependencies(local_dir, temp)?;

        if !has_packaged_dependencies(&copy) {
            self.helm().dependency_build(&copy)?;
        }

        Ok(PreparedChart {
            path: copy,
            origin: ChartOrigin::Local {
                version: app.chart_version.clone(),
            },
        })
    }

    /// Best-effort registry login with configured credentials
    fn login_for(&self, repo: &str) {
        if let Some(creds) = resolve_registry_credentials(self.runner, &self.workspace.config, repo) {
            self.helm()
                .ensure_registry_auth(repo, &creds.username, &creds.password);
        }
    }

    /// Absolute values files of `app`, failing on the first missing one
    fn values_files(&self, app: &Application) -> Result<Vec<PathBuf>> {
        app.values_files
            .iter()
            .map(|file| {
                let path = self.workspace.root.join(file);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(KubeError::ValuesFileNotFound {
                        path: path.display().to_string(),
                    })
                }
            })
            .collect()
    }

    /// Render the Helm source of `app`
    pub fn render_helm(&self, app: &Application) -> Result<(String, ChartOrigin)> {
        let mut values = self.values_files(app)?;
        let temp = TempDir::new()?;
        let chart = self.prepare_chart(app, temp.path())?;

        if let Some(object) = &app.values_object {
            let file = temp.path().join(VALUES_OBJECT_FILE);
            std::fs::write(&file, serde_yaml::to_string(object)?)?;
            values.push(file);
        }

        let stream = self.helm().template(
            &app.release_name,
            &chart.path,
            &app.namespace,
            &values,
            &self.workspace.root,
        )?;
        Ok((stream, chart.origin))
    }

    /// Render the Kustomize source of `app`, if any
    pub fn render_kustomize(&self, app: &Application) -> Result<Option<String>> {
        let Some(path) = &app.kustomize_path else {
            return Ok(None);
        };
        let dir = self.workspace.root.join(path);
        Kubectl::new(self.runner).kustomize(&dir).map(Some)
    }

    /// Concatenate the plain manifest directory of `app`, if any
    pub fn render_plain(&self, app: &Application) -> Result<Option<String>> {
        let Some(path) = &app.plain_manifests_path else {
            return Ok(None);
        };
        read_plain_manifests(&self.workspace.root.join(path)).map(Some)
    }

    /// Render every source of `app` into one stream
    pub fn render(&self, app: &Application) -> Result<Rendered> {
        let mut parts = Vec::new();
        let mut origin = None;

        if app.has_chart() {
            let (stream, chart_origin) = self.render_helm(app)?;
            parts.push(stream);
            origin = Some(chart_origin);
        }
        if let Some(stream) = self.render_kustomize(app)? {
            parts.push(stream);
        }
        if let Some(stream) = self.render_plain(app)? {
            parts.push(stream);
        }

        let stream = match parts.len() {
            0 => {
                return Err(KubeError::NothingToRender {
                    name: app.name.clone(),
                });
            }
            1 => parts.remove(0),
            _ => join_streams(&parts),
        };
        Ok(Rendered { stream, origin })
    }

    /// Render `app` and write the result to `output_dir`
    pub fn render_to_dir(&self, app: &Application, output_dir: &Path) -> Result<RenderSummary> {
        let rendered = self.render(app)?;
        let documents = write_rendered(&rendered.stream, output_dir)?;
        info!(app = %app.name, documents, dir = %output_dir.display(), "rendered application");
        Ok(RenderSummary {
            documents,
            origin: rendered.origin,
            nested: 0,
            nested_errors: Vec::new(),
        })
    }

    /// Render `app` and, recursively, the Applications and ApplicationSets
    /// found in its output
    ///
    /// Only a failure of `app` itself is an error; failures of nested
    /// applications are collected in [`NestedRender::errors`].
    pub fn render_nested(&self, app: &Application) -> Result<NestedRender> {
        self.render_nested_at(app, 0)
    }

    fn render_nested_at(&self, app: &Application, depth: usize) -> Result<NestedRender> {
        let rendered = self.render(app)?;
        let charts_dir = self.workspace.charts_dir();
        let nested = NestedResources::scan(
            &rendered.stream,
            &app.source_file,
            &self.workspace.root,
            &charts_dir,
        );
        let mut node = NestedRender {
            name: app.name.clone(),
            rendered,
            children: Vec::new(),
            errors: Vec::new(),
        };
        if nested.is_empty() {
            return Ok(node);
        }
        if depth + 1 >= MAX_NESTING_DEPTH {
            warn!(app = %app.name, depth, "nesting too deep, nested applications not rendered");
            node.errors.push(format!(
                "{}: maximum nesting depth ({}) reached",
                app.name, MAX_NESTING_DEPTH
            ));
            return Ok(node);
        }

        for child in nested.expand(&app.source_file, &self.workspace.root, &charts_dir) {
            if !is_valid_nested_name(&child.name) {
                node.errors.push(format!("{}: invalid application name", child.name));
                continue;
            }
            if node.children.iter().any(|c| c.name == child.name) {
                node.errors.push(format!("{}: defined more than once", child.name));
                continue;
            }
            debug!(parent = %app.name, child = %child.name, depth = depth + 1, "rendering nested application");
            match self.render_nested_at(&child, depth + 1) {
                Ok(rendered) => node.children.push(rendered),
                Err(e) => node.errors.push(format!("{}: {}", child.name, e)),
            }
        }
        Ok(node)
    }

    /// [`render_nested`](Self::render_nested) written to `output_dir`
    pub fn render_nested_to_dir(&self, app: &Application, output_dir: &Path) -> Result<RenderSummary> {
        let tree = self.render_nested(app)?;
        let documents = tree.write_to(output_dir)?;
        let nested = tree.nested_count();
        info!(app = %app.name, documents, nested, dir = %output_dir.display(), "rendered application tree");
        Ok(RenderSummary {
            documents,
            origin: tree.rendered.origin.clone(),
            nested,
            nested_errors: tree.all_errors(),
        })
    }
}

/// Join streams from several sources with document separators
pub fn join_streams(parts: &[String]) -> String {
    let trimmed: Vec<&str> = parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    let mut out = trimmed.join("\n---\n");
    out.push('\n');
    out
}

/// Read `*.yaml` / `*.yml` files of a directory in name order
pub fn read_plain_manifests(dir: &Path) -> Result<String> {
    if !dir.is_dir() {
        return Err(KubeError::ManifestsNotFound {
            path: dir.display().to_string(),
        });
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    if files.is_empty() {
        return Err(KubeError::ManifestsNotFound {
            path: dir.display().to_string(),
        });
    }
    files.sort();

    let mut contents = Vec::new();
    for file in &files {
        let content = std::fs::read_to_string(file)?;
        let content = content.trim();
        if !content.is_empty() {
            contents.push(content.to_string());
        }
    }
    Ok(contents.join("\n---\n"))
}
