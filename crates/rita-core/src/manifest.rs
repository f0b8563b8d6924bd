//! Rendered manifest handling: splitting, grouping by kind and diffing
//!
//! A rendered application is stored as one file per resource kind
//! (`deployment.yaml`, `service.yaml`, ...) next to `_all.yaml`, the
//! untouched multi-document stream produced by Helm or Kustomize. Diffs are
//! computed per resource so that reordering of documents in the stream
//! does not show up as a change.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use similar::TextDiff;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Name of the combined manifest written next to the per-kind files
pub const ALL_MANIFESTS_FILE: &str = "_all.yaml";

/// Default cap on the number of lines shown per resource in a diff
pub const DEFAULT_MAX_DIFF_LINES: usize = 250;

/// Unchanged lines kept around each change
const DIFF_CONTEXT_LINES: usize = 150;

/// Parse every non-empty document of a multi-document YAML stream
pub fn parse_documents(stream: &str) -> Result<Vec<YamlValue>> {
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(stream) {
        let value = YamlValue::deserialize(document)?;
        if !value.is_null() {
            docs.push(value);
        }
    }
    Ok(docs)
}

/// Group documents by file stem, preserving the order kinds first appear in
///
/// Keys come from [`kind_file_stem`], so kinds differing only in case share
/// a group.
pub fn group_by_kind(docs: Vec<YamlValue>) -> IndexMap<String, Vec<YamlValue>> {
    let mut groups: IndexMap<String, Vec<YamlValue>> = IndexMap::new();
    for doc in docs {
        let kind = doc.get("kind").and_then(YamlValue::as_str).unwrap_or("");
        groups.entry(kind_file_stem(kind)).or_default().push(doc);
    }
    groups
}

/// Lowercased kind usable as a file name inside the output directory
///
/// Anything other than ASCII alphanumerics, `-` and `_` becomes `_`, so path
/// separators and `..` never reach the filesystem. Empty kinds map to `unknown`.
pub fn kind_file_stem(kind: &str) -> String {
    let stem: String = kind
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if stem.chars().all(|c| c == '_') {
        "unknown".to_string()
    } else {
        stem
    }
}

/// Write a rendered stream to `output_dir`, returning the document count
///
/// Each kind goes to `<kind_file_stem>.yaml` and the stream itself to
/// [`ALL_MANIFESTS_FILE`]. A stream that cannot be parsed is still written
/// to `_all.yaml`; its document count is then estimated from separators.
pub fn write_rendered(stream: &str, output_dir: &Path) -> Result<usize> {
    std::fs::create_dir_all(output_dir)?;

    let count = match parse_documents(stream) {
        Ok(docs) => {
            let count = docs.len();
            for (kind, resources) in group_by_kind(docs) {
                let mut content = String::new();
                for (i, resource) in resources.iter().enumerate() {
                    if i > 0 {
                        content.push_str("---\n");
                    }
                    content.push_str(&serde_yaml::to_string(resource)?);
                }
                std::fs::write(output_dir.join(format!("{}.yaml", kind)), content)?;
            }
            count
        }
        Err(e) => {
            tracing::warn!(error = %e, "rendered output is not valid YAML, writing it unsplit");
            split_raw_documents(stream).len()
        }
    };

    std::fs::write(output_dir.join(ALL_MANIFESTS_FILE), stream)?;
    Ok(count)
}

/// Read `_all.yaml` of a rendered directory, `None` when absent
pub fn read_combined(dir: &Path) -> Result<Option<String>> {
    let path = dir.join(ALL_MANIFESTS_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}

/// Split a stream on document separators without parsing it
///
/// Separator lines are `---` optionally followed by a comment or content.
pub fn split_raw_documents(stream: &str) -> Vec<String> {
    let mut docs = Vec::new();
    let mut current = String::new();

    for line in stream.lines() {
        if line == "---" || line.starts_with("--- ") {
            if !current.trim().is_empty() {
                docs.push(current.trim().to_string());
            }
            current.clear();
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        docs.push(current.trim().to_string());
    }
    docs
}

/// Identity of a resource: `Kind/namespace/name` or `Kind/name`
pub fn resource_identity(doc: &YamlValue) -> String {
    let kind = doc
        .get("kind")
        .and_then(YamlValue::as_str)
        .unwrap_or("Unknown");
    let metadata = doc.get("metadata");
    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(YamlValue::as_str)
        .unwrap_or("unnamed");
    match metadata
        .and_then(|m| m.get("namespace"))
        .and_then(YamlValue::as_str)
        .filter(|ns| !ns.is_empty())
    {
        Some(ns) => format!("{}/{}/{}", kind, ns, name),
        None => format!("{}/{}", kind, name),
    }
}

/// Raw text of each resource keyed by identity
fn index_resources(stream: &str) -> BTreeMap<String, String> {
    let mut resources = BTreeMap::new();
    for (i, raw) in split_raw_documents(stream).into_iter().enumerate() {
        let identity = match serde_yaml::from_str::<YamlValue>(&raw) {
            Ok(doc) if doc.is_mapping() => resource_identity(&doc),
            Ok(_) => continue,
            Err(_) => format!("unparsable-document-{}", i),
        };
        resources.insert(identity, raw);
    }
    resources
}

/// Kind of change to a single resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Added => write!(f, "added"),
            ChangeType::Modified => write!(f, "modified"),
            ChangeType::Removed => write!(f, "removed"),
        }
    }
}

/// Diff of a single resource
#[derive(Debug, Clone, Serialize)]
pub struct ResourceChange {
    pub identity: String,
    pub change_type: ChangeType,

    /// Diff text, one `+`/`-`/` ` prefixed line per line
    pub diff: String,
}

/// Resource-level comparison of two manifest streams
#[derive(Debug, Clone)]
pub struct ManifestDiff {
    /// Lines shown per resource before truncation
    pub max_lines: usize,
}

impl Default for ManifestDiff {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_DIFF_LINES,
        }
    }
}

impl ManifestDiff {
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines }
    }

    /// Changed resources, sorted by identity. Unchanged resources are omitted.
    pub fn compare(&self, baseline: &str, current: &str) -> Vec<ResourceChange> {
        let old = index_resources(baseline);
        let new = index_resources(current);
        let identities: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

        identities
            .into_iter()
            .filter_map(|identity| match (old.get(identity), new.get(identity)) {
                (Some(before), Some(after)) if before == after => None,
                (Some(before), Some(after)) => Some(ResourceChange {
                    identity: identity.clone(),
                    change_type: ChangeType::Modified,
                    diff: self.unified(identity, before, after),
                }),
                (None, Some(after)) => Some(ResourceChange {
                    identity: identity.clone(),
                    change_type: ChangeType::Added,
                    diff: self.whole(&format!("+++ NEW: {}", identity), '+', after),
                }),
                (Some(before), None) => Some(ResourceChange {
                    identity: identity.clone(),
                    change_type: ChangeType::Removed,
                    diff: self.whole(&format!("--- REMOVED: {}", identity), '-', before),
                }),
                (None, None) => None,
            })
            .collect()
    }

    /// Render all changes as one text block, `None` when nothing changed
    pub fn render(&self, baseline: &str, current: &str) -> Option<String> {
        let changes = self.compare(baseline, current);
        if changes.is_empty() {
            return None;
        }
        Some(
            changes
                .iter()
                .map(|c| c.diff.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    fn whole(&self, header: &str, prefix: char, content: &str) -> String {
        let lines: Vec<&str> = content.lines().collect();
        let mut out = format!("{}\n", header);
        for line in lines.iter().take(self.max_lines) {
            out.push(prefix);
            out.push_str(line.trim_end());
            out.push('\n');
        }
        if lines.len() > self.max_lines {
            out.push_str(&format!("... ({} more lines)\n", lines.len() - self.max_lines));
        }
        out
    }

    fn unified(&self, identity: &str, before: &str, after: &str) -> String {
        let before = with_trailing_newline(before);
        let after = with_trailing_newline(after);
        let diff = TextDiff::from_lines(&before, &after)
            .unified_diff()
            .context_radius(DIFF_CONTEXT_LINES)
            .header(&format!("baseline/{}", identity), &format!("current/{}", identity))
            .to_string();

        let lines: Vec<&str> = diff.lines().collect();
        if lines.len() <= self.max_lines {
            return diff;
        }
        let mut out = lines[..self.max_lines].join("\n");
        out.push_str(&format!(
            "\n... (truncated, showing first {} lines)\n",
            self.max_lines
        ));
        out
    }
}

fn with_trailing_newline(s: &str) -> String {
    let mut s = s.to_string();
    if !s.ends_with('\n') {
        s.push('\n');
    }
    s
}

/// Result of diffing one application
#[derive(Debug, Clone)]
pub enum DiffOutcome {
    Unchanged,
    Changed {
        diff: String,
        /// No previously rendered baseline existed
        new_app: bool,
    },
    Failed(String),
}

/// Diff result for one application in one environment
#[derive(Debug, Clone)]
pub struct AppDiff {
    pub env: String,
    pub app: String,
    pub outcome: DiffOutcome,
}

/// Aggregated diff results of a `render diff` run
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    pub results: Vec<AppDiff>,
    pub changed_files: Vec<String>,
}

impl DiffReport {
    pub fn push(&mut self, env: &str, app: &str, outcome: DiffOutcome) {
        self.results.push(AppDiff {
            env: env.to_string(),
            app: app.to_string(),
            outcome,
        });
    }

    pub fn changed(&self) -> impl Iterator<Item = &AppDiff> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, DiffOutcome::Changed { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &AppDiff> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, DiffOutcome::Failed(_)))
    }

    pub fn has_changes(&self) -> bool {
        self.changed().next().is_some()
    }

    pub fn has_errors(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Machine-readable summary for CI jobs
    ///
    /// `message` is only present when no application was diffed.
    pub fn to_json(&self, elapsed: Duration) -> serde_json::Value {
        let results: Vec<serde_json::Value> = self
            .results
            .iter()
            .map(|result| {
                let (has_diff, new_app, diff, error) = match &result.outcome {
                    DiffOutcome::Unchanged => (false, false, None, None),
                    DiffOutcome::Changed { diff, new_app } => {
                        (true, *new_app, Some(diff.as_str()), None)
                    }
                    DiffOutcome::Failed(message) => (false, false, None, Some(message.as_str())),
                };
                serde_json::json!({
                    "env": result.env,
                    "app": result.app,
                    "has_diff": has_diff,
                    "new_app": new_app,
                    "diff": diff,
                    "error": error,
                })
            })
            .collect();

        let mut output = serde_json::json!({
            "has_diff": self.has_changes(),
            "has_errors": self.has_errors(),
            "elapsed_seconds": elapsed.as_secs_f64(),
            "changed_files": self.changed_files,
            "results": results,
        });
        if self.results.is_empty() {
            output["message"] = serde_json::Value::from("No affected apps found");
        }
        output
    }

    /// GitHub-flavoured markdown summary suitable for a PR comment
    pub fn to_markdown(&self, elapsed: Duration) -> String {
        if !self.has_changes() && !self.has_errors() {
            return "**No manifest changes detected**\n\nNo apps were affected by the changes in this branch.\n"
                .to_string();
        }

        let mut by_env: BTreeMap<&str, Vec<&AppDiff>> = BTreeMap::new();
        for result in self.changed() {
            by_env.entry(&result.env).or_default().push(result);
        }

        let mut lines = vec![
            "## Helm Manifest Changes".to_string(),
            String::new(),
            "| Environment | Apps Changed | Apps |".to_string(),
            "|-------------|--------------|------|".to_string(),
        ];
        for (env, results) in &by_env {
            let apps: Vec<String> = results.iter().map(|r| format!("`{}`", r.app)).collect();
            lines.push(format!("| {} | {} | {} |", env, results.len(), apps.join(", ")));
        }
        lines.push(String::new());

        for (env, results) in &by_env {
            lines.push(format!("### {}", env));
            lines.push(String::new());
            for result in results {
                let DiffOutcome::Changed { diff, new_app } = &result.outcome else {
                    continue;
                };
                let label = if *new_app { " (new)" } else { "" };
                lines.push("<details>".to_string());
                lines.push(format!("<summary><b>{}</b>{}</summary>", result.app, label));
                lines.push(String::new());
                lines.push("```diff".to_string());
                lines.push(diff.trim_end().to_string());
                lines.push("```".to_string());
                lines.push(String::new());
                lines.push("</details>".to_string());
                lines.push(String::new());
            }
        }

        if self.has_errors() {
            lines.push("### Errors".to_string());
            lines.push(String::new());
            for result in self.failed() {
                if let DiffOutcome::Failed(message) = &result.outcome {
                    let first_line = message.lines().next().unwrap_or_default();
                    lines.push(format!("- **{}/{}**: {}", result.env, result.app, first_line));
                }
            }
            lines.push(String::new());
        }

        if !self.changed_files.is_empty() {
            lines.push(format!(
                "<sub>{} changed file(s) in this branch</sub>",
                self.changed_files.len()
            ));
            lines.push(String::new());
        }
        lines.push("---".to_string());
        lines.push(format!(
            "<sub>Checked {} apps in {:.1}s</sub>",
            self.results.len(),
            elapsed.as_secs_f64()
        ));
        lines.push(String::new());

        lines.join("\n")
    }
}
