//! Chart scaffolding for `rita chart new`

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Replaced by the chart name in the Helm template sources below
const NAME_PLACEHOLDER: &str = "__CHART_NAME__";

/// Options for a new chart
#[derive(Debug, Clone)]
pub struct ScaffoldOptions {
    pub name: String,
    pub description: String,
    pub maintainer_name: String,
    pub maintainer_email: String,
}

impl ScaffoldOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "A Helm chart for Kubernetes".to_string(),
            maintainer_name: "developer".to_string(),
            maintainer_email: "developer@example.com".to_string(),
        }
    }
}

/// `my-chart` -> `MyChartValues`
pub fn to_struct_name(chart_name: &str) -> String {
    let mut name: String = chart_name
        .split(['-', '_'])
        .map(capitalize)
        .collect();
    name.push_str("Values");
    name
}

/// `my-chart` -> `my_chart`
pub fn to_module_name(chart_name: &str) -> String {
    chart_name.replace('-', "_")
}

/// `my-chart` -> `My Chart`
pub fn to_title(chart_name: &str) -> String {
    chart_name
        .split('-')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Check a chart name against Helm's naming rules
pub fn validate_chart_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| CoreError::InvalidChartName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let first = name.chars().next().ok_or_else(|| invalid("name is empty"))?;
    if !first.is_ascii_lowercase() {
        return Err(invalid("must start with a lowercase letter"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid("only lowercase letters, digits and '-' are allowed"));
    }
    if name.ends_with('-') || name.contains("--") {
        return Err(invalid("dashes must separate words"));
    }
    Ok(())
}

/// Create `<charts_dir>/<name>` with a minimal working chart
///
/// Returns the created files relative to the chart directory, sorted.
pub fn scaffold_chart(charts_dir: &Path, options: &ScaffoldOptions) -> Result<Vec<String>> {
    validate_chart_name(&options.name)?;

    let chart_dir = charts_dir.join(&options.name);
    if chart_dir.exists() {
        return Err(CoreError::ChartExists {
            path: chart_dir.display().to_string(),
        });
    }
    fs::create_dir_all(chart_dir.join("templates"))?;

    let mut files = vec![
        ("Chart.yaml".to_string(), chart_yaml(options)),
        ("values.yaml".to_string(), values_yaml(options)),
        (".helmignore".to_string(), HELMIGNORE.to_string()),
    ];
    for (file, template) in HELM_TEMPLATES {
        files.push((
            format!("templates/{}", file),
            template.replace(NAME_PLACEHOLDER, &options.name),
        ));
    }

    let mut created = Vec::new();
    for (relative, content) in files {
        fs::write(chart_dir.join(&relative), content)?;
        tracing::debug!(file = %relative, "created chart file");
        created.push(relative);
    }
    created.sort();
    Ok(created)
}

fn chart_yaml(options: &ScaffoldOptions) -> String {
    format!(
        r#"apiVersion: v2
name: {name}
description: {description}
type: application
version: 0.1.0
appVersion: "0.1.0"
maintainers:
  - name: {maintainer}
    email: {email}
"#,
        name = options.name,
        description = options.description,
        maintainer = options.maintainer_name,
        email = options.maintainer_email,
    )
}

fn values_yaml(options: &ScaffoldOptions) -> String {
    format!(
        r#"# Default values for {name}.
# The schema of this file is generated by `rita schema apply -c {name}`.

replicaCount: 1

image:
  repository: nginx
  tag: "latest"
  pullPolicy: IfNotPresent

imagePullSecrets: []
nameOverride: ""
fullnameOverride: ""

serviceAccount:
  create: true
  automount: true
  annotations: {{}}
  name: ""

podAnnotations: {{}}
podLabels: {{}}

service:
  type: ClusterIP
  port: 8000

resources: {{}}
  # limits:
  #   cpu: 100m
  #   memory: 128Mi
  # requests:
  #   cpu: 100m
  #   memory: 128Mi

livenessProbe:
  httpGet:
    path: /alive
    port: http
readinessProbe:
  httpGet:
    path: /alive
    port: http

nodeSelector: {{}}
tolerations: []
affinity: {{}}
"#,
        name = options.name
    )
}

const HELMIGNORE: &str = r#"# Patterns to ignore when building packages.
.DS_Store
.git/
.gitignore
*.swp
*.bak
*.tmp
*.orig
*~
.idea/
.vscode/
*.temp.yaml
"#;

const HELM_TEMPLATES: &[(&str, &str)] = &[
    (
        "_helpers.tpl",
        r#"{{/*
Expand the name of the chart.
*/}}
{{- define "__CHART_NAME__.name" -}}
{{- default .Chart.Name .Values.nameOverride | trunc 63 | trimSuffix "-" }}
{{- end }}

{{/*
Fully qualified app name, truncated to the 63 characters DNS names allow.
*/}}
{{- define "__CHART_NAME__.fullname" -}}
{{- if .Values.fullnameOverride }}
{{- .Values.fullnameOverride | trunc 63 | trimSuffix "-" }}
{{- else }}
{{- $name := default .Chart.Name .Values.nameOverride }}
{{- if contains $name .Release.Name }}
{{- .Release.Name | trunc 63 | trimSuffix "-" }}
{{- else }}
{{- printf "%s-%s" .Release.Name $name | trunc 63 | trimSuffix "-" }}
{{- end }}
{{- end }}
{{- end }}

{{- define "__CHART_NAME__.labels" -}}
helm.sh/chart: {{ printf "%s-%s" .Chart.Name .Chart.Version | replace "+" "_" | trunc 63 | trimSuffix "-" }}
{{ include "__CHART_NAME__.selectorLabels" . }}
app.kubernetes.io/version: {{ .Chart.AppVersion | quote }}
app.kubernetes.io/managed-by: {{ .Release.Service }}
{{- end }}

{{- define "__CHART_NAME__.selectorLabels" -}}
app.kubernetes.io/name: {{ include "__CHART_NAME__.name" . }}
app.kubernetes.io/instance: {{ .Release.Name }}
{{- end }}

{{- define "__CHART_NAME__.serviceAccountName" -}}
{{- if .Values.serviceAccount.create }}
{{- default (include "__CHART_NAME__.fullname" .) .Values.serviceAccount.name }}
{{- else }}
{{- default "default" .Values.serviceAccount.name }}
{{- end }}
{{- end }}
"#,
    ),
    (
        "deployment.yaml",
        r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: {{ include "__CHART_NAME__.fullname" . }}
  labels:
    {{- include "__CHART_NAME__.labels" . | nindent 4 }}
spec:
  replicas: {{ .Values.replicaCount }}
  selector:
    matchLabels:
      {{- include "__CHART_NAME__.selectorLabels" . | nindent 6 }}
  template:
    metadata:
      {{- with .Values.podAnnotations }}
      annotations:
        {{- toYaml . | nindent 8 }}
      {{- end }}
      labels:
        {{- include "__CHART_NAME__.selectorLabels" . | nindent 8 }}
        {{- with .Values.podLabels }}
        {{- toYaml . | nindent 8 }}
        {{- end }}
    spec:
      {{- with .Values.imagePullSecrets }}
      imagePullSecrets:
        {{- toYaml . | nindent 8 }}
      {{- end }}
      serviceAccountName: {{ include "__CHART_NAME__.serviceAccountName" . }}
      containers:
        - name: {{ .Chart.Name }}
          image: "{{ .Values.image.repository }}:{{ .Values.image.tag | default .Chart.AppVersion }}"
          imagePullPolicy: {{ .Values.image.pullPolicy }}
          ports:
            - name: http
              containerPort: {{ .Values.service.port }}
              protocol: TCP
          livenessProbe:
            {{- toYaml .Values.livenessProbe | nindent 12 }}
          readinessProbe:
            {{- toYaml .Values.readinessProbe | nindent 12 }}
          resources:
            {{- toYaml .Values.resources | nindent 12 }}
      {{- with .Values.nodeSelector }}
      nodeSelector:
        {{- toYaml . | nindent 8 }}
      {{- end }}
      {{- with .Values.affinity }}
      affinity:
        {{- toYaml . | nindent 8 }}
      {{- end }}
      {{- with .Values.tolerations }}
      tolerations:
        {{- toYaml . | nindent 8 }}
      {{- end }}
"#,
    ),
    (
        "service.yaml",
        r#"apiVersion: v1
kind: Service
metadata:
  name: {{ include "__CHART_NAME__.fullname" . }}
  labels:
    {{- include "__CHART_NAME__.labels" . | nindent 4 }}
spec:
  type: {{ .Values.service.type }}
  ports:
    - port: {{ .Values.service.port }}
      targetPort: http
      protocol: TCP
      name: http
  selector:
    {{- include "__CHART_NAME__.selectorLabels" . | nindent 4 }}
"#,
    ),
    (
        "serviceaccount.yaml",
        r#"{{- if .Values.serviceAccount.create -}}
apiVersion: v1
kind: ServiceAccount
metadata:
  name: {{ include "__CHART_NAME__.serviceAccountName" . }}
  labels:
    {{- include "__CHART_NAME__.labels" . | nindent 4 }}
  {{- with .Values.serviceAccount.annotations }}
  annotations:
    {{- toYaml . | nindent 4 }}
  {{- end }}
automountServiceAccountToken: {{ .Values.serviceAccount.automount }}
{{- end }}
"#,
    ),
    (
        "NOTES.txt",
        r#"{{ include "__CHART_NAME__.fullname" . }} is deployed in namespace {{ .Release.Namespace }}.

  kubectl --namespace {{ .Release.Namespace }} port-forward svc/{{ include "__CHART_NAME__.fullname" . }} 8080:{{ .Values.service.port }}
"#,
    ),
];

/// Rust source of a values model for a new chart
pub fn model_stub(chart_name: &str) -> String {
    format!(
        r#"//! `{name}` chart

use schemars::JsonSchema;
use serde::{{Deserialize, Serialize}};

use super::base::BaseChartValues;

/// Values of the `{name}` chart ({title})
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct {struct_name} {{
    #[serde(flatten)]
    pub base: BaseChartValues,
}}
"#,
        name = chart_name,
        title = to_title(chart_name),
        struct_name = to_struct_name(chart_name),
    )
}

/// Registry entry to add for a new chart model
pub fn registry_entry(chart_name: &str) -> String {
    let struct_name = to_struct_name(chart_name);
    format!(
        "RegisteredChart::of::<{struct_name}>(\"{chart_name}\", \"{struct_name}\"),"
    )
}

/// Write the model stub to `<dir>/<module>.rs`, refusing to overwrite
pub fn write_model_stub(dir: &Path, chart_name: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{}.rs", to_module_name(chart_name)));
    if path.exists() {
        return Err(CoreError::ChartExists {
            path: path.display().to_string(),
        });
    }
    fs::create_dir_all(dir)?;
    fs::write(&path, model_stub(chart_name))?;
    Ok(path)
}
