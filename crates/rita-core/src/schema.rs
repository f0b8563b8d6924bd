//! JSON Schema generation and validation for chart values
//!
//! Schemas are generated from the registered value models and written to
//! `<chart>/values.schema.json`, where Helm picks them up during `install`,
//! `upgrade`, `lint` and `template`. Descriptions can be prefixed with a type
//! label (`[string]`, `[array<EnvVar>]`, ...) so that editors showing only
//! the description in hover tooltips still surface the expected type.

use serde_json::{Map, Value as JsonValue};
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::values::RegisteredChart;

/// File name Helm reads the values schema from
pub const SCHEMA_FILE_NAME: &str = "values.schema.json";

/// Sections of a schema holding named definitions
const DEFINITION_KEYS: &[&str] = &["definitions", "$defs"];

/// Generate the JSON Schema of a registered chart
pub fn generate(chart: &RegisteredChart) -> Result<JsonValue> {
    Ok(serde_json::to_value(chart.schema())?)
}

/// Schema file content: pretty JSON followed by a newline
pub fn render_schema(chart: &RegisteredChart, with_types: bool) -> Result<String> {
    let mut schema = generate(chart)?;
    if with_types {
        enhance_with_types(&mut schema);
    }
    let mut content = serde_json::to_string_pretty(&schema)?;
    content.push('\n');
    Ok(content)
}

/// Whether an existing schema file matches freshly generated content
pub fn is_up_to_date(chart: &RegisteredChart, path: &Path, with_types: bool) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let existing = std::fs::read_to_string(path)?;
    Ok(existing == render_schema(chart, with_types)?)
}

/// Name of a referenced definition (`#/definitions/Foo` -> `Foo`)
fn ref_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// Type of a single schema without brackets, e.g. `string` or `array<EnvVar>`
fn bare_type(prop: &JsonValue) -> Option<String> {
    if let Some(reference) = prop.get("$ref").and_then(JsonValue::as_str) {
        return Some(ref_name(reference).to_string());
    }

    // A described reference is wrapped as `allOf: [{$ref}]`
    if let Some([single]) = prop.get("allOf").and_then(JsonValue::as_array).map(Vec::as_slice) {
        return bare_type(single);
    }

    if let Some(values) = prop.get("enum").and_then(JsonValue::as_array) {
        let rendered: Vec<String> = values
            .iter()
            .map(|v| match v {
                JsonValue::String(s) => format!("\"{}\"", s),
                other => other.to_string(),
            })
            .collect();
        return Some(rendered.join(" | "));
    }

    for key in ["anyOf", "oneOf"] {
        if let Some(options) = prop.get(key).and_then(JsonValue::as_array) {
            let types: Vec<String> = options
                .iter()
                .filter(|o| o.get("type").and_then(JsonValue::as_str) != Some("null"))
                .filter_map(bare_type)
                .collect();
            return (!types.is_empty()).then(|| types.join(" | "));
        }
    }

    match prop.get("type")? {
        JsonValue::String(t) => Some(single_type(t, prop)),
        JsonValue::Array(types) => {
            let types: Vec<String> = types
                .iter()
                .filter_map(JsonValue::as_str)
                .filter(|t| *t != "null")
                .map(|t| single_type(t, prop))
                .collect();
            (!types.is_empty()).then(|| types.join(" | "))
        }
        _ => None,
    }
}

fn single_type(t: &str, prop: &JsonValue) -> String {
    match t {
        "array" => {
            let item = prop
                .get("items")
                .and_then(bare_type)
                .unwrap_or_else(|| "any".to_string());
            format!("array<{}>", item)
        }
        "string" => match prop.get("format").and_then(JsonValue::as_str) {
            Some(format) => format!("string, {}", format),
            None => "string".to_string(),
        },
        other => other.to_string(),
    }
}

/// Human readable type label of a property, e.g. `[integer]`
pub fn type_label(prop: &JsonValue) -> Option<String> {
    bare_type(prop).map(|t| format!("[{}]", t))
}

/// Prefix property descriptions with their type label
///
/// Descriptions already starting with `(` or `[` are left untouched, which
/// also makes the transformation idempotent.
pub fn enhance_with_types(schema: &mut JsonValue) {
    if let Some(properties) = schema.get_mut("properties").and_then(JsonValue::as_object_mut) {
        enhance_properties(properties);
    }

    for key in DEFINITION_KEYS {
        if let Some(definitions) = schema.get_mut(*key).and_then(JsonValue::as_object_mut) {
            for definition in definitions.values_mut() {
                if let Some(properties) = definition
                    .get_mut("properties")
                    .and_then(JsonValue::as_object_mut)
                {
                    enhance_properties(properties);
                }
            }
        }
    }
}

fn enhance_properties(properties: &mut Map<String, JsonValue>) {
    for prop in properties.values_mut() {
        if !prop.is_object() {
            continue;
        }

        if let Some(label) = type_label(prop) {
            if let Some(JsonValue::String(description)) = prop.get_mut("description") {
                if !description.starts_with('(') && !description.starts_with('[') {
                    *description = format!("{} {}", label, description);
                }
            }
        }

        if let Some(nested) = prop.get_mut("properties").and_then(JsonValue::as_object_mut) {
            enhance_properties(nested);
        }
    }
}

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorInfo {
    /// JSON pointer of the offending value, `(root)` for the document itself
    pub path: String,
    pub message: String,
}

/// Outcome of validating values against a schema
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationErrorInfo>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn failure(errors: Vec<ValidationErrorInfo>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Compiled schema ready to validate values
pub struct SchemaValidator {
    compiled: jsonschema::Validator,
}

impl SchemaValidator {
    /// Compile a schema
    pub fn new(schema: &JsonValue) -> Result<Self> {
        let compiled = jsonschema::validator_for(schema).map_err(|e| CoreError::InvalidSchema {
            message: e.to_string(),
        })?;
        Ok(Self { compiled })
    }

    /// Compile the schema of a registered chart
    pub fn for_chart(chart: &RegisteredChart) -> Result<Self> {
        Self::new(&generate(chart)?)
    }

    /// Validate values against the schema
    pub fn validate(&self, values: &JsonValue) -> ValidationResult {
        if self.compiled.is_valid(values) {
            return ValidationResult::success();
        }

        let errors = self
            .compiled
            .iter_errors(values)
            .map(|e| {
                let path = e.instance_path.to_string();
                ValidationErrorInfo {
                    path: if path.is_empty() {
                        "(root)".to_string()
                    } else {
                        path
                    },
                    message: e.to_string().replace('"', "'"),
                }
            })
            .collect();

        ValidationResult::failure(errors)
    }
}

/// Load a values file (YAML or JSON) as JSON. An empty file is an empty object.
pub fn load_values_file(path: &Path) -> Result<JsonValue> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(JsonValue::Object(Map::new()));
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content)?;
    Ok(serde_json::to_value(yaml)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::{REGISTERED_CHARTS, get_chart};
    use serde_json::json;

    #[test]
    fn test_every_registered_model_produces_a_valid_schema() {
        for chart in REGISTERED_CHARTS {
            let schema = generate(chart).unwrap();
            assert_eq!(schema["type"], "object", "{}", chart.name);
            assert!(schema["properties"].is_object(), "{}", chart.name);

            let validator = SchemaValidator::new(&schema).unwrap();
            let result = validator.validate(&chart.defaults());
            assert!(result.is_valid, "{}: {:?}", chart.name, result.errors);
        }
    }

    #[test]
    fn test_empty_values_are_valid() {
        for chart in REGISTERED_CHARTS {
            let validator = SchemaValidator::for_chart(chart).unwrap();
            assert!(validator.validate(&json!({})).is_valid, "{}", chart.name);
        }
    }

    #[test]
    fn test_validation_reports_path() {
        let validator = SchemaValidator::for_chart(get_chart("web-service").unwrap()).unwrap();
        let result = validator.validate(&json!({
            "replicaCount": "three",
            "image": {"repository": "nginx", "pullPolicy": "Sometimes"}
        }));
        assert!(!result.is_valid);
        let paths: Vec<&str> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"/replicaCount"));
        assert!(paths.contains(&"/image/pullPolicy"));
        assert!(result.errors.iter().all(|e| !e.message.contains('"')));
    }

    #[test]
    fn test_missing_required_field_reports_root_of_object() {
        let validator =
            SchemaValidator::for_chart(get_chart("feature-deployment").unwrap()).unwrap();
        let result = validator.validate(&json!({"images": {"backend": {"tag": "abc"}}}));
        assert!(!result.is_valid);
        assert!(result.errors[0].message.contains("repository"));
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(type_label(&json!({"type": "string"})).unwrap(), "[string]");
        assert_eq!(
            type_label(&json!({"type": "string", "format": "uri"})).unwrap(),
            "[string, uri]"
        );
        assert_eq!(
            type_label(&json!({"type": ["string", "null"]})).unwrap(),
            "[string]"
        );
        assert_eq!(
            type_label(&json!({"type": "array", "items": {"$ref": "#/definitions/EnvVar"}}))
                .unwrap(),
            "[array<EnvVar>]"
        );
        assert_eq!(
            type_label(&json!({"type": "array", "items": {"type": "string"}})).unwrap(),
            "[array<string>]"
        );
        assert_eq!(type_label(&json!({"type": "array"})).unwrap(), "[array<any>]");
        assert_eq!(
            type_label(&json!({"allOf": [{"$ref": "#/definitions/ServiceConfig"}]})).unwrap(),
            "[ServiceConfig]"
        );
        assert_eq!(
            type_label(&json!({"type": "string", "enum": ["Always", "Never"]})).unwrap(),
            "[\"Always\" | \"Never\"]"
        );
        assert_eq!(
            type_label(&json!({"anyOf": [{"$ref": "#/$defs/Limits"}, {"type": "null"}]})).unwrap(),
            "[Limits]"
        );
        assert_eq!(
            type_label(&json!({"anyOf": [{"type": "integer"}, {"type": "string"}]})).unwrap(),
            "[integer | string]"
        );
        assert!(type_label(&json!({})).is_none());
    }

    #[test]
    fn test_enhance_prefixes_descriptions_once() {
        let mut schema = json!({
            "properties": {
                "replicaCount": {"type": "integer", "description": "Number of replicas"},
                "labelled": {"type": "string", "description": "[custom] Already labelled"},
                "nested": {
                    "type": "object",
                    "description": "Nested",
                    "properties": {
                        "flag": {"type": "boolean", "description": "A flag"}
                    }
                }
            },
            "definitions": {
                "Probe": {
                    "properties": {
                        "path": {"type": "string", "description": "Request path"}
                    }
                }
            }
        });

        enhance_with_types(&mut schema);
        let again = {
            let mut copy = schema.clone();
            enhance_with_types(&mut copy);
            copy
        };

        assert_eq!(
            schema["properties"]["replicaCount"]["description"],
            "[integer] Number of replicas"
        );
        assert_eq!(
            schema["properties"]["labelled"]["description"],
            "[custom] Already labelled"
        );
        assert_eq!(
            schema["properties"]["nested"]["properties"]["flag"]["description"],
            "[boolean] A flag"
        );
        assert_eq!(
            schema["definitions"]["Probe"]["properties"]["path"]["description"],
            "[string] Request path"
        );
        assert_eq!(schema, again);
    }

    #[test]
    fn test_render_schema_and_up_to_date_check() {
        let dir = tempfile::TempDir::new().unwrap();
        let chart = get_chart("web-service").unwrap();
        let path = dir.path().join(SCHEMA_FILE_NAME);

        let content = render_schema(chart, true).unwrap();
        assert!(content.ends_with("}\n"));
        assert!(content.contains("[integer] Number of pod replicas"));

        assert!(!is_up_to_date(chart, &path, true).unwrap());
        std::fs::write(&path, &content).unwrap();
        assert!(is_up_to_date(chart, &path, true).unwrap());
        assert!(!is_up_to_date(chart, &path, false).unwrap());
    }

    #[test]
    fn test_load_values_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("values.yaml");
        std::fs::write(&path, "replicaCount: 2\nimage:\n  repository: nginx\n").unwrap();
        let values = load_values_file(&path).unwrap();
        assert_eq!(values["replicaCount"], 2);

        std::fs::write(&path, "").unwrap();
        assert_eq!(load_values_file(&path).unwrap(), json!({}));
    }

    /// Title and labelled top-level properties of a rendered schema file
    fn schema_outline(chart_name: &str) -> String {
        let content = render_schema(get_chart(chart_name).unwrap(), true).unwrap();
        let schema: JsonValue = serde_json::from_str(&content).unwrap();
        let properties = schema["properties"].as_object().unwrap();

        let mut names: Vec<&String> = properties.keys().collect();
        names.sort();

        let mut lines = vec![format!("title: {}", schema["title"].as_str().unwrap_or("-"))];
        for name in names {
            let label = type_label(&properties[name]).unwrap_or_default();
            lines.push(format!("{}: {}", name, label));
        }
        lines.join("\n")
    }

    #[test]
    fn test_web_service_schema_snapshot() {
        insta::assert_snapshot!(schema_outline("web-service"), @r###"
        title: WebServiceValues
        affinity: [object]
        autoscaling: [AutoscalingConfig]
        env: [array<EnvVar>]
        envFromExternalSecrets: [EnvFromExternalSecretsConfig]
        externalSecrets: [ExternalSecretConfig]
        extraObjects: [array<any>]
        extraVolumeMounts: [array<VolumeMount>]
        fullnameOverride: [string]
        image: [ContainerImage]
        imagePullSecrets: [array<object>]
        ingress: [IngressConfig]
        livenessProbe: [ProbeConfig]
        nameOverride: [string]
        nodeSelector: [object]
        podAnnotations: [object]
        podLabels: [object]
        podSecurityContext: [object]
        readinessProbe: [ProbeConfig]
        replicaCount: [integer]
        resources: [object]
        securityContext: [object]
        service: [ServiceConfig]
        serviceAccount: [ServiceAccount]
        tolerations: [array<object>]
        volumeMounts: [array<object>]
        volumes: [array<object>]
        "###);
    }

    #[test]
    fn test_feature_deployment_schema_snapshot() {
        insta::assert_snapshot!(schema_outline("feature-deployment"), @r###"
        title: FeatureDeploymentValues
        branchId: [string]
        domain: [string]
        images: [FeatureImages]
        resources: [PodResources]
        ttlHours: [integer]
        versions: [FeatureVersions]
        "###);
    }

    #[test]
    fn test_app_stack_schema_snapshot() {
        insta::assert_snapshot!(schema_outline("app-stack"), @r###"
        title: AppStackValues
        backend: [StackComponent]
        frontend: [StackComponent]
        gateway: [StackComponent]
        global: [GlobalValues]
        "###);
    }
}
