//! Integration tests for CLI commands
//!
//! Every test runs inside its own temporary repository; none of them needs
//! helm, kubectl or kind.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to run rita inside `dir`
fn rita(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rita"))
        .args(args)
        .current_dir(dir)
        .env_remove("RITA_CONFIG")
        .env_remove("RITA_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute rita")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Repository with a `web-service` chart directory and one dev application
fn fixture_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("charts/web-service/templates")).unwrap();
    fs::write(
        root.join("charts/web-service/Chart.yaml"),
        "apiVersion: v2\nname: web-service\nversion: 0.1.0\n",
    )
    .unwrap();

    let templates = root.join("kubernetes/argocd/applications/dev/templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(
        templates.join("billing.yaml"),
        r#"apiVersion: argoproj.io/v1alpha1
kind: Application
metadata:
  name: billing
spec:
  destination:
    namespace: payments
  source:
    repoURL: ghcr.io/acme/charts
    chart: web-service
    targetRevision: 0.1.0
    helm:
      valueFiles:
        - kubernetes/billing/values-dev.yaml
"#,
    )
    .unwrap();
    fs::write(
        templates.join("redis.yaml"),
        r#"apiVersion: argoproj.io/v1alpha1
kind: Application
metadata:
  name: redis
spec:
  destination:
    namespace: cache
  source:
    repoURL: https://charts.bitnami.com/bitnami
    chart: redis
    targetRevision: 18.1.0
"#,
    )
    .unwrap();

    dir
}

mod schema_command {
    use super::*;

    #[test]
    fn test_list_shows_registered_charts() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["schema", "list"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("web-service"));
        assert!(out.contains("WebServiceValues"));
        assert!(out.contains("no chart directory"), "app-stack has no directory here");
    }

    #[test]
    fn test_show_prints_json_schema() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["schema", "show", "-c", "web-service"]);

        assert!(output.status.success());
        let schema: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("schema should be JSON");
        assert!(schema["properties"]["replicaCount"].is_object());
    }

    #[test]
    fn test_show_unknown_chart_suggests() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["schema", "show", "-c", "web-servise"]);

        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("web-service"));
    }

    #[test]
    fn test_apply_then_check() {
        let repo = fixture_repo();

        let check = rita(repo.path(), &["schema", "check", "-c", "web-service"]);
        assert_eq!(check.status.code(), Some(2), "missing schema is out of date");

        let apply = rita(repo.path(), &["schema", "apply"]);
        assert!(apply.status.success(), "stderr: {}", stderr(&apply));
        assert!(repo.path().join("charts/web-service/values.schema.json").is_file());
        assert!(stdout(&apply).contains("1 schema file(s) written"));

        let check = rita(repo.path(), &["schema", "check", "-c", "web-service"]);
        assert!(check.status.success());
        assert!(stdout(&check).contains("up to date"));

        let again = rita(repo.path(), &["schema", "apply", "-c", "web-service"]);
        assert!(stdout(&again).contains("0 schema file(s) written"));
    }

    #[test]
    fn test_apply_dry_run_writes_nothing() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["schema", "apply", "--dry-run"]);

        assert!(output.status.success());
        assert!(stdout(&output).contains("Would write"));
        assert!(!repo.path().join("charts/web-service/values.schema.json").exists());
    }

    #[test]
    fn test_validate_values() {
        let repo = fixture_repo();
        let good = repo.path().join("good.yaml");
        let bad = repo.path().join("bad.yaml");
        fs::write(&good, "replicaCount: 2\n").unwrap();
        fs::write(&bad, "replicaCount: three\n").unwrap();

        let output = rita(
            repo.path(),
            &["schema", "validate", "-c", "web-service", "good.yaml"],
        );
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let output = rita(
            repo.path(),
            &["schema", "validate", "-c", "web-service", "bad.yaml"],
        );
        assert_eq!(output.status.code(), Some(2));
        assert!(stdout(&output).contains("Validation failed"));
    }

    #[test]
    fn test_validate_json_output() {
        let repo = fixture_repo();
        fs::write(repo.path().join("bad.yaml"), "replicaCount: three\n").unwrap();

        let output = rita(
            repo.path(),
            &["schema", "validate", "-c", "web-service", "bad.yaml", "--json"],
        );
        let json: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("Output should be valid JSON");

        assert_eq!(json["valid"], false);
        assert_eq!(json["chart"], "web-service");
        assert_eq!(json["files"], 1);
        assert!(!json["issues"].as_array().unwrap().is_empty());
    }
}

mod config_command {
    use super::*;

    #[test]
    fn test_init_show_path() {
        let repo = fixture_repo();

        let output = rita(repo.path(), &["config", "init"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(repo.path().join(".rita.yaml").is_file());

        let output = rita(repo.path(), &["config", "path"]);
        assert!(stdout(&output).trim().ends_with(".rita.yaml"));

        let output = rita(repo.path(), &["config", "show"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("kind_cluster_name"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let repo = fixture_repo();
        assert!(rita(repo.path(), &["config", "init"]).status.success());

        let output = rita(repo.path(), &["config", "init"]);
        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("--force"));

        assert!(rita(repo.path(), &["config", "init", "--force"]).status.success());
    }

    #[test]
    fn test_check_defaults() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["config", "check"]);

        // default prod path does not exist in the fixture: warning only
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("path not found"));
    }

    #[test]
    fn test_check_reports_errors() {
        let repo = fixture_repo();
        fs::write(
            repo.path().join(".rita.yaml"),
            "environments:\n  - name: dev\n    paths: [apps]\n  - name: dev\n    paths: [apps]\ntest:\n  timeout_seconds: 0\n",
        )
        .unwrap();

        let output = rita(repo.path(), &["config", "check"]);
        assert_eq!(output.status.code(), Some(4));
        assert!(stdout(&output).contains("more than once"));

        let output = rita(repo.path(), &["config", "show"]);
        assert!(output.status.success(), "config show tolerates invalid files");
    }

    #[test]
    fn test_discover_environments_and_charts() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["config", "discover"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("Environments (2, defaults)"));
        assert!(out.contains("dev  2 application(s)"));
        assert!(out.contains("prod  0 application(s)"));
        assert!(out.contains("web-service  values model WebServiceValues"));

        fs::write(repo.path().join(".rita.yaml"), "environments: []\n").unwrap();
        let output = rita(repo.path(), &["config", "discover"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("Environments (1, auto-discovered)"));
    }

    #[test]
    fn test_discover_path() {
        let repo = fixture_repo();
        let output = rita(
            repo.path(),
            &["config", "discover", "--path", "kubernetes/argocd/applications"],
        );
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("billing"));
        assert!(out.contains("redis"));

        let output = rita(repo.path(), &["config", "discover", "--path", "nowhere"]);
        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn test_invalid_config_rejected_by_other_commands() {
        let repo = fixture_repo();
        fs::write(
            repo.path().join(".rita.yaml"),
            "environments:\n  - name: dev\n    paths: [apps]\ntest:\n  timeout_seconds: 0\n",
        )
        .unwrap();

        let output = rita(repo.path(), &["render", "list"]);
        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("timeout_seconds"));
    }
}

mod init_command {
    use super::*;

    #[test]
    fn test_init_detects_environments() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["init", "--registry", "ghcr.io/acme"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let config = fs::read_to_string(repo.path().join(".rita.yaml")).unwrap();
        assert!(config.contains("kubernetes/argocd/applications/dev/templates"));
        assert!(!config.contains("applications/prod"));
        assert!(config.contains("ghcr.io/acme"));

        let output = rita(repo.path(), &["init"]);
        assert_eq!(output.status.code(), Some(4));
    }
}

mod chart_command {
    use super::*;

    #[test]
    fn test_new_chart() {
        let repo = fixture_repo();
        let output = rita(
            repo.path(),
            &["chart", "new", "billing-api", "--schema-out", "models"],
        );

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(repo.path().join("charts/billing-api/Chart.yaml").is_file());
        assert!(repo.path().join("charts/billing-api/templates").is_dir());
        assert!(repo.path().join("models/billing_api.rs").is_file());
        assert!(stdout(&output).contains("BillingApiValues"));
    }

    #[test]
    fn test_new_chart_refuses_existing() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["chart", "new", "web-service"]);
        assert!(!output.status.success());
    }
}

mod render_command {
    use super::*;

    #[test]
    fn test_list_applications() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["render", "list", "-e", "dev"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("billing"));
        assert!(out.contains("redis"));
        assert!(out.contains("local"));
        assert!(out.contains("external"));
    }

    #[test]
    fn test_list_alias_resolves() {
        let repo = fixture_repo();
        fs::write(
            repo.path().join(".rita.yaml"),
            "environments:\n  - name: dev\n    aliases: [development]\n    paths: [kubernetes/argocd/applications/dev/templates]\n",
        )
        .unwrap();

        let output = rita(repo.path(), &["render", "list", "-e", "development"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("billing"));
    }

    #[test]
    fn test_unknown_environment() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["render", "list", "-e", "dve"]);

        assert_eq!(output.status.code(), Some(4));
        assert!(stderr(&output).contains("dev"));
    }

    #[test]
    fn test_apply_dry_run_skips_external_charts() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["render", "apply", "-e", "dev", "--dry-run"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("Would render billing"));
        assert!(!out.contains("Would render redis"));
        assert!(!repo.path().join("rendered").exists());
    }

    #[test]
    fn test_diff_json_without_apps() {
        let repo = fixture_repo();
        fs::create_dir_all(repo.path().join("kubernetes/argocd/applications/qa/templates")).unwrap();
        fs::write(
            repo.path().join(".rita.yaml"),
            "environments:\n  - name: qa\n    paths: [kubernetes/argocd/applications/qa/templates]\n",
        )
        .unwrap();

        let output = rita(repo.path(), &["render", "diff", "-e", "qa", "--json"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let report: serde_json::Value =
            serde_json::from_str(&stdout(&output)).expect("diff report should be JSON");
        assert_eq!(report["has_diff"], false);
        assert_eq!(report["results"], serde_json::json!([]));
        assert_eq!(report["message"], "No affected apps found");
    }

    #[test]
    fn test_diff_json_conflicts_with_github() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["render", "diff", "--json", "--github"]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_clean_requires_target() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["render", "clean"]);

        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("Nothing to clean"));
    }

    #[test]
    fn test_clean_environment() {
        let repo = fixture_repo();
        let rendered = repo.path().join("rendered/dev/billing");
        fs::create_dir_all(&rendered).unwrap();
        fs::write(rendered.join("_all.yaml"), "kind: ConfigMap\n").unwrap();

        let output = rita(repo.path(), &["render", "clean", "-e", "dev"]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(!repo.path().join("rendered/dev").exists());
    }
}

mod values_command {
    use super::*;

    #[test]
    fn test_list_external_only() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["values", "list"]);

        assert!(output.status.success(), "stderr: {}", stderr(&output));
        let out = stdout(&output);
        assert!(out.contains("redis"));
        assert!(!out.contains("billing"));
    }

    #[test]
    fn test_clean_temp_files() {
        let repo = fixture_repo();
        let values_dir = repo.path().join("kubernetes/redis");
        fs::create_dir_all(&values_dir).unwrap();
        fs::write(values_dir.join("values-dev.yaml"), "a: 1\n").unwrap();
        fs::write(values_dir.join("values-dev.temp.yaml"), "a: 2\n").unwrap();

        let output = rita(repo.path(), &["values", "clean", "--dry-run"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("Would delete"));
        assert!(values_dir.join("values-dev.temp.yaml").exists());

        let output = rita(repo.path(), &["values", "clean"]);
        assert!(output.status.success());
        assert!(!values_dir.join("values-dev.temp.yaml").exists());
        assert!(values_dir.join("values-dev.yaml").exists());
    }
}

mod test_command {
    use super::*;

    #[test]
    fn test_dry_run_requires_target() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["test", "dry-run"]);
        assert_eq!(output.status.code(), Some(2), "clap usage errors exit with 2");
    }

    #[test]
    fn test_dry_run_missing_chart() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["test", "dry-run", "-c", "nope"]);
        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("Chart not found"));
    }

    #[test]
    fn test_dry_run_external_app_rejected() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["test", "dry-run", "-a", "redis"]);
        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("external chart"));
    }
}

mod auth_command {
    use super::*;

    #[test]
    fn test_login_without_credentials() {
        let repo = fixture_repo();
        let output = rita(repo.path(), &["auth", "login", "-u", "", "-p", ""]);

        assert_eq!(output.status.code(), Some(64));
        let err = stderr(&output);
        assert!(err.contains("credentials"));
        assert!(err.contains("'ghcr.io'"));
    }
}

mod lore_command {
    use super::*;

    #[test]
    fn test_lore() {
        let dir = TempDir::new().unwrap();
        let output = rita(dir.path(), &["lore"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("Render It Then Argue"));
    }
}
