//! Registry credential sources
//!
//! Credentials are never logged; [`Credentials`] redacts the secret in its
//! `Debug` output.

use std::fmt;
use std::path::{Path, PathBuf};

use rita_core::RitaConfig;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{KubeError, Result};
use crate::process::{CommandRunner, Tool, ToolCommand};

/// Username ACR expects when logging in with an exchanged token
pub const ACR_TOKEN_USERNAME: &str = "00000000-0000-0000-0000-000000000000";

/// Username Artifact Registry expects for OAuth access tokens
pub const GCP_TOKEN_USERNAME: &str = "oauth2accesstoken";

/// Username ECR expects
pub const ECR_USERNAME: &str = "AWS";

/// A username and secret for a registry login
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn non_empty(output: String, command: &ToolCommand) -> Result<String> {
    let value = output.trim().to_string();
    if value.is_empty() {
        return Err(KubeError::InvalidOutput {
            command: command.to_string(),
            message: "empty output".to_string(),
        });
    }
    Ok(value)
}

fn run_trimmed(runner: &dyn CommandRunner, command: ToolCommand) -> Result<String> {
    let out = runner.run(&command)?;
    non_empty(out, &command)
}

// ============================================================================
// GitHub CLI
// ============================================================================

/// Token and login of the authenticated GitHub CLI user
pub fn github_cli(runner: &dyn CommandRunner) -> Result<Credentials> {
    let token = run_trimmed(runner, ToolCommand::new(Tool::Gh).args(["auth", "token"]))?;
    let user = run_trimmed(
        runner,
        ToolCommand::new(Tool::Gh).args(["api", "user", "--jq", ".login"]),
    )?;
    Ok(Credentials::new(user, token))
}

/// Add the `read:packages` scope to the GitHub CLI token (interactive)
pub fn refresh_github_scopes(runner: &dyn CommandRunner) -> Result<()> {
    runner.run(&ToolCommand::new(Tool::Gh).args(["auth", "refresh", "-s", "read:packages"]))?;
    Ok(())
}

// ============================================================================
// Cloud registries
// ============================================================================

/// An ECR registry host and its login
#[derive(Debug, Clone)]
pub struct RegistryLogin {
    pub registry: String,
    pub credentials: Credentials,
}

fn aws_command(region: Option<&str>, profile: Option<&str>) -> ToolCommand {
    let mut cmd = ToolCommand::new(Tool::Aws);
    if let Some(profile) = profile {
        cmd = cmd.args(["--profile", profile]);
    }
    if let Some(region) = region {
        cmd = cmd.args(["--region", region]);
    }
    cmd
}

/// Resolve an ECR registry and login password
///
/// Account and region fall back to `aws sts get-caller-identity` and the
/// configured default region.
pub fn ecr(
    runner: &dyn CommandRunner,
    region: Option<&str>,
    profile: Option<&str>,
    account_id: Option<&str>,
) -> Result<RegistryLogin> {
    let account = match account_id {
        Some(id) => id.to_string(),
        None => run_trimmed(
            runner,
            aws_command(region, profile).args([
                "sts",
                "get-caller-identity",
                "--query",
                "Account",
                "--output",
                "text",
            ]),
        )?,
    };
    let region = match region {
        Some(r) => r.to_string(),
        None => run_trimmed(
            runner,
            aws_command(None, profile).args(["configure", "get", "region"]),
        )?,
    };

    let password = run_trimmed(
        runner,
        aws_command(Some(&region), profile).args(["ecr", "get-login-password"]),
    )?;

    Ok(RegistryLogin {
        registry: format!("{}.dkr.ecr.{}.amazonaws.com", account, region),
        credentials: Credentials::new(ECR_USERNAME, password),
    })
}

/// Artifact Registry host for a region: `us` -> `us-docker.pkg.dev`
pub fn gcp_registry(region: &str) -> String {
    format!("{}-docker.pkg.dev", region)
}

/// Access token from the active gcloud account
pub fn gcp_access_token(runner: &dyn CommandRunner) -> Result<Credentials> {
    let token = run_trimmed(
        runner,
        ToolCommand::new(Tool::Gcloud).args(["auth", "print-access-token"]),
    )?;
    Ok(Credentials::new(GCP_TOKEN_USERNAME, token))
}

/// Project configured in gcloud
pub fn gcp_project(runner: &dyn CommandRunner) -> Result<String> {
    run_trimmed(
        runner,
        ToolCommand::new(Tool::Gcloud).args(["config", "get-value", "project"]),
    )
}

/// `myacr` or `myacr.azurecr.io` -> (`myacr.azurecr.io`, `myacr`)
pub fn acr_names(registry: &str) -> (String, String) {
    match registry.strip_suffix(".azurecr.io") {
        Some(name) => (registry.to_string(), name.to_string()),
        None => (format!("{}.azurecr.io", registry), registry.to_string()),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcrToken {
    #[serde(default)]
    access_token: String,
}

/// Exchange the Azure CLI session for an ACR token
pub fn azure_acr_token(runner: &dyn CommandRunner, registry_name: &str) -> Result<Credentials> {
    let cmd = ToolCommand::new(Tool::Az).args([
        "acr",
        "login",
        "--name",
        registry_name,
        "--expose-token",
        "--output",
        "json",
    ]);
    let out = runner.run(&cmd)?;
    let token: AcrToken = serde_json::from_str(&out).map_err(|e| KubeError::InvalidOutput {
        command: cmd.to_string(),
        message: e.to_string(),
    })?;
    Ok(Credentials::new(ACR_TOKEN_USERNAME, token.access_token))
}

/// Service principal from `AZURE_CLIENT_ID` / `AZURE_CLIENT_SECRET`
pub fn azure_service_principal() -> Option<Credentials> {
    let id = std::env::var("AZURE_CLIENT_ID").ok().filter(|v| !v.is_empty())?;
    let secret = std::env::var("AZURE_CLIENT_SECRET")
        .ok()
        .filter(|v| !v.is_empty())?;
    Some(Credentials::new(id, secret))
}

// ============================================================================
// AWS Secrets Manager
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretPayload {
    username: Option<String>,
    password: Option<String>,
    access_token: Option<String>,
}

/// Parse a secret holding `username` and `password` (or `accessToken`)
pub fn parse_secret(secret: &str) -> Option<Credentials> {
    let payload: SecretPayload = serde_json::from_str(secret.trim()).ok()?;
    let username = payload.username?;
    let password = payload.password.or(payload.access_token)?;
    Some(Credentials::new(username, password))
}

/// Fetch registry credentials stored in AWS Secrets Manager
pub fn aws_secret(
    runner: &dyn CommandRunner,
    secret_name: &str,
    region: Option<&str>,
    profile: Option<&str>,
) -> Result<Credentials> {
    let cmd = aws_command(region, profile).args([
        "secretsmanager",
        "get-secret-value",
        "--secret-id",
        secret_name,
        "--query",
        "SecretString",
        "--output",
        "text",
    ]);
    let out = runner.run(&cmd)?;
    parse_secret(&out).ok_or_else(|| KubeError::InvalidOutput {
        command: cmd.to_string(),
        message: "secret must be JSON with 'username' and 'password' or 'accessToken'".to_string(),
    })
}

/// Credentials configured for a registry URL
///
/// An AWS secret takes precedence; when it cannot be fetched the
/// username/password fields (literal or `$VAR`) are used. `None` when no
/// registry matches or the values are incomplete.
pub fn resolve_registry_credentials(
    runner: &dyn CommandRunner,
    config: &RitaConfig,
    url: &str,
) -> Option<Credentials> {
    let registry = config.registry_for(url)?;

    if let Some(secret) = &registry.aws_secret_name {
        match aws_secret(
            runner,
            secret,
            registry.aws_region.as_deref(),
            registry.aws_profile.as_deref(),
        ) {
            Ok(creds) => return Some(creds),
            Err(e) => warn!(registry = %registry.url, error = %e, "could not read registry secret"),
        }
    }

    match (registry.resolved_username(), registry.resolved_password()) {
        (Some(username), Some(password)) => Some(Credentials::new(username, password)),
        _ => {
            debug!(registry = %registry.url, "registry credentials incomplete");
            None
        }
    }
}

// ============================================================================
// Docker config
// ============================================================================

/// Login state recorded in the Docker client config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerAuthStatus {
    NoConfig,
    Authenticated,
    NotAuthenticated,
}

#[derive(Deserialize, Default)]
struct DockerConfig {
    #[serde(default)]
    auths: serde_json::Map<String, serde_json::Value>,
}

/// `~/.docker/config.json`
pub fn docker_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".docker").join("config.json"))
}

fn read_docker_config(path: &Path) -> Result<Option<DockerConfig>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Whether `registry` has an entry under `auths` in the given config file
pub fn docker_auth_status(config_path: &Path, registry: &str) -> Result<DockerAuthStatus> {
    Ok(match read_docker_config(config_path)? {
        None => DockerAuthStatus::NoConfig,
        Some(config) if config.auths.contains_key(registry) => DockerAuthStatus::Authenticated,
        Some(_) => DockerAuthStatus::NotAuthenticated,
    })
}

/// Registries with stored logins, sorted
pub fn docker_logged_in_registries(config_path: &Path) -> Result<Vec<String>> {
    let mut registries: Vec<String> = read_docker_config(config_path)?
        .map(|config| config.auths.keys().cloned().collect())
        .unwrap_or_default();
    registries.sort();
    Ok(registries)
}
