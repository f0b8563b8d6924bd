//! Auth commands - registry logins for Helm

use clap::Subcommand;
use console::style;
use rita_kube::credentials::{self, Credentials, DockerAuthStatus};
use rita_kube::{Helm, KubeError, SystemRunner, registry_host, resolve_registry_credentials};
use std::io::{BufRead, Write};

use crate::display;
use crate::error::{CliError, Result};
use crate::util::Context;

const DEFAULT_REGISTRY: &str = "ghcr.io";

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Log in to an OCI registry (GitHub CLI token by default)
    Login {
        /// Registry host
        #[arg(short, long, default_value = DEFAULT_REGISTRY)]
        registry: String,

        /// Username
        #[arg(short, long, env = "GITHUB_USERNAME")]
        username: Option<String>,

        /// Password or token
        #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
        password: Option<String>,

        /// Take credentials from the GitHub CLI
        #[arg(long)]
        use_gh: bool,
    },

    /// Log out of an OCI registry
    Logout {
        /// Registry host
        #[arg(short, long, default_value = DEFAULT_REGISTRY)]
        registry: String,
    },

    /// Show whether a registry login is stored
    Status {
        /// Registry host
        #[arg(short, long, default_value = DEFAULT_REGISTRY)]
        registry: String,
    },

    /// Log in to every registry listed in the configuration
    Registries,

    /// Add the read:packages scope to the GitHub CLI token
    RefreshScopes,

    /// Log in to Google Artifact Registry with the gcloud token
    Gcp {
        /// GCP project (defaults to the gcloud configuration)
        #[arg(long)]
        project: Option<String>,

        /// Artifact Registry region
        #[arg(long, default_value = "us")]
        region: String,

        /// Repository name, shown in the chart reference hint
        #[arg(long)]
        repository: Option<String>,
    },

    /// Log in to Azure Container Registry
    Azure {
        /// Registry name or `<name>.azurecr.io`
        #[arg(short, long)]
        registry: String,

        /// Use AZURE_CLIENT_ID / AZURE_CLIENT_SECRET instead of `az acr login`
        #[arg(long)]
        use_sp: bool,
    },

    /// Log in to Amazon ECR
    Ecr {
        /// AWS region
        #[arg(long, env = "AWS_REGION")]
        region: Option<String>,

        /// AWS profile
        #[arg(long, env = "AWS_PROFILE")]
        profile: Option<String>,

        /// AWS account ID (defaults to the caller identity)
        #[arg(long, env = "AWS_ACCOUNT_ID")]
        account_id: Option<String>,
    },
}

pub fn run(ctx: &Context, command: AuthCommand) -> Result<()> {
    let runner = SystemRunner::new();
    let helm = Helm::new(&runner);
    match command {
        AuthCommand::Login {
            registry,
            username,
            password,
            use_gh,
        } => login(&runner, &helm, &registry, username, password, use_gh),
        AuthCommand::Logout { registry } => {
            helm.registry_logout(&registry)?;
            display::success(format!("Logged out of {}", registry));
            Ok(())
        }
        AuthCommand::Status { registry } => status(&registry),
        AuthCommand::Registries => registries(ctx, &runner, &helm),
        AuthCommand::RefreshScopes => {
            credentials::refresh_github_scopes(&runner)?;
            display::success("GitHub CLI token refreshed with read:packages");
            Ok(())
        }
        AuthCommand::Gcp {
            project,
            region,
            repository,
        } => gcp(&runner, &helm, project, &region, repository.as_deref()),
        AuthCommand::Azure { registry, use_sp } => azure(&runner, &helm, &registry, use_sp),
        AuthCommand::Ecr {
            region,
            profile,
            account_id,
        } => {
            let spinner = crate::util::spinner("Requesting ECR login password...");
            let result = credentials::ecr(
                &runner,
                region.as_deref(),
                profile.as_deref(),
                account_id.as_deref(),
            );
            spinner.finish_and_clear();
            let ecr = result?;
            helm_login(&helm, &ecr.registry, &ecr.credentials)
        }
    }
}

fn helm_login(helm: &Helm<'_>, registry: &str, creds: &Credentials) -> Result<()> {
    helm.registry_login(registry, &creds.username, &creds.password)?;
    display::success(format!(
        "Logged in to {} as {}",
        style(registry).cyan(),
        creds.username
    ));
    Ok(())
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}: ", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn login(
    runner: &SystemRunner,
    helm: &Helm<'_>,
    registry: &str,
    username: Option<String>,
    password: Option<String>,
    use_gh: bool,
) -> Result<()> {
    if use_gh || (username.is_none() && password.is_none()) {
        match credentials::github_cli(runner) {
            Ok(creds) => {
                display::step("Using GitHub CLI credentials");
                return helm_login(helm, registry, &creds);
            }
            Err(e) if use_gh => {
                return Err(CliError::tool(
                    format!("GitHub CLI credentials unavailable: {}", e),
                    "Run: gh auth login",
                ));
            }
            Err(e) => {
                tracing::debug!(error = %e, "gh credentials unavailable, prompting");
            }
        }
    }

    let username = match username {
        Some(u) => u,
        None => prompt_line("Username")?,
    };
    let password = match password {
        Some(p) => p,
        None => rpassword::prompt_password("Password: ")?,
    };
    if username.is_empty() || password.is_empty() {
        return Err(KubeError::MissingCredentials {
            registry: registry.to_string(),
        }
        .into());
    }
    helm_login(helm, registry, &Credentials::new(username, password))
}

fn status(registry: &str) -> Result<()> {
    let Some(path) = credentials::docker_config_path() else {
        display::warning("Cannot locate the home directory");
        return Ok(());
    };

    match credentials::docker_auth_status(&path, registry)? {
        DockerAuthStatus::NoConfig => {
            display::warning(format!("No Docker config found at {}", path.display()));
            display::hint(format!("Run: rita auth login -r {}", registry));
            return Ok(());
        }
        DockerAuthStatus::Authenticated => {
            display::success(format!("Authenticated to {}", registry));
        }
        DockerAuthStatus::NotAuthenticated => {
            display::failure(format!("Not authenticated to {}", registry));
            display::hint(format!("Run: rita auth login -r {}", registry));
        }
    }

    let logged_in = credentials::docker_logged_in_registries(&path)?;
    if !logged_in.is_empty() {
        display::header("Stored registry logins");
        for host in logged_in {
            println!("  {}", host);
        }
    }
    Ok(())
}

fn registries(ctx: &Context, runner: &SystemRunner, helm: &Helm<'_>) -> Result<()> {
    let workspace = ctx.workspace()?;
    if workspace.config.registries.is_empty() {
        display::warning("No registries configured");
        display::hint(format!("Add a `registries` section to {}", workspace.config_file().display()));
        return Ok(());
    }

    let mut failed = 0usize;
    for registry in &workspace.config.registries {
        let host = registry_host(&registry.url);
        let Some(creds) = resolve_registry_credentials(runner, &workspace.config, &registry.url)
        else {
            display::warning(format!("{}: no credentials, skipped", host));
            continue;
        };
        match helm.registry_login(host, &creds.username, &creds.password) {
            Ok(()) => display::success(format!("{}: logged in as {}", host, creds.username)),
            Err(e) => {
                failed += 1;
                display::failure(format!("{}: {}", host, e));
            }
        }
    }

    if failed > 0 {
        return Err(CliError::tool(
            format!("{} registry login(s) failed", failed),
            "Check the credentials configured for each registry",
        ));
    }
    Ok(())
}

fn gcp(
    runner: &SystemRunner,
    helm: &Helm<'_>,
    project: Option<String>,
    region: &str,
    repository: Option<&str>,
) -> Result<()> {
    let project = match project {
        Some(p) => p,
        None => credentials::gcp_project(runner)?,
    };
    let registry = credentials::gcp_registry(region);
    let creds = credentials::gcp_access_token(runner)?;
    helm_login(helm, &registry, &creds)?;

    display::key_value("Project", &project);
    if let Some(repository) = repository {
        display::hint(format!(
            "Charts are available at oci://{}/{}/{}",
            registry, project, repository
        ));
    }
    Ok(())
}

fn azure(runner: &SystemRunner, helm: &Helm<'_>, registry: &str, use_sp: bool) -> Result<()> {
    let (url, name) = credentials::acr_names(registry);
    let creds = if use_sp {
        credentials::azure_service_principal().ok_or_else(|| {
            CliError::usage(
                "Service principal credentials not set",
                "Export AZURE_CLIENT_ID and AZURE_CLIENT_SECRET",
            )
        })?
    } else {
        credentials::azure_acr_token(runner, &name)?
    };
    helm_login(helm, &url, &creds)
}
