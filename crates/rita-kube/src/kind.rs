//! kind (Kubernetes in Docker) cluster management

use tracing::debug;

use crate::error::Result;
use crate::process::{CommandRunner, Tool, ToolCommand};

/// kubectl context name kind assigns to a cluster
pub fn context_name(cluster: &str) -> String {
    format!("kind-{}", cluster)
}

pub struct Kind<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Kind<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    fn command(&self) -> ToolCommand {
        ToolCommand::new(Tool::Kind)
    }

    pub fn is_available(&self) -> bool {
        self.runner.succeeds(&self.command().arg("version"))
    }

    /// Names of existing clusters
    pub fn clusters(&self) -> Result<Vec<String>> {
        let out = self.runner.run(&self.command().args(["get", "clusters"]))?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("No kind clusters"))
            .map(String::from)
            .collect())
    }

    pub fn cluster_exists(&self, name: &str) -> Result<bool> {
        Ok(self.clusters()?.iter().any(|c| c == name))
    }

    /// Create a cluster unless it already exists; returns whether it was created
    ///
    /// `wait` bounds how long kind waits for the control plane (e.g. `60s`).
    pub fn create_cluster(&self, name: &str, wait: &str) -> Result<bool> {
        if self.cluster_exists(name)? {
            debug!(cluster = name, "kind cluster already exists");
            return Ok(false);
        }
        self.runner.run(
            &self
                .command()
                .args(["create", "cluster", "--name", name, "--wait", wait]),
        )?;
        Ok(true)
    }

    /// Delete a cluster if present; returns whether anything was deleted
    pub fn delete_cluster(&self, name: &str) -> Result<bool> {
        if !self.cluster_exists(name)? {
            return Ok(false);
        }
        self.runner
            .run(&self.command().args(["delete", "cluster", "--name", name]))?;
        Ok(true)
    }
}
