//! External process execution
//!
//! Every tool invocation goes through [`CommandRunner`], so the wrappers in
//! this crate can be exercised against a recording runner in tests.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{KubeError, Result};

/// External binaries RITA knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Helm,
    Kubectl,
    Kind,
    Kustomize,
    Git,
    Gh,
    Aws,
    Gcloud,
    Az,
}

impl Tool {
    /// Executable name looked up in PATH
    pub fn binary(self) -> &'static str {
        match self {
            Tool::Helm => "helm",
            Tool::Kubectl => "kubectl",
            Tool::Kind => "kind",
            Tool::Kustomize => "kustomize",
            Tool::Git => "git",
            Tool::Gh => "gh",
            Tool::Aws => "aws",
            Tool::Gcloud => "gcloud",
            Tool::Az => "az",
        }
    }

    /// Where to get the tool when it is missing
    pub fn install_hint(self) -> &'static str {
        match self {
            Tool::Helm => "https://helm.sh/docs/intro/install/",
            Tool::Kubectl => "https://kubernetes.io/docs/tasks/tools/",
            Tool::Kind => "https://kind.sigs.k8s.io/docs/user/quick-start/#installation",
            Tool::Kustomize => "https://kubectl.docs.kubernetes.io/installation/kustomize/",
            Tool::Git => "https://git-scm.com/downloads",
            Tool::Gh => "https://cli.github.com/",
            Tool::Aws => "https://aws.amazon.com/cli/",
            Tool::Gcloud => "https://cloud.google.com/sdk/docs/install",
            Tool::Az => "https://learn.microsoft.com/cli/azure/install-azure-cli",
        }
    }

    fn not_found(self) -> KubeError {
        KubeError::ToolNotFound {
            tool: self.binary().to_string(),
            hint: format!("install it from {}", self.install_hint()),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// A single invocation of an external tool
#[derive(Debug, Clone)]
pub struct ToolCommand {
    tool: Tool,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    stdin: Option<String>,
}

impl ToolCommand {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Data written to the child's stdin; never shown in logs
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn get_env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn get_stdin(&self) -> Option<&str> {
        self.stdin.as_deref()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool.binary())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Executes tool commands
pub trait CommandRunner {
    /// Run the command to completion and capture its output
    fn output(&self, command: &ToolCommand) -> Result<ToolOutput>;

    /// Whether the tool's binary can be found
    fn is_available(&self, tool: Tool) -> bool;

    /// Run the command and return stdout, failing on a non-zero exit
    fn run(&self, command: &ToolCommand) -> Result<String> {
        let output = self.output(command)?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(KubeError::CommandFailed {
                command: command.to_string(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    /// Run the command, reporting only whether it exited successfully
    fn succeeds(&self, command: &ToolCommand) -> bool {
        self.output(command).map(|o| o.success).unwrap_or(false)
    }
}

/// Runs commands as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn output(&self, command: &ToolCommand) -> Result<ToolOutput> {
        let tool = command.tool();
        let program = which::which(tool.binary()).map_err(|_| tool.not_found())?;

        debug!(command = %command, "running");

        let mut process = Command::new(program);
        process
            .args(command.get_args())
            .envs(command.get_env().iter().map(|(k, v)| (k, v)))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = command.get_current_dir() {
            process.current_dir(dir);
        }
        process.stdin(if command.get_stdin().is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let spawn_error = |source| KubeError::Spawn {
            command: command.to_string(),
            source,
        };

        let mut child = process.spawn().map_err(spawn_error)?;
        if let (Some(input), Some(mut pipe)) = (command.get_stdin(), child.stdin.take()) {
            pipe.write_all(input.as_bytes()).map_err(spawn_error)?;
        }
        let output = child.wait_with_output().map_err(spawn_error)?;

        let result = ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success {
            debug!(command = %command, code = ?result.code, "command failed");
        }
        Ok(result)
    }

    fn is_available(&self, tool: Tool) -> bool {
        which::which(tool.binary()).is_ok()
    }
}
