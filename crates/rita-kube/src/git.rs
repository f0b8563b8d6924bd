//! Git queries used for change detection

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::process::{CommandRunner, Tool, ToolCommand};

pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    cwd: PathBuf,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner, cwd: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            cwd: cwd.into(),
        }
    }

    fn command(&self) -> ToolCommand {
        ToolCommand::new(Tool::Git).current_dir(&self.cwd)
    }

    /// Top-level directory of the enclosing repository
    pub fn repo_root(&self) -> Result<PathBuf> {
        let out = self
            .runner
            .run(&self.command().args(["rev-parse", "--show-toplevel"]))?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Files changed on this branch since it diverged from `base`
    ///
    /// Uses the three-dot form, the same comparison a pull request shows.
    pub fn changed_files(&self, base: &str) -> Result<Vec<String>> {
        let range = format!("{}...HEAD", base);
        let out = self
            .runner
            .run(&self.command().args(["diff", "--name-only", range.as_str()]))?;
        Ok(parse_name_list(&out))
    }

    /// [`changed_files`](Self::changed_files) relative to `dir`
    ///
    /// Git reports paths from the top of the repository. When `dir` is a
    /// subdirectory, files outside it are dropped and the rest lose the prefix.
    pub fn changed_files_under(&self, base: &str, dir: &Path) -> Result<Vec<String>> {
        let files = self.changed_files(base)?;
        let top = self.repo_root()?;
        let top = top.canonicalize().unwrap_or(top);
        let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());

        let prefix = match dir.strip_prefix(&top) {
            Ok(sub) if !sub.as_os_str().is_empty() => {
                format!("{}/", sub.to_string_lossy().replace('\\', "/"))
            }
            _ => return Ok(files),
        };
        tracing::debug!(prefix = %prefix, "rebasing changed files onto workspace");
        Ok(files
            .into_iter()
            .filter_map(|file| file.strip_prefix(&prefix).map(String::from))
            .collect())
    }

}

fn parse_name_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
