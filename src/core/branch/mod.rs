//! Current branch detection
//!
//! Shells out to `git` and degrades to a sentinel branch on any failure

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::core::{Error, Result};

/// Branch reported when detection fails.
pub const UNKNOWN_BRANCH: &str = "unknown";

/// Arguments asking git for the abbreviated name of `HEAD`.
const ABBREV_REF_ARGS: [&str; 3] = ["rev-parse", "--abbrev-ref", "HEAD"];

/// Source of the raw branch name
///
/// The live implementation is [`GitCli`]; tests substitute fakes.
pub trait BranchSource: Send + Sync {
    /// Return the raw, untrimmed branch name.
    ///
    /// # Errors
    ///
    /// Returns error if the branch cannot be determined.
    fn current_branch(&self) -> Result<String>;
}

/// Live branch source that runs `git rev-parse --abbrev-ref HEAD`
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    dir: Option<PathBuf>,
}

impl GitCli {
    /// Create a source using `git` from `PATH` in the current directory
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
            dir: None,
        }
    }

    /// Use a different git executable
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Run git inside `dir` instead of the current directory
    #[must_use]
    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn command_line(&self) -> String {
        format!("{} {}", self.program, ABBREV_REF_ARGS.join(" "))
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl BranchSource for GitCli {
    fn current_branch(&self) -> Result<String> {
        let mut command = Command::new(&self.program);
        command
            .args(ABBREV_REF_ARGS)
            .stdin(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }

        let output = command.output()?;
        if !output.status.success() {
            return Err(Error::GitExit {
                command: self.command_line(),
                status: output.status,
            });
        }

        String::from_utf8(output.stdout).map_err(|e| Error::InvalidOutput {
            command: self.command_line(),
            reason: e.to_string(),
        })
    }
}

/// Resolves the current branch, never failing
pub struct BranchResolver {
    source: Box<dyn BranchSource>,
    silent: bool,
}

impl BranchResolver {
    /// Create a resolver over any branch source
    #[must_use]
    pub fn new(source: Box<dyn BranchSource>, silent: bool) -> Self {
        Self { source, silent }
    }

    /// Resolve the current branch.
    ///
    /// Returns [`UNKNOWN_BRANCH`] when detection fails. Unless silent, the
    /// failure is logged at error level.
    #[must_use]
    pub fn resolve(&self) -> String {
        match self.try_resolve() {
            Ok(branch) => branch,
            Err(e) => {
                if !self.silent {
                    tracing::error!(
                        plugin = crate::core::plugin::PLUGIN_NAME,
                        error = %e,
                        "git branch detection failed"
                    );
                }
                UNKNOWN_BRANCH.to_string()
            }
        }
    }

    fn try_resolve(&self) -> Result<String> {
        let raw = self.source.current_branch()?;
        let branch = raw.trim();
        if branch.is_empty() {
            return Err(Error::EmptyBranch);
        }
        Ok(branch.to_string())
    }
}

impl std::fmt::Debug for BranchResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchResolver")
            .field("silent", &self.silent)
            .finish_non_exhaustive()
    }
}
