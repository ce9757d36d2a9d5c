//! Core plugin logic shared by the library and the `branchdef` binary.

pub mod branch;
pub mod define;
mod error;
pub mod host;
pub mod plugin;
pub mod session;
pub mod watcher;

pub use branch::{BranchResolver, BranchSource, GitCli, UNKNOWN_BRANCH};
pub use define::{DefinePlugin, OutputFormat};
pub use error::{Error, Result};
pub use host::{BuildHost, DefineExtension, Definitions, Extension, WatchRunHook};
pub use plugin::{GitBranchPlugin, PluginOptions};
pub use session::BuildSession;
