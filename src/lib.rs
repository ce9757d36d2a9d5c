//! git-branch-define - the current git branch as a build-time define.
//!
//! The library provides:
//! - a branch resolver that shells out to `git` and never fails
//! - a build host contract ([`core::host`]) and a plugin that keeps a
//!   define constant in sync with the checked-out branch
//! - a reference host ([`core::BuildSession`]) driven by a file watcher
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   activate    ┌─────────────────┐
//! │  Build host  │──────────────▶│ GitBranchPlugin │
//! │ (BuildHost)  │◀──────────────│                 │
//! └──────┬───────┘  define/tap   └────────┬────────┘
//!        │ watch-run                      │ resolve
//!        └───────────────────────────────▶│
//!                                ┌────────┴────────┐
//!                                │ BranchResolver  │──▶ git
//!                                └─────────────────┘
//! ```

pub mod build_info;
pub mod cli;
pub mod config;
pub mod core;

pub use config::Config;
pub use core::{BuildSession, GitBranchPlugin, PluginOptions};
