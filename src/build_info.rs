//! Build information captured at compile time.

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git commit hash (7 chars).
pub const BUILD_HASH: &str = env!("BUILD_HASH");

/// Branch the binary was built from.
pub const BUILD_BRANCH: &str = env!("BUILD_BRANCH");

/// Full version string including hash and branch.
///
/// Format: `0.1.0 (abc1234 on main)`.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_HASH"),
    " on ",
    env!("BUILD_BRANCH"),
    ")"
);
