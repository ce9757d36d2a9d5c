//! CLI command parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::core::define::OutputFormat;

/// branchdef - the current git branch as a build-time define.
#[derive(Parser)]
#[command(name = "branchdef")]
#[command(about = "Inject the current git branch as a build-time define")]
#[command(version = crate::build_info::LONG_VERSION)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Project directory (git working tree and watch root).
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Name of the injected constant.
    #[arg(long, global = true, env = "BRANCHDEF_VARIABLE")]
    pub variable_name: Option<String>,

    /// Suppress plugin diagnostics.
    #[arg(short, long, global = true)]
    pub silent: bool,

    /// Output format.
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output file path (stdout if not specified).
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply command-line overrides on top of loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(name) = &self.variable_name {
            config.plugin.variable_name.clone_from(name);
        }
        if self.silent {
            config.plugin.silent = true;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(path) = &self.output {
            config.output.path = Some(path.clone());
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the branch once and print the define table.
    Show,

    /// Keep the define table in sync while files change.
    #[command(visible_alias = "w")]
    Watch,

    /// Manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration.
    Show,

    /// Show the configuration file paths.
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_show() {
        let cli = Cli::parse_from(["branchdef", "show"]);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.dir, PathBuf::from("."));
        assert!(matches!(cli.command, Commands::Show));
    }

    #[test]
    fn cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["branchdef"]).is_err());
    }

    #[test]
    fn cli_parses_verbose_flag() {
        let cli = Cli::parse_from(["branchdef", "-v", "show"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["branchdef", "-vvv", "show"]);
        assert_eq!(cli.verbose, 3);
    }

    #[test]
    fn cli_parses_watch_alias() {
        let cli = Cli::parse_from(["branchdef", "w"]);
        assert!(matches!(cli.command, Commands::Watch));
    }

    #[test]
    fn cli_parses_plugin_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "branchdef",
            "watch",
            "--variable-name",
            "GIT_BRANCH",
            "--silent",
            "-f",
            "cargo",
            "-o",
            "branch.env",
            "-C",
            "/repo",
        ]);

        assert_eq!(cli.variable_name.as_deref(), Some("GIT_BRANCH"));
        assert!(cli.silent);
        assert_eq!(cli.format, Some(OutputFormat::Cargo));
        assert_eq!(cli.output, Some(PathBuf::from("branch.env")));
        assert_eq!(cli.dir, PathBuf::from("/repo"));
    }

    #[test]
    fn cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["branchdef", "show", "-f", "yaml"]).is_err());
    }

    #[test]
    fn cli_parses_config_commands() {
        let cli = Cli::parse_from(["branchdef", "config", "show"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Show
            }
        ));

        let cli = Cli::parse_from(["branchdef", "config", "path"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Path
            }
        ));
    }

    #[test]
    fn overrides_replace_config_values() {
        let cli = Cli::parse_from([
            "branchdef",
            "show",
            "--variable-name",
            "BRANCH",
            "-s",
            "-f",
            "env",
        ]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.plugin.variable_name, "BRANCH");
        assert!(config.plugin.silent);
        assert_eq!(config.output.format, OutputFormat::Env);
        assert!(config.output.path.is_none());
    }

    #[test]
    fn no_overrides_keep_config() {
        let cli = Cli::parse_from(["branchdef", "show"]);
        let mut config = Config::default();
        config.plugin.variable_name = "FROM_FILE".to_string();
        cli.apply_overrides(&mut config);
        assert_eq!(config.plugin.variable_name, "FROM_FILE");
    }

    #[test]
    fn cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
