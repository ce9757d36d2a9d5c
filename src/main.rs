use std::io::Write as _;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use branch_define::{
    BuildSession, Config, GitBranchPlugin,
    cli::{Cli, Commands, ConfigCommands},
    core::{
        GitCli, define,
        host::{Definitions, SharedExtension},
        watcher::FileWatcher,
    },
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Plugin diagnostics are informational, so show them by default
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let dir = cli.dir.canonicalize()?;
    let mut config = Config::load(&dir)?;
    cli.apply_overrides(&mut config);

    match cli.command {
        Commands::Show => {
            let session = start_session(&dir, &config);
            emit(&session.definitions(), &config, &dir)?;
        }

        Commands::Watch => watch(&dir, &config)?,

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigCommands::Path => {
                println!("{}", Config::config_path()?.display());
                println!("{}", Config::project_config_path(&dir).display());
            }
        },
    }

    Ok(())
}

/// Build a session with the git branch plugin registered and activated
fn start_session(dir: &Path, config: &Config) -> BuildSession {
    let source = GitCli::new()
        .with_program(config.git.program.clone())
        .in_dir(dir);
    let plugin: SharedExtension = Arc::new(GitBranchPlugin::with_source(
        config.plugin.clone(),
        Box::new(source),
    ));

    let mut session = BuildSession::with_extensions(vec![plugin]);
    session.apply_extensions();
    session
}

fn watch(dir: &Path, config: &Config) -> anyhow::Result<()> {
    let mut session = start_session(dir, config);
    let mut last = session.definitions();
    emit(&last, config, dir)?;

    let mut watcher = FileWatcher::new(dir, &config.watch)?;
    if let Some(path) = &config.output.path {
        watcher = watcher.ignoring(dir.join(path));
    }
    watcher.watch()?;

    session.watch(&watcher, config.watch.debounce(), |session, _events| {
        let current = session.definitions();
        if current != last {
            emit(&current, config, dir)?;
            last = current;
        }
        Ok(true)
    })?;

    Ok(())
}

/// Render definitions to the configured file, or stdout
fn emit(
    definitions: &Definitions,
    config: &Config,
    dir: &Path,
) -> branch_define::core::Result<()> {
    let rendered = define::render(definitions, config.output.format)?;

    match &config.output.path {
        Some(path) => {
            let path = dir.join(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, rendered)?;
            tracing::debug!(path = %path.display(), "wrote definitions");
        }
        None => {
            print!("{rendered}");
            std::io::stdout().flush()?;
        }
    }

    Ok(())
}
