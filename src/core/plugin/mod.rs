//! Git branch plugin
//!
//! Injects the current branch as a define and refreshes it on every watch
//! cycle where the branch has changed

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::branch::{BranchResolver, BranchSource, GitCli};
use crate::core::host::{BuildHost, Definitions, Extension, SharedDefine};

/// Name the plugin taps hooks and logs under.
pub const PLUGIN_NAME: &str = "GitBranchPlugin";

/// Constant name used when none is configured.
pub const DEFAULT_VARIABLE_NAME: &str = "__BRANCH__";

/// Plugin options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginOptions {
    /// Name of the injected constant.
    pub variable_name: String,

    /// Suppress informational and error diagnostics.
    pub silent: bool,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            variable_name: DEFAULT_VARIABLE_NAME.to_string(),
            silent: false,
        }
    }
}

#[derive(Default)]
struct PluginState {
    branch: Option<String>,
    define: Option<SharedDefine>,
}

/// Build host plugin exposing the current git branch as a define
pub struct GitBranchPlugin {
    options: Arc<PluginOptions>,
    resolver: Arc<BranchResolver>,
    state: Arc<Mutex<PluginState>>,
}

impl GitBranchPlugin {
    /// Create a plugin that asks `git` in the current directory
    #[must_use]
    pub fn new(options: PluginOptions) -> Self {
        Self::with_source(options, Box::new(GitCli::new()))
    }

    /// Create a plugin reading branches from `source`
    #[must_use]
    pub fn with_source(options: PluginOptions, source: Box<dyn BranchSource>) -> Self {
        let resolver = BranchResolver::new(source, options.silent);
        Self {
            options: Arc::new(options),
            resolver: Arc::new(resolver),
            state: Arc::new(Mutex::new(PluginState::default())),
        }
    }

    /// Branch seen by the last resolution, `None` before activation
    #[must_use]
    pub fn current_branch(&self) -> Option<String> {
        self.state.lock().branch.clone()
    }

    /// Activate against a build host.
    ///
    /// Resolves the branch, installs it into the host's define extension
    /// (reusing one if registered, creating one otherwise) and taps the
    /// watch-run hook so later branch switches are picked up.
    pub fn activate(&self, host: &mut dyn BuildHost) {
        let branch = self.resolver.resolve();
        log_info(
            &self.options,
            format_args!("initialized with branch: {branch}"),
        );
        self.state.lock().branch = Some(branch.clone());

        self.install_define(host, &branch);

        let options = Arc::clone(&self.options);
        let resolver = Arc::clone(&self.resolver);
        let state = Arc::clone(&self.state);
        host.watch_run().tap(PLUGIN_NAME, move || {
            on_watch_run(&options, &resolver, &state);
        });
    }

    fn install_define(&self, host: &mut dyn BuildHost, branch: &str) {
        let extensions = host.extensions().clone();
        let existing = extensions.iter().find_map(|ext| host.as_define(ext));

        if let Some(define) = existing {
            define.ensure_definitions();
            define.set_definition(&self.options.variable_name, quote(branch));
            self.state.lock().define = Some(define);
            return;
        }

        let mut seed = Definitions::new();
        seed.insert(self.options.variable_name.clone(), quote(branch));
        let define = host.create_define(seed);
        host.extensions().push(Arc::clone(&define).into_extension());
        self.state.lock().define = Some(Arc::clone(&define));

        // Appended after the host's own activation pass, so apply it here
        define.apply(host);
    }
}

impl Extension for GitBranchPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn apply(&self, host: &mut dyn BuildHost) {
        self.activate(host);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl std::fmt::Debug for GitBranchPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitBranchPlugin")
            .field("options", &self.options)
            .field("branch", &self.current_branch())
            .finish_non_exhaustive()
    }
}

fn on_watch_run(options: &PluginOptions, resolver: &BranchResolver, state: &Mutex<PluginState>) {
    let branch = resolver.resolve();
    let mut state = state.lock();

    let previous = state.branch.as_deref().unwrap_or_default();
    if previous == branch {
        return;
    }

    log_info(options, format_args!("branch changed: {previous} → {branch}"));
    let value = quote(&branch);
    state.branch = Some(branch);

    // A missing define table is the host's problem, not ours
    if let Some(define) = &state.define {
        define.set_definition(&options.variable_name, value);
    }
}

fn log_info(options: &PluginOptions, message: std::fmt::Arguments<'_>) {
    if !options.silent {
        tracing::info!(plugin = PLUGIN_NAME, "{message}");
    }
}

/// JSON-quote a branch so it can be substituted as a string literal
fn quote(branch: &str) -> String {
    serde_json::Value::from(branch).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Result;

    struct Fixed(&'static str);

    impl BranchSource for Fixed {
        fn current_branch(&self) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn default_options() {
        let options = PluginOptions::default();
        assert_eq!(options.variable_name, "__BRANCH__");
        assert!(!options.silent);
    }

    #[test]
    fn options_fill_missing_fields_from_defaults() {
        let options: PluginOptions = toml::from_str("silent = true").unwrap();
        assert_eq!(options.variable_name, DEFAULT_VARIABLE_NAME);
        assert!(options.silent);
    }

    #[test]
    fn quote_produces_json_string_literal() {
        assert_eq!(quote("main"), "\"main\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn branch_is_unset_before_activation() {
        let plugin = GitBranchPlugin::with_source(PluginOptions::default(), Box::new(Fixed("main")));
        assert!(plugin.current_branch().is_none());
        assert_eq!(plugin.name(), PLUGIN_NAME);
    }
}
