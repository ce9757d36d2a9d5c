//! Constant-injection extension and its renderers
//!
//! `DefinePlugin` holds the define table a build session substitutes into
//! source; the renderers turn that table into files other tools consume

use std::any::Any;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::host::{BuildHost, DefineExtension, Definitions, Extension, SharedExtension};

/// Name the define extension registers under
pub const DEFINE_PLUGIN_NAME: &str = "DefinePlugin";

/// Define table owned by a build session
#[derive(Debug, Default)]
pub struct DefinePlugin {
    definitions: Mutex<Option<Definitions>>,
    applied: AtomicBool,
}

impl DefinePlugin {
    /// Create a define extension seeded with `definitions`
    #[must_use]
    pub fn new(definitions: Definitions) -> Self {
        Self {
            definitions: Mutex::new(Some(definitions)),
            applied: AtomicBool::new(false),
        }
    }

    /// Create a define extension whose table has not been set up yet
    #[must_use]
    pub fn without_definitions() -> Self {
        Self::default()
    }

    /// Drop the table entirely
    pub fn clear_definitions(&self) {
        *self.definitions.lock() = None;
    }

    /// Whether the host has activated this extension
    #[must_use]
    pub fn is_applied(&self) -> bool {
        self.applied.load(Ordering::SeqCst)
    }
}

impl Extension for DefinePlugin {
    fn name(&self) -> &str {
        DEFINE_PLUGIN_NAME
    }

    fn apply(&self, _host: &mut dyn BuildHost) {
        self.applied.store(true, Ordering::SeqCst);
        let count = self.definitions.lock().as_ref().map_or(0, Definitions::len);
        tracing::debug!(definitions = count, "applied define plugin");
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl DefineExtension for DefinePlugin {
    fn ensure_definitions(&self) {
        self.definitions.lock().get_or_insert_with(Definitions::new);
    }

    fn definitions(&self) -> Option<Definitions> {
        self.definitions.lock().clone()
    }

    fn set_definition(&self, name: &str, value: String) -> bool {
        match self.definitions.lock().as_mut() {
            Some(defs) => {
                defs.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }

    fn into_extension(self: Arc<Self>) -> SharedExtension {
        self
    }
}

/// Output format for a rendered define table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A JSON object of name to literal
    #[default]
    Json,
    /// `NAME=literal` lines
    Env,
    /// `pub const NAME: &str = "...";` items
    Rust,
    /// `cargo:rustc-env=NAME=value` build-script directives
    Cargo,
}

/// Render `definitions` in the requested format.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render(definitions: &Definitions, format: OutputFormat) -> serde_json::Result<String> {
    let rendered = match format {
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(definitions)?;
            out.push('\n');
            out
        }
        OutputFormat::Env => definitions.iter().fold(String::new(), |mut out, (name, value)| {
            let _ = writeln!(out, "{name}={value}");
            out
        }),
        OutputFormat::Rust => definitions.iter().fold(String::new(), |mut out, (name, value)| {
            let _ = match decode_literal(value) {
                Some(text) => writeln!(out, "pub const {name}: &str = {text:?};"),
                None => writeln!(out, "pub const {name}: &str = {value:?};"),
            };
            out
        }),
        OutputFormat::Cargo => definitions.iter().fold(String::new(), |mut out, (name, value)| {
            let text = decode_literal(value).unwrap_or_else(|| value.clone());
            let _ = writeln!(out, "cargo:rustc-env={name}={text}");
            out
        }),
    };
    Ok(rendered)
}

/// Decode a JSON string literal back to its text
fn decode_literal(value: &str) -> Option<String> {
    serde_json::from_str::<String>(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, branch: &str) -> Definitions {
        let mut defs = Definitions::new();
        defs.insert(name.to_string(), serde_json::to_string(branch).unwrap());
        defs
    }

    #[test]
    fn seeded_plugin_exposes_definitions() {
        let plugin = DefinePlugin::new(table("__BRANCH__", "main"));
        assert_eq!(
            plugin.definition("__BRANCH__"),
            Some("\"main\"".to_string())
        );
        assert!(!plugin.is_applied());
    }

    #[test]
    fn set_definition_requires_table() {
        let plugin = DefinePlugin::without_definitions();
        assert!(!plugin.set_definition("__BRANCH__", "\"main\"".to_string()));
        assert!(plugin.definitions().is_none());

        plugin.ensure_definitions();
        assert!(plugin.set_definition("__BRANCH__", "\"main\"".to_string()));
        assert_eq!(plugin.definitions().unwrap().len(), 1);
    }

    #[test]
    fn ensure_definitions_keeps_existing_entries() {
        let plugin = DefinePlugin::new(table("VERSION", "1.0"));
        plugin.ensure_definitions();
        assert_eq!(plugin.definition("VERSION"), Some("\"1.0\"".to_string()));
    }

    #[test]
    fn clear_definitions_removes_table() {
        let plugin = DefinePlugin::new(table("__BRANCH__", "main"));
        plugin.clear_definitions();
        assert!(plugin.definitions().is_none());
    }

    #[test]
    fn downcasts_through_any() {
        let ext: SharedExtension = Arc::new(DefinePlugin::default());
        assert!(ext.into_any().downcast::<DefinePlugin>().is_ok());
    }

    #[test]
    fn renders_json_object() {
        let out = render(&table("__BRANCH__", "feature/foo"), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["__BRANCH__"], "\"feature/foo\"");
    }

    #[test]
    fn renders_env_lines_with_literals() {
        let out = render(&table("__BRANCH__", "main"), OutputFormat::Env).unwrap();
        assert_eq!(out, "__BRANCH__=\"main\"\n");
    }

    #[test]
    fn renders_rust_consts() {
        let out = render(&table("GIT_BRANCH", "feature/\"quoted\""), OutputFormat::Rust).unwrap();
        assert_eq!(
            out,
            "pub const GIT_BRANCH: &str = \"feature/\\\"quoted\\\"\";\n"
        );
    }

    #[test]
    fn renders_rust_const_for_non_string_literal() {
        let mut defs = Definitions::new();
        defs.insert("DEBUG".to_string(), "true".to_string());
        let out = render(&defs, OutputFormat::Rust).unwrap();
        assert_eq!(out, "pub const DEBUG: &str = \"true\";\n");
    }

    #[test]
    fn renders_cargo_directives_with_decoded_values() {
        let out = render(&table("GIT_BRANCH", "release/1.2"), OutputFormat::Cargo).unwrap();
        assert_eq!(out, "cargo:rustc-env=GIT_BRANCH=release/1.2\n");
    }

    #[test]
    fn output_format_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: OutputFormat,
        }

        let wrapper: Wrapper = toml::from_str("format = \"cargo\"").unwrap();
        assert_eq!(wrapper.format, OutputFormat::Cargo);
    }
}
