//! Build session
//!
//! A minimal build host: an ordered extension list, an activation pass,
//! a watch-run hook and the merged define table the session would inject

use std::sync::Arc;
use std::time::Duration;

use crate::core::Result;
use crate::core::define::DefinePlugin;
use crate::core::host::{BuildHost, Definitions, SharedDefine, SharedExtension, WatchRunHook};
use crate::core::watcher::{FileEvent, FileWatcher};

/// Build session acting as a plugin host
#[derive(Default)]
pub struct BuildSession {
    extensions: Vec<SharedExtension>,
    watch_run: WatchRunHook,
    cycles: u64,
}

impl BuildSession {
    /// Create a session with no extensions
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with the given extensions registered
    #[must_use]
    pub fn with_extensions(extensions: Vec<SharedExtension>) -> Self {
        Self {
            extensions,
            ..Self::default()
        }
    }

    /// Register an extension
    pub fn register(&mut self, extension: SharedExtension) {
        tracing::debug!(extension = %extension.name(), "registered extension");
        self.extensions.push(extension);
    }

    /// Activate every extension registered so far.
    ///
    /// Extensions appended while the pass runs are not visited; they have
    /// to activate themselves.
    pub fn apply_extensions(&mut self) {
        let registered = self.extensions.clone();
        for extension in registered {
            tracing::debug!(extension = %extension.name(), "applying extension");
            extension.apply(self);
        }
    }

    /// Run the watch-run hook once
    pub fn run_watch_cycle(&mut self) {
        self.cycles += 1;
        tracing::debug!(cycle = self.cycles, "watch cycle started");
        self.watch_run.call();
    }

    /// Number of watch cycles run so far
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Names of registered extensions, in order
    #[must_use]
    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.iter().map(|ext| ext.name()).collect()
    }

    /// Define extensions registered with this session
    #[must_use]
    pub fn defines(&self) -> Vec<SharedDefine> {
        self.extensions
            .iter()
            .filter_map(|ext| self.as_define(ext))
            .collect()
    }

    /// Merged define table; later extensions win on conflicting names
    #[must_use]
    pub fn definitions(&self) -> Definitions {
        self.defines()
            .iter()
            .filter_map(|define| define.definitions())
            .fold(Definitions::new(), |mut merged, defs| {
                merged.extend(defs);
                merged
            })
    }

    /// Drive watch cycles from file events until `on_cycle` asks to stop.
    ///
    /// Each batch of events is debounced, then one watch cycle runs and
    /// `on_cycle` sees the session and the events that triggered it.
    /// Returning `Ok(false)` from `on_cycle` ends the loop.
    ///
    /// # Errors
    ///
    /// Returns error if the watcher fails or `on_cycle` fails.
    pub fn watch<F>(
        &mut self,
        watcher: &FileWatcher,
        debounce: Duration,
        mut on_cycle: F,
    ) -> Result<()>
    where
        F: FnMut(&Self, &[FileEvent]) -> Result<bool>,
    {
        loop {
            let mut events = watcher.recv()?;
            if events.is_empty() {
                continue;
            }

            std::thread::sleep(debounce);
            events.extend(watcher.poll());
            tracing::debug!(events = events.len(), "file changes detected");

            self.run_watch_cycle();
            if !on_cycle(self, &events)? {
                return Ok(());
            }
        }
    }
}

impl BuildHost for BuildSession {
    fn extensions(&mut self) -> &mut Vec<SharedExtension> {
        &mut self.extensions
    }

    fn as_define(&self, extension: &SharedExtension) -> Option<SharedDefine> {
        let define = Arc::clone(extension)
            .into_any()
            .downcast::<DefinePlugin>()
            .ok()?;
        Some(define)
    }

    fn create_define(&self, definitions: Definitions) -> SharedDefine {
        Arc::new(DefinePlugin::new(definitions))
    }

    fn watch_run(&mut self) -> &mut WatchRunHook {
        &mut self.watch_run
    }
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("extensions", &self.extension_names())
            .field("watch_run", &self.watch_run)
            .field("cycles", &self.cycles)
            .finish()
    }
}
