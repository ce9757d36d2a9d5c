//! File watching that drives watch cycles
//!
//! Uses the notify crate to watch the project tree and emit change events

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// File change event
#[derive(Debug, Clone)]
pub struct FileEvent {
    /// Path to the changed file
    pub path: PathBuf,
    /// Type of change
    pub kind: FileEventKind,
}

/// Type of file change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    /// File was created
    Created,
    /// File was modified
    Modified,
    /// File was deleted
    Deleted,
}

/// File watcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Path fragments to ignore (beyond gitignore)
    pub ignore_patterns: Vec<String>,
    /// Debounce duration for events, in milliseconds
    pub debounce_ms: u64,
}

impl WatcherConfig {
    /// Debounce as a duration
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: vec![
                // HEAD and refs stay visible so branch switches trigger a cycle
                ".git/objects".to_string(),
                ".git/logs".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
                ".cache".to_string(),
            ],
            debounce_ms: 100,
        }
    }
}

/// File watcher for a directory
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    receiver: mpsc::Receiver<std::result::Result<Event, notify::Error>>,
    gitignore: Option<Gitignore>,
    ignore_patterns: Vec<String>,
    ignore_paths: Vec<PathBuf>,
    root: PathBuf,
}

impl FileWatcher {
    /// Create a new file watcher for a directory
    ///
    /// # Errors
    ///
    /// Returns error if watcher initialization fails
    pub fn new(root: impl AsRef<Path>, config: &WatcherConfig) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let (tx, rx) = mpsc::channel();

        let watcher_config = Config::default()
            .with_poll_interval(config.debounce())
            .with_compare_contents(false);

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            watcher_config,
        )?;

        let gitignore = Self::load_gitignore(&root);

        Ok(Self {
            watcher,
            receiver: rx,
            gitignore,
            ignore_patterns: config.ignore_patterns.clone(),
            ignore_paths: Vec::new(),
            root,
        })
    }

    /// Never report events for `path`
    ///
    /// Used for generated output inside the watched tree, which would
    /// otherwise retrigger the cycle that wrote it.
    #[must_use]
    pub fn ignoring(mut self, path: impl AsRef<Path>) -> Self {
        self.ignore_paths.push(absolute(&self.root, path.as_ref()));
        self
    }

    fn load_gitignore(root: &Path) -> Option<Gitignore> {
        let gitignore_path = root.join(".gitignore");
        if !gitignore_path.exists() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(root);
        if builder.add(&gitignore_path).is_some() {
            return None;
        }

        builder.build().ok()
    }

    /// Start watching the root directory
    ///
    /// # Errors
    ///
    /// Returns error if watching fails
    pub fn watch(&mut self) -> Result<()> {
        self.watcher.watch(&self.root, RecursiveMode::Recursive)?;
        tracing::info!(root = %self.root.display(), "started file watcher");
        Ok(())
    }

    /// Poll for file events (non-blocking)
    #[must_use]
    pub fn poll(&self) -> Vec<FileEvent> {
        let mut events = Vec::new();

        while let Ok(result) = self.receiver.try_recv() {
            if let Ok(event) = result {
                events.extend(self.process_event(event));
            }
        }

        events
    }

    /// Wait for next file event (blocking)
    ///
    /// # Errors
    ///
    /// Returns error if channel is disconnected
    pub fn recv(&self) -> Result<Vec<FileEvent>> {
        let result = self
            .receiver
            .recv()
            .map_err(|_| Error::WatcherDisconnected)?;

        Ok(self.process_event(result?))
    }

    /// Wait for next file event with timeout
    ///
    /// # Errors
    ///
    /// Returns error if channel is disconnected
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Vec<FileEvent>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(Ok(event)) => Ok(self.process_event(event)),
            Ok(Err(e)) => Err(e.into()),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(Vec::new()),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::WatcherDisconnected),
        }
    }

    fn process_event(&self, event: Event) -> Vec<FileEvent> {
        let kind = match event.kind {
            EventKind::Create(_) => FileEventKind::Created,
            EventKind::Modify(_) => FileEventKind::Modified,
            EventKind::Remove(_) => FileEventKind::Deleted,
            _ => return Vec::new(),
        };

        event
            .paths
            .into_iter()
            .filter(|path| !self.is_ignored(path))
            .map(|path| FileEvent { path, kind })
            .collect()
    }

    fn is_ignored(&self, path: &Path) -> bool {
        if self.ignore_paths.iter().any(|ignored| ignored == path) {
            return true;
        }

        // Check gitignore
        if let Some(ref gitignore) = self.gitignore {
            let is_dir = path.is_dir();
            if gitignore.matched(path, is_dir).is_ignore() {
                return true;
            }
        }

        // Check config ignores against the path below the root
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let path_str = relative.to_string_lossy();
        self.ignore_patterns
            .iter()
            .any(|pattern| path_str.contains(pattern.as_str()))
    }
}

fn absolute(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EventKind, path: PathBuf) -> Event {
        Event::new(kind).add_path(path)
    }

    #[test]
    fn default_config_keeps_head_visible() {
        let config = WatcherConfig::default();
        assert!(config.ignore_patterns.contains(&".git/objects".to_string()));
        assert!(config.ignore_patterns.contains(&"node_modules".to_string()));
        assert!(!config.ignore_patterns.iter().any(|p| ".git/HEAD".contains(p.as_str())));
        assert_eq!(config.debounce(), Duration::from_millis(100));
    }

    #[test]
    fn file_event_kind_equality() {
        assert_eq!(FileEventKind::Created, FileEventKind::Created);
        assert_ne!(FileEventKind::Created, FileEventKind::Modified);
    }

    #[test]
    fn filters_configured_patterns() {
        let temp = tempfile::tempdir().unwrap();
        let watcher = FileWatcher::new(temp.path(), &WatcherConfig::default()).unwrap();

        let ignored = watcher.process_event(event(
            EventKind::Modify(notify::event::ModifyKind::Any),
            temp.path().join("node_modules/pkg/index.js"),
        ));
        assert!(ignored.is_empty());

        let head = watcher.process_event(event(
            EventKind::Modify(notify::event::ModifyKind::Any),
            temp.path().join(".git/HEAD"),
        ));
        assert_eq!(head.len(), 1);
        assert_eq!(head[0].kind, FileEventKind::Modified);
    }

    #[test]
    fn ignores_explicit_output_path() {
        let temp = tempfile::tempdir().unwrap();
        let watcher = FileWatcher::new(temp.path(), &WatcherConfig::default())
            .unwrap()
            .ignoring("branch.json");

        let events = watcher.process_event(event(
            EventKind::Create(notify::event::CreateKind::File),
            temp.path().join("branch.json"),
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn drops_access_events() {
        let temp = tempfile::tempdir().unwrap();
        let watcher = FileWatcher::new(temp.path(), &WatcherConfig::default()).unwrap();

        let events = watcher.process_event(event(
            EventKind::Access(notify::event::AccessKind::Any),
            temp.path().join("src/main.rs"),
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn poll_is_empty_without_activity() {
        let temp = tempfile::tempdir().unwrap();
        let watcher = FileWatcher::new(temp.path(), &WatcherConfig::default()).unwrap();
        assert!(watcher.poll().is_empty());
        assert!(
            watcher
                .recv_timeout(Duration::from_millis(10))
                .unwrap()
                .is_empty()
        );
    }
}
