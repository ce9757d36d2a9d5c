//! Build host contract consumed by plugins
//!
//! A host owns an ordered list of extensions, knows which of them is its
//! constant-injection ("define") extension, and exposes a watch-run hook

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Constant name to pre-serialized literal value.
pub type Definitions = BTreeMap<String, String>;

/// Extension registered with a host.
pub type SharedExtension = Arc<dyn Extension>;

/// Handle to a host's define extension.
pub type SharedDefine = Arc<dyn DefineExtension>;

/// Callback run at the start of every watch cycle.
pub type WatchRunCallback = Box<dyn FnMut() + Send>;

/// Something the host can register and activate
pub trait Extension: Send + Sync + 'static {
    /// Name used in host diagnostics
    fn name(&self) -> &str;

    /// Activate against the host
    ///
    /// Extensions without an activation step keep the default no-op.
    fn apply(&self, _host: &mut dyn BuildHost) {}

    /// Erase to `Any` so hosts can recognise their own extension types
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// The host's constant-injection extension
///
/// Owns a table from constant name to a literal that is substituted
/// verbatim into source. The table may be absent until
/// [`DefineExtension::ensure_definitions`] is called.
pub trait DefineExtension: Extension {
    /// Create an empty table if none exists
    fn ensure_definitions(&self);

    /// Snapshot of the table, `None` if absent
    fn definitions(&self) -> Option<Definitions>;

    /// Current value for `name`
    fn definition(&self, name: &str) -> Option<String> {
        self.definitions().and_then(|mut defs| defs.remove(name))
    }

    /// Write `value` under `name`
    ///
    /// Returns `false` without writing when the table is absent.
    fn set_definition(&self, name: &str, value: String) -> bool;

    /// View this define extension as a plain extension
    fn into_extension(self: Arc<Self>) -> SharedExtension;
}

/// Handle a host passes to plugins during activation
pub trait BuildHost {
    /// Registered extensions, in registration order
    fn extensions(&mut self) -> &mut Vec<SharedExtension>;

    /// Identity check for the host's define extension type
    fn as_define(&self, extension: &SharedExtension) -> Option<SharedDefine>;

    /// Construct a new define extension seeded with `definitions`
    fn create_define(&self, definitions: Definitions) -> SharedDefine;

    /// Hook fired at the start of each watch cycle
    fn watch_run(&mut self) -> &mut WatchRunHook;
}

/// Named taps invoked in registration order
#[derive(Default)]
pub struct WatchRunHook {
    taps: Vec<(String, WatchRunCallback)>,
}

impl WatchRunHook {
    /// Create a hook with no taps
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback under `name`
    pub fn tap(&mut self, name: impl Into<String>, callback: impl FnMut() + Send + 'static) {
        let name = name.into();
        tracing::debug!(tap = %name, "tapped watch-run hook");
        self.taps.push((name, Box::new(callback)));
    }

    /// Run every tap
    pub fn call(&mut self) {
        for (name, callback) in &mut self.taps {
            tracing::trace!(tap = %name, "calling watch-run tap");
            callback();
        }
    }

    /// Names of registered taps
    #[must_use]
    pub fn taps(&self) -> Vec<&str> {
        self.taps.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Whether any tap is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }
}

impl fmt::Debug for WatchRunHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRunHook")
            .field("taps", &self.taps())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn hook_calls_taps_in_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut hook = WatchRunHook::new();

        let first = Arc::clone(&order);
        hook.tap("first", move || first.lock().push(1));
        let second = Arc::clone(&order);
        hook.tap("second", move || second.lock().push(2));

        hook.call();
        hook.call();

        assert_eq!(*order.lock(), vec![1, 2, 1, 2]);
        assert_eq!(hook.taps(), vec!["first", "second"]);
    }

    #[test]
    fn empty_hook_is_a_noop() {
        let mut hook = WatchRunHook::new();
        assert!(hook.is_empty());
        hook.call();
    }

    #[test]
    fn taps_may_keep_state() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut hook = WatchRunHook::new();
        let counter = Arc::clone(&count);
        hook.tap("counter", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..3 {
            hook.call();
        }

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
