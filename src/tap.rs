use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::conn::attach_hooks;
use crate::error::Result;
use crate::hooks::{
    AfterHook, BeforeHook, BeginHook, CloseHook, ExecuteHook, HookSet, OpenHook, PrepareHook,
    QueryHook,
};
use crate::traits::{DatabaseDriver, DriverConnection};

/// A named driver that forwards every operation to an inner driver, routing
/// each call through the configured hooks.
///
/// Create one with [`crate::register`]. Hooks start out absent (every
/// operation passes straight through) and may be set at any point before the
/// connections they should affect go to work; the hook set is shared by all
/// connections opened through this tap, and a replacement takes effect from
/// the next operation onward, never retroactively for a call in flight.
///
/// Configuring hooks concurrently with active traffic is not a data race,
/// but which calls see the old and which the new hook is then unspecified;
/// configure before first use.
pub struct Tap {
    name: String,
    inner: Box<dyn DatabaseDriver>,
    hooks: Arc<HookSet>,
}

impl fmt::Debug for Tap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tap")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Tap {
    pub(crate) fn new(name: impl Into<String>, inner: Box<dyn DatabaseDriver>) -> Self {
        Self {
            name: name.into(),
            inner,
            hooks: Arc::new(HookSet::default()),
        }
    }

    /// The name this tap is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs after each successful inner open, receiving the decorated
    /// connection; it may wrap, substitute, or reject it.
    pub fn on_open(&self, hook: impl OpenHook + 'static) {
        self.hooks.on_open.set(Arc::new(hook));
    }

    /// Replaces the begin operation.
    pub fn on_begin(&self, hook: impl BeginHook + 'static) {
        self.hooks.on_begin.set(Arc::new(hook));
    }

    /// Replaces the prepare operation.
    pub fn on_prepare(&self, hook: impl PrepareHook + 'static) {
        self.hooks.on_prepare.set(Arc::new(hook));
    }

    /// Replaces the close operation.
    pub fn on_close(&self, hook: impl CloseHook + 'static) {
        self.hooks.on_close.set(Arc::new(hook));
    }

    /// Replaces the direct-execute operation on capable connections.
    pub fn on_execute(&self, hook: impl ExecuteHook + 'static) {
        self.hooks.on_execute.set(Arc::new(hook));
    }

    /// Replaces the direct-query operation on capable connections.
    pub fn on_query(&self, hook: impl QueryHook + 'static) {
        self.hooks.on_query.set(Arc::new(hook));
    }

    /// Observes every operation before it runs.
    pub fn before_all(&self, hook: impl BeforeHook + 'static) {
        self.hooks.before_all.set(Arc::new(hook));
    }

    /// Observes every operation after it ran.
    pub fn after_all(&self, hook: impl AfterHook + 'static) {
        self.hooks.after_all.set(Arc::new(hook));
    }

    /// Opens a connection through the inner driver and decorates it.
    ///
    /// An inner open failure is returned unchanged without invoking any
    /// hook. On success the raw connection is wrapped according to its
    /// capability tag; a configured [`OpenHook`] then gets the final say. If
    /// the hook fails, its error is returned and the already-open raw
    /// connection is left to the hook (this layer does not close it).
    pub async fn open(&self, dsn: &str) -> Result<DriverConnection> {
        debug!(driver = %self.name, "opening connection");
        let raw = self.inner.open(dsn).await?;
        let conn = attach_hooks(raw, Arc::clone(&self.hooks));
        match self.hooks.on_open.get() {
            Some(hook) => hook.handle(dsn, conn).await,
            None => Ok(conn),
        }
    }
}
