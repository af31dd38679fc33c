//! Hook points around the driver operations.
//!
//! Two kinds of hook exist:
//!
//! - **Replacement handlers** ([`OpenHook`], [`BeginHook`], [`PrepareHook`],
//!   [`CloseHook`], [`ExecuteHook`], [`QueryHook`]) run *instead of* the raw
//!   operation. They receive the raw connection (or its typed capability
//!   handle) together with the operation arguments and decide themselves
//!   whether to call through.
//! - **Observers** ([`BeforeHook`], [`AfterHook`]) run around every
//!   operation. They cannot alter the outcome: their signatures return `()`,
//!   so a "failing" observer is unrepresentable. Plain closures work as
//!   observers through the blanket impls.
//!
//! All hooks default to absent, which means pass-through behavior.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{DbTapError, Result};
use crate::traits::{
    Connection, DirectExecute, DirectQuery, DriverConnection, Statement, Transaction,
};
use crate::types::{ExecSummary, RowSet, SqlValue};

/// A driver operation together with its arguments, as seen by observers.
#[derive(Debug, Clone, Copy)]
pub enum OpEvent<'a> {
    Begin,
    Prepare { sql: &'a str },
    Close,
    Execute { sql: &'a str, params: &'a [SqlValue] },
    Query { sql: &'a str, params: &'a [SqlValue] },
}

impl OpEvent<'_> {
    /// The operation's name.
    pub fn name(&self) -> &'static str {
        match self {
            OpEvent::Begin => "begin",
            OpEvent::Prepare { .. } => "prepare",
            OpEvent::Close => "close",
            OpEvent::Execute { .. } => "execute",
            OpEvent::Query { .. } => "query",
        }
    }
}

/// The successful result of an operation, as seen by [`AfterHook`].
///
/// Handle-shaped results (transactions, statements) are opaque; value-shaped
/// results are borrowed.
#[derive(Debug, Clone, Copy)]
pub enum OpOutput<'a> {
    Begun,
    Prepared,
    Closed,
    Executed(&'a ExecSummary),
    Queried(&'a RowSet),
}

/// Runs after a successful inner open, receiving the decorated connection.
/// May hand it back unchanged, wrap it again, substitute it, or fail, in
/// which case the error becomes the result of the open call.
#[async_trait]
pub trait OpenHook: Send + Sync {
    async fn handle(&self, dsn: &str, conn: DriverConnection) -> Result<DriverConnection>;
}

/// Replaces [`Connection::begin`].
#[async_trait]
pub trait BeginHook: Send + Sync {
    async fn handle(&self, conn: &mut dyn Connection) -> Result<Box<dyn Transaction>>;
}

/// Replaces [`Connection::prepare`].
#[async_trait]
pub trait PrepareHook: Send + Sync {
    async fn handle(&self, conn: &mut dyn Connection, sql: &str) -> Result<Box<dyn Statement>>;
}

/// Replaces [`Connection::close`].
#[async_trait]
pub trait CloseHook: Send + Sync {
    async fn handle(&self, conn: &mut dyn Connection) -> Result<()>;
}

/// Replaces [`DirectExecute::execute`]. Only reachable on connections whose
/// raw counterpart has the direct-execute capability.
#[async_trait]
pub trait ExecuteHook: Send + Sync {
    async fn handle(
        &self,
        conn: &mut dyn DirectExecute,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<ExecSummary>;
}

/// Replaces [`DirectQuery::query`]. Only reachable on connections whose raw
/// counterpart has the direct-query capability.
#[async_trait]
pub trait QueryHook: Send + Sync {
    async fn handle(
        &self,
        conn: &mut dyn DirectQuery,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<RowSet>;
}

/// Observes every operation before it runs.
pub trait BeforeHook: Send + Sync {
    fn observe(&self, conn: &mut dyn Connection, event: &OpEvent<'_>);
}

impl<F> BeforeHook for F
where
    F: Fn(&mut dyn Connection, &OpEvent<'_>) + Send + Sync,
{
    fn observe(&self, conn: &mut dyn Connection, event: &OpEvent<'_>) {
        self(conn, event)
    }
}

/// Observes every operation after it ran, receiving the actual outcome.
pub trait AfterHook: Send + Sync {
    fn observe(
        &self,
        conn: &mut dyn Connection,
        event: &OpEvent<'_>,
        output: std::result::Result<OpOutput<'_>, &DbTapError>,
    );
}

impl<F> AfterHook for F
where
    F: Fn(&mut dyn Connection, &OpEvent<'_>, std::result::Result<OpOutput<'_>, &DbTapError>) + Send + Sync,
{
    fn observe(
        &self,
        conn: &mut dyn Connection,
        event: &OpEvent<'_>,
        output: std::result::Result<OpOutput<'_>, &DbTapError>,
    ) {
        self(conn, event, output)
    }
}

/// One optionally-populated hook, shared between a [`crate::Tap`] and every
/// connection opened through it. Reads take a snapshot, so replacing a hook
/// affects subsequent operations but never a call already in flight.
pub(crate) struct HookSlot<T: ?Sized> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T: ?Sized> HookSlot<T> {
    pub(crate) fn set(&self, hook: Arc<T>) {
        *self.slot.write().unwrap() = Some(hook);
    }

    pub(crate) fn get(&self) -> Option<Arc<T>> {
        self.slot.read().unwrap().clone()
    }
}

impl<T: ?Sized> Default for HookSlot<T> {
    fn default() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }
}

/// The full set of configurable hooks held by a [`crate::Tap`].
#[derive(Default)]
pub(crate) struct HookSet {
    pub(crate) on_open: HookSlot<dyn OpenHook>,
    pub(crate) on_begin: HookSlot<dyn BeginHook>,
    pub(crate) on_prepare: HookSlot<dyn PrepareHook>,
    pub(crate) on_close: HookSlot<dyn CloseHook>,
    pub(crate) on_execute: HookSlot<dyn ExecuteHook>,
    pub(crate) on_query: HookSlot<dyn QueryHook>,
    pub(crate) before_all: HookSlot<dyn BeforeHook>,
    pub(crate) after_all: HookSlot<dyn AfterHook>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(OpEvent::Begin.name(), "begin");
        assert_eq!(OpEvent::Prepare { sql: "select 1" }.name(), "prepare");
        assert_eq!(OpEvent::Close.name(), "close");
        let params = [SqlValue::Int32(1)];
        assert_eq!(
            OpEvent::Execute { sql: "delete", params: &params }.name(),
            "execute"
        );
        assert_eq!(
            OpEvent::Query { sql: "select", params: &params }.name(),
            "query"
        );
    }
}
