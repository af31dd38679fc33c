//! Hooked connection wrappers.
//!
//! [`attach_hooks`] maps every [`DriverConnection`] variant to the same
//! variant wrapping the matching hooked type, so the decorated connection
//! carries exactly the capability tag of the raw one. Each wrapper routes
//! its operations through the same three-phase pipeline: before-observer,
//! then handler-or-passthrough, then after-observer. The pipeline returns
//! whatever phase two produced; observers can watch but not interfere.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;

use crate::error::Result;
use crate::hooks::{HookSet, OpEvent, OpOutput};
use crate::traits::{
    Connection, DirectExecute, DirectExecuteQuery, DirectQuery, DriverConnection, Statement,
    Transaction,
};
use crate::types::{ExecSummary, RowSet, SqlValue};

/// Wraps a raw connection in the hooked counterpart of its own variant.
pub(crate) fn attach_hooks(raw: DriverConnection, hooks: Arc<HookSet>) -> DriverConnection {
    match raw {
        DriverConnection::Base(raw) => {
            DriverConnection::Base(Box::new(HookedConn { raw, hooks }))
        }
        DriverConnection::Execute(raw) => {
            DriverConnection::Execute(Box::new(HookedExecConn { raw, hooks }))
        }
        DriverConnection::Query(raw) => {
            DriverConnection::Query(Box::new(HookedQueryConn { raw, hooks }))
        }
        DriverConnection::Full(raw) => {
            DriverConnection::Full(Box::new(HookedFullConn { raw, hooks }))
        }
    }
}

async fn run_begin(raw: &mut dyn Connection, hooks: &HookSet) -> Result<Box<dyn Transaction>> {
    let event = OpEvent::Begin;
    trace!(op = event.name(), "dispatching driver operation");
    if let Some(before) = hooks.before_all.get() {
        before.observe(raw, &event);
    }
    let out = match hooks.on_begin.get() {
        Some(hook) => hook.handle(raw).await,
        None => raw.begin().await,
    };
    if let Some(after) = hooks.after_all.get() {
        let output = match &out {
            Ok(_) => Ok(OpOutput::Begun),
            Err(e) => Err(e),
        };
        after.observe(raw, &event, output);
    }
    out
}

async fn run_prepare(
    raw: &mut dyn Connection,
    hooks: &HookSet,
    sql: &str,
) -> Result<Box<dyn Statement>> {
    let event = OpEvent::Prepare { sql };
    trace!(op = event.name(), "dispatching driver operation");
    if let Some(before) = hooks.before_all.get() {
        before.observe(raw, &event);
    }
    let out = match hooks.on_prepare.get() {
        Some(hook) => hook.handle(raw, sql).await,
        None => raw.prepare(sql).await,
    };
    if let Some(after) = hooks.after_all.get() {
        let output = match &out {
            Ok(_) => Ok(OpOutput::Prepared),
            Err(e) => Err(e),
        };
        after.observe(raw, &event, output);
    }
    out
}

async fn run_close(raw: &mut dyn Connection, hooks: &HookSet) -> Result<()> {
    let event = OpEvent::Close;
    trace!(op = event.name(), "dispatching driver operation");
    if let Some(before) = hooks.before_all.get() {
        before.observe(raw, &event);
    }
    let out = match hooks.on_close.get() {
        Some(hook) => hook.handle(raw).await,
        None => raw.close().await,
    };
    if let Some(after) = hooks.after_all.get() {
        let output = match &out {
            Ok(()) => Ok(OpOutput::Closed),
            Err(e) => Err(e),
        };
        after.observe(raw, &event, output);
    }
    out
}

async fn run_execute(
    raw: &mut dyn DirectExecute,
    hooks: &HookSet,
    sql: &str,
    params: &[SqlValue],
) -> Result<ExecSummary> {
    let event = OpEvent::Execute { sql, params };
    trace!(op = event.name(), "dispatching driver operation");
    if let Some(before) = hooks.before_all.get() {
        let conn: &mut dyn Connection = &mut *raw;
        before.observe(conn, &event);
    }
    let out = match hooks.on_execute.get() {
        Some(hook) => hook.handle(raw, sql, params).await,
        None => raw.execute(sql, params).await,
    };
    if let Some(after) = hooks.after_all.get() {
        let output = match &out {
            Ok(summary) => Ok(OpOutput::Executed(summary)),
            Err(e) => Err(e),
        };
        let conn: &mut dyn Connection = &mut *raw;
        after.observe(conn, &event, output);
    }
    out
}

async fn run_query(
    raw: &mut dyn DirectQuery,
    hooks: &HookSet,
    sql: &str,
    params: &[SqlValue],
) -> Result<RowSet> {
    let event = OpEvent::Query { sql, params };
    trace!(op = event.name(), "dispatching driver operation");
    if let Some(before) = hooks.before_all.get() {
        let conn: &mut dyn Connection = &mut *raw;
        before.observe(conn, &event);
    }
    let out = match hooks.on_query.get() {
        Some(hook) => hook.handle(raw, sql, params).await,
        None => raw.query(sql, params).await,
    };
    if let Some(after) = hooks.after_all.get() {
        let output = match &out {
            Ok(rows) => Ok(OpOutput::Queried(rows)),
            Err(e) => Err(e),
        };
        let conn: &mut dyn Connection = &mut *raw;
        after.observe(conn, &event, output);
    }
    out
}

/// Hooked wrapper for base-only connections.
struct HookedConn {
    raw: Box<dyn Connection>,
    hooks: Arc<HookSet>,
}

#[async_trait]
impl Connection for HookedConn {
    async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        run_begin(self.raw.as_mut(), &self.hooks).await
    }

    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        run_prepare(self.raw.as_mut(), &self.hooks, sql).await
    }

    async fn close(&mut self) -> Result<()> {
        run_close(self.raw.as_mut(), &self.hooks).await
    }
}

/// Hooked wrapper for connections with the direct-execute capability.
struct HookedExecConn {
    raw: Box<dyn DirectExecute>,
    hooks: Arc<HookSet>,
}

#[async_trait]
impl Connection for HookedExecConn {
    async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        let raw: &mut dyn Connection = &mut *self.raw;
        run_begin(raw, &self.hooks).await
    }

    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        let raw: &mut dyn Connection = &mut *self.raw;
        run_prepare(raw, &self.hooks, sql).await
    }

    async fn close(&mut self) -> Result<()> {
        let raw: &mut dyn Connection = &mut *self.raw;
        run_close(raw, &self.hooks).await
    }
}

#[async_trait]
impl DirectExecute for HookedExecConn {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecSummary> {
        run_execute(self.raw.as_mut(), &self.hooks, sql, params).await
    }
}

/// Hooked wrapper for connections with the direct-query capability.
struct HookedQueryConn {
    raw: Box<dyn DirectQuery>,
    hooks: Arc<HookSet>,
}

#[async_trait]
impl Connection for HookedQueryConn {
    async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        let raw: &mut dyn Connection = &mut *self.raw;
        run_begin(raw, &self.hooks).await
    }

    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        let raw: &mut dyn Connection = &mut *self.raw;
        run_prepare(raw, &self.hooks, sql).await
    }

    async fn close(&mut self) -> Result<()> {
        let raw: &mut dyn Connection = &mut *self.raw;
        run_close(raw, &self.hooks).await
    }
}

#[async_trait]
impl DirectQuery for HookedQueryConn {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet> {
        run_query(self.raw.as_mut(), &self.hooks, sql, params).await
    }
}

/// Hooked wrapper for connections with both direct capabilities.
struct HookedFullConn {
    raw: Box<dyn DirectExecuteQuery>,
    hooks: Arc<HookSet>,
}

#[async_trait]
impl Connection for HookedFullConn {
    async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        let raw: &mut dyn Connection = &mut *self.raw;
        run_begin(raw, &self.hooks).await
    }

    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        let raw: &mut dyn Connection = &mut *self.raw;
        run_prepare(raw, &self.hooks, sql).await
    }

    async fn close(&mut self) -> Result<()> {
        let raw: &mut dyn Connection = &mut *self.raw;
        run_close(raw, &self.hooks).await
    }
}

#[async_trait]
impl DirectExecute for HookedFullConn {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecSummary> {
        let raw: &mut dyn DirectExecute = &mut *self.raw;
        run_execute(raw, &self.hooks, sql, params).await
    }
}

#[async_trait]
impl DirectQuery for HookedFullConn {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet> {
        let raw: &mut dyn DirectQuery = &mut *self.raw;
        run_query(raw, &self.hooks, sql, params).await
    }
}
