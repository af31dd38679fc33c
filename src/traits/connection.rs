use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::{Statement, Transaction};
use crate::types::{ExecSummary, RowSet, SqlValue};

/// Base capability every driver connection provides.
#[async_trait]
pub trait Connection: Send {
    /// Start a transaction.
    async fn begin(&mut self) -> Result<Box<dyn Transaction>>;

    /// Prepare a statement for later execution.
    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Close the connection. Best-effort: a failure is reported to the
    /// caller but never retried.
    async fn close(&mut self) -> Result<()>;
}

/// Optional capability: execute a statement directly, without preparing it
/// first.
#[async_trait]
pub trait DirectExecute: Connection {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecSummary>;
}

/// Optional capability: run a row-returning query directly, without
/// preparing it first.
#[async_trait]
pub trait DirectQuery: Connection {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet>;
}

/// Both optional capabilities at once. Blanket-implemented, so a connection
/// type earns it by implementing [`DirectExecute`] and [`DirectQuery`].
pub trait DirectExecuteQuery: DirectExecute + DirectQuery {}

impl<T: DirectExecute + DirectQuery> DirectExecuteQuery for T {}

/// A driver connection tagged with the optional capabilities it supports.
///
/// This is the closed set of capability combinations a connection can have.
/// The tag is fixed when the driver constructs the value: each constructor
/// requires the matching trait bounds, so a variant can never promise an
/// operation its connection cannot perform, and the accessors below are
/// total matches; no downcasting happens after construction.
///
/// The hook layer preserves the tag exactly: a connection decorated by a
/// [`crate::Tap`] reports the same capabilities as the raw connection it
/// wraps.
pub enum DriverConnection {
    /// Begin/prepare/close only.
    Base(Box<dyn Connection>),
    /// Base plus direct execution.
    Execute(Box<dyn DirectExecute>),
    /// Base plus direct querying.
    Query(Box<dyn DirectQuery>),
    /// Base plus both direct capabilities.
    Full(Box<dyn DirectExecuteQuery>),
}

impl fmt::Debug for DriverConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            DriverConnection::Base(_) => "Base",
            DriverConnection::Execute(_) => "Execute",
            DriverConnection::Query(_) => "Query",
            DriverConnection::Full(_) => "Full",
        };
        f.debug_tuple(variant).finish()
    }
}

impl DriverConnection {
    /// Wrap a connection with no optional capabilities.
    pub fn base(conn: impl Connection + 'static) -> Self {
        DriverConnection::Base(Box::new(conn))
    }

    /// Wrap a connection that supports direct execution.
    pub fn with_execute(conn: impl DirectExecute + 'static) -> Self {
        DriverConnection::Execute(Box::new(conn))
    }

    /// Wrap a connection that supports direct querying.
    pub fn with_query(conn: impl DirectQuery + 'static) -> Self {
        DriverConnection::Query(Box::new(conn))
    }

    /// Wrap a connection that supports both direct capabilities.
    pub fn with_execute_and_query(conn: impl DirectExecuteQuery + 'static) -> Self {
        DriverConnection::Full(Box::new(conn))
    }

    pub fn supports_execute(&self) -> bool {
        matches!(
            self,
            DriverConnection::Execute(_) | DriverConnection::Full(_)
        )
    }

    pub fn supports_query(&self) -> bool {
        matches!(self, DriverConnection::Query(_) | DriverConnection::Full(_))
    }

    /// The base-capability view, available for every variant.
    pub fn as_connection(&mut self) -> &mut dyn Connection {
        match self {
            DriverConnection::Base(c) => c.as_mut(),
            DriverConnection::Execute(c) => &mut **c,
            DriverConnection::Query(c) => &mut **c,
            DriverConnection::Full(c) => &mut **c,
        }
    }

    /// The direct-execute capability handle, if this connection has it.
    pub fn as_execute(&mut self) -> Option<&mut dyn DirectExecute> {
        match self {
            DriverConnection::Execute(c) => Some(c.as_mut()),
            DriverConnection::Full(c) => Some(&mut **c),
            _ => None,
        }
    }

    /// The direct-query capability handle, if this connection has it.
    pub fn as_query(&mut self) -> Option<&mut dyn DirectQuery> {
        match self {
            DriverConnection::Query(c) => Some(c.as_mut()),
            DriverConnection::Full(c) => Some(&mut **c),
            _ => None,
        }
    }

    /// Forwards to [`Connection::begin`].
    pub async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        self.as_connection().begin().await
    }

    /// Forwards to [`Connection::prepare`].
    pub async fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        self.as_connection().prepare(sql).await
    }

    /// Forwards to [`Connection::close`].
    pub async fn close(&mut self) -> Result<()> {
        self.as_connection().close().await
    }
}
