use tracing::debug;

use crate::error::{DbTapError, Result};
use crate::traits::{DriverConnection, Statement, Transaction};
use crate::types::{ExecSummary, RowSet, SqlValue};

/// A thin, pool-free client over a single driver connection.
///
/// The client supplies the host-side statement semantics the driver contract
/// leaves out: direct-capability dispatch with a prepare fallback, and
/// parameter-count validation against [`Statement::num_params`] before a
/// prepared statement runs. Everything else is forwarded.
#[derive(Debug)]
pub struct Client {
    conn: DriverConnection,
}

impl Client {
    /// Wraps an already-opened connection. Most callers get a `Client` from
    /// [`crate::open`] instead.
    pub fn new(conn: DriverConnection) -> Self {
        Self { conn }
    }

    /// Direct access to the underlying connection, e.g. to feature-detect
    /// its capabilities.
    pub fn connection_mut(&mut self) -> &mut DriverConnection {
        &mut self.conn
    }

    /// Runs `sql` for its side effects.
    ///
    /// Uses the connection's direct-execute capability when present;
    /// otherwise prepares the statement, validates the parameter count, and
    /// executes it.
    pub async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecSummary> {
        if let Some(exec) = self.conn.as_execute() {
            return exec.execute(sql, params).await;
        }
        let mut stmt = self.conn.prepare(sql).await?;
        if let Err(e) = check_params(stmt.num_params(), params.len()) {
            close_statement(stmt).await;
            return Err(e);
        }
        let out = stmt.execute(params).await;
        close_statement(stmt).await;
        out
    }

    /// Runs `sql` and returns the produced rows.
    ///
    /// Uses the connection's direct-query capability when present; otherwise
    /// prepares the statement, validates the parameter count, and queries
    /// through it.
    pub async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet> {
        if let Some(query) = self.conn.as_query() {
            return query.query(sql, params).await;
        }
        let mut stmt = self.conn.prepare(sql).await?;
        if let Err(e) = check_params(stmt.num_params(), params.len()) {
            close_statement(stmt).await;
            return Err(e);
        }
        let out = stmt.query(params).await;
        close_statement(stmt).await;
        out
    }

    /// Prepares `sql`, returning a reusable statement handle.
    pub async fn prepare(&mut self, sql: &str) -> Result<Prepared> {
        let stmt = self.conn.prepare(sql).await?;
        Ok(Prepared { stmt })
    }

    /// Starts a transaction on the underlying connection.
    pub async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        self.conn.begin().await
    }

    /// Closes the underlying connection.
    pub async fn close(&mut self) -> Result<()> {
        self.conn.close().await
    }
}

/// A prepared statement with client-side parameter-count validation.
/// Reusable across [`Prepared::execute`] and [`Prepared::query`] calls.
pub struct Prepared {
    stmt: Box<dyn Statement>,
}

impl Prepared {
    /// Number of bound parameters the statement expects.
    pub fn num_params(&self) -> usize {
        self.stmt.num_params()
    }

    pub async fn execute(&mut self, params: &[SqlValue]) -> Result<ExecSummary> {
        check_params(self.stmt.num_params(), params.len())?;
        self.stmt.execute(params).await
    }

    pub async fn query(&mut self, params: &[SqlValue]) -> Result<RowSet> {
        check_params(self.stmt.num_params(), params.len())?;
        self.stmt.query(params).await
    }

    /// Releases the statement on the driver side.
    pub async fn close(self) -> Result<()> {
        let mut stmt = self.stmt;
        stmt.close().await
    }
}

fn check_params(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(DbTapError::ParameterCount { expected, actual });
    }
    Ok(())
}

async fn close_statement(mut stmt: Box<dyn Statement>) {
    if let Err(e) = stmt.close().await {
        debug!(error = %e, "failed to close one-shot statement");
    }
}
