use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ExecSummary, RowSet, SqlValue};

/// A prepared statement held open on a driver connection.
///
/// Parameter-count validation against [`Statement::num_params`] is the
/// caller's job (the [`crate::Client`] layer does it); drivers only report
/// the count.
#[async_trait]
pub trait Statement: Send {
    /// Number of bound parameters the statement expects.
    fn num_params(&self) -> usize;

    /// Run the statement for its side effects.
    async fn execute(&mut self, params: &[SqlValue]) -> Result<ExecSummary>;

    /// Run the statement and return the produced rows.
    async fn query(&mut self, params: &[SqlValue]) -> Result<RowSet>;

    /// Release the statement on the driver side.
    async fn close(&mut self) -> Result<()>;
}

/// An open transaction on a driver connection. Purely a forwarding handle;
/// this crate attaches no transaction semantics of its own.
#[async_trait]
pub trait Transaction: Send {
    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}
