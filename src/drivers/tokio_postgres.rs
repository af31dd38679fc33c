use std::sync::Arc;

use async_trait::async_trait;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client as PgClient, NoTls};
use tracing::error;

use crate::error::{DbTapError, Result};
use crate::traits::{
    Connection, DatabaseDriver, DirectExecute, DirectQuery, DriverConnection, Statement,
    Transaction,
};
use crate::types::{ExecSummary, RowSet, SqlValue};

/// PostgreSQL driver implementation using tokio-postgres.
///
/// Each `open` establishes one connection and spawns its I/O task.
/// Connections expose both direct capabilities.
#[derive(Debug, Default)]
pub struct TokioPostgresDriver;

impl TokioPostgresDriver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DatabaseDriver for TokioPostgresDriver {
    async fn open(&self, dsn: &str) -> Result<DriverConnection> {
        let (client, connection) = tokio_postgres::connect(dsn, NoTls)
            .await
            .map_err(|e| DbTapError::ConnectionFailed(e.to_string()))?;

        // Drive the wire protocol until the client goes away
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(DriverConnection::with_execute_and_query(PgConnection {
            client: Arc::new(client),
        }))
    }
}

struct PgConnection {
    client: Arc<PgClient>,
}

#[async_trait]
impl Connection for PgConnection {
    async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        self.client
            .batch_execute("BEGIN")
            .await
            .map_err(|e| DbTapError::QueryFailed(e.to_string()))?;
        Ok(Box::new(PgTransaction {
            client: Arc::clone(&self.client),
        }))
    }

    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        let stmt = self
            .client
            .prepare(sql)
            .await
            .map_err(|e| DbTapError::QueryFailed(e.to_string()))?;
        Ok(Box::new(PgStatement {
            client: Arc::clone(&self.client),
            stmt,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the client terminates the spawned I/O task; nothing to
        // flush beyond that.
        Ok(())
    }
}

#[async_trait]
impl DirectExecute for PgConnection {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<ExecSummary> {
        let converted: Vec<_> = params.iter().map(sql_value_to_tosql).collect();
        let rows_affected = self
            .client
            .execute(sql, &param_refs(&converted))
            .await
            .map_err(|e| DbTapError::QueryFailed(e.to_string()))?;
        Ok(ExecSummary::new(rows_affected))
    }
}

#[async_trait]
impl DirectQuery for PgConnection {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RowSet> {
        let converted: Vec<_> = params.iter().map(sql_value_to_tosql).collect();
        let rows = self
            .client
            .query(sql, &param_refs(&converted))
            .await
            .map_err(|e| DbTapError::QueryFailed(e.to_string()))?;
        Ok(rows_to_set(&rows))
    }
}

struct PgStatement {
    client: Arc<PgClient>,
    stmt: tokio_postgres::Statement,
}

#[async_trait]
impl Statement for PgStatement {
    fn num_params(&self) -> usize {
        self.stmt.params().len()
    }

    async fn execute(&mut self, params: &[SqlValue]) -> Result<ExecSummary> {
        let converted: Vec<_> = params.iter().map(sql_value_to_tosql).collect();
        let rows_affected = self
            .client
            .execute(&self.stmt, &param_refs(&converted))
            .await
            .map_err(|e| DbTapError::QueryFailed(e.to_string()))?;
        Ok(ExecSummary::new(rows_affected))
    }

    async fn query(&mut self, params: &[SqlValue]) -> Result<RowSet> {
        let converted: Vec<_> = params.iter().map(sql_value_to_tosql).collect();
        let rows = self
            .client
            .query(&self.stmt, &param_refs(&converted))
            .await
            .map_err(|e| DbTapError::QueryFailed(e.to_string()))?;
        Ok(rows_to_set(&rows))
    }

    async fn close(&mut self) -> Result<()> {
        // Server-side statements are cleaned up with the session.
        Ok(())
    }
}

struct PgTransaction {
    client: Arc<PgClient>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(&mut self) -> Result<()> {
        self.client
            .batch_execute("COMMIT")
            .await
            .map_err(|e| DbTapError::QueryFailed(e.to_string()))
    }

    async fn rollback(&mut self) -> Result<()> {
        self.client
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| DbTapError::QueryFailed(e.to_string()))
    }
}

/// Convert a SqlValue to a boxed ToSql trait object.
fn sql_value_to_tosql(value: &SqlValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        SqlValue::Null => Box::new(None::<String>),
        SqlValue::Text(s) => Box::new(s.clone()),
        SqlValue::Int32(i) => Box::new(*i),
        SqlValue::Int64(i) => Box::new(*i),
        SqlValue::Float64(f) => Box::new(*f),
        SqlValue::Bool(b) => Box::new(*b),
    }
}

fn param_refs(converted: &[Box<dyn ToSql + Sync + Send>]) -> Vec<&(dyn ToSql + Sync)> {
    converted
        .iter()
        .map(|b| b.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

fn rows_to_set(rows: &[tokio_postgres::Row]) -> RowSet {
    let columns: Vec<String> = if rows.is_empty() {
        Vec::new()
    } else {
        rows[0]
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    };

    let converted_rows: Vec<Vec<SqlValue>> = rows
        .iter()
        .map(|row| (0..row.len()).map(|i| row_value(row, i)).collect())
        .collect();

    RowSet::new(columns, converted_rows)
}

/// Convert a row value at a given index back to a driver-agnostic value.
/// Tries the common types in turn; anything unrecognized comes back as Null.
fn row_value(row: &tokio_postgres::Row, index: usize) -> SqlValue {
    if let Ok(val) = row.try_get::<_, i32>(index) {
        return SqlValue::Int32(val);
    }
    if let Ok(val) = row.try_get::<_, i64>(index) {
        return SqlValue::Int64(val);
    }
    if let Ok(val) = row.try_get::<_, String>(index) {
        return SqlValue::Text(val);
    }
    if let Ok(val) = row.try_get::<_, bool>(index) {
        return SqlValue::Bool(val);
    }
    if let Ok(val) = row.try_get::<_, f64>(index) {
        return SqlValue::Float64(val);
    }
    SqlValue::Null
}
