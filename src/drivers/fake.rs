use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::Client;
use crate::error::Result;
use crate::registry;
use crate::traits::{
    Connection, DatabaseDriver, DriverConnection, Statement, Transaction,
};
use crate::types::{ExecSummary, RowSet, SqlValue};

static FAKE_SEQ: AtomicUsize = AtomicUsize::new(0);

/// What the fake remembers about the most recent statement.
#[derive(Debug, Default)]
struct StatementRecord {
    num_params: usize,
    last_query: String,
    last_values: Vec<SqlValue>,
}

/// An in-memory driver that records the last prepared statement and the
/// values last bound to it, for verification in tests.
///
/// Connections opened from the fake have no direct capabilities, so a
/// [`Client`] reaches it through the prepare fallback: call
/// [`set_num_params`](Self::set_num_params) before issuing a statement to
/// control the parameter count the prepared statement reports, then read
/// back [`last_query`](Self::last_query).
///
/// Every clone and every opened connection shares one statement record, so
/// concurrent callers would trample each other's recordings; use a fresh
/// fake per test scenario.
///
/// # Example
/// ```
/// use dbtap::drivers::FakeDriver;
///
/// let fake = FakeDriver::new();
/// fake.set_num_params(1);
/// let (query, values) = fake.last_query();
/// assert!(query.is_empty() && values.is_empty());
/// ```
#[derive(Clone, Default)]
pub struct FakeDriver {
    record: Arc<Mutex<StatementRecord>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh fake under a generated unique name and opens a
    /// [`Client`] on it, returning both handles.
    pub async fn install() -> Result<(FakeDriver, Client)> {
        let fake = FakeDriver::new();
        let name = format!("fakedb_{}", FAKE_SEQ.fetch_add(1, Ordering::Relaxed));
        registry::try_register(&name, fake.clone())?;
        let client = registry::open(&name, "").await?;
        Ok((fake, client))
    }

    /// Sets the parameter count that subsequently prepared statements will
    /// report. The fake itself never validates counts; the client layer
    /// rejects mismatched calls based on this value.
    pub fn set_num_params(&self, n: usize) {
        self.record.lock().unwrap().num_params = n;
    }

    /// The most recently prepared statement text and the values last bound
    /// to it.
    pub fn last_query(&self) -> (String, Vec<SqlValue>) {
        let record = self.record.lock().unwrap();
        (record.last_query.clone(), record.last_values.clone())
    }
}

#[async_trait]
impl DatabaseDriver for FakeDriver {
    async fn open(&self, _dsn: &str) -> Result<DriverConnection> {
        Ok(DriverConnection::base(FakeConnection {
            record: Arc::clone(&self.record),
        }))
    }
}

struct FakeConnection {
    record: Arc<Mutex<StatementRecord>>,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn begin(&mut self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(FakeTransaction))
    }

    async fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        let num_params = {
            let mut record = self.record.lock().unwrap();
            record.last_query = sql.to_string();
            record.last_values.clear();
            record.num_params
        };
        Ok(Box::new(FakeStatement {
            record: Arc::clone(&self.record),
            num_params,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct FakeStatement {
    record: Arc<Mutex<StatementRecord>>,
    // Snapshot taken at prepare time; a later set_num_params call only
    // affects statements prepared after it.
    num_params: usize,
}

#[async_trait]
impl Statement for FakeStatement {
    fn num_params(&self) -> usize {
        self.num_params
    }

    async fn execute(&mut self, params: &[SqlValue]) -> Result<ExecSummary> {
        self.record.lock().unwrap().last_values = params.to_vec();
        Ok(ExecSummary::default())
    }

    async fn query(&mut self, params: &[SqlValue]) -> Result<RowSet> {
        self.record.lock().unwrap().last_values = params.to_vec();
        Ok(RowSet::empty())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct FakeTransaction;

#[async_trait]
impl Transaction for FakeTransaction {
    async fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        Ok(())
    }
}
