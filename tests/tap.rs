use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dbtap::{
    Connection, DatabaseDriver, DbTapError, DirectExecute, DirectQuery, DriverConnection,
    ExecSummary, ExecuteHook, OpEvent, OpOutput, OpenHook, PrepareHook, RowSet, SqlValue,
    Statement, Transaction,
};

type Log = Arc<Mutex<Vec<String>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn push(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

// Scriptable connections, one type per capability combination. Every
// operation appends a marker to the shared log and returns a canned value so
// tests can check that results cross the decoration layer unchanged.

struct TestTx {
    log: Log,
}

#[async_trait]
impl Transaction for TestTx {
    async fn commit(&mut self) -> dbtap::Result<()> {
        push(&self.log, "tx.commit");
        Ok(())
    }

    async fn rollback(&mut self) -> dbtap::Result<()> {
        push(&self.log, "tx.rollback");
        Ok(())
    }
}

struct TestStmt {
    log: Log,
    num_params: usize,
}

#[async_trait]
impl Statement for TestStmt {
    fn num_params(&self) -> usize {
        self.num_params
    }

    async fn execute(&mut self, _params: &[SqlValue]) -> dbtap::Result<ExecSummary> {
        push(&self.log, "stmt.execute");
        Ok(ExecSummary::new(21))
    }

    async fn query(&mut self, _params: &[SqlValue]) -> dbtap::Result<RowSet> {
        push(&self.log, "stmt.query");
        Ok(sample_rows())
    }

    async fn close(&mut self) -> dbtap::Result<()> {
        push(&self.log, "stmt.close");
        Ok(())
    }
}

fn sample_rows() -> RowSet {
    RowSet::new(vec!["id".to_string()], vec![vec![SqlValue::Int32(1)]])
}

macro_rules! impl_base_connection {
    ($ty:ident) => {
        #[async_trait]
        impl Connection for $ty {
            async fn begin(&mut self) -> dbtap::Result<Box<dyn Transaction>> {
                push(&self.log, "begin");
                Ok(Box::new(TestTx {
                    log: Arc::clone(&self.log),
                }))
            }

            async fn prepare(&mut self, sql: &str) -> dbtap::Result<Box<dyn Statement>> {
                push(&self.log, format!("prepare:{sql}"));
                Ok(Box::new(TestStmt {
                    log: Arc::clone(&self.log),
                    num_params: 3,
                }))
            }

            async fn close(&mut self) -> dbtap::Result<()> {
                push(&self.log, "close");
                Ok(())
            }
        }
    };
}

struct BaseConn {
    log: Log,
}
impl_base_connection!(BaseConn);

struct ExecConn {
    log: Log,
}
impl_base_connection!(ExecConn);

#[async_trait]
impl DirectExecute for ExecConn {
    async fn execute(&mut self, sql: &str, _params: &[SqlValue]) -> dbtap::Result<ExecSummary> {
        push(&self.log, format!("execute:{sql}"));
        Ok(ExecSummary::new(7))
    }
}

struct QueryConn {
    log: Log,
}
impl_base_connection!(QueryConn);

#[async_trait]
impl DirectQuery for QueryConn {
    async fn query(&mut self, sql: &str, _params: &[SqlValue]) -> dbtap::Result<RowSet> {
        push(&self.log, format!("query:{sql}"));
        Ok(sample_rows())
    }
}

struct FullConn {
    log: Log,
}
impl_base_connection!(FullConn);

#[async_trait]
impl DirectExecute for FullConn {
    async fn execute(&mut self, sql: &str, _params: &[SqlValue]) -> dbtap::Result<ExecSummary> {
        push(&self.log, format!("execute:{sql}"));
        Ok(ExecSummary::new(7))
    }
}

#[async_trait]
impl DirectQuery for FullConn {
    async fn query(&mut self, sql: &str, _params: &[SqlValue]) -> dbtap::Result<RowSet> {
        push(&self.log, format!("query:{sql}"));
        Ok(sample_rows())
    }
}

#[derive(Clone, Copy)]
enum Caps {
    Base,
    Execute,
    Query,
    Full,
}

struct TestDriver {
    caps: Caps,
    log: Log,
}

#[async_trait]
impl DatabaseDriver for TestDriver {
    async fn open(&self, _dsn: &str) -> dbtap::Result<DriverConnection> {
        let log = Arc::clone(&self.log);
        Ok(match self.caps {
            Caps::Base => DriverConnection::base(BaseConn { log }),
            Caps::Execute => DriverConnection::with_execute(ExecConn { log }),
            Caps::Query => DriverConnection::with_query(QueryConn { log }),
            Caps::Full => DriverConnection::with_execute_and_query(FullConn { log }),
        })
    }
}

struct FailingDriver;

struct FailingConn;

#[async_trait]
impl Connection for FailingConn {
    async fn begin(&mut self) -> dbtap::Result<Box<dyn Transaction>> {
        Err(DbTapError::QueryFailed("begin refused".to_string()))
    }

    async fn prepare(&mut self, _sql: &str) -> dbtap::Result<Box<dyn Statement>> {
        Err(DbTapError::QueryFailed("boom".to_string()))
    }

    async fn close(&mut self) -> dbtap::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl DatabaseDriver for FailingDriver {
    async fn open(&self, _dsn: &str) -> dbtap::Result<DriverConnection> {
        Ok(DriverConnection::base(FailingConn))
    }
}

#[tokio::test]
async fn test_passthrough_without_hooks() {
    let log = new_log();
    let tap = dbtap::register(
        "passthrough",
        TestDriver {
            caps: Caps::Base,
            log: Arc::clone(&log),
        },
    );

    let mut conn = tap.open("").await.unwrap();

    let mut tx = conn.begin().await.unwrap();
    tx.commit().await.unwrap();

    let mut stmt = conn.prepare("select 1").await.unwrap();
    assert_eq!(stmt.num_params(), 3);
    let summary = stmt.execute(&[]).await.unwrap();
    assert_eq!(summary, ExecSummary::new(21));

    conn.close().await.unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "begin",
            "tx.commit",
            "prepare:select 1",
            "stmt.execute",
            "close"
        ]
    );
}

#[tokio::test]
async fn test_direct_capabilities_pass_through() {
    let log = new_log();
    let tap = dbtap::register(
        "passthrough_direct",
        TestDriver {
            caps: Caps::Full,
            log: Arc::clone(&log),
        },
    );

    let mut conn = tap.open("").await.unwrap();

    let summary = conn
        .as_execute()
        .unwrap()
        .execute("delete from t", &[])
        .await
        .unwrap();
    assert_eq!(summary, ExecSummary::new(7));

    let rows = conn
        .as_query()
        .unwrap()
        .query("select id from t", &[])
        .await
        .unwrap();
    assert_eq!(rows, sample_rows());

    assert_eq!(
        entries(&log),
        vec!["execute:delete from t", "query:select id from t"]
    );
}

#[tokio::test]
async fn test_capability_surface_mirrors_raw_connection() {
    for (name, caps, execute, query) in [
        ("mirror_base", Caps::Base, false, false),
        ("mirror_execute", Caps::Execute, true, false),
        ("mirror_query", Caps::Query, false, true),
        ("mirror_full", Caps::Full, true, true),
    ] {
        let tap = dbtap::register(
            name,
            TestDriver {
                caps,
                log: new_log(),
            },
        );
        let mut conn = tap.open("").await.unwrap();
        assert_eq!(conn.supports_execute(), execute, "{name}");
        assert_eq!(conn.supports_query(), query, "{name}");
        assert_eq!(conn.as_execute().is_some(), execute, "{name}");
        assert_eq!(conn.as_query().is_some(), query, "{name}");
    }
}

#[tokio::test]
async fn test_observers_run_in_order_with_actual_outcome() {
    let log = new_log();
    let tap = dbtap::register(
        "observed",
        TestDriver {
            caps: Caps::Full,
            log: Arc::clone(&log),
        },
    );

    let before_log = Arc::clone(&log);
    tap.before_all(move |_conn: &mut dyn Connection, event: &OpEvent<'_>| {
        push(&before_log, format!("before:{}", event.name()));
    });

    let after_log = Arc::clone(&log);
    tap.after_all(
        move |_conn: &mut dyn Connection,
              event: &OpEvent<'_>,
              output: Result<OpOutput<'_>, &DbTapError>| {
            let entry = match output {
                Ok(OpOutput::Executed(summary)) => {
                    format!("after:{}:{}", event.name(), summary.rows_affected)
                }
                Ok(_) => format!("after:{}:ok", event.name()),
                Err(e) => format!("after:{}:{e}", event.name()),
            };
            push(&after_log, entry);
        },
    );

    let mut conn = tap.open("").await.unwrap();
    conn.as_execute()
        .unwrap()
        .execute("delete from t", &[])
        .await
        .unwrap();
    conn.begin().await.unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "before:execute",
            "execute:delete from t",
            "after:execute:7",
            "before:begin",
            "begin",
            "after:begin:ok",
        ]
    );
}

#[tokio::test]
async fn test_after_observer_sees_error() {
    let log = new_log();
    let tap = dbtap::register("observed_error", FailingDriver);

    let after_log = Arc::clone(&log);
    tap.after_all(
        move |_conn: &mut dyn Connection,
              event: &OpEvent<'_>,
              output: Result<OpOutput<'_>, &DbTapError>| {
            if let Err(e) = output {
                push(&after_log, format!("after:{}:{e}", event.name()));
            }
        },
    );

    let mut conn = tap.open("").await.unwrap();
    let err = match conn.prepare("select 1").await {
        Ok(_) => panic!("prepare should fail"),
        Err(e) => e,
    };
    assert!(matches!(err, DbTapError::QueryFailed(ref msg) if msg == "boom"));
    assert_eq!(entries(&log), vec!["after:prepare:Query failed: boom"]);
}

struct StubPrepare {
    log: Log,
}

#[async_trait]
impl PrepareHook for StubPrepare {
    async fn handle(
        &self,
        _conn: &mut dyn Connection,
        sql: &str,
    ) -> dbtap::Result<Box<dyn Statement>> {
        push(&self.log, format!("hook.prepare:{sql}"));
        Ok(Box::new(TestStmt {
            log: Arc::clone(&self.log),
            num_params: 42,
        }))
    }
}

#[tokio::test]
async fn test_override_replaces_raw_operation() {
    let raw_log = new_log();
    let hook_log = new_log();
    let tap = dbtap::register(
        "overridden",
        TestDriver {
            caps: Caps::Base,
            log: Arc::clone(&raw_log),
        },
    );
    tap.on_prepare(StubPrepare {
        log: Arc::clone(&hook_log),
    });

    let mut conn = tap.open("").await.unwrap();
    let stmt = conn.prepare("select 1").await.unwrap();

    // The raw prepare never ran; only the hook's statement came back.
    assert_eq!(stmt.num_params(), 42);
    assert_eq!(entries(&raw_log), Vec::<String>::new());
    assert_eq!(entries(&hook_log), vec!["hook.prepare:select 1"]);
}

struct LoggingExecute {
    seen: Log,
}

#[async_trait]
impl ExecuteHook for LoggingExecute {
    async fn handle(
        &self,
        conn: &mut dyn DirectExecute,
        sql: &str,
        params: &[SqlValue],
    ) -> dbtap::Result<ExecSummary> {
        push(&self.seen, sql.to_string());
        conn.execute(sql, params).await
    }
}

#[tokio::test]
async fn test_logging_execute_hook_calls_through() {
    let raw_log = new_log();
    let seen = new_log();
    let tap = dbtap::register(
        "debug",
        TestDriver {
            caps: Caps::Full,
            log: Arc::clone(&raw_log),
        },
    );
    tap.on_execute(LoggingExecute {
        seen: Arc::clone(&seen),
    });

    let mut client = dbtap::open("debug", "").await.unwrap();
    client.execute("DELETE FROM t", &[]).await.unwrap();

    // Logged by the hook and still executed against the inner driver.
    assert_eq!(entries(&seen), vec!["DELETE FROM t"]);
    assert_eq!(entries(&raw_log), vec!["execute:DELETE FROM t"]);
}

struct SubstituteOnOpen {
    replacement_log: Log,
}

#[async_trait]
impl OpenHook for SubstituteOnOpen {
    async fn handle(
        &self,
        _dsn: &str,
        _conn: DriverConnection,
    ) -> dbtap::Result<DriverConnection> {
        Ok(DriverConnection::base(BaseConn {
            log: Arc::clone(&self.replacement_log),
        }))
    }
}

#[tokio::test]
async fn test_open_hook_substitutes_connection() {
    let inner_log = new_log();
    let replacement_log = new_log();
    let tap = dbtap::register(
        "substituted",
        TestDriver {
            caps: Caps::Full,
            log: Arc::clone(&inner_log),
        },
    );
    tap.on_open(SubstituteOnOpen {
        replacement_log: Arc::clone(&replacement_log),
    });

    let mut conn = tap.open("").await.unwrap();
    conn.begin().await.unwrap();

    assert!(!conn.supports_execute());
    assert_eq!(entries(&inner_log), Vec::<String>::new());
    assert_eq!(entries(&replacement_log), vec!["begin"]);
}

struct RejectOnOpen;

#[async_trait]
impl OpenHook for RejectOnOpen {
    async fn handle(
        &self,
        _dsn: &str,
        _conn: DriverConnection,
    ) -> dbtap::Result<DriverConnection> {
        Err(DbTapError::ConnectionFailed("denied".to_string()))
    }
}

#[tokio::test]
async fn test_open_hook_error_becomes_open_result() {
    let tap = dbtap::register(
        "rejected",
        TestDriver {
            caps: Caps::Base,
            log: new_log(),
        },
    );
    tap.on_open(RejectOnOpen);

    let err = tap.open("").await.unwrap_err();
    assert!(matches!(err, DbTapError::ConnectionFailed(ref msg) if msg == "denied"));
}

struct NeverOpensDriver;

#[async_trait]
impl DatabaseDriver for NeverOpensDriver {
    async fn open(&self, dsn: &str) -> dbtap::Result<DriverConnection> {
        Err(DbTapError::ConnectionFailed(format!("no route to {dsn}")))
    }
}

struct PanicOnOpen;

#[async_trait]
impl OpenHook for PanicOnOpen {
    async fn handle(&self, _dsn: &str, _conn: DriverConnection) -> dbtap::Result<DriverConnection> {
        panic!("open hook must not run when the inner open fails");
    }
}

#[tokio::test]
async fn test_inner_open_failure_skips_open_hook() {
    let tap = dbtap::register("never_opens", NeverOpensDriver);
    tap.on_open(PanicOnOpen);

    let err = tap.open("db9").await.unwrap_err();
    assert!(matches!(err, DbTapError::ConnectionFailed(ref msg) if msg == "no route to db9"));
}

#[tokio::test]
async fn test_open_by_unknown_name() {
    let err = dbtap::open("no_such_driver", "").await.unwrap_err();
    assert!(matches!(err, DbTapError::UnknownDriver(ref name) if name == "no_such_driver"));
}

#[test]
fn test_try_register_duplicate() {
    dbtap::register(
        "duplicate",
        TestDriver {
            caps: Caps::Base,
            log: new_log(),
        },
    );
    let err = dbtap::try_register("duplicate", FailingDriver).unwrap_err();
    assert!(matches!(err, DbTapError::DuplicateDriver(ref name) if name == "duplicate"));
}

#[test]
#[should_panic(expected = "already registered under `duplicate_panics`")]
fn test_register_duplicate_panics() {
    dbtap::register(
        "duplicate_panics",
        TestDriver {
            caps: Caps::Base,
            log: new_log(),
        },
    );
    dbtap::register("duplicate_panics", FailingDriver);
}
