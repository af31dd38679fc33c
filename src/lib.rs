//! dbtap - an observation tap between an application and its database driver
//!
//! A registered [`Tap`] wraps an inner [`DatabaseDriver`] and decorates every
//! connection it opens, routing each driver operation through an ordered hook
//! pipeline: a before-observer, then the configured replacement handler (or
//! the raw operation when none is set), then an after-observer. With no hooks
//! configured every call passes straight through, results and errors
//! untouched.
//!
//! Decoration preserves the connection's capability surface exactly: a
//! connection that supports direct execution or direct querying still does
//! after wrapping, and one that doesn't gains nothing. See
//! [`DriverConnection`] for the capability model.
//!
//! # Example
//! ```ignore
//! use dbtap::drivers::TokioPostgresDriver;
//! use dbtap::{Connection, OpEvent};
//!
//! // Register a tap over the real driver and watch every operation.
//! let tap = dbtap::register("watched", TokioPostgresDriver::new());
//! tap.before_all(|_conn: &mut dyn Connection, event: &OpEvent<'_>| {
//!     println!("-> {}", event.name());
//! });
//!
//! // Open through the registry the usual way; the connection string is
//! // owned by the inner driver.
//! let mut client = dbtap::open("watched", "postgres://localhost/mydb").await?;
//! client.execute("DELETE FROM sessions", &[]).await?;
//! ```
//!
//! For tests, [`drivers::FakeDriver`] is an inner driver that records the
//! last statement and bound values it saw.

pub mod drivers;
pub mod error;
pub mod hooks;
pub mod registry;
pub mod traits;
pub mod types;

mod client;
mod conn;
mod tap;

// Re-export main types for convenient access
pub use client::{Client, Prepared};
pub use error::{DbTapError, Result};
pub use hooks::{
    AfterHook, BeforeHook, BeginHook, CloseHook, ExecuteHook, OpEvent, OpOutput, OpenHook,
    PrepareHook, QueryHook,
};
pub use registry::{lookup, open, register, try_register};
pub use tap::Tap;
pub use traits::{
    Connection, DatabaseDriver, DirectExecute, DirectExecuteQuery, DirectQuery, DriverConnection,
    Statement, Transaction,
};
pub use types::{ExecSummary, Row, RowSet, SqlValue};
