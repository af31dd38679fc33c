mod connection;
mod driver;
mod statement;

pub use connection::{
    Connection, DirectExecute, DirectExecuteQuery, DirectQuery, DriverConnection,
};
pub use driver::DatabaseDriver;
pub use statement::{Statement, Transaction};
