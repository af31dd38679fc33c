mod row;
mod sql_value;
mod summary;

pub use row::{Row, RowSet};
pub use sql_value::SqlValue;
pub use summary::ExecSummary;
