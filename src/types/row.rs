use std::collections::HashMap;

use crate::error::{DbTapError, Result};
use crate::types::SqlValue;

/// Driver-agnostic result of a row-returning query.
///
/// Values are fully materialized: the wrapped drivers in this crate hand
/// back complete result sets, so callers iterate without holding a cursor
/// into the underlying connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Column names in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows in the result.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the result contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extracts a single row from the result.
    /// Returns an error if the result contains zero or more than one row.
    pub fn single_row(self) -> Result<Row> {
        if self.rows.len() != 1 {
            return Err(DbTapError::UnexpectedRowCount {
                expected: 1,
                actual: self.rows.len(),
            });
        }
        let values = self.rows.into_iter().next().unwrap();
        Ok(Row::new(&self.columns, values))
    }

    /// Consumes the result, yielding one [`Row`] per result row.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
            .into_iter()
            .map(|values| Row::new(&self.columns, values))
            .collect()
    }
}

/// A single row result from a query, with values accessed by column name.
#[derive(Debug, Clone)]
pub struct Row {
    values: HashMap<String, SqlValue>,
}

impl Row {
    pub(crate) fn new(columns: &[String], values: Vec<SqlValue>) -> Self {
        let values = columns
            .iter()
            .zip(values)
            .map(|(col, val)| (col.clone(), val))
            .collect();
        Self { values }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.values
            .get(column)
            .ok_or_else(|| DbTapError::ColumnNotFound(column.to_string()))
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
