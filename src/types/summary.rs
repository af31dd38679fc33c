/// Summary of a statement execution that produced no rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecSummary {
    /// Number of rows the statement touched.
    pub rows_affected: u64,
    /// Identifier of the last inserted row, for backends that report one.
    pub last_insert_id: Option<i64>,
}

impl ExecSummary {
    pub fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }
}
