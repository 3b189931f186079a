//! Immutable table snapshots
//!
//! A table is an ordered set of named, equal-length columns. Transformations
//! never mutate a table in place; each one builds a new snapshot, so every
//! intermediate pipeline state stays inspectable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("column `{column}` has {actual} values, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Named-column, ordered-row dataset snapshot.
///
/// Invariants, enforced at construction (including deserialization):
/// column names are unique and every column has the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<Column>,
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<Column>,
}

impl TryFrom<RawTable> for Table {
    type Error = TableError;

    fn try_from(raw: RawTable) -> Result<Self, TableError> {
        Table::new(raw.columns)
    }
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let expected = columns.first().map_or(0, |c| c.values.len());
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
            if column.values.len() != expected {
                return Err(TableError::RaggedColumns {
                    column: column.name.clone(),
                    expected,
                    actual: column.values.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Table with no columns and no rows.
    pub fn empty() -> Self {
        Self { columns: vec![] }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&i| Value::Int(i)).collect()
    }

    #[test]
    fn test_table_construction() {
        let table = Table::new(vec![
            Column::new("a", ints(&[1, 2, 3])),
            Column::new("b", ints(&[4, 5, 6])),
        ])
        .unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = Table::new(vec![
            Column::new("a", ints(&[1])),
            Column::new("a", ints(&[2])),
        ])
        .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".to_string()));
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let err = Table::new(vec![
            Column::new("a", ints(&[1, 2])),
            Column::new("b", ints(&[1])),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            TableError::RaggedColumns {
                column: "b".to_string(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_empty_table() {
        let table = Table::empty();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn test_json_round_trip() {
        let json = r#"{"columns":[{"name":"name","values":["A","B"]},{"name":"age","values":[20,40]}]}"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("age").unwrap().values,
            vec![Value::Int(20), Value::Int(40)]
        );
        assert_eq!(serde_json::to_string(&table).unwrap(), json);
    }

    #[test]
    fn test_deserialization_enforces_invariants() {
        let json = r#"{"columns":[{"name":"a","values":[1]},{"name":"a","values":[2]}]}"#;
        assert!(serde_json::from_str::<Table>(json).is_err());
    }
}
