//! Command executor - one validated command in, a new table out

use thiserror::Error;

use tabula_expr::{compile, Bindings, EvalError, ParseError};
use tabula_ir::{Column, Table, ValidatedCommand, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// One row of a table, viewed as expression bindings.
struct RowView<'a> {
    table: &'a Table,
    row: usize,
}

impl Bindings for RowView<'_> {
    fn get(&self, name: &str) -> Option<&Value> {
        self.table.column(name).map(|c| &c.values[self.row])
    }
}

/// Apply one validated command to a table, producing the next table.
/// Pure: the input table is never mutated.
pub fn execute(table: &Table, command: &ValidatedCommand) -> Result<Table, ExecError> {
    match command {
        ValidatedCommand::Filter { predicate } => filter(table, predicate),
        ValidatedCommand::Select { columns } => select(table, columns),
        ValidatedCommand::AddColumn {
            column_name,
            formula,
        } => add_column(table, column_name, formula),
    }
}

/// Keep the rows where the predicate evaluates to true, in order.
///
/// A row where evaluation fails aborts the whole command: dropping or
/// keeping such a row silently would yield a table whose row selection
/// depends on evaluator quirks rather than on the predicate.
fn filter(table: &Table, predicate: &str) -> Result<Table, ExecError> {
    let compiled = compile(predicate)?;

    let mut keep = Vec::new();
    for row in 0..table.row_count() {
        if compiled.eval_predicate(&RowView { table, row })? {
            keep.push(row);
        }
    }

    let columns = table
        .columns()
        .iter()
        .map(|c| {
            Column::new(
                c.name.clone(),
                keep.iter().map(|&i| c.values[i].clone()).collect(),
            )
        })
        .collect();
    Ok(Table::new(columns).expect("filtering preserves a valid schema"))
}

/// Project to exactly the requested columns, in the requested order.
fn select(table: &Table, names: &[String]) -> Result<Table, ExecError> {
    let mut columns = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(ExecError::DuplicateColumn(name.clone()));
        }
        let column = table
            .column(name)
            .ok_or_else(|| ExecError::UnknownColumn(name.clone()))?;
        columns.push(column.clone());
    }
    Ok(Table::new(columns).expect("selected columns form a valid schema"))
}

/// Append a column computed per row from the formula.
fn add_column(table: &Table, name: &str, formula: &str) -> Result<Table, ExecError> {
    if table.has_column(name) {
        // Overwriting silently would be ambiguous intent
        return Err(ExecError::DuplicateColumn(name.to_string()));
    }
    let compiled = compile(formula)?;

    let mut values = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        values.push(compiled.eval_scalar(&RowView { table, row })?);
    }

    let mut columns = table.columns().to_vec();
    columns.push(Column::new(name, values));
    Ok(Table::new(columns).expect("appending a fresh column preserves a valid schema"))
}
