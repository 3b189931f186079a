//! End-to-end pipeline behavior over JSON command sequences

use tabula_engine::{run, run_sequence, ExecError, PipelineError, StepError};
use tabula_ir::{Column, CommandSequence, Table, Value};

fn people() -> Table {
    Table::new(vec![
        Column::new(
            "name",
            vec![
                Value::Str("A".to_string()),
                Value::Str("B".to_string()),
                Value::Str("C".to_string()),
            ],
        ),
        Column::new("age", vec![Value::Int(20), Value::Int(40), Value::Int(60)]),
    ])
    .unwrap()
}

fn sequence(json: serde_json::Value) -> CommandSequence {
    serde_json::from_value(json).unwrap()
}

#[test]
fn empty_sequence_returns_the_input_table() {
    let table = people();
    let seq = sequence(serde_json::json!({"transformations": []}));
    assert_eq!(run_sequence(&table, &seq).unwrap(), table);
}

#[test]
fn filter_then_select() {
    let table = people();
    let seq = sequence(serde_json::json!({
        "transformations": [
            {"command": "filter", "parameters": {"predicate": "age > 30"}},
            {"command": "select", "parameters": {"columns": ["name"]}}
        ]
    }));
    let out = run_sequence(&table, &seq).unwrap();
    assert_eq!(out.column_names(), vec!["name"]);
    assert_eq!(
        out.column("name").unwrap().values,
        vec![Value::Str("B".to_string()), Value::Str("C".to_string())]
    );
}

#[test]
fn select_with_full_column_set_is_a_no_op_twice_over() {
    let table = people();
    let seq = sequence(serde_json::json!({
        "transformations": [
            {"command": "select", "parameters": {"columns": ["name", "age"]}},
            {"command": "select", "parameters": {"columns": ["name", "age"]}}
        ]
    }));
    assert_eq!(run_sequence(&table, &seq).unwrap(), table);
}

#[test]
fn add_column_preserves_existing_data() {
    let table = people();
    let seq = sequence(serde_json::json!({
        "transformations": [
            {"command": "add_column", "parameters": {"column_name": "age_next_year", "formula": "age + 1"}}
        ]
    }));
    let out = run_sequence(&table, &seq).unwrap();
    assert_eq!(out.row_count(), table.row_count());
    assert_eq!(out.column("name").unwrap(), table.column("name").unwrap());
    assert_eq!(out.column("age").unwrap(), table.column("age").unwrap());
    assert_eq!(
        out.column("age_next_year").unwrap().values,
        vec![Value::Int(21), Value::Int(41), Value::Int(61)]
    );
}

#[test]
fn add_column_sees_columns_added_by_earlier_steps() {
    let table = people();
    let seq = sequence(serde_json::json!({
        "transformations": [
            {"command": "add_column", "parameters": {"column_name": "doubled", "formula": "age * 2"}},
            {"command": "add_column", "parameters": {"column_name": "quadrupled", "formula": "doubled * 2"}}
        ]
    }));
    let out = run_sequence(&table, &seq).unwrap();
    assert_eq!(
        out.column("quadrupled").unwrap().values,
        vec![Value::Int(80), Value::Int(160), Value::Int(240)]
    );
}

#[test]
fn duplicate_column_name_fails_the_pipeline() {
    let table = people();
    let seq = sequence(serde_json::json!({
        "transformations": [
            {"command": "add_column", "parameters": {"column_name": "age", "formula": "age * 2"}}
        ]
    }));
    let PipelineError { step, cause, .. } = run_sequence(&table, &seq).unwrap_err();
    assert_eq!(step, 0);
    assert_eq!(
        cause,
        StepError::Exec(ExecError::DuplicateColumn("age".to_string()))
    );
}

#[test]
fn select_of_missing_column_fails_the_pipeline() {
    let table = people();
    let seq = sequence(serde_json::json!({
        "transformations": [
            {"command": "select", "parameters": {"columns": ["height"]}}
        ]
    }));
    let err = run_sequence(&table, &seq).unwrap_err();
    assert_eq!(
        err.cause,
        StepError::Exec(ExecError::UnknownColumn("height".to_string()))
    );
}

#[test]
fn failure_mid_sequence_reports_zero_indexed_step() {
    let table = people();
    let seq = sequence(serde_json::json!({
        "transformations": [
            {"command": "select", "parameters": {"columns": ["age"]}},
            {"command": "filter", "parameters": {"predicate": "name == 'B'"}}
        ]
    }));
    let err = run_sequence(&table, &seq).unwrap_err();
    assert_eq!(err.step, 1);
    assert_eq!(err.command, "filter");
    // schema changed at step 0, so `name` is gone by the time step 1 runs
    assert!(matches!(err.cause, StepError::Exec(ExecError::Eval(_))));
    assert_eq!(err.table_before.column_names(), vec!["age"]);
}

#[test]
fn predicate_referencing_filtered_schema_still_works() {
    // Filters do not change the schema, so a later formula can use any
    // original column.
    let table = people();
    let seq = sequence(serde_json::json!({
        "transformations": [
            {"command": "filter", "parameters": {"predicate": "age >= 40"}},
            {"command": "add_column", "parameters": {"column_name": "tag", "formula": "name + '!'"}}
        ]
    }));
    let out = run_sequence(&table, &seq).unwrap();
    assert_eq!(
        out.column("tag").unwrap().values,
        vec![Value::Str("B!".to_string()), Value::Str("C!".to_string())]
    );
}

#[test]
fn run_accepts_a_plain_command_slice() {
    let table = people();
    let commands: Vec<tabula_ir::Command> = serde_json::from_value(serde_json::json!([
        {"command": "filter", "parameters": {"predicate": "age > 30"}}
    ]))
    .unwrap();
    assert_eq!(run(&table, &commands).unwrap().row_count(), 2);
}
