//! Pipeline runner - applies a command sequence end to end

use thiserror::Error;

use tabula_ir::{validate, Command, CommandError, CommandSequence, Table};

use crate::executor::{execute, ExecError};

/// What went wrong inside one pipeline step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Failure of a pipeline run at a specific step.
///
/// `table_before` is the table as of the last successful step, so callers
/// can inspect or report how far the pipeline got. Steps are zero-indexed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("step {step} (`{command}`) failed: {cause}")]
pub struct PipelineError {
    pub step: usize,
    pub command: String,
    pub cause: StepError,
    pub table_before: Table,
}

/// Apply commands in order, short-circuiting on the first failure.
///
/// Each step is validated and then executed; a failed step is never
/// partially applied. No retries: execution is deterministic and pure, so
/// a repeated attempt would fail identically.
pub fn run(initial: &Table, commands: &[Command]) -> Result<Table, PipelineError> {
    let mut table = initial.clone();
    for (step, raw) in commands.iter().enumerate() {
        let outcome = validate(raw)
            .map_err(StepError::from)
            .and_then(|command| execute(&table, &command).map_err(StepError::from));
        match outcome {
            Ok(next) => table = next,
            Err(cause) => {
                return Err(PipelineError {
                    step,
                    command: raw.name.clone(),
                    cause,
                    table_before: table,
                })
            }
        }
    }
    Ok(table)
}

/// Convenience wrapper for the translator's boundary shape.
pub fn run_sequence(initial: &Table, sequence: &CommandSequence) -> Result<Table, PipelineError> {
    run(initial, &sequence.transformations)
}
