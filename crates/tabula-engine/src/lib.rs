//! Tabula execution engine
//!
//! Applies validated transformation commands to in-memory tables. Pure and
//! synchronous: no I/O, no logging, no shared state. Every failure comes
//! back as structured data; nothing here prints or aborts.

mod executor;
mod pipeline;

pub use executor::{execute, ExecError};
pub use pipeline::{run, run_sequence, PipelineError, StepError};
