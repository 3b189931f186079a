//! Tabula command model
//!
//! Canonical JSON representation of a transformation request: the untrusted
//! `Command`/`CommandSequence` shape produced by the translator, the typed
//! `ValidatedCommand` the engine consumes, and the validation between them.
//! All types are deterministically serializable for caching and provenance.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

mod table;
pub use table::{Column, Table, TableError};

/// Scalar cell value. Untagged so it maps 1:1 onto JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// One raw transformation step as produced by the translator.
///
/// `parameters` stays arbitrary JSON until [`validate`] has checked it;
/// unknown extra keys are ignored rather than rejected, so translator noise
/// does not fail an otherwise well-formed command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "command")]
    pub name: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

/// Ordered sequence of commands, consumed exactly once per pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSequence {
    pub transformations: Vec<Command>,
}

impl CommandSequence {
    /// Calculate fingerprint (SHA-256) for deterministic caching
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).expect("command sequence should always serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A command that passed structural and semantic validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatedCommand {
    Filter { predicate: String },
    Select { columns: Vec<String> },
    AddColumn { column_name: String, formula: String },
}

impl ValidatedCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ValidatedCommand::Filter { .. } => "filter",
            ValidatedCommand::Select { .. } => "select",
            ValidatedCommand::AddColumn { .. } => "add_column",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("command `{command}` is missing required parameter `{key}`")]
    MissingParameter {
        command: &'static str,
        key: &'static str,
    },

    #[error("command `{command}` parameter `{key}` must be {expected}, got {actual}")]
    InvalidParameterType {
        command: &'static str,
        key: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Validate one raw command against the command vocabulary.
///
/// Pure function: checks the name, then required keys, then parameter types,
/// in that order, and returns the first violation.
pub fn validate(command: &Command) -> Result<ValidatedCommand, CommandError> {
    match command.name.as_str() {
        "filter" => {
            let predicate = require_string(command, "filter", "predicate")?;
            Ok(ValidatedCommand::Filter { predicate })
        }
        "select" => {
            let columns = require_string_list(command, "select", "columns")?;
            Ok(ValidatedCommand::Select { columns })
        }
        "add_column" => {
            let column_name = require_string(command, "add_column", "column_name")?;
            let formula = require_string(command, "add_column", "formula")?;
            Ok(ValidatedCommand::AddColumn {
                column_name,
                formula,
            })
        }
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn require_param<'a>(
    command: &'a Command,
    name: &'static str,
    key: &'static str,
) -> Result<&'a serde_json::Value, CommandError> {
    command
        .parameters
        .get(key)
        .ok_or(CommandError::MissingParameter { command: name, key })
}

fn require_string(
    command: &Command,
    name: &'static str,
    key: &'static str,
) -> Result<String, CommandError> {
    let value = require_param(command, name, key)?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or(CommandError::InvalidParameterType {
            command: name,
            key,
            expected: "a string",
            actual: json_type_name(value),
        })
}

fn require_string_list(
    command: &Command,
    name: &'static str,
    key: &'static str,
) -> Result<Vec<String>, CommandError> {
    let value = require_param(command, name, key)?;
    let items = value
        .as_array()
        .ok_or(CommandError::InvalidParameterType {
            command: name,
            key,
            expected: "a list of strings",
            actual: json_type_name(value),
        })?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or(CommandError::InvalidParameterType {
                    command: name,
                    key,
                    expected: "a list of strings",
                    actual: json_type_name(item),
                })
        })
        .collect()
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}
