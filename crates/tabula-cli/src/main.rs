//! Tabula CLI
//!
//! Loads a table, asks OpenAI to translate a natural-language instruction
//! into a command sequence, runs the pipeline, and renders the result.
//! Everything impure lives here; the engine crates stay silent and pure.

use clap::Parser;
use tracing::info;

use tabula_ir::{Column, Table, Value};

mod config;
mod logging;
mod render;
mod translator;

use config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "tabula",
    about = "Apply natural-language transformations to a tabular dataset"
)]
struct Args {
    /// Path to a JSON table file ({"columns": [{"name": ..., "values": [...]}]});
    /// a built-in sample table is used when omitted
    #[arg(long)]
    table: Option<std::path::PathBuf>,

    /// Transformation instruction; prompts on stdin when omitted
    #[arg(long)]
    instruction: Option<String>,

    /// Path to the YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        Config::default()
    };
    config.apply_logging_env();
    logging::init();

    let table = match &args.table {
        Some(path) => load_table(path)?,
        None => sample_table(),
    };
    println!("Input table:\n{}", render::render(&table));

    let instruction = match args.instruction {
        Some(text) => text,
        None => prompt_for_instruction()?,
    };

    let api_key = Config::openai_api_key()?;
    let openai_config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
    let client = async_openai::Client::with_config(openai_config);

    info!(model = %config.llm.model, "translating instruction");
    let sequence = translator::translate(
        &client,
        &config.llm.model,
        &instruction,
        &table.column_names(),
    )
    .await?;
    info!(
        fingerprint = %sequence.fingerprint(),
        steps = sequence.transformations.len(),
        "translator produced a command sequence"
    );
    println!(
        "Generated commands:\n{}",
        serde_json::to_string_pretty(&sequence)?
    );

    match tabula_engine::run_sequence(&table, &sequence) {
        Ok(result) => {
            println!("Transformed table:\n{}", render::render(&result));
            Ok(())
        }
        Err(err) => {
            eprintln!(
                "Pipeline failed at step {} (`{}`): {}",
                err.step, err.command, err.cause
            );
            eprintln!(
                "Table before the failing step: {} rows, columns [{}]",
                err.table_before.row_count(),
                err.table_before.column_names().join(", ")
            );
            std::process::exit(1);
        }
    }
}

fn load_table(path: &std::path::Path) -> Result<Table, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Demo table used when no --table file is given.
fn sample_table() -> Table {
    Table::new(vec![
        Column::new(
            "name",
            ["Alice", "Bob", "Charlie", "David"]
                .map(|s| Value::Str(s.to_string()))
                .to_vec(),
        ),
        Column::new(
            "age",
            vec![
                Value::Int(25),
                Value::Int(35),
                Value::Int(45),
                Value::Int(28),
            ],
        ),
        Column::new(
            "salary",
            vec![
                Value::Int(50000),
                Value::Int(60000),
                Value::Int(70000),
                Value::Int(52000),
            ],
        ),
    ])
    .expect("sample table is well formed")
}

fn prompt_for_instruction() -> std::io::Result<String> {
    use std::io::Write;

    print!("Enter your data transformation instructions: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
