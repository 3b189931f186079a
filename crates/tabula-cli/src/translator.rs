//! OpenAI integration: natural language -> command sequence
//!
//! The model's output is untrusted input. It gets sanitized (code fences),
//! normalized (wrapper object or bare array), and every command must pass
//! full validation before the sequence is accepted; anything else becomes
//! feedback for a retry.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};

use tabula_ir::{validate, Command, CommandSequence};

/// System prompt - teaches the model the command vocabulary
const SYSTEM_PROMPT: &str = r#"You are an assistant that translates natural language instructions into a sequence of structured data transformation commands in JSON format. Each command is a JSON object with a `command` field naming the operation and a `parameters` field with its details.

Available Commands:

1. filter - keeps rows satisfying a condition.
   Parameters:
   - `predicate`: a boolean expression over column names (e.g. "age > 30").
   Example:
   { "command": "filter", "parameters": { "predicate": "age > 30" } }

2. select - keeps only the named columns, in the given order.
   Parameters:
   - `columns`: a list of column names.
   Example:
   { "command": "select", "parameters": { "columns": ["name", "age"] } }

3. add_column - appends a new column computed per row.
   Parameters:
   - `column_name`: name of the new column (must not already exist).
   - `formula`: a scalar expression over column names (e.g. "age / income").
   Example:
   { "command": "add_column", "parameters": { "column_name": "age_income_ratio", "formula": "age / income" } }

Expressions may use numbers, single-quoted strings, column names, `+ - * /`, comparisons (`> >= < <= == !=`), `and`, `or`, `not`, and parentheses. No function calls.

Rules:
1. Return a JSON object with a single key `transformations` mapping to an array of command objects.
2. Only reference columns from the Available Columns list.
3. Combine every instruction in the input into one command sequence, in order.
4. Return ONLY the JSON - no markdown, no explanations.

Examples:

Instruction: "Filter rows where age > 30 and select the name and age columns."
Response:
{
  "transformations": [
    { "command": "filter", "parameters": { "predicate": "age > 30" } },
    { "command": "select", "parameters": { "columns": ["name", "age"] } }
  ]
}

Instruction: "Add a column named 'age_to_income_ratio' that divides age by income."
Response:
{
  "transformations": [
    { "command": "add_column", "parameters": { "column_name": "age_to_income_ratio", "formula": "age / income" } }
  ]
}"#;

const MAX_RETRIES: usize = 3;

/// Strip a Markdown code fence, if the model wrapped its JSON in one.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    match rest.rfind("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

/// Normalize the model output into the single CommandSequence shape.
///
/// Accepts the documented `{"transformations": [...]}` wrapper as well as a
/// bare array of commands, which some models produce despite the prompt.
fn normalize(content: &str) -> Result<CommandSequence, serde_json::Error> {
    let text = strip_code_fences(content);
    serde_json::from_str::<CommandSequence>(text).or_else(|wrapper_err| {
        serde_json::from_str::<Vec<Command>>(text)
            .map(|transformations| CommandSequence { transformations })
            .map_err(|_| wrapper_err)
    })
}

/// Check every command against the vocabulary before accepting the sequence.
fn validate_sequence(sequence: &CommandSequence) -> Result<(), String> {
    for (i, command) in sequence.transformations.iter().enumerate() {
        validate(command).map_err(|e| format!("step {i}: {e}"))?;
    }
    Ok(())
}

/// Translate a natural-language instruction into a validated command
/// sequence, with an error-feedback retry loop.
pub async fn translate(
    client: &Client<OpenAIConfig>,
    model: &str,
    instruction: &str,
    column_names: &[&str],
) -> Result<CommandSequence, Box<dyn std::error::Error>> {
    let system_prompt = format!(
        "{SYSTEM_PROMPT}\n\nAvailable Columns:\n{}",
        column_names.join(", ")
    );

    let mut messages = vec![
        ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()?,
        ),
        ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(instruction)
                .build()?,
        ),
    ];

    for attempt in 0..MAX_RETRIES {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages.clone())
            .temperature(0.0) // Deterministic output
            .build()?;

        let response = client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .ok_or("no response from the model")?;

        tracing::debug!(attempt = attempt + 1, response = %content, "translator response");

        let feedback = match normalize(content) {
            Ok(sequence) => match validate_sequence(&sequence) {
                Ok(()) => return Ok(sequence),
                Err(e) => format!("Error: {e}. Please fix the command and regenerate the JSON."),
            },
            Err(e) => format!(
                "Error: could not parse your response as a JSON command sequence ({e}). \
                 Return ONLY valid JSON, no markdown formatting."
            ),
        };

        if attempt == MAX_RETRIES - 1 {
            return Err(feedback.into());
        }

        tracing::warn!(attempt = attempt + 1, "translator output rejected, sending feedback");
        messages.push(ChatCompletionRequestMessage::Assistant(
            async_openai::types::ChatCompletionRequestAssistantMessageArgs::default()
                .content(content.clone())
                .build()?,
        ));
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(feedback)
                .build()?,
        ));
    }

    Err("exceeded maximum translator retries".into())
}
