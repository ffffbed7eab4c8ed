// obox-server/src/tools/command.rs

//! `run_command`: runs an argument vector directly, optionally bounded by a
//! timeout after which the process is left running in the background.

use super::{create_schema_object, optional_str, string_list, timeout_secs};
use obox_core::process::{run_and_format, Command, RunOptions, SuccessPolicy};
use obox_core::OboxConfig;
use rmcp::{model::Tool, Error as McpError};
use serde_json::{json, Map, Value};
use tracing::info;

pub const NAME: &str = "run_command";

pub fn definition() -> Tool {
    Tool {
        name: NAME.into(),
        description: "Runs a program with arguments (no shell) and returns its output. With a timeout, long-running programs such as dev servers are left running and the output captured so far is returned.".into(),
        input_schema: create_schema_object(
            vec![
                ("command", json!({ "type": "array", "items": { "type": "string" }, "description": "Program followed by its arguments, e.g. [\"pnpm\", \"run\", \"dev\"]." })),
                ("working_dir", json!({ "type": "string", "description": "Directory to run in (default: current directory)." })),
                ("timeout_secs", json!({ "type": "number", "description": "Seconds to wait before returning partial output." })),
                ("success_codes", json!({ "type": "array", "items": { "type": "integer" }, "description": "Exit codes that are not errors (default [0])." })),
            ],
            vec!["command"],
        ),
    }
}

fn success_codes_arg(args: &Map<String, Value>) -> Result<SuccessPolicy, McpError> {
    match args.get("success_codes") {
        None | Some(Value::Null) => Ok(SuccessPolicy::default()),
        Some(value) => serde_json::from_value::<Vec<i32>>(value.clone())
            .map(SuccessPolicy::codes)
            .map_err(|e| McpError::invalid_params(format!("Invalid format for 'success_codes': {}", e), None)),
    }
}

pub async fn call(args: &Map<String, Value>, config: &OboxConfig) -> Result<String, McpError> {
    let argv = string_list(args, "command")?;
    if argv.is_empty() {
        return Err(McpError::invalid_params("'command' must name a program", None));
    }
    let command = Command::Argv(argv);

    let mut options = RunOptions::new();
    if let Some(dir) = optional_str(args, "working_dir") {
        options = options.in_dir(dir);
    }
    if let Some(timeout) = timeout_secs(args, "timeout_secs")?.or_else(|| config.default_timeout()) {
        options = options.with_timeout(timeout);
    }
    let policy = success_codes_arg(args)?;

    info!(command = %command, working_dir = ?options.working_dir, timeout = ?options.timeout, "Running command tool");
    Ok(run_and_format(&command, &options, &config.process.error_prefix, &policy).await)
}
