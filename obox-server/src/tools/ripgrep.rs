// obox-server/src/tools/ripgrep.rs

//! `search`: recursive pattern search with ripgrep.

use super::{create_schema_object, flag, optional_str, optional_u64, required_str, string_list};
use obox_core::process::{format_result, run, Command, RunOptions, SuccessPolicy};
use obox_core::OboxConfig;
use rmcp::{model::Tool, Error as McpError};
use serde_json::{json, Map, Value};
use tracing::info;

pub const NAME: &str = "search";

pub fn definition() -> Tool {
    Tool {
        name: NAME.into(),
        description: "Searches files recursively for a regex pattern using ripgrep (rg). Respects .gitignore and skips hidden files by default.".into(),
        input_schema: create_schema_object(
            vec![
                ("pattern", json!({ "type": "string", "description": "The regex pattern to search for." })),
                ("path", json!({ "type": "string", "description": "Directory or file to search (default: current directory)." })),
                ("glob", json!({ "type": "array", "items": { "type": "string" }, "description": "Glob patterns to include or exclude, e.g. [\"*.py\", \"!*.log\"]." })),
                ("case_sensitive", json!({ "type": "boolean", "description": "Search case sensitively (default: smart case)." })),
                ("fixed_strings", json!({ "type": "boolean", "description": "Treat the pattern as a literal string." })),
                ("context", json!({ "type": "integer", "description": "Lines of context around each match." })),
                ("max_depth", json!({ "type": "integer", "description": "Descend at most this many directories." })),
                ("include_hidden", json!({ "type": "boolean", "description": "Search hidden files and directories." })),
            ],
            vec!["pattern"],
        ),
    }
}

#[derive(Debug, Default)]
pub struct SearchParams {
    pub pattern: String,
    pub path: Option<String>,
    pub globs: Vec<String>,
    pub case_sensitive: bool,
    pub fixed_strings: bool,
    pub context: u64,
    pub max_depth: Option<u64>,
    pub include_hidden: bool,
}

pub fn build_command(params: &SearchParams) -> Command {
    let mut args = vec!["rg".to_string(), "-n".to_string(), "--color".to_string(), "never".to_string()];
    if params.fixed_strings {
        args.push("-F".to_string());
    }
    if params.context > 0 {
        args.push(format!("-C{}", params.context));
    }
    if let Some(depth) = params.max_depth {
        args.push(format!("-d{}", depth));
    }
    if params.include_hidden {
        args.push("--hidden".to_string());
    }
    args.push(if params.case_sensitive { "-s" } else { "-S" }.to_string());
    for glob in &params.globs {
        args.push("-g".to_string());
        args.push(glob.clone());
    }
    args.push("--".to_string());
    args.push(params.pattern.clone());
    args.push(params.path.clone().unwrap_or_else(|| ".".to_string()));
    Command::Argv(args)
}

pub async fn call(args: &Map<String, Value>, config: &OboxConfig) -> Result<String, McpError> {
    let params = SearchParams {
        pattern: required_str(args, "pattern")?.to_string(),
        path: optional_str(args, "path").map(str::to_string),
        globs: string_list(args, "glob")?,
        case_sensitive: flag(args, "case_sensitive", false),
        fixed_strings: flag(args, "fixed_strings", false),
        context: optional_u64(args, "context").unwrap_or(0),
        max_depth: optional_u64(args, "max_depth"),
        include_hidden: flag(args, "include_hidden", false),
    };
    info!(pattern = %params.pattern, path = ?params.path, "Searching with ripgrep");

    let command = build_command(&params);
    let result = run(&command, &RunOptions::new()).await;
    // rg exits 1 when nothing matched.
    if result.code == Some(1) && result.stdout.is_empty() {
        return Ok("No matches found.".to_string());
    }
    Ok(format_result(
        &command,
        result,
        &config.process.error_prefix,
        &SuccessPolicy::zero_or_one(),
    ))
}
