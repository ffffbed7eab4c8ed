// obox-server/src/tools/fd.rs

//! `find`: filesystem entry lookup with fd.

use super::{create_schema_object, flag, optional_str, optional_u64, string_list};
use obox_core::process::{run_and_format, Command, RunOptions, SuccessPolicy};
use obox_core::OboxConfig;
use rmcp::{model::Tool, Error as McpError};
use serde_json::{json, Map, Value};

pub const NAME: &str = "find";

pub fn definition() -> Tool {
    Tool {
        name: NAME.into(),
        description: "Finds files and directories by pattern, extension or type using fd. Respects .gitignore and skips hidden entries by default.".into(),
        input_schema: create_schema_object(
            vec![
                ("pattern", json!({ "type": "string", "description": "Regex matched against entry names (default: match everything)." })),
                ("path", json!({ "type": "string", "description": "Root directory for the search." })),
                ("hidden", json!({ "type": "boolean", "description": "Include hidden files and directories (-H)." })),
                ("no_ignore", json!({ "type": "boolean", "description": "Do not respect .gitignore or .fdignore (-I)." })),
                ("extension", json!({ "type": "array", "items": { "type": "string" }, "description": "Only entries with these extensions (-e)." })),
                ("file_type", json!({ "type": "string", "description": "f (file), d (directory), l (symlink), x (executable), e (empty)." })),
                ("max_depth", json!({ "type": "integer", "description": "Maximum search depth (-d)." })),
            ],
            vec![],
        ),
    }
}

#[derive(Debug, Default)]
pub struct FindParams {
    pub pattern: Option<String>,
    pub path: Option<String>,
    pub hidden: bool,
    pub no_ignore: bool,
    pub extensions: Vec<String>,
    pub file_type: Option<String>,
    pub max_depth: Option<u64>,
}

pub fn build_command(params: &FindParams) -> Command {
    let mut args = vec!["fd".to_string(), "--color".to_string(), "never".to_string()];
    if params.hidden {
        args.push("-H".to_string());
    }
    if params.no_ignore {
        args.push("-I".to_string());
    }
    if let Some(depth) = params.max_depth {
        args.push("-d".to_string());
        args.push(depth.to_string());
    }
    if let Some(file_type) = &params.file_type {
        args.push("-t".to_string());
        args.push(file_type.clone());
    }
    for ext in &params.extensions {
        args.push("-e".to_string());
        args.push(ext.clone());
    }
    // fd takes the pattern before the path, so a path alone needs a match-all pattern.
    match (&params.pattern, &params.path) {
        (Some(pattern), path) => {
            args.push(pattern.clone());
            args.extend(path.clone());
        }
        (None, Some(path)) => {
            args.push(".".to_string());
            args.push(path.clone());
        }
        (None, None) => {}
    }
    Command::Argv(args)
}

pub async fn call(args: &Map<String, Value>, config: &OboxConfig) -> Result<String, McpError> {
    let params = FindParams {
        pattern: optional_str(args, "pattern").map(str::to_string),
        path: optional_str(args, "path").map(str::to_string),
        hidden: flag(args, "hidden", false),
        no_ignore: flag(args, "no_ignore", false),
        extensions: string_list(args, "extension")?,
        file_type: optional_str(args, "file_type").map(str::to_string),
        max_depth: optional_u64(args, "max_depth"),
    };

    let output = run_and_format(
        &build_command(&params),
        &RunOptions::new(),
        &config.process.error_prefix,
        &SuccessPolicy::zero_or_one(),
    )
    .await;
    if output.is_empty() {
        Ok("No entries found.".to_string())
    } else {
        Ok(output)
    }
}
