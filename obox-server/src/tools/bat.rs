// obox-server/src/tools/bat.rs

//! `read_file`: line-ranged file viewing with bat.

use super::{create_schema_object, optional_str, required_str};
use obox_core::installer::{install_app, Platform};
use obox_core::process::{run_and_format, Command, RunOptions, SuccessPolicy};
use obox_core::OboxConfig;
use rmcp::{model::Tool, Error as McpError};
use serde_json::{json, Map, Value};

pub const NAME: &str = "read_file";

pub fn definition() -> Tool {
    Tool {
        name: NAME.into(),
        description: "Reads a file with bat, optionally limited to a line range. At most 500 lines are returned per read.".into(),
        input_schema: create_schema_object(
            vec![
                ("path", json!({ "type": "string", "description": "Absolute path to the file to read." })),
                ("line_range", json!({ "type": "string", "description": "Lines to read: 'N', 'N:M', 'N:' or ':M'." })),
                ("style", json!({ "type": "string", "description": "bat style: default, plain, numbers, changes, grid, header, snip. Defaults to numbers." })),
            ],
            vec!["path"],
        ),
    }
}

/// Normalizes `line_range` into bat's `START:END` form, capped at `max_lines`.
///
/// Line numbers start at 1. The error is the message returned to the agent.
pub fn resolve_line_range(line_range: Option<&str>, max_lines: usize) -> Result<String, String> {
    let max = max_lines as u64;
    let too_long = || format!("Error: Line range exceeds maximum of {} lines.", max);
    let Some(range) = line_range else {
        return Ok(format!("1:{}", max));
    };

    if !range.contains(':') {
        let line = range.trim();
        return match parse_line(line, "Error: Invalid line number.")? {
            Some(_) => Ok(line.to_string()),
            None => Err("Error: Invalid line number.".to_string()),
        };
    }

    let parts: Vec<&str> = range.split(':').collect();
    if parts.len() > 2 {
        return Err("Error: Invalid line range format. Use 'N', 'N:M', 'N:', or ':M'.".to_string());
    }

    let start = parse_line(parts[0], "Error: Invalid start line number.")?.unwrap_or(1);
    let end = match parse_line(parts[1], "Error: Invalid end line number.")? {
        Some(end) => end,
        None => start
            .checked_add(max.saturating_sub(1))
            .ok_or_else(too_long)?,
    };

    if end < start {
        return Err("Error: End line must be >= start line.".to_string());
    }
    match (end - start).checked_add(1) {
        Some(span) if span <= max => Ok(format!("{}:{}", start, end)),
        _ => Err(too_long()),
    }
}

/// `Ok(None)` for an empty bound. Zero and negative numbers are rejected.
fn parse_line(text: &str, invalid: &str) -> Result<Option<u64>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<i64>() {
        Ok(n) if n >= 1 => Ok(Some(n as u64)),
        Ok(_) => Err("Error: Invalid line number.".to_string()),
        Err(_) => Err(invalid.to_string()),
    }
}

pub fn build_command(path: &str, range: &str, style: &str) -> Command {
    Command::argv(["bat", "--line-range", range, "--style", style, "--color", "never", path])
}

pub async fn call(args: &Map<String, Value>, config: &OboxConfig) -> Result<String, McpError> {
    let path = required_str(args, "path")?;
    let style = optional_str(args, "style").unwrap_or("numbers");

    let range = match resolve_line_range(optional_str(args, "line_range"), config.read_file.max_lines) {
        Ok(range) => range,
        Err(message) => return Ok(message),
    };

    if let Err(e) = install_app(&Platform::current(), "bat", None, None).await {
        return Ok(format!("Error: {}", e));
    }

    Ok(run_and_format(
        &build_command(path, &range, style),
        &RunOptions::new(),
        "Error reading file with bat",
        &SuccessPolicy::default(),
    )
    .await)
}
