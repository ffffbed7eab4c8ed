// obox-server/src/tools/project.rs

use super::{create_schema_object, required_str};
use obox_core::project::{find_project_root_from, FdSearch};
use obox_core::OboxConfig;
use rmcp::{model::Tool, Error as McpError};
use serde_json::{json, Map, Value};
use tracing::warn;

pub const NAME: &str = "find_project_root";

pub fn definition() -> Tool {
    Tool {
        name: NAME.into(),
        description: "Finds the directory containing a marker file (e.g. 'package.json'), searching parent directories first and then subdirectories up to a small depth.".into(),
        input_schema: create_schema_object(
            vec![(
                "marker",
                json!({ "type": "string", "description": "File name that marks the project root, e.g. 'pyproject.toml'." }),
            )],
            vec!["marker"],
        ),
    }
}

pub async fn call(args: &Map<String, Value>, config: &OboxConfig) -> Result<String, McpError> {
    let marker = required_str(args, "marker")?;
    let start = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!(error = %e, "Cannot read current directory");
            return Ok(format!("Error: could not determine the current directory: {}", e));
        }
    };

    let search = FdSearch::new(config.project_root.max_depth);
    Ok(match find_project_root_from(&start, marker, &search).await {
        Some(root) => root.display().to_string(),
        None => format!("No project root found containing '{}'.", marker),
    })
}
