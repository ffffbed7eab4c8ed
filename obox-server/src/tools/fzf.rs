// obox-server/src/tools/fzf.rs

//! `filter_items`: non-interactive fuzzy filtering with `fzf --filter`.

use super::{create_schema_object, flag, required_str, string_list};
use obox_core::process::{run_and_format, Command, RunOptions, SuccessPolicy};
use obox_core::OboxConfig;
use rmcp::{model::Tool, Error as McpError};
use serde_json::{json, Map, Value};

pub const NAME: &str = "filter_items";

pub fn definition() -> Tool {
    Tool {
        name: NAME.into(),
        description: "Fuzzy filters a list of strings with fzf matching logic and returns the matches, best first.".into(),
        input_schema: create_schema_object(
            vec![
                ("items", json!({ "type": "array", "items": { "type": "string" }, "description": "The strings to filter." })),
                ("query", json!({ "type": "string", "description": "The fuzzy search pattern." })),
                ("exact", json!({ "type": "boolean", "description": "Enable exact-match." })),
                ("ignore_case", json!({ "type": "boolean", "description": "Case-insensitive match." })),
                ("smart_case", json!({ "type": "boolean", "description": "Smart-case match (default true)." })),
                ("no_sort", json!({ "type": "boolean", "description": "Keep input order instead of sorting by score." })),
            ],
            vec!["items", "query"],
        ),
    }
}

#[derive(Debug)]
pub struct FilterOptions {
    pub exact: bool,
    pub ignore_case: bool,
    pub smart_case: bool,
    pub no_sort: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            exact: false,
            ignore_case: false,
            smart_case: true,
            no_sort: false,
        }
    }
}

pub fn build_command(query: &str, options: &FilterOptions) -> Command {
    let mut args = vec!["fzf".to_string(), "--filter".to_string(), query.to_string()];
    if options.exact {
        args.push("-e".to_string());
    }
    if options.ignore_case {
        args.push("-i".to_string());
    } else if !options.smart_case {
        args.push("+i".to_string());
    }
    if options.no_sort {
        args.push("+s".to_string());
    }
    Command::Argv(args)
}

/// Runs the filter with `items` fed to stdin, one per line.
pub async fn filter(items: &[String], query: &str, options: &FilterOptions) -> String {
    run_and_format(
        &build_command(query, options),
        &RunOptions::new().with_input(items.join("\n")),
        "Error executing fzf",
        &SuccessPolicy::zero_or_one(),
    )
    .await
}

pub async fn call(args: &Map<String, Value>, _config: &OboxConfig) -> Result<String, McpError> {
    let items = string_list(args, "items")?;
    let query = required_str(args, "query")?;
    let options = FilterOptions {
        exact: flag(args, "exact", false),
        ignore_case: flag(args, "ignore_case", false),
        smart_case: flag(args, "smart_case", true),
        no_sort: flag(args, "no_sort", false),
    };
    Ok(filter(&items, query, &options).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use obox_core::command_exists;

    #[test]
    fn test_case_flags() {
        assert_eq!(build_command("abc", &FilterOptions::default()).to_string(), "fzf --filter abc");

        let sensitive = FilterOptions {
            smart_case: false,
            ..Default::default()
        };
        assert_eq!(build_command("abc", &sensitive).to_string(), "fzf --filter abc +i");

        let insensitive = FilterOptions {
            ignore_case: true,
            smart_case: false,
            exact: true,
            no_sort: true,
        };
        assert_eq!(build_command("abc", &insensitive).to_string(), "fzf --filter abc -e -i +s");
    }

    #[tokio::test]
    async fn test_filter_pipes_items_through_stdin() {
        if !command_exists("fzf").await {
            println!("Skipping test_filter_pipes_items_through_stdin: 'fzf' not found in PATH.");
            return;
        }
        let items = vec!["src/main.rs".to_string(), "README.md".to_string(), "src/lib.rs".to_string()];
        let output = filter(&items, "lib", &FilterOptions::default()).await;
        assert_eq!(output, "src/lib.rs");

        let none = filter(&items, "zzzzqqq", &FilterOptions::default()).await;
        assert_eq!(none, "");
    }
}
