// obox-server/src/tools/installer.rs

//! Package manager tools: Homebrew on macOS, Scoop on Windows.

use super::{create_schema_object, optional_str, required_str};
use obox_core::installer::{self, Platform};
use rmcp::{model::Tool, Error as McpError};
use serde_json::{json, Map, Value};

pub const INSTALL_PACKAGE_MANAGER: &str = "install_package_manager";
pub const INSTALL_APP: &str = "install_app";
pub const ADD_BUCKET: &str = "add_bucket";
pub const SEARCH_PACKAGE: &str = "search_package";

pub fn definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: INSTALL_PACKAGE_MANAGER.into(),
            description: "Detects the OS and installs its package manager: Homebrew on macOS, Scoop on Windows.".into(),
            input_schema: create_schema_object(vec![], vec![]),
        },
        Tool {
            name: INSTALL_APP.into(),
            description: "Installs an application with the system package manager (Homebrew on macOS, Scoop on Windows, optionally adding a bucket first).".into(),
            input_schema: create_schema_object(
                vec![
                    ("app_name", json!({ "type": "string", "description": "The package to install." })),
                    ("scoop_bucket", json!({ "type": "string", "description": "Optional Scoop bucket to add first (Windows only)." })),
                ],
                vec!["app_name"],
            ),
        },
        Tool {
            name: ADD_BUCKET.into(),
            description: "Adds a bucket to Scoop (Windows only).".into(),
            input_schema: create_schema_object(
                vec![("bucket_name", json!({ "type": "string", "description": "The bucket to add, e.g. 'extras'." }))],
                vec!["bucket_name"],
            ),
        },
        Tool {
            name: SEARCH_PACKAGE.into(),
            description: "Searches for a package with 'brew search' (macOS) or 'scoop search' (Windows).".into(),
            input_schema: create_schema_object(
                vec![("name", json!({ "type": "string", "description": "The package name to search for." }))],
                vec!["name"],
            ),
        },
    ]
}

fn message(result: Result<String, obox_core::InstallError>) -> String {
    result.unwrap_or_else(|e| e.to_string())
}

pub async fn call_install_package_manager() -> String {
    message(installer::install_package_manager(&Platform::current()).await)
}

pub async fn call_install_app(args: &Map<String, Value>) -> Result<String, McpError> {
    let app = required_str(args, "app_name")?;
    let bucket = optional_str(args, "scoop_bucket");
    Ok(message(
        installer::install_app(&Platform::current(), app, bucket, None).await,
    ))
}

pub async fn call_add_bucket(args: &Map<String, Value>) -> Result<String, McpError> {
    let bucket = required_str(args, "bucket_name")?;
    Ok(message(
        installer::add_scoop_bucket(&Platform::current(), bucket).await,
    ))
}

pub async fn call_search_package(args: &Map<String, Value>) -> Result<String, McpError> {
    let name = required_str(args, "name")?;
    Ok(message(
        installer::search_package(&Platform::current(), name).await,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_add_bucket_reports_platform_error_as_text() {
        let mut args = Map::new();
        args.insert("bucket_name".to_string(), json!("extras"));
        let text = call_add_bucket(&args).await.ok();
        assert_eq!(text.as_deref(), Some("Scoop buckets can only be added on Windows."));
    }

    #[tokio::test]
    async fn test_install_app_requires_name() {
        assert!(call_install_app(&Map::new()).await.is_err());
    }
}
