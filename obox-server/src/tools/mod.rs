// obox-server/src/tools/mod.rs

//! Tool definitions and the argument plumbing they share.
//!
//! Each submodule exposes its tool definitions and call functions that turn
//! the JSON arguments into a command line, run it through
//! `obox_core::process`, and return the text the agent will see. Only missing
//! or ill-typed arguments become protocol errors; everything that goes wrong
//! while running a tool is reported as text.

pub mod bat;
pub mod command;
pub mod fd;
pub mod fzf;
pub mod installer;
pub mod nodejs;
pub mod project;
pub mod python;
pub mod ripgrep;

use obox_core::OboxConfig;
use rmcp::{model::*, Error as McpError};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// JSON Schema for a tool's arguments: an object with the given properties,
/// of which `required` must be present.
pub fn create_schema_object(
    properties: Vec<(&str, Value)>,
    required: Vec<&str>,
) -> Arc<Map<String, Value>> {
    let props_map: Map<String, Value> = properties
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let req_vec: Vec<Value> = required
        .into_iter()
        .map(|s| Value::String(s.to_string()))
        .collect();

    let schema = json!({
        "type": "object",
        "properties": props_map,
        "required": req_vec
    });
    let map = match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Arc::new(map)
}

/// Every tool the server offers.
pub fn definitions() -> Vec<Tool> {
    let mut tools = installer::definitions();
    tools.extend([
        project::definition(),
        ripgrep::definition(),
        fd::definition(),
        bat::definition(),
        fzf::definition(),
        command::definition(),
    ]);
    tools.extend(nodejs::definitions());
    tools.extend(python::definitions());
    tools
}

/// Routes a call to its tool. `Ok(None)` means no tool has that name.
pub async fn call(
    name: &str,
    args: &Map<String, Value>,
    config: &OboxConfig,
) -> Result<Option<String>, McpError> {
    let text = match name {
        installer::INSTALL_PACKAGE_MANAGER => installer::call_install_package_manager().await,
        installer::INSTALL_APP => installer::call_install_app(args).await?,
        installer::ADD_BUCKET => installer::call_add_bucket(args).await?,
        installer::SEARCH_PACKAGE => installer::call_search_package(args).await?,
        project::NAME => project::call(args, config).await?,
        ripgrep::NAME => ripgrep::call(args, config).await?,
        fd::NAME => fd::call(args, config).await?,
        bat::NAME => bat::call(args, config).await?,
        fzf::NAME => fzf::call(args, config).await?,
        command::NAME => command::call(args, config).await?,
        nodejs::INSTALL_NODEJS_TOOLS => nodejs::call_install_nodejs_tools().await,
        nodejs::LIST_NODE_VERSIONS => nodejs::call_list_node_versions(config).await,
        nodejs::LIST_REMOTE_NODE_VERSIONS => nodejs::call_list_remote_node_versions(config).await,
        nodejs::INSTALL_NODE_VERSION => nodejs::call_install_node_version(args, config).await?,
        nodejs::USE_NODE_VERSION => nodejs::call_use_node_version(args, config).await?,
        nodejs::GET_NODEJS_INFO => nodejs::call_get_nodejs_info(args, config).await,
        nodejs::PNPM_ADD => nodejs::call_pnpm_add(args, config).await?,
        nodejs::PNPM_LIST => nodejs::call_pnpm_list(args, config).await,
        nodejs::PNPM_RUN => nodejs::call_pnpm_run(args, config).await?,
        python::LIST_AVAILABLE_PYTHON_ENVIRONMENTS => {
            python::call_list_available_python_environments(args, config).await
        }
        python::CONFIGURE_PYTHON_ENVIRONMENT => python::call_configure_python_environment(args, config).await?,
        python::GET_ENV_INFO => python::call_get_env_info(args, config).await,
        python::INSTALL_PYTHON_PACKAGE => python::call_install_python_package(args, config).await?,
        python::GET_LIST_PYTHON_PACKAGES_INSTALLED => {
            python::call_get_list_python_packages_installed(args, config).await
        }
        python::UV_SYNC => python::call_uv_sync(args, config).await,
        _ => return Ok(None),
    };
    Ok(Some(text))
}

pub fn text_result(text: String) -> CallToolResult {
    let raw_content = RawContent::Text(RawTextContent { text });
    let annotated = Annotated {
        raw: raw_content,
        annotations: None,
    };
    CallToolResult {
        content: vec![annotated],
        is_error: Some(false),
    }
}

pub fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, McpError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| McpError::invalid_params(format!("Missing required argument: {}", key), None))
}

pub fn optional_str<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub fn flag(args: &Map<String, Value>, key: &str, default: bool) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(default)
}

pub fn optional_u64(args: &Map<String, Value>, key: &str) -> Option<u64> {
    args.get(key).and_then(Value::as_u64)
}

/// Seconds as a `Duration`; a missing key or `null` is no timeout.
pub fn timeout_secs(args: &Map<String, Value>, key: &str) -> Result<Option<Duration>, McpError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_f64() {
            Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
            _ => Err(McpError::invalid_params(
                format!("'{}' must be a non-negative number", key),
                None,
            )),
        },
    }
}

/// A list of strings; a missing key or `null` is an empty list.
pub fn string_list(args: &Map<String, Value>, key: &str) -> Result<Vec<String>, McpError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
            McpError::invalid_params(format!("Invalid format for '{}': {}", key, e), None)
        }),
    }
}
