// obox-server/src/tools/nodejs.rs

//! Node.js tools: fnm manages Node versions, pnpm manages packages and runs
//! scripts.
//!
//! pnpm commands run in the directory holding `package.json`. When several
//! candidates sit below the current directory the agent is asked to pass
//! `root_dir` instead of one being picked at random.

use super::{create_schema_object, flag, optional_str, required_str, string_list, timeout_secs};
use obox_core::installer::{install_app, Platform};
use obox_core::process::{run_and_format, Command, RunOptions, SuccessPolicy};
use obox_core::project::{find_project_roots, DescendantSearch, FdSearch};
use obox_core::OboxConfig;
use rmcp::{model::Tool, Error as McpError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const INSTALL_NODEJS_TOOLS: &str = "install_nodejs_tools";
pub const LIST_NODE_VERSIONS: &str = "list_node_versions";
pub const LIST_REMOTE_NODE_VERSIONS: &str = "list_remote_node_versions";
pub const INSTALL_NODE_VERSION: &str = "install_node_version";
pub const USE_NODE_VERSION: &str = "use_node_version";
pub const GET_NODEJS_INFO: &str = "get_nodejs_info";
pub const PNPM_ADD: &str = "pnpm_add";
pub const PNPM_LIST: &str = "pnpm_list";
pub const PNPM_RUN: &str = "pnpm_run";

const PACKAGE_JSON: &str = "package.json";

fn root_dir_property() -> (&'static str, Value) {
    (
        "root_dir",
        json!({ "type": "string", "description": "Directory containing package.json. Required when several projects are found." }),
    )
}

fn version_property() -> (&'static str, Value) {
    (
        "version",
        json!({ "type": "string", "description": "Node.js version, e.g. '20', '18.17.0' or 'latest'." }),
    )
}

pub fn definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: INSTALL_NODEJS_TOOLS.into(),
            description: "Installs fnm (Fast Node Manager) and pnpm with Homebrew (macOS) or Scoop (Windows).".into(),
            input_schema: create_schema_object(vec![], vec![]),
        },
        Tool {
            name: LIST_NODE_VERSIONS.into(),
            description: "Lists installed Node.js versions ('fnm ls').".into(),
            input_schema: create_schema_object(vec![], vec![]),
        },
        Tool {
            name: LIST_REMOTE_NODE_VERSIONS.into(),
            description: "Lists Node.js versions available for download ('fnm ls-remote').".into(),
            input_schema: create_schema_object(vec![], vec![]),
        },
        Tool {
            name: INSTALL_NODE_VERSION.into(),
            description: "Installs a Node.js version ('fnm install').".into(),
            input_schema: create_schema_object(vec![version_property()], vec!["version"]),
        },
        Tool {
            name: USE_NODE_VERSION.into(),
            description: "Switches the current Node.js version ('fnm use').".into(),
            input_schema: create_schema_object(vec![version_property()], vec!["version"]),
        },
        Tool {
            name: GET_NODEJS_INFO.into(),
            description: "Reports the Node.js and pnpm versions, installed Node versions and the project name as JSON.".into(),
            input_schema: create_schema_object(vec![root_dir_property()], vec![]),
        },
        Tool {
            name: PNPM_ADD.into(),
            description: "Adds packages to the project with 'pnpm add'.".into(),
            input_schema: create_schema_object(
                vec![
                    ("packages", json!({ "type": "array", "items": { "type": "string" }, "description": "Packages to add, e.g. [\"tailwindcss\", \"axios\"]." })),
                    ("dev", json!({ "type": "boolean", "description": "Add as devDependencies (-D)." })),
                    root_dir_property(),
                ],
                vec!["packages"],
            ),
        },
        Tool {
            name: PNPM_LIST.into(),
            description: "Lists the project's installed packages ('pnpm list').".into(),
            input_schema: create_schema_object(vec![root_dir_property()], vec![]),
        },
        Tool {
            name: PNPM_RUN.into(),
            description: "Runs a package.json script ('pnpm run <script>'). Give long-running scripts such as 'dev' a timeout; they keep running after it.".into(),
            input_schema: create_schema_object(
                vec![
                    ("script", json!({ "type": "string", "description": "Script name from package.json." })),
                    root_dir_property(),
                    ("timeout", json!({ "type": "number", "description": "Seconds to wait before returning partial output." })),
                ],
                vec!["script"],
            ),
        },
    ]
}

/// Picks the directory pnpm should run in.
///
/// An explicit `root_dir` wins. Otherwise the enclosing project, or the only
/// project below `start`, is used. The error is the text returned to the agent.
pub async fn resolve_root(
    root_dir: Option<&str>,
    start: &Path,
    search: &dyn DescendantSearch,
) -> Result<PathBuf, String> {
    if let Some(dir) = root_dir {
        return Ok(PathBuf::from(dir));
    }

    let mut roots = find_project_roots(start, PACKAGE_JSON, search).await;
    match roots.len() {
        0 => Err(format!(
            "Error: Could not find any directory containing '{}'.",
            PACKAGE_JSON
        )),
        1 => Ok(roots.remove(0)),
        _ => {
            let listing = roots
                .iter()
                .map(|root| format!("- {}", root.display()))
                .collect::<Vec<_>>()
                .join("\n");
            Err(format!(
                "Found multiple project roots containing '{}'. \
                 Please specify the 'root_dir' parameter to choose one:\n{}",
                PACKAGE_JSON, listing
            ))
        }
    }
}

async fn resolve_root_here(args: &Map<String, Value>, config: &OboxConfig) -> Result<PathBuf, String> {
    let start = std::env::current_dir()
        .map_err(|e| format!("Error: could not determine the current directory: {}", e))?;
    let search = FdSearch::new(config.project_root.max_depth);
    resolve_root(optional_str(args, "root_dir"), &start, &search).await
}

/// Runs `command`, installing fnm or pnpm first when it is the program and
/// missing from `PATH`.
async fn run_node_tool(
    command: Command,
    dir: Option<&Path>,
    timeout: Option<Duration>,
    config: &OboxConfig,
) -> String {
    let program = command.program().to_string();
    if matches!(program.as_str(), "fnm" | "pnpm") {
        if let Err(e) = install_app(&Platform::current(), &program, None, None).await {
            return format!("Error installing {}: {}", program, e);
        }
    }

    let mut options = RunOptions::new();
    if let Some(dir) = dir {
        options = options.in_dir(dir);
    }
    if let Some(timeout) = timeout {
        options = options.with_timeout(timeout);
    }
    run_and_format(&command, &options, &config.process.error_prefix, &SuccessPolicy::default()).await
}

pub async fn call_install_nodejs_tools() -> String {
    let platform = Platform::current();
    let mut lines = Vec::new();
    for app in ["fnm", "pnpm"] {
        let message = match install_app(&platform, app, None, None).await {
            Ok(text) => text,
            Err(e) => e.to_string(),
        };
        lines.push(format!("{}: {}", app, message));
    }
    lines.join("\n")
}

pub async fn call_list_node_versions(config: &OboxConfig) -> String {
    run_node_tool(Command::argv(["fnm", "ls"]), None, None, config).await
}

pub async fn call_list_remote_node_versions(config: &OboxConfig) -> String {
    run_node_tool(Command::argv(["fnm", "ls-remote"]), None, None, config).await
}

pub async fn call_install_node_version(args: &Map<String, Value>, config: &OboxConfig) -> Result<String, McpError> {
    let version = required_str(args, "version")?;
    Ok(run_node_tool(Command::argv(["fnm", "install", version]), None, None, config).await)
}

pub async fn call_use_node_version(args: &Map<String, Value>, config: &OboxConfig) -> Result<String, McpError> {
    let version = required_str(args, "version")?;
    Ok(run_node_tool(Command::argv(["fnm", "use", version]), None, None, config).await)
}

#[derive(Serialize, Debug, PartialEq)]
pub struct NodeEnvInfo {
    pub node_version: String,
    pub pnpm_version: String,
    pub installed_node_versions: Vec<String>,
    pub project_name: Option<String>,
}

/// The `name` field of `<root>/package.json`, if the file exists.
pub async fn read_project_name(root: &Path) -> Result<Option<String>, String> {
    let path = root.join(PACKAGE_JSON);
    if !path.is_file() {
        return Ok(None);
    }
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let manifest: Value = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    Ok(manifest.get("name").and_then(Value::as_str).map(str::to_string))
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn call_get_nodejs_info(args: &Map<String, Value>, config: &OboxConfig) -> String {
    let root = match resolve_root_here(args, config).await {
        Ok(root) => root,
        Err(message) => return message,
    };
    debug!(root = %root.display(), "Gathering Node.js environment info");

    let (node_version, pnpm_version, installed) = tokio::join!(
        run_node_tool(Command::argv(["node", "--version"]), Some(&root), None, config),
        run_node_tool(Command::argv(["pnpm", "--version"]), Some(&root), None, config),
        run_node_tool(Command::argv(["fnm", "ls"]), Some(&root), None, config),
    );

    let project_name = match read_project_name(&root).await {
        Ok(name) => name,
        Err(message) => return format!("Error gathering environment info: {}", message),
    };

    let info = NodeEnvInfo {
        node_version,
        pnpm_version,
        installed_node_versions: non_empty_lines(&installed),
        project_name,
    };
    serde_json::to_string_pretty(&info)
        .unwrap_or_else(|e| format!("Error gathering environment info: {}", e))
}

pub fn pnpm_add_command(packages: &[String], dev: bool) -> Command {
    let mut args = vec!["pnpm".to_string(), "add".to_string()];
    args.extend(packages.iter().cloned());
    if dev {
        args.push("-D".to_string());
    }
    Command::Argv(args)
}

pub async fn call_pnpm_add(args: &Map<String, Value>, config: &OboxConfig) -> Result<String, McpError> {
    let packages = string_list(args, "packages")?;
    if packages.is_empty() {
        return Err(McpError::invalid_params("'packages' must name at least one package", None));
    }
    let dev = flag(args, "dev", false);
    let root = match resolve_root_here(args, config).await {
        Ok(root) => root,
        Err(message) => return Ok(message),
    };
    info!(root = %root.display(), ?packages, dev, "Adding packages with pnpm");
    Ok(run_node_tool(pnpm_add_command(&packages, dev), Some(&root), None, config).await)
}

pub async fn call_pnpm_list(args: &Map<String, Value>, config: &OboxConfig) -> String {
    match resolve_root_here(args, config).await {
        Ok(root) => run_node_tool(Command::argv(["pnpm", "list"]), Some(&root), None, config).await,
        Err(message) => message,
    }
}

pub async fn call_pnpm_run(args: &Map<String, Value>, config: &OboxConfig) -> Result<String, McpError> {
    let script = required_str(args, "script")?;
    let timeout = timeout_secs(args, "timeout")?;
    let root = match resolve_root_here(args, config).await {
        Ok(root) => root,
        Err(message) => return Ok(message),
    };
    info!(root = %root.display(), script, ?timeout, "Running pnpm script");
    Ok(run_node_tool(Command::argv(["pnpm", "run", script]), Some(&root), timeout, config).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use obox_core::{async_trait, NoDescendantSearch};
    use std::fs;
    use tempfile::tempdir;

    /// Reports a fixed list of marker files.
    struct FixedSearch(Vec<PathBuf>);

    #[async_trait]
    impl DescendantSearch for FixedSearch {
        async fn search(&self, _root: &Path, _marker: &str) -> Vec<PathBuf> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_explicit_root_dir_wins() {
        let dir = tempdir().unwrap();
        let root = resolve_root(Some("/srv/app"), dir.path(), &NoDescendantSearch).await;
        assert_eq!(root, Ok(PathBuf::from("/srv/app")));
    }

    #[tokio::test]
    async fn test_enclosing_project_is_used() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(PACKAGE_JSON), "{}").unwrap();
        let nested = dir.path().join("src").join("components");
        fs::create_dir_all(&nested).unwrap();

        let root = resolve_root(None, &nested, &NoDescendantSearch).await;
        assert_eq!(root, Ok(dir.path().to_path_buf()));
    }

    #[tokio::test]
    async fn test_single_project_below_is_used() {
        let dir = tempdir().unwrap();
        let web = dir.path().join("web");
        let search = FixedSearch(vec![web.join(PACKAGE_JSON)]);

        let root = resolve_root(None, dir.path(), &search).await;
        assert_eq!(root, Ok(web));
    }

    #[tokio::test]
    async fn test_several_projects_ask_for_root_dir() {
        let dir = tempdir().unwrap();
        let web = dir.path().join("web");
        let docs = dir.path().join("docs");
        let search = FixedSearch(vec![web.join(PACKAGE_JSON), docs.join(PACKAGE_JSON)]);

        let message = resolve_root(None, dir.path(), &search).await.unwrap_err();
        assert!(message.starts_with(
            "Found multiple project roots containing 'package.json'. Please specify the 'root_dir' parameter"
        ));
        assert!(message.contains(&format!("- {}", web.display())));
        assert!(message.contains(&format!("- {}", docs.display())));
    }

    #[tokio::test]
    async fn test_no_project_is_reported() {
        let dir = tempdir().unwrap();
        let message = resolve_root(None, dir.path(), &NoDescendantSearch).await;
        assert_eq!(
            message,
            Err("Error: Could not find any directory containing 'package.json'.".to_string())
        );
    }

    #[tokio::test]
    async fn test_read_project_name() {
        let dir = tempdir().unwrap();
        assert_eq!(read_project_name(dir.path()).await, Ok(None));

        fs::write(dir.path().join(PACKAGE_JSON), r#"{ "name": "demo-app", "version": "1.0.0" }"#).unwrap();
        assert_eq!(read_project_name(dir.path()).await, Ok(Some("demo-app".to_string())));

        fs::write(dir.path().join(PACKAGE_JSON), "{ not json").unwrap();
        assert!(read_project_name(dir.path()).await.is_err());
    }

    #[test]
    fn test_pnpm_add_command() {
        let packages = vec!["tailwindcss".to_string(), "axios".to_string()];
        assert_eq!(pnpm_add_command(&packages, false).to_string(), "pnpm add tailwindcss axios");
        assert_eq!(pnpm_add_command(&packages, true).to_string(), "pnpm add tailwindcss axios -D");
    }

    #[tokio::test]
    async fn test_pnpm_add_requires_packages() {
        let mut args = Map::new();
        args.insert("packages".to_string(), json!([]));
        assert!(call_pnpm_add(&args, &OboxConfig::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_pnpm_run_rejects_bad_timeout() {
        let mut args = Map::new();
        args.insert("script".to_string(), json!("dev"));
        args.insert("timeout".to_string(), json!(-1));
        assert!(call_pnpm_run(&args, &OboxConfig::default()).await.is_err());
    }

    #[test]
    fn test_info_serializes_as_json() {
        let info = NodeEnvInfo {
            node_version: "v20.11.0".to_string(),
            pnpm_version: "8.15.1".to_string(),
            installed_node_versions: non_empty_lines("* v20.11.0 default\n\n  v18.19.0\n"),
            project_name: None,
        };
        let value: Value = serde_json::from_str(&serde_json::to_string_pretty(&info).unwrap()).unwrap();
        assert_eq!(value["installed_node_versions"], json!(["* v20.11.0 default", "v18.19.0"]));
        assert_eq!(value["project_name"], Value::Null);
    }
}
