// obox-server/src/tools/python.rs

//! Python tools backed by uv. Commands run in the project holding
//! `pyproject.toml`, or in the current directory when there is none.

use super::{create_schema_object, optional_str, required_str};
use obox_core::process::{run_and_format, Command, RunOptions, SuccessPolicy};
use obox_core::project::{find_project_root_from, DescendantSearch, FdSearch};
use obox_core::OboxConfig;
use rmcp::{model::Tool, Error as McpError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const LIST_AVAILABLE_PYTHON_ENVIRONMENTS: &str = "list_available_python_environments";
pub const CONFIGURE_PYTHON_ENVIRONMENT: &str = "configure_python_environment";
pub const GET_ENV_INFO: &str = "get_env_info";
pub const INSTALL_PYTHON_PACKAGE: &str = "install_python_package";
pub const GET_LIST_PYTHON_PACKAGES_INSTALLED: &str = "get_list_python_packages_installed";
pub const UV_SYNC: &str = "uv_sync";

const PYPROJECT: &str = "pyproject.toml";
const UV_ERROR_PREFIX: &str = "Error executing uv";

fn root_dir_property() -> (&'static str, Value) {
    (
        "root_dir",
        json!({ "type": "string", "description": "Project directory (default: the nearest directory with pyproject.toml)." }),
    )
}

pub fn definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: LIST_AVAILABLE_PYTHON_ENVIRONMENTS.into(),
            description: "Lists installed Python versions and those available for download ('uv python list').".into(),
            input_schema: create_schema_object(vec![], vec![]),
        },
        Tool {
            name: CONFIGURE_PYTHON_ENVIRONMENT.into(),
            description: "Creates the project's virtual environment for a Python version ('uv venv --python').".into(),
            input_schema: create_schema_object(
                vec![
                    ("version", json!({ "type": "string", "description": "Python version, e.g. '3.11', '3.12' or '3.10.12'." })),
                    root_dir_property(),
                ],
                vec!["version"],
            ),
        },
        Tool {
            name: GET_ENV_INFO.into(),
            description: "Reports the Python version, virtual environment path, available Python versions and project name as JSON.".into(),
            input_schema: create_schema_object(vec![root_dir_property()], vec![]),
        },
        Tool {
            name: INSTALL_PYTHON_PACKAGE.into(),
            description: "Adds a package to the project with 'uv add', updating pyproject.toml and the lockfile.".into(),
            input_schema: create_schema_object(
                vec![
                    ("package_name", json!({ "type": "string", "description": "Requirement, e.g. 'requests' or 'pandas==2.1.0'." })),
                    root_dir_property(),
                ],
                vec!["package_name"],
            ),
        },
        Tool {
            name: GET_LIST_PYTHON_PACKAGES_INSTALLED.into(),
            description: "Lists packages installed in the project environment ('uv pip list').".into(),
            input_schema: create_schema_object(vec![root_dir_property()], vec![]),
        },
        Tool {
            name: UV_SYNC.into(),
            description: "Installs everything pyproject.toml and the lockfile require ('uv sync').".into(),
            input_schema: create_schema_object(vec![root_dir_property()], vec![]),
        },
    ]
}

/// `root_dir` if given, else the project containing `start`, else `start`.
pub async fn resolve_root(root_dir: Option<&str>, start: &Path, search: &dyn DescendantSearch) -> PathBuf {
    if let Some(dir) = root_dir {
        return PathBuf::from(dir);
    }
    find_project_root_from(start, PYPROJECT, search)
        .await
        .unwrap_or_else(|| start.to_path_buf())
}

async fn resolve_root_here(args: &Map<String, Value>, config: &OboxConfig) -> Result<PathBuf, String> {
    let start = std::env::current_dir()
        .map_err(|e| format!("Error: could not determine the current directory: {}", e))?;
    let search = FdSearch::new(config.project_root.max_depth);
    Ok(resolve_root(optional_str(args, "root_dir"), &start, &search).await)
}

pub fn uv_command<'a>(args: impl IntoIterator<Item = &'a str>) -> Command {
    Command::argv(std::iter::once("uv").chain(args))
}

async fn run_uv(args: &[&str], root: &Path) -> String {
    run_and_format(
        &uv_command(args.iter().copied()),
        &RunOptions::new().in_dir(root),
        UV_ERROR_PREFIX,
        &SuccessPolicy::default(),
    )
    .await
}

/// Runs `uv <args>` in the resolved project directory.
async fn run_uv_in_project(args: &[&str], tool_args: &Map<String, Value>, config: &OboxConfig) -> String {
    match resolve_root_here(tool_args, config).await {
        Ok(root) => {
            debug!(root = %root.display(), ?args, "Running uv");
            run_uv(args, &root).await
        }
        Err(message) => message,
    }
}

pub async fn call_list_available_python_environments(args: &Map<String, Value>, config: &OboxConfig) -> String {
    run_uv_in_project(&["python", "list"], args, config).await
}

pub async fn call_configure_python_environment(
    args: &Map<String, Value>,
    config: &OboxConfig,
) -> Result<String, McpError> {
    let version = required_str(args, "version")?;
    Ok(run_uv_in_project(&["venv", "--python", version], args, config).await)
}

pub async fn call_install_python_package(
    args: &Map<String, Value>,
    config: &OboxConfig,
) -> Result<String, McpError> {
    let package = required_str(args, "package_name")?;
    Ok(run_uv_in_project(&["add", package], args, config).await)
}

pub async fn call_get_list_python_packages_installed(args: &Map<String, Value>, config: &OboxConfig) -> String {
    run_uv_in_project(&["pip", "list"], args, config).await
}

pub async fn call_uv_sync(args: &Map<String, Value>, config: &OboxConfig) -> String {
    run_uv_in_project(&["sync"], args, config).await
}

#[derive(Serialize, Debug, PartialEq)]
pub struct PythonEnvInfo {
    pub python_version: String,
    pub venv_path: Option<String>,
    pub installed_python_versions: Vec<String>,
    pub project_name: Option<String>,
}

/// `[project].name` from `<root>/pyproject.toml`. Unreadable or malformed
/// files count as "no name".
pub async fn read_project_name(root: &Path) -> Option<String> {
    let path = root.join(PYPROJECT);
    let content = tokio::fs::read_to_string(&path).await.ok()?;
    match toml::from_str::<toml::Value>(&content) {
        Ok(manifest) => manifest
            .get("project")
            .and_then(|project| project.get("name"))
            .and_then(toml::Value::as_str)
            .map(str::to_string),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not parse pyproject.toml");
            None
        }
    }
}

fn venv_path(root: &Path) -> Option<String> {
    let venv = root.join(".venv");
    venv.is_dir().then(|| venv.display().to_string())
}

pub async fn call_get_env_info(args: &Map<String, Value>, config: &OboxConfig) -> String {
    let root = match resolve_root_here(args, config).await {
        Ok(root) => root,
        Err(message) => return message,
    };

    let (python_version, available) = tokio::join!(
        run_uv(&["python", "--version"], &root),
        run_uv(&["python", "list"], &root),
    );

    let info = PythonEnvInfo {
        python_version,
        venv_path: venv_path(&root),
        installed_python_versions: available
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        project_name: read_project_name(&root).await,
    };
    serde_json::to_string_pretty(&info)
        .unwrap_or_else(|e| format!("Error gathering environment info: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use obox_core::NoDescendantSearch;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_root_falls_back_to_start() {
        let dir = tempdir().unwrap();
        let root = resolve_root(None, dir.path(), &NoDescendantSearch).await;
        assert_eq!(root, dir.path());
    }

    #[tokio::test]
    async fn test_root_is_enclosing_project() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(PYPROJECT), "[project]\nname = \"demo\"\n").unwrap();
        let nested = dir.path().join("src").join("demo");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(resolve_root(None, &nested, &NoDescendantSearch).await, dir.path());
        assert_eq!(
            resolve_root(Some("/work/other"), &nested, &NoDescendantSearch).await,
            PathBuf::from("/work/other")
        );
    }

    #[tokio::test]
    async fn test_read_project_name() {
        let dir = tempdir().unwrap();
        assert_eq!(read_project_name(dir.path()).await, None);

        fs::write(
            dir.path().join(PYPROJECT),
            "[project]\nname = 'obox-demo'\nversion = \"0.1.0\"\n\n[tool.uv]\ndev-dependencies = []\n",
        )
        .unwrap();
        assert_eq!(read_project_name(dir.path()).await, Some("obox-demo".to_string()));

        fs::write(dir.path().join(PYPROJECT), "[project\nname =").unwrap();
        assert_eq!(read_project_name(dir.path()).await, None);
    }

    #[test]
    fn test_venv_path() {
        let dir = tempdir().unwrap();
        assert_eq!(venv_path(dir.path()), None);
        fs::create_dir(dir.path().join(".venv")).unwrap();
        assert_eq!(venv_path(dir.path()), Some(dir.path().join(".venv").display().to_string()));
    }

    #[test]
    fn test_uv_command() {
        assert_eq!(uv_command(["venv", "--python", "3.12"]).to_string(), "uv venv --python 3.12");
    }

    #[tokio::test]
    async fn test_install_package_requires_name() {
        assert!(call_install_python_package(&Map::new(), &OboxConfig::default()).await.is_err());
    }
}
