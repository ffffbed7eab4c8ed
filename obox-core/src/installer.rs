// obox-core/src/installer.rs

//! Bootstraps the external binaries the tools wrap.
//!
//! macOS goes through Homebrew and Windows through Scoop; both package
//! managers are installed on first use. Anything else is reported as
//! unsupported rather than guessed at.

use crate::errors::InstallError;
use crate::process::{command_exists, run, Command, ProcessResult, RunOptions};
use std::fmt;
use tracing::{info, warn};

const HOMEBREW_INSTALL: &str = r#"/bin/bash -c "$(curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh)""#;
const SCOOP_INSTALL: &str = r#"powershell -Command "Set-ExecutionPolicy -ExecutionPolicy RemoteSigned -Scope CurrentUser; Invoke-RestMethod -Uri https://get.scoop.sh | Invoke-Expression""#;

/// Host operating system, as far as installation is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Other(String),
}

impl Platform {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            other => Platform::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::MacOs => f.write_str("macOS"),
            Platform::Windows => f.write_str("Windows"),
            Platform::Other(name) => f.write_str(name),
        }
    }
}

// Package and bucket names end up in a shell line on Windows.
fn is_valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || "._@+/-".contains(c))
}

fn ensure_valid_name(name: &str) -> Result<(), InstallError> {
    if is_valid_package_name(name) {
        Ok(())
    } else {
        Err(InstallError::InvalidName(name.to_string()))
    }
}

fn failure_text(result: &ProcessResult) -> String {
    if result.stderr.is_empty() {
        result.stdout.clone()
    } else {
        result.stderr.clone()
    }
}

/// Installs Homebrew (macOS) or Scoop (Windows) unless it is already present.
pub async fn install_package_manager(platform: &Platform) -> Result<String, InstallError> {
    let (manager, binary, script) = match platform {
        Platform::MacOs => ("Homebrew", "brew", HOMEBREW_INSTALL),
        Platform::Windows => ("Scoop", "scoop", SCOOP_INSTALL),
        Platform::Other(os) => return Err(InstallError::UnsupportedPackageManagerOs(os.clone())),
    };

    if command_exists(binary).await {
        return Ok(format!("{} is already installed.", manager));
    }

    info!(manager, "Installing package manager");
    let result = run(&Command::shell(script), &RunOptions::new()).await;
    if result.code == Some(0) {
        Ok(format!("{} installed successfully.", manager))
    } else {
        Err(InstallError::PackageManager {
            manager: manager.to_string(),
            message: failure_text(&result),
        })
    }
}

/// Adds a Scoop bucket. Windows only; an already-added bucket counts as success.
pub async fn add_scoop_bucket(platform: &Platform, bucket: &str) -> Result<String, InstallError> {
    if *platform != Platform::Windows {
        return Err(InstallError::ScoopRequiresWindows);
    }
    ensure_valid_name(bucket)?;
    install_package_manager(platform).await?;

    info!(bucket, "Adding Scoop bucket");
    let result = run(&Command::shell(format!("scoop bucket add {}", bucket)), &RunOptions::new()).await;
    let already_added = result.stdout.to_lowercase().contains("already added")
        || result.stderr.to_lowercase().contains("already added");
    if result.code == Some(0) || already_added {
        Ok(format!("Bucket '{}' is ready.", bucket))
    } else {
        Err(InstallError::Bucket(failure_text(&result)))
    }
}

/// Makes sure `app` is usable, installing it through the platform package
/// manager when `command_name` (default: `app`) is not on `PATH`.
///
/// A failing `scoop_bucket` is only logged; the install is still attempted.
pub async fn install_app(
    platform: &Platform,
    app: &str,
    scoop_bucket: Option<&str>,
    command_name: Option<&str>,
) -> Result<String, InstallError> {
    let binary = command_name.unwrap_or(app);
    if command_exists(binary).await {
        return Ok(format!("'{}' is already installed and available on PATH.", binary));
    }
    ensure_valid_name(app)?;

    install_package_manager(platform)
        .await
        .map_err(InstallError::prerequisite)?;

    if let (Platform::Windows, Some(bucket)) = (platform, scoop_bucket) {
        if let Err(e) = add_scoop_bucket(platform, bucket).await {
            warn!(bucket, error = %e, "Could not add Scoop bucket");
        }
    }

    let command = match platform {
        Platform::MacOs => Command::argv(["brew", "install", app]),
        Platform::Windows => Command::shell(format!("scoop install {}", app)),
        Platform::Other(os) => return Err(InstallError::UnsupportedOs(os.clone())),
    };

    info!(app, "Installing app");
    let result = run(&command, &RunOptions::new()).await;
    if result.code == Some(0) {
        Ok(format!("Successfully installed {}.", app))
    } else {
        Err(InstallError::App {
            app: app.to_string(),
            message: failure_text(&result),
        })
    }
}

/// Searches the platform package manager for `name`.
pub async fn search_package(platform: &Platform, name: &str) -> Result<String, InstallError> {
    let command = match platform {
        Platform::MacOs => Command::argv(["brew", "search", name]),
        Platform::Windows => {
            ensure_valid_name(name)?;
            Command::shell(format!("scoop search {}", name))
        }
        Platform::Other(os) => return Err(InstallError::UnsupportedSearchOs(os.clone())),
    };

    let result = run(&command, &RunOptions::new()).await;
    if result.code == Some(0) {
        Ok(result.stdout)
    } else {
        Err(InstallError::Search {
            name: name.to_string(),
            message: failure_text(&result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> Platform {
        Platform::Other("linux".to_string())
    }

    #[test]
    fn test_platform_display() {
        assert_eq!(Platform::MacOs.to_string(), "macOS");
        assert_eq!(linux().to_string(), "linux");
    }

    #[test]
    fn test_package_name_validation() {
        assert!(is_valid_package_name("ripgrep"));
        assert!(is_valid_package_name("extras/bat"));
        assert!(is_valid_package_name("node@20"));
        assert!(!is_valid_package_name("bat & del C:\\"));
        assert!(!is_valid_package_name(""));
        assert!(!is_valid_package_name("-rf"));
    }

    #[tokio::test]
    async fn test_package_manager_unsupported_os() {
        let err = install_package_manager(&linux()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported OS for automatic package manager installation: linux"
        );
    }

    #[tokio::test]
    async fn test_scoop_bucket_requires_windows() {
        let err = add_scoop_bucket(&Platform::MacOs, "extras").await.unwrap_err();
        assert_eq!(err, InstallError::ScoopRequiresWindows);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_app_short_circuits_when_present() {
        let message = install_app(&linux(), "sh", None, None).await.unwrap();
        assert_eq!(message, "'sh' is already installed and available on PATH.");
    }

    #[tokio::test]
    async fn test_install_app_unsupported_os_wraps_prerequisite() {
        let err = install_app(&linux(), "obox_missing_app_qwertyuiop", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Prerequisite(_)));
        assert_eq!(
            err.to_string(),
            "Installation failed: Unsupported OS for automatic package manager installation: linux"
        );
    }

    #[tokio::test]
    async fn test_install_app_rejects_shell_metacharacters() {
        let err = install_app(&Platform::Windows, "bat; calc", None, None)
            .await
            .unwrap_err();
        assert_eq!(err, InstallError::InvalidName("bat; calc".to_string()));
    }

    #[tokio::test]
    async fn test_search_package_unsupported_os() {
        let err = search_package(&linux(), "ripgrep").await.unwrap_err();
        assert_eq!(err.to_string(), "Unsupported OS for package search: linux");
    }
}
