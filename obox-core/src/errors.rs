// obox-core/src/errors.rs
use thiserror::Error;

/// Failures while driving a child process.
///
/// These never leave [`crate::process::run`]; they are folded into a
/// [`crate::process::ProcessResult`] with exit code `-1`.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started (not found, permission denied, ...).
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the input data to the child's stdin failed.
    #[error("Failed to write to stdin: {0}")]
    Stdin(#[source] std::io::Error),

    /// Waiting for the child to exit failed.
    #[error("Failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),
}

/// Errors from package manager bootstrapping and app installation.
///
/// The `Display` text is what the tool layer hands back to the agent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstallError {
    #[error("Unsupported OS for automatic package manager installation: {0}")]
    UnsupportedPackageManagerOs(String),

    #[error("Unsupported OS: {0}")]
    UnsupportedOs(String),

    #[error("Unsupported OS for package search: {0}")]
    UnsupportedSearchOs(String),

    #[error("Invalid package name: '{0}'")]
    InvalidName(String),

    #[error("Scoop buckets can only be added on Windows.")]
    ScoopRequiresWindows,

    #[error("Failed to install {manager}: {message}")]
    PackageManager { manager: String, message: String },

    #[error("Failed to add Scoop bucket: {0}")]
    Bucket(String),

    #[error("Installation failed: {0}")]
    Prerequisite(Box<InstallError>),

    #[error("Failed to install {app}: {message}")]
    App { app: String, message: String },

    #[error("Failed to search for {name}: {message}")]
    Search { name: String, message: String },
}

impl InstallError {
    pub fn prerequisite(inner: InstallError) -> Self {
        InstallError::Prerequisite(Box::new(inner))
    }
}
