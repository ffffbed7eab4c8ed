// obox-core/src/lib.rs

#![doc = include_str!("../../README.md")]

pub mod config;
pub mod errors;
pub mod installer;
pub mod process;
pub mod project;

pub use async_trait::async_trait;

pub use config::OboxConfig;
pub use errors::{InstallError, ProcessError};
pub use installer::Platform;
pub use process::{
    command_exists, run, run_and_format, Command, ProcessResult, RunOptions, SuccessPolicy,
    DEFAULT_ERROR_PREFIX, STILL_RUNNING_MARKER,
};
pub use project::{
    find_project_root, find_project_root_from, find_project_roots, DescendantSearch, FdSearch,
    NoDescendantSearch,
};
