//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-project data directory
pub const PROJECT_DIR: &str = ".tdk";

/// Represents a TDK project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .tdk/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::write_skeleton(root)
    }

    /// Re-initialize even if .tdk/ exists; the config is rewritten, the
    /// record store is left alone
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        Self::write_skeleton(root)
    }

    fn write_skeleton(root: PathBuf) -> Result<Self, ProjectError> {
        let tdk_dir = root.join(PROJECT_DIR);
        std::fs::create_dir_all(&tdk_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(tdk_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# TDK Project Configuration

# Recorded as the creator of directories (default: git user.name, then $USER)
# author: ""

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto

# Schema generator command; receives a generation request as JSON on stdin
# and prints {"schema": {...}} on stdout
# generator: ""

# Autofill command; receives {"directoryId", "entityName"} on stdin and
# prints {"data": {...}} on stdout
# autofill: ""

# Authors whose listings are approved on submission
# auto_approve: []
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .tdk data directory
    pub fn tdk_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Path of the project config file
    pub fn config_path(&self) -> PathBuf {
        self.tdk_dir().join("config.yaml")
    }

    /// Path of the record store database
    pub fn store_path(&self) -> PathBuf {
        self.tdk_dir().join("store.db")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a TDK project (searched from {searched_from:?}). Run 'tdk init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("TDK project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
