//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::Project;

/// TDK configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Recorded as the creator of directories
    pub author: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Command line of the schema generator
    pub generator: Option<String>,

    /// Command line of the autofill program
    pub autofill: Option<String>,

    /// Authors whose listings skip moderation
    pub auto_approve: Vec<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/tdk/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.tdk/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(author) = std::env::var("TDK_AUTHOR") {
            config.author = Some(author);
        }
        if let Ok(generator) = std::env::var("TDK_GENERATOR") {
            config.generator = Some(generator);
        }
        if let Ok(autofill) = std::env::var("TDK_AUTOFILL") {
            config.autofill = Some(autofill);
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tdk")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.generator.is_some() {
            self.generator = other.generator;
        }
        if other.autofill.is_some() {
            self.autofill = other.autofill;
        }
        if !other.auto_approve.is_empty() {
            self.auto_approve = other.auto_approve;
        }
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        // Try git config
        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        // Fall back to username
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_other() {
        let mut base = Config {
            author: Some("alice".into()),
            generator: Some("gen-a".into()),
            auto_approve: vec!["alice".into()],
            ..Default::default()
        };
        base.merge(Config {
            generator: Some("gen-b".into()),
            ..Default::default()
        });
        assert_eq!(base.author.as_deref(), Some("alice"));
        assert_eq!(base.generator.as_deref(), Some("gen-b"));
        assert_eq!(base.auto_approve, vec!["alice"]);
    }

    #[test]
    fn test_parse_yaml() {
        let config: Config = serde_yml::from_str(
            "author: ops\ngenerator: ./gen.sh --fast\nauto_approve:\n  - ops\n  - admin\n",
        )
        .unwrap();
        assert_eq!(config.author.as_deref(), Some("ops"));
        assert_eq!(config.generator.as_deref(), Some("./gen.sh --fast"));
        assert_eq!(config.auto_approve.len(), 2);
        assert!(config.autofill.is_none());
    }

    #[test]
    fn test_read_file_ignores_garbage() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "auto_approve: {not: [a list").unwrap();
        assert!(Config::read_file(&path).is_none());
        assert!(Config::read_file(&tmp.path().join("missing.yaml")).is_none());
    }
}
