//! Settings resolution for shapepipe.
//!
//! Sources (highest priority first):
//! 1. Environment variables (SHAPEPIPE_BIN, SHAPEPIPE_DATA_URL, SHAPEPIPE_OUT)
//! 2. Config file (.shapepipe/config.yaml, searched upward from the current
//!    directory and then in the home directory; relative paths resolve
//!    against the config file's directory)
//! 3. Defaults (datasets from the public demo server, output under the
//!    current directory)
//!
//! The resolved `Settings` value is passed explicitly into the pipeline
//! driver; nothing here mutates the process environment or caches globally.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default remote dataset source; archives are fetched as `<url>/<archive>`.
pub const DEFAULT_DATASET_URL: &str = "https://datasets.sci.utah.edu/shapeworks";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub toolkit: ToolkitConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolkitConfig {
    /// Directory holding the toolkit executables (relative to config file)
    pub bin: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetConfig {
    /// Base URL archives are downloaded from
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Root directory use-case working trees are created under
    pub root: Option<String>,
}

/// Resolved settings with absolute paths.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Explicit toolkit bin directory; `None` means resolve executables by
    /// name through the ambient search path.
    pub toolkit_bin: Option<PathBuf>,
    /// Base URL of the remote dataset source.
    pub dataset_url: String,
    /// Root directory for working trees and downloaded archives.
    pub output_root: PathBuf,
    /// Path to the config file, if one was found.
    pub config_file: Option<PathBuf>,
}

impl Settings {
    /// Resolve settings from all sources.
    pub fn load() -> Result<Self> {
        let config_file = find_config_file();

        let (file_bin, file_url, file_root) = if let Some(ref config_path) = config_file {
            let config = load_config_file(config_path)?;
            let base_dir = config_path.parent().unwrap_or(Path::new("."));

            (
                config.toolkit.bin.map(|p| resolve_path(base_dir, &p)),
                config.dataset.url,
                config.output.root.map(|p| resolve_path(base_dir, &p)),
            )
        } else {
            (None, None, None)
        };

        let toolkit_bin = std::env::var("SHAPEPIPE_BIN")
            .ok()
            .map(PathBuf::from)
            .or(file_bin);

        let dataset_url = std::env::var("SHAPEPIPE_DATA_URL")
            .ok()
            .or(file_url)
            .unwrap_or_else(|| DEFAULT_DATASET_URL.to_string());

        let output_root = match std::env::var("SHAPEPIPE_OUT").ok().map(PathBuf::from).or(file_root)
        {
            Some(root) => root,
            None => std::env::current_dir().context("failed to determine current directory")?,
        };

        Ok(Settings {
            toolkit_bin,
            dataset_url,
            output_root,
            config_file,
        })
    }
}

/// Find config file by searching current directory and parents, then the
/// user's home directory
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".shapepipe").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let config_path = dirs::home_dir()?.join(".shapepipe").join("config.yaml");
    config_path.exists().then_some(config_path)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".shapepipe");
        std::fs::create_dir_all(&dir).unwrap();

        let config_path = dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
toolkit:
  bin: /opt/shapeworks/bin
dataset:
  url: https://mirror.example.org/shapeworks
output:
  root: ./runs
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.toolkit.bin, Some("/opt/shapeworks/bin".to_string()));
        assert_eq!(
            config.dataset.url,
            Some("https://mirror.example.org/shapeworks".to_string())
        );
        assert_eq!(config.output.root, Some("./runs".to_string()));
    }

    #[test]
    fn test_sections_are_optional() {
        let config: ConfigFile = serde_yaml::from_str("version: \"1.0\"\n").unwrap();
        assert!(config.toolkit.bin.is_none());
        assert!(config.dataset.url.is_none());
        assert!(config.output.root.is_none());
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project/.shapepipe");

        assert_eq!(
            resolve_path(&base, "/opt/shapeworks/bin"),
            PathBuf::from("/opt/shapeworks/bin")
        );
        // Non-existent relative paths fall back to a plain join
        assert_eq!(
            resolve_path(&base, "../toolkit/bin"),
            PathBuf::from("/home/user/project/.shapepipe/../toolkit/bin")
        );
    }
}
