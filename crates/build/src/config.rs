//! `zhc.toml` project configuration.
//!
//! Modeled on `tools/hadron-build/src/config.rs`'s `ProjectConfig`: a
//! `serde`-derived tree loaded with the `toml` crate, with `#[serde(default)]`
//! sections so a project only has to write down what it wants to override.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from `zhc.toml`.
#[derive(Debug, Deserialize)]
pub struct ZhcConfig {
    /// `[project]` section.
    pub project: ProjectMeta,
    /// `[build]` section.
    #[serde(default)]
    pub build: BuildConfig,
}

/// `[project]` section.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// Project name, used only for diagnostics.
    pub name: String,
    /// Project version string, used only for diagnostics.
    #[serde(default)]
    pub version: Option<String>,
}

/// `[build]` section.
#[derive(Debug, Deserialize)]
pub struct BuildConfig {
    /// Offload-bundle payload alignment, in bytes. Must be a power of two.
    #[serde(default = "default_alignment")]
    pub alignment: u64,
    /// Root directory for content-addressed scratch directories, relative
    /// to the project root.
    #[serde(default = "default_cache_dir", rename = "cache-dir")]
    pub cache_dir: String,
    /// Host compiler binary invoked to build the offload-library stub.
    #[serde(default = "default_host_compiler", rename = "host-compiler")]
    pub host_compiler: String,
    /// Device compiler binary invoked to build device objects.
    #[serde(default = "default_device_compiler", rename = "device-compiler")]
    pub device_compiler: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            alignment: default_alignment(),
            cache_dir: default_cache_dir(),
            host_compiler: default_host_compiler(),
            device_compiler: default_device_compiler(),
        }
    }
}

fn default_alignment() -> u64 {
    4096
}

fn default_cache_dir() -> String {
    "build/cache".to_string()
}

fn default_host_compiler() -> String {
    "cc".to_string()
}

fn default_device_compiler() -> String {
    "clang".to_string()
}

/// Searches `start` and its ancestors for a `zhc.toml`, returning the
/// directory containing it.
///
/// # Errors
///
/// Returns an error if no ancestor of `start` contains a `zhc.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join("zhc.toml").exists() {
            return Ok(dir);
        }
        if !dir.pop() {
            bail!("could not find zhc.toml in any parent directory of {}", start.display());
        }
    }
}

/// Loads and parses `zhc.toml` from `root`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails to parse.
pub fn load_config(root: &Path) -> Result<ZhcConfig> {
    let path = root.join("zhc.toml");
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let toml = r#"
            [project]
            name = "demo"
        "#;
        let config: ZhcConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.build.alignment, 4096);
        assert_eq!(config.build.cache_dir, "build/cache");
    }

    #[test]
    fn overrides_build_section() {
        let toml = r#"
            [project]
            name = "demo"

            [build]
            alignment = 8192
            device-compiler = "clang-18"
        "#;
        let config: ZhcConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.build.alignment, 8192);
        assert_eq!(config.build.device_compiler, "clang-18");
        assert_eq!(config.build.host_compiler, "cc");
    }

    #[test]
    fn rejects_missing_project_section() {
        let toml = "[build]\nalignment = 4096\n";
        assert!(toml::from_str::<ZhcConfig>(toml).is_err());
    }
}
