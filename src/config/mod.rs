// src/config/mod.rs

//! Tool and package configuration
//!
//! [`Config`] describes where package directories live and where upstream
//! recipes come from. It is loaded once from `pkgsmith.toml` and passed to
//! whatever needs path or URL derivation:
//!
//! ```toml
//! base_path = "packages"
//! aur_base_url = "https://aur.archlinux.org"
//! ```
//!
//! Every package directory then has the layout:
//!
//! ```text
//! packages/<pkgbase>/
//!   config.yaml       PackageConfig
//!   upstream/         recipe as imported
//!   local/            local additions, copied over upstream
//!   scripts/          onprepare.sh, onmerge.sh
//!   script-override/  files produced by scripts, copied last
//!   merged/           the materialized recipe
//! ```

mod package;

pub use package::PackageConfig;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file name looked up by [`Config::discover`]
pub const CONFIG_FILE_NAME: &str = "pkgsmith.toml";

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one subdirectory per package
    pub base_path: PathBuf,

    /// Per-package config file name
    pub config_file: String,

    /// Per-package directory of local additions
    pub local_dir: String,

    /// Per-package directory the recipe is materialized into
    pub merged_dir: String,

    /// Per-package directory of hook scripts
    pub scripts_dir: String,

    /// Per-package directory of script-generated files
    pub script_override_dir: String,

    /// Per-package directory of the imported recipe
    pub upstream_dir: String,

    /// AUR web root
    pub aur_base_url: String,

    /// Package list path below the AUR web root
    pub aur_packages_path: String,

    /// Arch Linux GitLab group holding official packaging repos
    pub arch_base_git_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("packages"),
            config_file: "config.yaml".to_string(),
            local_dir: "local".to_string(),
            merged_dir: "merged".to_string(),
            scripts_dir: "scripts".to_string(),
            script_override_dir: "script-override".to_string(),
            upstream_dir: "upstream".to_string(),
            aur_base_url: "https://aur.archlinux.org".to_string(),
            aur_packages_path: "pkgbase.gz".to_string(),
            arch_base_git_url: "https://gitlab.archlinux.org/archlinux".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::NotFoundError(format!("cannot read config file {}: {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// `pkgsmith.toml` from `dir`, then the user config directory, else defaults
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            Some(dir.join(CONFIG_FILE_NAME)),
            dirs::config_dir().map(|d| d.join("pkgsmith").join(CONFIG_FILE_NAME)),
        ];

        for candidate in candidates.into_iter().flatten() {
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }

        debug!("No {} found, using defaults", CONFIG_FILE_NAME);
        Ok(Self::default())
    }

    /// Re-root a relative `base_path` at `dir`
    pub fn with_root(mut self, dir: &Path) -> Self {
        if self.base_path.is_relative() {
            self.base_path = dir.join(&self.base_path);
        }
        self
    }

    pub fn package_path(&self, pkgbase: &str) -> PathBuf {
        self.base_path.join(pkgbase)
    }

    pub fn package_config_path(&self, pkgbase: &str) -> PathBuf {
        self.package_path(pkgbase).join(&self.config_file)
    }

    pub fn local_path(&self, pkgbase: &str) -> PathBuf {
        self.package_path(pkgbase).join(&self.local_dir)
    }

    pub fn merged_path(&self, pkgbase: &str) -> PathBuf {
        self.package_path(pkgbase).join(&self.merged_dir)
    }

    pub fn scripts_path(&self, pkgbase: &str) -> PathBuf {
        self.package_path(pkgbase).join(&self.scripts_dir)
    }

    pub fn script_override_path(&self, pkgbase: &str) -> PathBuf {
        self.package_path(pkgbase).join(&self.script_override_dir)
    }

    pub fn upstream_path(&self, pkgbase: &str) -> PathBuf {
        self.package_path(pkgbase).join(&self.upstream_dir)
    }

    /// AUR package list consumed by the external import layer
    pub fn aur_packages_url(&self) -> String {
        format!("{}/{}", self.aur_base_url, self.aur_packages_path)
    }

    /// AUR clone URL for `pkgbase`, used by the external import layer
    pub fn aur_package_git_url(&self, pkgbase: &str) -> String {
        format!("{}/{}.git", self.aur_base_url, pkgbase)
    }

    /// Arch packaging clone URL for `pkgbase`, used by the external import layer
    pub fn arch_package_git_url(&self, pkgbase: &str) -> String {
        format!(
            "{}/packaging/packages/{}.git",
            self.arch_base_git_url, pkgbase
        )
    }

    /// Every package directory under the base path, sorted
    pub fn packages(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            Error::NotFoundError(format!(
                "cannot list packages in {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut packages = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                packages.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        packages.sort();
        Ok(packages)
    }

    pub fn package_exists(&self, pkgbase: &str) -> bool {
        self.package_path(pkgbase).is_dir()
    }

    pub fn load_package(&self, pkgbase: &str) -> Result<PackageConfig> {
        PackageConfig::load(&self.package_config_path(pkgbase))
    }

    pub fn save_package(&self, pkgbase: &str, config: &PackageConfig) -> Result<()> {
        config.save(&self.package_config_path(pkgbase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_paths() {
        let config = Config::default();
        assert_eq!(config.merged_path("foo"), PathBuf::from("packages/foo/merged"));
        assert_eq!(
            config.package_config_path("foo"),
            PathBuf::from("packages/foo/config.yaml")
        );
        assert_eq!(
            config.script_override_path("foo"),
            PathBuf::from("packages/foo/script-override")
        );
    }

    #[test]
    fn test_urls() {
        let config = Config::default();
        assert_eq!(config.aur_packages_url(), "https://aur.archlinux.org/pkgbase.gz");
        assert_eq!(
            config.aur_package_git_url("yay"),
            "https://aur.archlinux.org/yay.git"
        );
        assert_eq!(
            config.arch_package_git_url("nano"),
            "https://gitlab.archlinux.org/archlinux/packaging/packages/nano.git"
        );
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str("base_path = \"/srv/pkgs\"\nmerged_dir = \"out\"\n").unwrap();
        assert_eq!(config.merged_path("a"), PathBuf::from("/srv/pkgs/a/out"));
        assert_eq!(config.local_dir, "local");
    }

    #[test]
    fn test_discover_in_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "upstream_dir = \"up\"\n").unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.upstream_dir, "up");
    }

    #[test]
    fn test_packages_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["zlib", "acl", "nano"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("README"), "").unwrap();

        let config = Config {
            base_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        assert_eq!(config.packages().unwrap(), vec!["acl", "nano", "zlib"]);
        assert!(config.package_exists("nano"));
        assert!(!config.package_exists("README"));
    }
}
