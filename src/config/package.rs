// src/config/package.rs

//! Per-package `config.yaml`

use crate::error::Result;
use crate::overrides::OverrideSet;
use crate::vcs::VcsInfo;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Persisted state of one package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageConfig {
    /// Where the upstream recipe is imported from (`aur`, `arch`, `local`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,

    /// Build this package alone, before anything else in its batch
    #[serde(default, skip_serializing_if = "is_false")]
    pub build_first: bool,

    /// Leave the package out of imports and builds
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore: bool,

    #[serde(default, skip_serializing_if = "OverrideSet::is_empty")]
    pub overrides: OverrideSet,

    /// Pinned VCS snapshot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<VcsInfo>,
}

impl PackageConfig {
    /// Load a package config; a missing file yields the default config
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} does not exist, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// A VCS package whose snapshot has not been generated yet
    pub fn needs_vcs_info(&self) -> bool {
        self.vcs.as_ref().is_some_and(|vcs| !vcs.is_generated())
    }
}
