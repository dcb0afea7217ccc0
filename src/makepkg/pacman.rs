// src/makepkg/pacman.rs

//! Binary repository versions from the pacman sync databases

use crate::error::{Error, Result};
use crate::makepkg::find_tool;
use crate::scheduler::RepositoryIndex;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Looks packages up with `pacman -Si`
pub struct PacmanRepository {
    pacman: PathBuf,
    /// Restrict lookups to one sync repository
    repo: Option<String>,
}

impl PacmanRepository {
    pub fn new(repo: Option<String>) -> Result<Self> {
        Ok(Self {
            pacman: find_tool("pacman")?,
            repo,
        })
    }
}

/// The `Version` field of `pacman -Si` output
pub fn parse_si_version(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "Version").then(|| value.trim().to_string())
    })
}

impl RepositoryIndex for PacmanRepository {
    fn version(&self, name: &str) -> Result<Option<String>> {
        let target = match &self.repo {
            Some(repo) => format!("{}/{}", repo, name),
            None => name.to_string(),
        };

        let output = Command::new(&self.pacman)
            .args(["-Si", &target])
            .output()
            .map_err(|e| Error::CommandFailed(format!("failed to run pacman: {}", e)))?;

        if !output.status.success() {
            debug!("{} is not in the sync databases", target);
            return Ok(None);
        }

        Ok(parse_si_version(&String::from_utf8_lossy(&output.stdout)))
    }
}
