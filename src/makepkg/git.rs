// src/makepkg/git.rs

//! Commit lookup in makepkg checkouts

use crate::error::{Error, Result};
use crate::makepkg::{find_tool, run};
use crate::vcs::CommitInspector;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// [`CommitInspector`] backed by the `git` binary
pub struct GitInspector {
    git: PathBuf,
}

impl GitInspector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            git: find_tool("git")?,
        })
    }

    fn git(&self, checkout: &Path, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.git);
        cmd.arg("-C").arg(checkout).args(args);
        run(&mut cmd, &format!("git {}", args.join(" ")))
    }
}

/// Parse `git config --get-regexp` output into (submodule name, path) pairs
pub fn parse_gitmodule_paths(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| line.split_once(' '))
        .filter_map(|(key, path)| {
            key.strip_prefix("submodule.")
                .and_then(|rest| rest.strip_suffix(".path"))
                .map(|name| (name.to_string(), path.trim().to_string()))
        })
        .collect()
}

impl CommitInspector for GitInspector {
    fn revision(&self, checkout: &Path) -> Result<String> {
        let out = self.git(checkout, &["rev-parse", "HEAD"])?;
        let revision = out.trim();
        if revision.is_empty() {
            return Err(Error::ParseError(format!(
                "no revision for {}",
                checkout.display()
            )));
        }
        Ok(revision.to_string())
    }

    fn submodules(&self, checkout: &Path) -> Result<BTreeMap<String, String>> {
        if !checkout.join(".gitmodules").is_file() {
            return Ok(BTreeMap::new());
        }

        let config = self.git(
            checkout,
            &[
                "config",
                "--file",
                ".gitmodules",
                "--get-regexp",
                r"^submodule\..*\.path$",
            ],
        )?;

        let mut commits = BTreeMap::new();
        for (name, path) in parse_gitmodule_paths(&config) {
            let spec = format!("HEAD:{}", path);
            let commit = self.git(checkout, &["rev-parse", &spec])?;
            debug!("Submodule {} at {} is {}", name, path, commit.trim());
            commits.insert(name, commit.trim().to_string());
        }

        Ok(commits)
    }
}
