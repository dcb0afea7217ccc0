// src/ci/mod.rs

//! CI environment selection
//!
//! The environment is picked once at startup by probing in a fixed order:
//! Forgejo Actions first, then GitHub Actions, else a local run. Forgejo
//! sets the GitHub variables too, so it must be probed first.

use crate::error::{Error, Result};
use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use strum_macros::{Display, EnumString};
use tracing::debug;

/// Where pkgsmith is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CiEnv {
    Forgejo,
    Github,
    Local,
}

type Probe = fn(&dyn Fn(&str) -> Option<String>) -> Option<CiEnv>;

fn probe_forgejo(lookup: &dyn Fn(&str) -> Option<String>) -> Option<CiEnv> {
    (lookup("GITEA_ACTIONS").as_deref() == Some("true")).then_some(CiEnv::Forgejo)
}

fn probe_github(lookup: &dyn Fn(&str) -> Option<String>) -> Option<CiEnv> {
    lookup("GITHUB_RUN_ID")
        .is_some_and(|id| !id.is_empty())
        .then_some(CiEnv::Github)
}

/// Probes in priority order
const PROBES: &[Probe] = &[probe_forgejo, probe_github];

impl CiEnv {
    /// Select the environment from the process environment
    pub fn detect() -> Self {
        Self::detect_with(&|name: &str| env::var(name).ok())
    }

    /// Select the environment using `lookup` for variables
    pub fn detect_with(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let selected = PROBES
            .iter()
            .find_map(|probe| probe(lookup))
            .unwrap_or(CiEnv::Local);
        debug!("CI environment: {}", selected);
        selected
    }

    pub fn is_ci(&self) -> bool {
        !matches!(self, CiEnv::Local)
    }

    /// Publish the packages selected for building
    ///
    /// In CI the line goes to the `$GITHUB_OUTPUT` file when it is set;
    /// otherwise, and locally, it is printed.
    pub fn write_build_packages(&self, packages: &[String]) -> Result<()> {
        let output_file = if self.is_ci() {
            env::var("GITHUB_OUTPUT").ok().filter(|v| !v.is_empty())
        } else {
            None
        };

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_build_packages_to(packages, output_file.as_deref().map(Path::new), &mut handle)
    }
}

/// `packages=["a","b"]`
pub fn build_packages_line(packages: &[String]) -> Result<String> {
    let json = serde_json::to_string(packages)
        .map_err(|e| Error::ParseError(format!("cannot encode package list: {}", e)))?;
    Ok(format!("packages={}", json))
}

/// Append the line to `output_file`, or write it to `fallback`
pub fn write_build_packages_to(
    packages: &[String],
    output_file: Option<&Path>,
    fallback: &mut dyn Write,
) -> Result<()> {
    let line = build_packages_line(packages)?;

    match output_file {
        Some(path) => {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            writeln!(file, "{}", line)?;
            debug!("Wrote build list to {}", path.display());
        }
        None => writeln!(fallback, "{}", line)?,
    }
    Ok(())
}
