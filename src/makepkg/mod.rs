// src/makepkg/mod.rs

//! External tools the core delegates to
//!
//! - [`BashExtractor`]: recipe evaluation through `bash`
//! - [`MakepkgFetcher`]: source checkout through `makepkg`
//! - [`GitInspector`]: commit lookup through `git`
//! - [`PacmanRepository`]: binary repository versions through `pacman`
//!
//! Every call blocks until the tool exits. Failures are returned as-is;
//! nothing here retries.

mod extractor;
mod git;
mod pacman;

pub use extractor::BashExtractor;
pub use git::{GitInspector, parse_gitmodule_paths};
pub use pacman::{PacmanRepository, parse_si_version};

use crate::error::{Error, Result};
use crate::recipe::SRCINFO;
use crate::vcs::SourceFetcher;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error};

/// Locate a required tool on PATH
pub fn find_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|e| Error::ToolNotFound(format!("{}: {}", name, e)))
}

/// Run a command, returning stdout; non-zero exit is an error carrying stderr
pub(crate) fn run(cmd: &mut Command, what: &str) -> Result<String> {
    debug!("Running {}", what);

    let output = cmd
        .output()
        .map_err(|e| Error::CommandFailed(format!("failed to start {}: {}", what, e)))?;

    if !output.status.success() {
        return Err(Error::CommandFailed(format!(
            "{} exited with {}: {}",
            what,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Downloads and extracts sources with `makepkg` without building
pub struct MakepkgFetcher {
    makepkg: PathBuf,
}

impl MakepkgFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            makepkg: find_tool("makepkg")?,
        })
    }
}

impl SourceFetcher for MakepkgFetcher {
    fn fetch(&self, workdir: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.makepkg);
        cmd.args(["--noprepare", "--nobuild", "--nodeps", "--holdver"])
            .current_dir(workdir);

        run(&mut cmd, "makepkg --nobuild").map_err(|e| {
            error!("Failed downloading sources in {}", workdir.display());
            e
        })?;
        Ok(())
    }
}

/// Write `.SRCINFO` for the recipe in `dir`
pub fn generate_srcinfo(dir: &Path) -> Result<()> {
    let makepkg = find_tool("makepkg")?;
    let mut cmd = Command::new(makepkg);
    cmd.arg("--printsrcinfo").current_dir(dir);

    let srcinfo = run(&mut cmd, "makepkg --printsrcinfo")?;
    fs::write(dir.join(SRCINFO), srcinfo)?;

    debug!("Generated {} in {}", SRCINFO, dir.display());
    Ok(())
}
