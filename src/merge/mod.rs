// src/merge/mod.rs

//! Layered recipe materialization
//!
//! The merged directory of a package is rebuilt from scratch on every
//! merge:
//!
//! 1. `scripts/onprepare.sh` runs inside the empty merged directory
//! 2. `upstream/`, `local/` and `script-override/` are copied over it, in
//!    that order, later layers replacing earlier files
//! 3. the PKGBUILD is canonicalized and the package's overrides applied
//! 4. `scripts/onmerge.sh` runs, and the PKGBUILD is canonicalized again
//!
//! A failed merge leaves the directory in an undefined state; merging
//! again starts over from the layers.

use crate::config::{Config, PackageConfig};
use crate::error::{Error, Result};
use crate::overrides::{OverrideContext, OverrideEngine};
use crate::recipe::{MetadataExtractor, PKGBUILD, canonicalize};
use crate::vcs::{PinOutcome, VcsPinGenerator};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Hook run before the layers are copied
pub const ONPREPARE_SCRIPT: &str = "onprepare.sh";

/// Hook run after overrides are applied
pub const ONMERGE_SCRIPT: &str = "onmerge.sh";

/// Whether stored VCS pins are replayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Replay the stored snapshot
    Pinned,
    /// Leave VCS sources floating, for pin regeneration
    Floating,
}

/// Materializes packages below a [`Config`] base path
pub struct Merger<'a> {
    config: &'a Config,
    extractor: &'a dyn MetadataExtractor,
}

impl<'a> Merger<'a> {
    pub fn new(config: &'a Config, extractor: &'a dyn MetadataExtractor) -> Self {
        Self { config, extractor }
    }

    /// Rebuild the merged directory of `pkgbase`, returning its path
    pub fn merge(&self, pkgbase: &str, package: &PackageConfig, mode: MergeMode) -> Result<PathBuf> {
        debug!("Merging {}", pkgbase);

        if !self.config.package_exists(pkgbase) {
            return Err(Error::NotFoundError(format!("package {}", pkgbase)));
        }

        let merged = self.config.merged_path(pkgbase);
        remove_dir_if_exists(&merged)?;
        fs::create_dir_all(&merged)?;

        let scripts = self.config.scripts_path(pkgbase);
        run_hook(&scripts.join(ONPREPARE_SCRIPT), &merged)?;

        for layer in [
            self.config.upstream_path(pkgbase),
            self.config.local_path(pkgbase),
            self.config.script_override_path(pkgbase),
        ] {
            if layer.is_dir() {
                copy_tree(&layer, &merged)?;
            }
        }

        let pkgbuild = merged.join(PKGBUILD);
        canonicalize_file(&pkgbuild)?;

        let vcs = match mode {
            MergeMode::Pinned => package.vcs.as_ref().filter(|v| v.is_generated()),
            MergeMode::Floating => None,
        };
        let ctx = OverrideContext {
            pkgbase,
            workdir: &merged,
        };
        OverrideEngine::new(self.extractor).apply(&ctx, &package.overrides, vcs)?;

        run_hook(&scripts.join(ONMERGE_SCRIPT), &merged)?;
        canonicalize_file(&pkgbuild)?;

        Ok(merged)
    }

    /// Merge every package concurrently
    ///
    /// Each package's config is loaded fresh and `after` runs on its
    /// merged directory. One result is returned per package, in input
    /// order; a failure never stops the other packages.
    pub fn prepare_all<F>(
        &self,
        pkgbases: &[String],
        mode: MergeMode,
        after: F,
    ) -> Vec<(String, Result<PathBuf>)>
    where
        F: Fn(&str, &Path) -> Result<()> + Sync,
    {
        info!("Preparing {} package(s)", pkgbases.len());

        pkgbases
            .par_iter()
            .map(|pkgbase| {
                let result = self
                    .config
                    .load_package(pkgbase)
                    .and_then(|package| self.merge(pkgbase, &package, mode))
                    .and_then(|merged| {
                        after(pkgbase, &merged)?;
                        Ok(merged)
                    });

                if let Err(e) = &result {
                    warn!("Failed to prepare {}: {}", pkgbase, e);
                }
                (pkgbase.clone(), result)
            })
            .collect()
    }

    /// Merge with floating sources and generate a new VCS snapshot
    pub fn regenerate_vcs(
        &self,
        pkgbase: &str,
        package: &PackageConfig,
        generator: &VcsPinGenerator<'_>,
    ) -> Result<PinOutcome> {
        let merged = self.merge(pkgbase, package, MergeMode::Floating)?;
        generator.generate(&merged, package.vcs.as_ref())
    }

    /// Remove the merged and script-override directories
    pub fn clear_merge(&self, pkgbase: &str) -> Result<()> {
        if !self.config.package_exists(pkgbase) {
            return Err(Error::NotFoundError(format!("package {}", pkgbase)));
        }
        remove_dir_if_exists(&self.config.merged_path(pkgbase))?;
        remove_dir_if_exists(&self.config.script_override_path(pkgbase))?;
        Ok(())
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn canonicalize_file(path: &Path) -> Result<()> {
    let text = fs::read_to_string(path).map_err(|e| {
        Error::NotFoundError(format!("cannot read {}: {}", path.display(), e))
    })?;
    fs::write(path, canonicalize(&text)?)?;
    Ok(())
}

/// Run a hook script in `dir` if it exists
fn run_hook(script: &Path, dir: &Path) -> Result<()> {
    if !script.is_file() {
        return Ok(());
    }

    info!("Running {}", script.display());
    let status = Command::new(script)
        .current_dir(dir)
        .status()
        .map_err(|e| Error::CommandFailed(format!("failed to run {}: {}", script.display(), e)))?;

    if !status.success() {
        return Err(Error::CommandFailed(format!(
            "{} exited with {}",
            script.display(),
            status
        )));
    }
    Ok(())
}

/// Copy the contents of `src` into `dest`, replacing existing files
fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::InvalidPath(e.to_string()))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        if fs::symlink_metadata(&target).is_ok() {
            fs::remove_file(&target)?;
        }

        if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            std::os::unix::fs::symlink(link, &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
