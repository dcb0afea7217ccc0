// src/commands/mod.rs
//! Command handlers for the pkgsmith CLI

mod config;
mod prepare;
mod recipe;
mod schedule;
mod vcs;

// Re-export all command handlers
pub use config::{cmd_format_config, cmd_prune_bumps};
pub use prepare::cmd_prepare;
pub use recipe::{cmd_canonicalize, cmd_vercmp};
pub use schedule::{cmd_bump_pkgrel, cmd_needs_build};
pub use vcs::cmd_update_vcs;

use anyhow::{Result, bail};
use pkgsmith::Config;

/// Resolve the package list for a command
///
/// A named package must exist; otherwise every package directory is used.
/// Ignored packages are dropped unless they were named explicitly.
pub(crate) fn select_packages(config: &Config, package: Option<&str>) -> Result<Vec<String>> {
    if let Some(name) = package {
        if !config.package_exists(name) {
            bail!("Package {} does not exist", name);
        }
        return Ok(vec![name.to_string()]);
    }

    let mut selected = Vec::new();
    for pkgbase in config.packages()? {
        if config.load_package(&pkgbase)?.ignore {
            continue;
        }
        selected.push(pkgbase);
    }
    Ok(selected)
}
