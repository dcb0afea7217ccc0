// src/commands/config.rs

//! Package config maintenance commands

use anyhow::{Context, Result, bail};
use pkgsmith::overrides::prune_bump_pkgrel;
use pkgsmith::{Config, PackageConfig};
use tracing::debug;

/// Rewrite existing `config.yaml` files in canonical form
pub fn cmd_format_config(config: &Config, package: Option<&str>) -> Result<()> {
    let pkgbases = match package {
        Some(name) => vec![name.to_string()],
        None => config.packages()?,
    };

    let mut formatted = 0;
    for pkgbase in &pkgbases {
        if !PackageConfig::exists(&config.package_config_path(pkgbase)) {
            debug!("{} has no config", pkgbase);
            continue;
        }

        let pconfig = config
            .load_package(pkgbase)
            .with_context(|| format!("Failed to load config for {}", pkgbase))?;
        config.save_package(pkgbase, &pconfig)?;
        formatted += 1;
    }

    println!("Formatted {} config file(s)", formatted);
    Ok(())
}

/// Drop `bumpPkgrel` entries at or below `version`
pub fn cmd_prune_bumps(config: &Config, package: &str, version: &str) -> Result<()> {
    if !config.package_exists(package) {
        bail!("Package {} does not exist", package);
    }

    let mut pconfig = config.load_package(package)?;
    let removed = prune_bump_pkgrel(version, &mut pconfig.overrides.bump_pkgrel);

    if removed > 0 {
        config.save_package(package, &pconfig)?;
    }
    println!("Removed {} pkgrel bump(s) from {}", removed, package);
    Ok(())
}
