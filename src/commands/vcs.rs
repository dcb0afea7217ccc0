// src/commands/vcs.rs

//! VCS snapshot commands

use anyhow::{Context, Result, bail};
use pkgsmith::makepkg::{BashExtractor, GitInspector, MakepkgFetcher};
use pkgsmith::{Config, Merger, PinOutcome, VcsPinGenerator};
use tracing::info;

/// Regenerate stored VCS snapshots
///
/// Without `package`, ignored packages are skipped, and so are packages
/// with no VCS info unless `all` is set.
pub fn cmd_update_vcs(config: &Config, package: Option<&str>, all: bool) -> Result<()> {
    if package.is_some() && all {
        bail!("--package and --all options are mutually exclusive");
    }

    let extractor = BashExtractor::new().context("Recipe evaluation needs bash")?;
    let fetcher = MakepkgFetcher::new().context("Fetching sources needs makepkg")?;
    let inspector = GitInspector::new().context("Resolving commits needs git")?;
    let generator = VcsPinGenerator::new(&extractor, &fetcher, &inspector);
    let merger = Merger::new(config, &extractor);

    let pkgbases = match package {
        Some(name) => {
            if !config.package_exists(name) {
                bail!("Package {} does not exist", name);
            }
            vec![name.to_string()]
        }
        None => config.packages()?,
    };

    let mut updated = 0;
    for pkgbase in &pkgbases {
        let mut pconfig = config
            .load_package(pkgbase)
            .with_context(|| format!("Failed to load config for {}", pkgbase))?;

        if package.is_none() && (pconfig.ignore || (pconfig.vcs.is_none() && !all)) {
            continue;
        }

        info!("Checking package {} for VCS updates...", pkgbase);

        let outcome = merger
            .regenerate_vcs(pkgbase, &pconfig, &generator)
            .with_context(|| format!("Failed to generate VCS info for {}", pkgbase))?;

        let vcs = match outcome {
            PinOutcome::Updated(vcs) => vcs,
            PinOutcome::Unchanged => {
                info!("{} is up to date", pkgbase);
                continue;
            }
            PinOutcome::NotApplicable => {
                info!("{} has no floating VCS sources", pkgbase);
                continue;
            }
        };

        info!(
            "Updating package {} to version {}",
            pkgbase,
            vcs.version_string()
        );
        pconfig.vcs = Some(vcs);
        config.save_package(pkgbase, &pconfig)?;
        merger.clear_merge(pkgbase)?;
        updated += 1;
    }

    println!("Updated {} package(s)", updated);
    Ok(())
}
