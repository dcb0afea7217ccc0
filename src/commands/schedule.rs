// src/commands/schedule.rs

//! Build scheduling commands

use anyhow::{Context, Result};
use pkgsmith::ci::CiEnv;
use pkgsmith::makepkg::{BashExtractor, PacmanRepository};
use pkgsmith::recipe::{PKGBUILD, SRCINFO, srcinfo};
use pkgsmith::{BuildScheduler, Config, MergeMode, Merger, MetadataExtractor, Tracker};
use tracing::{info, warn};

/// Select the packages to build and publish the list
///
/// Works on the merged recipes left by `prepare`.
pub fn cmd_needs_build(config: &Config, repo: Option<String>, arch: &[String]) -> Result<()> {
    let extractor = BashExtractor::new().context("Recipe evaluation needs bash")?;
    let repository = PacmanRepository::new(repo).context("Repository lookups need pacman")?;
    let arches: Vec<&str> = arch.iter().map(String::as_str).collect();

    let mut scheduler = BuildScheduler::new();

    for pkgbase in config.packages()? {
        let pconfig = config
            .load_package(&pkgbase)
            .with_context(|| format!("Failed to load config for {}", pkgbase))?;

        if pconfig.ignore {
            continue;
        }

        if pconfig.needs_vcs_info() {
            info!(
                "Skipping VCS package {} without VCS information. Run update-vcs.",
                pkgbase
            );
            continue;
        }

        let merged = config.merged_path(&pkgbase);
        let upstream_version = extractor
            .version_parts(&merged.join(PKGBUILD))
            .and_then(|parts| parts.to_version())
            .with_context(|| format!("Failed to read merged version of {}", pkgbase))?
            .to_string();

        let packages = srcinfo::load(&merged.join(SRCINFO))
            .with_context(|| format!("Failed to load {} for {}; run prepare", SRCINFO, pkgbase))?;

        match Tracker::from_srcinfo(&upstream_version, &packages, &repository, &arches) {
            Ok(tracker) => scheduler.add_tracker(tracker.with_build_first(pconfig.build_first)),
            Err(e) => warn!("Skipping {}: {}", pkgbase, e),
        }
    }

    let batch = scheduler.select();
    info!(
        "{} of {} package(s) selected for this run",
        batch.len(),
        scheduler.tracker_count()
    );

    CiEnv::detect().write_build_packages(&batch)?;
    Ok(())
}

/// Force a rebuild of every package producing one of `packages`
///
/// VCS packages get their snapshot release bumped; others get a
/// `bumpPkgrel` entry for their current upstream version.
pub fn cmd_bump_pkgrel(config: &Config, packages: &[String]) -> Result<()> {
    let extractor = BashExtractor::new().context("Recipe evaluation needs bash")?;
    let merger = Merger::new(config, &extractor);

    let mut targets = Vec::new();
    for pkgbase in config.packages()? {
        let pconfig = config.load_package(&pkgbase)?;
        if pconfig.ignore {
            continue;
        }

        let merged = merger
            .merge(&pkgbase, &pconfig, MergeMode::Pinned)
            .with_context(|| format!("Failed to merge {}", pkgbase))?;
        let names = extractor.package_names(&merged.join(PKGBUILD))?;

        if names.iter().any(|name| packages.contains(name)) {
            targets.push((pkgbase, pconfig, merged));
        }
    }

    for (pkgbase, mut pconfig, merged) in targets {
        let version = match pconfig.vcs.as_mut() {
            Some(vcs) => {
                vcs.release += 1;
                vcs.version_string()
            }
            None => {
                let parts = extractor.version_parts(&merged.join(PKGBUILD))?;
                *pconfig
                    .overrides
                    .bump_pkgrel
                    .entry(parts.pkgver.clone())
                    .or_insert(0) += 1;
                parts.pkgver
            }
        };

        info!("Bumping pkgrel of {} at version {}", pkgbase, version);
        config.save_package(&pkgbase, &pconfig)?;
        println!("Bumped {}", pkgbase);
    }

    Ok(())
}
