// src/commands/prepare.rs

//! Recipe materialization command

use super::select_packages;
use anyhow::{Context, Result, bail};
use pkgsmith::makepkg::{BashExtractor, generate_srcinfo};
use pkgsmith::{Config, MergeMode, Merger};
use tracing::{error, info};

/// Merge packages and generate their `.SRCINFO`
pub fn cmd_prepare(
    config: &Config,
    package: Option<&str>,
    no_vcs: bool,
    no_srcinfo: bool,
) -> Result<()> {
    let pkgbases = select_packages(config, package)?;
    if pkgbases.is_empty() {
        println!("No packages to prepare.");
        return Ok(());
    }

    let extractor = BashExtractor::new().context("Recipe evaluation needs bash")?;
    let merger = Merger::new(config, &extractor);
    let mode = if no_vcs {
        MergeMode::Floating
    } else {
        MergeMode::Pinned
    };

    let results = merger.prepare_all(&pkgbases, mode, |pkgbase, merged| {
        if no_srcinfo {
            return Ok(());
        }
        info!("Generating .SRCINFO for {}", pkgbase);
        generate_srcinfo(merged)
    });

    let mut failed = Vec::new();
    for (pkgbase, result) in &results {
        if let Err(e) = result {
            error!("{}: {}", pkgbase, e);
            failed.push(pkgbase.as_str());
        }
    }

    println!(
        "Prepared {} of {} package(s)",
        results.len() - failed.len(),
        results.len()
    );

    if !failed.is_empty() {
        bail!("Failed to prepare: {}", failed.join(", "));
    }
    Ok(())
}
