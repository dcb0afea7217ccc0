// src/main.rs

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use pkgsmith::Config;
use std::env;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let cwd = env::current_dir().context("Cannot determine working directory")?;
            Config::discover(&cwd)?
        }
    };

    match cli.command {
        Commands::Prepare {
            package,
            no_vcs,
            no_srcinfo,
        } => commands::cmd_prepare(&config, package.as_deref(), no_vcs, no_srcinfo),
        Commands::UpdateVcs { package, all } => {
            commands::cmd_update_vcs(&config, package.as_deref(), all)
        }
        Commands::NeedsBuild { repo, arch } => commands::cmd_needs_build(&config, repo, &arch),
        Commands::BumpPkgrel { packages } => commands::cmd_bump_pkgrel(&config, &packages),
        Commands::PruneBumps { package, version } => {
            commands::cmd_prune_bumps(&config, &package, &version)
        }
        Commands::FormatConfig { package } => {
            commands::cmd_format_config(&config, package.as_deref())
        }
        Commands::Vercmp { left, right } => commands::cmd_vercmp(&left, &right),
        Commands::Canonicalize { file } => commands::cmd_canonicalize(&file),
    }
}
