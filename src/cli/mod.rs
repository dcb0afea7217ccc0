// src/cli/mod.rs
//! CLI definitions for pkgsmith
//!
//! This module contains the command-line interface definitions using clap.
//! The command implementations are in the `commands` module.
//!
//! Recipe pipeline:
//! - `prepare` - Materialize merged recipes and their `.SRCINFO`
//! - `update-vcs` - Regenerate VCS snapshot pins
//! - `needs-build` - Select the packages to build this run
//!
//! Config maintenance:
//! - `bump-pkgrel` - Force a rebuild of packages producing given names
//! - `prune-bumps` - Drop pkgrel bumps for versions already passed
//! - `format-config` - Rewrite `config.yaml` files in canonical form
//!
//! Utilities:
//! - `vercmp` - Compare two versions
//! - `canonicalize` - Print a recipe in canonical form

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pkgsmith")]
#[command(author = "pkgsmith Contributors")]
#[command(version)]
#[command(about = "Maintains a repository of Arch build recipes", long_about = None)]
pub struct Cli {
    /// Tool configuration file (default: ./pkgsmith.toml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Materialize merged recipes and generate .SRCINFO
    Prepare {
        /// Only prepare this package
        #[arg(short, long)]
        package: Option<String>,

        /// Leave VCS sources floating instead of replaying stored pins
        #[arg(long)]
        no_vcs: bool,

        /// Skip .SRCINFO generation
        #[arg(long)]
        no_srcinfo: bool,
    },

    /// Regenerate pinned snapshots of VCS packages
    UpdateVcs {
        /// Only check this package
        #[arg(short, long, conflicts_with = "all")]
        package: Option<String>,

        /// Check every package, including ones without stored VCS info
        #[arg(long)]
        all: bool,
    },

    /// Print the packages that can be built in this run
    NeedsBuild {
        /// Sync repository holding the built packages
        #[arg(long)]
        repo: Option<String>,

        /// Architectures whose dependencies are considered (default: all)
        #[arg(long, value_delimiter = ',')]
        arch: Vec<String>,
    },

    /// Force a rebuild of the packages producing the given names
    BumpPkgrel {
        /// Comma-separated produced package names
        #[arg(long, value_delimiter = ',', required = true)]
        packages: Vec<String>,
    },

    /// Drop pkgrel bumps for versions at or below VERSION
    PruneBumps {
        /// Package to prune
        #[arg(short, long)]
        package: String,

        /// Resolved upstream version
        version: String,
    },

    /// Rewrite config.yaml files in canonical form
    FormatConfig {
        /// Only format this package's config
        #[arg(short, long)]
        package: Option<String>,
    },

    /// Compare two versions; prints -1, 0 or 1
    Vercmp {
        left: String,
        right: String,
    },

    /// Print a recipe in canonical form
    Canonicalize {
        /// Recipe file
        file: PathBuf,
    },
}
