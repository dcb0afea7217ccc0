// src/lib.rs

//! pkgsmith
//!
//! Maintains a repository of Arch Linux build recipes tracked from the AUR
//! and the Arch package repositories, with local modifications layered on
//! top.
//!
//! # Architecture
//!
//! - Layers: each package merges `upstream/`, `local/` and generated files
//!   into `merged/`, which is rebuilt from scratch on every run
//! - Overrides: declarative edits from `config.yaml`, applied to the
//!   canonical form of the recipe
//! - VCS snapshots: floating git sources are pinned to commits, with a
//!   version that never goes backwards
//! - Scheduling: one batch per run, deferring recipes whose build
//!   dependencies are themselves pending

pub mod ci;
pub mod config;
mod error;
pub mod makepkg;
pub mod merge;
pub mod overrides;
pub mod recipe;
pub mod scheduler;
pub mod vcs;
pub mod version;

pub use config::{Config, PackageConfig};
pub use error::{Error, Result};
pub use merge::{MergeMode, Merger};
pub use overrides::{OverrideEngine, OverrideSet};
pub use recipe::{MetadataExtractor, Recipe, canonicalize};
pub use scheduler::{BuildScheduler, RepositoryIndex, Tracker};
pub use vcs::{PinOutcome, VcsInfo, VcsPinGenerator};
pub use version::{PkgVersion, compare_versions, vercmp};
