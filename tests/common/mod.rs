// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! The fakes stand in for bash, makepkg, git and pacman so the core can
//! be exercised without an Arch toolchain.

#![allow(dead_code)]

use pkgsmith::recipe::{DynamicVersion, MetadataExtractor, SourceArrays, VersionParts};
use pkgsmith::scheduler::RepositoryIndex;
use pkgsmith::vcs::{CHECKOUT_DIR, CommitInspector, SourceFetcher};
use pkgsmith::{Config, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Metadata extractor returning fixed values
#[derive(Debug, Clone, Default)]
pub struct FakeExtractor {
    pub names: Vec<String>,
    pub arrays: SourceArrays,
    pub version: DynamicVersion,
    pub parts: VersionParts,
}

impl FakeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names(mut self, names: &[&str]) -> Self {
        self.names = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_array(mut self, name: &str, items: &[&str]) -> Self {
        self.arrays.insert(
            name.to_string(),
            items.iter().map(|i| i.to_string()).collect(),
        );
        self
    }

    /// Declared pkgver/pkgrel plus the pkgver() output
    pub fn with_version(mut self, declared: &str, release: &str, computed: Option<&str>) -> Self {
        self.version = DynamicVersion {
            declared_version: declared.to_string(),
            declared_release: release.to_string(),
            computed_version: computed.map(str::to_string),
        };
        self
    }
}

impl MetadataExtractor for FakeExtractor {
    fn package_names(&self, _pkgbuild: &Path) -> Result<Vec<String>> {
        Ok(self.names.clone())
    }

    fn source_arrays(&self, _pkgbuild: &Path) -> Result<SourceArrays> {
        Ok(self.arrays.clone())
    }

    fn dynamic_version(&self, _pkgbuild: &Path) -> Result<DynamicVersion> {
        Ok(self.version.clone())
    }

    fn version_parts(&self, _pkgbuild: &Path) -> Result<VersionParts> {
        Ok(self.parts.clone())
    }
}

/// Fetcher that creates empty checkout directories
#[derive(Debug, Clone, Default)]
pub struct FakeFetcher {
    pub folders: Vec<String>,
}

impl FakeFetcher {
    pub fn new(folders: &[&str]) -> Self {
        Self {
            folders: folders.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl SourceFetcher for FakeFetcher {
    fn fetch(&self, workdir: &Path) -> Result<()> {
        for folder in &self.folders {
            fs::create_dir_all(workdir.join(CHECKOUT_DIR).join(folder))?;
        }
        Ok(())
    }
}

/// Inspector keyed by checkout folder name
#[derive(Debug, Clone, Default)]
pub struct FakeInspector {
    pub revisions: BTreeMap<String, String>,
    pub submodules: BTreeMap<String, BTreeMap<String, String>>,
}

impl FakeInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_revision(mut self, folder: &str, commit: &str) -> Self {
        self.revisions.insert(folder.to_string(), commit.to_string());
        self
    }

    pub fn with_submodule(mut self, host: &str, name: &str, commit: &str) -> Self {
        self.submodules
            .entry(host.to_string())
            .or_default()
            .insert(name.to_string(), commit.to_string());
        self
    }
}

fn folder_name(checkout: &Path) -> String {
    checkout
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl CommitInspector for FakeInspector {
    fn revision(&self, checkout: &Path) -> Result<String> {
        let folder = folder_name(checkout);
        self.revisions
            .get(&folder)
            .cloned()
            .ok_or_else(|| pkgsmith::Error::NotFoundError(format!("no revision for {}", folder)))
    }

    fn submodules(&self, checkout: &Path) -> Result<BTreeMap<String, String>> {
        Ok(self
            .submodules
            .get(&folder_name(checkout))
            .cloned()
            .unwrap_or_default())
    }
}

/// Repository index backed by a map
#[derive(Debug, Clone, Default)]
pub struct FakeRepository {
    pub versions: BTreeMap<String, String>,
}

impl FakeRepository {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            versions: entries
                .iter()
                .map(|(name, version)| (name.to_string(), version.to_string()))
                .collect(),
        }
    }
}

impl RepositoryIndex for FakeRepository {
    fn version(&self, name: &str) -> Result<Option<String>> {
        Ok(self.versions.get(name).cloned())
    }
}

/// Create a package tree with one package whose upstream PKGBUILD is `pkgbuild`.
///
/// Returns (TempDir, Config) - keep the TempDir alive to prevent cleanup.
pub fn setup_package_tree(pkgbase: &str, pkgbuild: &str) -> (TempDir, Config) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = Config::default().with_root(temp_dir.path());

    let upstream = config.upstream_path(pkgbase);
    fs::create_dir_all(&upstream).unwrap();
    fs::write(upstream.join("PKGBUILD"), pkgbuild).unwrap();

    (temp_dir, config)
}
