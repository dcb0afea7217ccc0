// src/recipe/metadata.rs

//! Evaluated recipe metadata
//!
//! Recipes are shell scripts; their real values only exist after an
//! interpreter has sourced them. The core never evaluates a recipe itself
//! and asks a [`MetadataExtractor`] instead.

use crate::error::Result;
use crate::version::PkgVersion;
use std::collections::BTreeMap;
use std::path::Path;

/// Version fields of a recipe after evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionParts {
    pub epoch: String,
    pub pkgver: String,
    pub pkgrel: String,
}

impl VersionParts {
    pub fn to_version(&self) -> Result<PkgVersion> {
        let text = if self.epoch.is_empty() || self.epoch == "0" {
            format!("{}-{}", self.pkgver, self.pkgrel)
        } else {
            format!("{}:{}-{}", self.epoch, self.pkgver, self.pkgrel)
        };
        PkgVersion::parse(&text)
    }
}

/// Result of running a recipe's dynamic version function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicVersion {
    /// `pkgver` as declared in the recipe
    pub declared_version: String,
    /// `pkgrel` as declared in the recipe
    pub declared_release: String,
    /// Output of `pkgver()`, if the recipe has one
    pub computed_version: Option<String>,
}

impl DynamicVersion {
    /// The version the package will be built as
    pub fn effective_version(&self) -> &str {
        self.computed_version
            .as_deref()
            .unwrap_or(&self.declared_version)
    }
}

/// Evaluated `source*` and `*sums*` arrays keyed by variable name
pub type SourceArrays = BTreeMap<String, Vec<String>>;

/// Evaluates a recipe file in its own directory
pub trait MetadataExtractor: Send + Sync {
    /// Every value of `pkgname`
    fn package_names(&self, pkgbuild: &Path) -> Result<Vec<String>>;

    /// All `source`, `source_<arch>`, `<algo>sums` and `<algo>sums_<arch>` arrays
    fn source_arrays(&self, pkgbuild: &Path) -> Result<SourceArrays>;

    /// Declared version fields plus the output of `pkgver()` when present
    ///
    /// Sources must already be fetched for `pkgver()` to work.
    fn dynamic_version(&self, pkgbuild: &Path) -> Result<DynamicVersion>;

    fn version_parts(&self, pkgbuild: &Path) -> Result<VersionParts>;
}
