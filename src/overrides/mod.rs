// src/overrides/mod.rs

//! Declarative recipe overrides
//!
//! An [`OverrideSet`] lives under the `overrides:` key of a package's
//! `config.yaml`:
//!
//! ```yaml
//! overrides:
//!   renamePackage:
//!     - from: foo
//!       to: foo-custom
//!   modifySection:
//!     - section: build
//!       replace:
//!         - from: "--disable-foo"
//!           to: "--enable-foo"
//!   bumpPkgrel:
//!     "1.2.3": 1
//!   clearSignatures: true
//!   deleteFile:
//!     - "*.install"
//! ```
//!
//! The [`OverrideEngine`] applies a set in three fixed phases no matter
//! how the YAML is ordered: structural rewrites, appended blocks, then
//! file operations.

mod append;
mod engine;
mod files;

pub use append::{file_name, is_signature, remove_source_lines};
pub use engine::{OverrideContext, OverrideEngine};
pub use files::apply_file_operations;

use crate::error::{Error, Result};
use crate::recipe::SectionKind;
use crate::version::vercmp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// A `from`/`to` pair used by renames and replacements
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FromTo {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

impl FromTo {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Edit of one or more recipe sections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifySection {
    /// Explicit section kind; a missing section of this kind is created
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<SectionKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<String>,

    /// Subpackage qualifier added to each section name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,

    /// New name for each targeted section (qualifier is kept)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,

    /// Regex replacements applied in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replace: Vec<FromTo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepend: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<String>,
}

/// A section name and optional subpackage qualifier
pub type SectionTarget = (Option<String>, Option<String>);

impl ModifySection {
    /// Every (section, package) pair this edit applies to
    ///
    /// With no section at all the edit targets the whole recipe text.
    pub fn targets(&self) -> Result<Vec<SectionTarget>> {
        let sections: Vec<&String> = self.sections.iter().chain(self.section.iter()).collect();
        let packages: Vec<&String> = self.packages.iter().chain(self.package.iter()).collect();

        if sections.is_empty() {
            if !packages.is_empty() {
                return Err(Error::InvalidOverride(
                    "cannot specify package name without section name".to_string(),
                ));
            }
            return Ok(vec![(None, None)]);
        }

        let mut targets = Vec::new();
        for section in &sections {
            if packages.is_empty() {
                targets.push((Some(section.to_string()), None));
            }
            for package in &packages {
                targets.push((Some(section.to_string()), Some(package.to_string())));
            }
        }
        Ok(targets)
    }
}

/// The full set of overrides for one package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideSet {
    /// Rename produced packages; an empty `from` matches the pkgbase
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rename_package: Vec<FromTo>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rename_function: Vec<FromTo>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modify_section: Vec<ModifySection>,

    /// Upstream version -> pkgrel increment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bump_pkgrel: BTreeMap<String, u32>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub bump_epoch: u32,

    #[serde(default, skip_serializing_if = "is_false")]
    pub clear_depends_versions: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub clear_pkgver_func: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub clear_provides: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub clear_conflicts: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub clear_replaces: bool,

    /// Drop `validpgpkeys` and every `.sig`/`.sign`/`.asc` source
    #[serde(default, skip_serializing_if = "is_false")]
    pub clear_signatures: bool,

    /// Regexes matched against source file names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove_source: Vec<String>,

    /// Literal text appended after every other block
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<String>,

    /// Paths or globs relative to the working directory
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delete_file: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rename_file: Vec<FromTo>,
}

impl OverrideSet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Drop pkgrel bumps whose version is not newer than `version`
///
/// Returns the number of entries removed.
pub fn prune_bump_pkgrel(version: &str, bumps: &mut BTreeMap<String, u32>) -> usize {
    if version.is_empty() {
        return 0;
    }

    let before = bumps.len();
    bumps.retain(|key, _| vercmp(key, version) == Ordering::Greater);
    let removed = before - bumps.len();

    if removed > 0 {
        debug!("Pruned {} pkgrel bump(s) at or below {}", removed, version);
    }

    removed
}
