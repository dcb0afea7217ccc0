// src/vcs/mod.rs

//! VCS snapshot pinning
//!
//! A VCS package builds from a moving branch or tag. [`VcsPinGenerator`]
//! resolves every floating git source of a merged recipe to the commit it
//! currently points at and records the result as a [`VcsInfo`]: literal
//! source replacements plus the version the snapshot builds as. The
//! override engine replays a stored `VcsInfo` on every later merge, so the
//! snapshot stays pinned until the next regeneration.
//!
//! Regeneration is monotonic (see [`reconcile`]): a new snapshot never
//! moves the upstream version backwards, and a refresh of an unchanged
//! upstream version advances the release counter.

pub mod source;

pub use source::Source;

use crate::error::{Error, Result};
use crate::overrides::FromTo;
use crate::recipe::{MetadataExtractor, PKGBUILD};
use crate::version::{parse_release, vercmp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Directory under the working directory that makepkg checks sources into
pub const CHECKOUT_DIR: &str = "src";

/// A source whose pin comes from a submodule of another source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmoduleLink {
    /// Folder of the host checkout that contains the submodule
    pub source: String,
    /// Submodule name in the host's `.gitmodules`
    pub name: String,
}

/// Persisted result of the last successful pin generation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcsInfo {
    #[serde(rename = "pkgver", default)]
    pub upstream_version: String,

    #[serde(rename = "pkgrel", default)]
    pub release: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_overrides: Vec<FromTo>,

    /// Target folder -> host checkout and submodule name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submodules: Option<BTreeMap<String, SubmoduleLink>>,
}

impl VcsInfo {
    /// Whether a snapshot has been generated (as opposed to only submodule links)
    pub fn is_generated(&self) -> bool {
        !self.upstream_version.is_empty()
    }

    /// Compare pin sets ignoring declaration order
    pub fn same_pins(&self, other: &VcsInfo) -> bool {
        let mut mine = self.source_overrides.clone();
        let mut theirs = other.source_overrides.clone();
        mine.sort();
        theirs.sort();
        mine == theirs
    }

    /// Full version string the pinned snapshot builds as
    pub fn version_string(&self) -> String {
        format!("{}-{}", self.upstream_version, self.release)
    }
}

/// Outcome of a pin regeneration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinOutcome {
    /// The recipe has no floating VCS source
    NotApplicable,
    /// The stored pins already match the checkouts
    Unchanged,
    /// A new snapshot that should be stored
    Updated(VcsInfo),
}

/// Checks out every source of a recipe into `<workdir>/src`
pub trait SourceFetcher: Send + Sync {
    fn fetch(&self, workdir: &Path) -> Result<()>;
}

/// Reads commit identifiers from checkouts
pub trait CommitInspector: Send + Sync {
    /// Commit the checkout's HEAD points at
    fn revision(&self, checkout: &Path) -> Result<String>;

    /// Submodule name -> commit recorded in the checkout's HEAD
    fn submodules(&self, checkout: &Path) -> Result<BTreeMap<String, String>>;
}

/// Apply the monotonicity policy to a freshly generated snapshot
///
/// `previous` entries that only carry submodule links count as absent.
pub fn reconcile(previous: Option<&VcsInfo>, mut candidate: VcsInfo) -> Result<PinOutcome> {
    let previous = match previous.filter(|p| p.is_generated()) {
        Some(previous) => previous,
        None => {
            debug!("No stored snapshot, accepting {}", candidate.version_string());
            return Ok(PinOutcome::Updated(candidate));
        }
    };

    if previous.same_pins(&candidate) {
        return Ok(PinOutcome::Unchanged);
    }

    match vercmp(&previous.upstream_version, &candidate.upstream_version) {
        Ordering::Less => Ok(PinOutcome::Updated(candidate)),
        Ordering::Greater => Err(Error::VersionRegression {
            old: previous.upstream_version.clone(),
            new: candidate.upstream_version,
        }),
        Ordering::Equal => {
            candidate.release = next_release(previous.release)?;
            debug!(
                "Pins changed at unchanged version {}, release {} -> {}",
                candidate.upstream_version, previous.release, candidate.release
            );
            Ok(PinOutcome::Updated(candidate))
        }
    }
}

/// Release a regenerated snapshot starts from
///
/// A `pkgver()` that moved the version resets the release to 1. A version
/// that did not move keeps the declared release, bumped once more if the
/// declared release carries a generation.
fn snapshot_release(computed_version: &str, declared_version: &str, declared_release: &str) -> Result<u32> {
    if computed_version != declared_version {
        return Ok(1);
    }

    let (release, generation) = parse_release(declared_release)?;
    match generation {
        Some(g) if g > 0 => next_release(release),
        _ => Ok(release),
    }
}

fn next_release(release: u32) -> Result<u32> {
    release
        .checked_add(1)
        .ok_or_else(|| Error::ParseError(format!("release {} cannot be incremented", release)))
}

/// Resolves floating git sources of a merged recipe to commits
pub struct VcsPinGenerator<'a> {
    extractor: &'a dyn MetadataExtractor,
    fetcher: &'a dyn SourceFetcher,
    inspector: &'a dyn CommitInspector,
}

impl<'a> VcsPinGenerator<'a> {
    pub fn new(
        extractor: &'a dyn MetadataExtractor,
        fetcher: &'a dyn SourceFetcher,
        inspector: &'a dyn CommitInspector,
    ) -> Self {
        Self {
            extractor,
            fetcher,
            inspector,
        }
    }

    /// Generate a snapshot for the recipe in `workdir`
    ///
    /// `workdir` must hold a recipe merged without stored source pins so
    /// the floating references are visible. `previous` is the stored
    /// snapshot; its submodule links are carried into the new one.
    pub fn generate(&self, workdir: &Path, previous: Option<&VcsInfo>) -> Result<PinOutcome> {
        let pkgbuild = workdir.join(PKGBUILD);
        let mut sources = self.git_sources(&pkgbuild)?;

        if !sources.values().any(Source::is_floating_vcs) {
            debug!("No floating VCS sources in {}", pkgbuild.display());
            return Ok(PinOutcome::NotApplicable);
        }

        info!("Fetching sources in {}", workdir.display());
        self.fetcher.fetch(workdir)?;

        let checkouts = workdir.join(CHECKOUT_DIR);
        let links = previous.and_then(|p| p.submodules.clone());

        if let Some(links) = &links {
            self.pin_submodules(&checkouts, links, &mut sources)?;
        }

        let mut source_overrides = Vec::new();
        for (folder, source) in sources.iter_mut() {
            if !source.is_pinned() {
                let checkout = checkouts.join(folder);
                if !checkout.is_dir() {
                    return Err(Error::NotFoundError(format!(
                        "checkout of {} missing at {}",
                        source.original,
                        checkout.display()
                    )));
                }
                let revision = self.inspector.revision(&checkout)?;
                debug!("{} is at {}", folder, revision);
                source.pin(&revision);
            }

            if source.is_changed() {
                source_overrides.push(FromTo::new(source.original.clone(), source.to_string()));
            }
        }

        let version = self.extractor.dynamic_version(&pkgbuild)?;
        let upstream_version = version.effective_version().to_string();
        let release = snapshot_release(
            &upstream_version,
            &version.declared_version,
            &version.declared_release,
        )?;

        let candidate = VcsInfo {
            upstream_version,
            release,
            source_overrides,
            submodules: links,
        };

        let outcome = reconcile(previous, candidate)?;
        if let PinOutcome::Updated(info) = &outcome {
            info!(
                "New VCS snapshot {} with {} pinned source(s)",
                info.version_string(),
                info.source_overrides.len()
            );
        }
        Ok(outcome)
    }

    /// Git sources of every `source*` array keyed by checkout folder
    fn git_sources(&self, pkgbuild: &Path) -> Result<BTreeMap<String, Source>> {
        let arrays = self.extractor.source_arrays(pkgbuild)?;
        let mut sources = BTreeMap::new();

        for (name, items) in &arrays {
            if name != "source" && !name.starts_with("source_") {
                continue;
            }
            for item in items {
                let source = Source::parse(item)?;
                if source.vcs_type == "git" {
                    sources.insert(source.folder().to_string(), source);
                }
            }
        }

        Ok(sources)
    }

    /// Pin sources that track a submodule of another checkout
    fn pin_submodules(
        &self,
        checkouts: &Path,
        links: &BTreeMap<String, SubmoduleLink>,
        sources: &mut BTreeMap<String, Source>,
    ) -> Result<()> {
        let mut hosts: BTreeMap<&str, BTreeMap<String, String>> = BTreeMap::new();

        for (target, link) in links {
            let floating = sources.get(target).is_some_and(|s| !s.is_pinned());
            if !floating {
                continue;
            }

            if !hosts.contains_key(link.source.as_str()) {
                let host = checkouts.join(&link.source);
                if !host.is_dir() {
                    warn!("Submodule host {} was not checked out", link.source);
                    continue;
                }
                hosts.insert(&link.source, self.inspector.submodules(&host)?);
            }

            let commit = hosts
                .get(link.source.as_str())
                .and_then(|commits| commits.get(&link.name));

            match (commit, sources.get_mut(target)) {
                (Some(commit), Some(source)) => {
                    debug!("{} pinned to submodule {} of {}", target, link.name, link.source);
                    source.pin(commit);
                }
                _ => warn!("Submodule {} not found in {}", link.name, link.source),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(version: &str, release: u32, pins: &[(&str, &str)]) -> VcsInfo {
        VcsInfo {
            upstream_version: version.to_string(),
            release,
            source_overrides: pins.iter().map(|(f, t)| FromTo::new(*f, *t)).collect(),
            submodules: None,
        }
    }

    #[test]
    fn test_reconcile_without_previous() {
        let new = info("1.0.r1", 1, &[("a", "a#commit=1")]);
        assert_eq!(reconcile(None, new.clone()).unwrap(), PinOutcome::Updated(new));
    }

    #[test]
    fn test_reconcile_identical_pins() {
        let prev = info("1.0.r1", 3, &[("a", "a#commit=1"), ("b", "b#commit=2")]);
        let new = info("1.0.r1", 1, &[("b", "b#commit=2"), ("a", "a#commit=1")]);
        assert_eq!(reconcile(Some(&prev), new).unwrap(), PinOutcome::Unchanged);
    }

    #[test]
    fn test_reconcile_newer_version() {
        let prev = info("1.0.r1", 3, &[("a", "a#commit=1")]);
        let new = info("1.0.r2", 1, &[("a", "a#commit=2")]);
        assert_eq!(reconcile(Some(&prev), new.clone()).unwrap(), PinOutcome::Updated(new));
    }

    #[test]
    fn test_reconcile_same_version_advances_release() {
        let prev = info("1.0", 4, &[("a", "a#commit=1")]);
        let new = info("1.0", 1, &[("a", "a#commit=2")]);
        match reconcile(Some(&prev), new).unwrap() {
            PinOutcome::Updated(info) => assert_eq!(info.release, 5),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_reconcile_regression_is_error() {
        let prev = info("1.10", 1, &[("a", "a#commit=1")]);
        let new = info("1.9", 1, &[("a", "a#commit=2")]);
        let err = reconcile(Some(&prev), new).unwrap_err();
        assert!(matches!(err, Error::VersionRegression { old, new } if old == "1.10" && new == "1.9"));
    }

    #[test]
    fn test_reconcile_links_only_previous() {
        let prev = VcsInfo {
            submodules: Some(BTreeMap::new()),
            ..Default::default()
        };
        let new = info("0.1", 1, &[("a", "a#commit=1")]);
        assert!(matches!(
            reconcile(Some(&prev), new).unwrap(),
            PinOutcome::Updated(_)
        ));
    }

    #[test]
    fn test_snapshot_release() {
        assert_eq!(snapshot_release("1.0.r5", "1.0", "3").unwrap(), 1);
        assert_eq!(snapshot_release("1.0", "1.0", "3").unwrap(), 3);
        assert_eq!(snapshot_release("1.0", "1.0", "3.2").unwrap(), 4);
        assert_eq!(snapshot_release("1.0", "1.0", "3.0").unwrap(), 3);
        assert!(snapshot_release("1.0", "1.0", "x").is_err());
    }

    #[test]
    fn test_release_overflow_is_an_error() {
        let prev = info("1.0", u32::MAX, &[("a", "a#commit=1")]);
        let new = info("1.0", 1, &[("a", "a#commit=2")]);
        assert!(matches!(
            reconcile(Some(&prev), new).unwrap_err(),
            Error::ParseError(_)
        ));

        let declared = format!("{}.1", u32::MAX);
        assert!(snapshot_release("1.0", "1.0", &declared).is_err());
    }

    #[test]
    fn test_yaml_keys() {
        let yaml = r#"
pkgver: 1.0.r12.gabc
pkgrel: 2
sourceOverrides:
  - from: git+https://e.org/x.git
    to: git+https://e.org/x.git#commit=abc
submodules:
  vendor:
    source: x
    name: third_party/vendor
"#;
        let info: VcsInfo = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(info.upstream_version, "1.0.r12.gabc");
        assert_eq!(info.release, 2);
        assert_eq!(info.source_overrides.len(), 1);
        let links = info.submodules.as_ref().unwrap();
        assert_eq!(links["vendor"].source, "x");
        assert_eq!(info.version_string(), "1.0.r12.gabc-2");

        let out = serde_yaml::to_string(&info).unwrap();
        assert!(out.contains("sourceOverrides:"));
        assert!(out.contains("pkgrel: 2"));
    }
}
