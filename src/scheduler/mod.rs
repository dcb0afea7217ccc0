// src/scheduler/mod.rs

//! Build batch selection
//!
//! Given one [`Tracker`] per recipe, the scheduler picks the recipes that
//! can be rebuilt in the current run. A recipe that needs an update is
//! deferred when one of its build dependencies is produced by another
//! recipe that also needs an update; it is reconsidered on a later run,
//! once that dependency is current.
//!
//! ```ignore
//! use pkgsmith::scheduler::{BuildScheduler, Tracker};
//!
//! let mut scheduler = BuildScheduler::new();
//! scheduler.add_tracker(tracker_a);
//! scheduler.add_tracker(tracker_b);
//!
//! let batch = scheduler.select();
//! ```
//!
//! Deferral is one level deep. This is not a topological sort: a recipe
//! blocked this run may be blocked again next run if its dependency is
//! still pending.

use crate::error::{Error, Result};
use crate::recipe::{SrcinfoPackage, strip_constraint};
use crate::version::is_version_newer;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// One binary package produced by a recipe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProducedPackage {
    pub name: String,
    pub full_version: String,
    /// Build-time dependency names, constraints stripped
    pub build_deps: BTreeSet<String>,
}

impl ProducedPackage {
    pub fn new(name: impl Into<String>, full_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_version: full_version.into(),
            build_deps: BTreeSet::new(),
        }
    }

    /// Add build dependencies; version constraints are dropped
    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.build_deps
            .extend(deps.into_iter().map(|d| strip_constraint(d.as_ref()).to_string()));
        self
    }

    pub fn from_srcinfo(package: &SrcinfoPackage, arches: &[&str]) -> Self {
        Self::new(&package.pkgname, package.full_version())
            .with_deps(package.build_depends(arches))
    }
}

/// Versions currently published in the binary repository
pub trait RepositoryIndex: Send + Sync {
    /// Version of a produced package, or `None` if it was never published
    fn version(&self, name: &str) -> Result<Option<String>>;
}

/// Version state of one recipe for a scheduling run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tracker {
    pub pkgbase: String,
    pub upstream_version: String,
    /// Version currently in the binary repository; `None` if never built
    pub repository_version: Option<String>,
    pub needs_update: bool,
    /// Serialize the batch on this recipe when it is selected
    pub build_first: bool,
    pub packages: Vec<ProducedPackage>,
}

impl Tracker {
    /// Build a tracker, computing `needs_update` from the two versions
    pub fn new(
        pkgbase: impl Into<String>,
        upstream_version: impl Into<String>,
        repository_version: Option<String>,
    ) -> Result<Self> {
        let upstream_version = upstream_version.into();
        let needs_update = is_version_newer(
            repository_version.as_deref().unwrap_or_default(),
            &upstream_version,
        )?;

        Ok(Self {
            pkgbase: pkgbase.into(),
            upstream_version,
            repository_version,
            needs_update,
            build_first: false,
            packages: Vec::new(),
        })
    }

    /// Build a tracker from a recipe's `.SRCINFO` packages
    ///
    /// The repository version is that of the first produced package the
    /// repository knows about.
    pub fn from_srcinfo(
        upstream_version: &str,
        packages: &[SrcinfoPackage],
        repository: &dyn RepositoryIndex,
        arches: &[&str],
    ) -> Result<Self> {
        let pkgbase = packages
            .first()
            .map(|p| p.pkgbase.clone())
            .ok_or_else(|| Error::ParseError("no packages in .SRCINFO".to_string()))?;

        let mut repository_version = None;
        for package in packages {
            repository_version = repository.version(&package.pkgname)?;
            if repository_version.is_some() {
                break;
            }
        }

        let mut tracker = Self::new(pkgbase, upstream_version, repository_version)?;
        tracker.packages = packages
            .iter()
            .map(|p| ProducedPackage::from_srcinfo(p, arches))
            .collect();
        Ok(tracker)
    }

    pub fn with_package(mut self, package: ProducedPackage) -> Self {
        self.packages.push(package);
        self
    }

    pub fn with_build_first(mut self, build_first: bool) -> Self {
        self.build_first = build_first;
        self
    }

    fn build_deps(&self) -> impl Iterator<Item = &String> {
        self.packages.iter().flat_map(|p| p.build_deps.iter())
    }
}

/// Selects the recipes that can be rebuilt this run
#[derive(Debug, Default)]
pub struct BuildScheduler {
    trackers: Vec<Tracker>,
    /// Produced package name or pkgbase -> indices into `trackers`
    producers: HashMap<String, Vec<usize>>,
}

impl BuildScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fully populated tracker
    pub fn add_tracker(&mut self, tracker: Tracker) {
        let index = self.trackers.len();

        if tracker.needs_update {
            match &tracker.repository_version {
                Some(current) => info!(
                    "Considering package {}, version {} is newer than {}.",
                    tracker.pkgbase, tracker.upstream_version, current
                ),
                None => info!(
                    "Considering new package {}, version {}.",
                    tracker.pkgbase, tracker.upstream_version
                ),
            }
        }

        let names = std::iter::once(&tracker.pkgbase)
            .chain(tracker.packages.iter().map(|package| &package.name));
        for name in names {
            let indices = self.producers.entry(name.clone()).or_default();
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
        self.trackers.push(tracker);
    }

    pub fn tracker_count(&self) -> usize {
        self.trackers.len()
    }

    /// Pending recipe, other than `index`, that produces `name`
    fn pending_producer(&self, index: usize, name: &str) -> Option<&Tracker> {
        self.producers
            .get(name)?
            .iter()
            .filter(|&&other| other != index)
            .map(|&other| &self.trackers[other])
            .find(|other| other.needs_update)
    }

    /// Recipes safe to build now, sorted by pkgbase
    ///
    /// If a selected recipe is flagged `build_first`, the batch is only
    /// that recipe (the first such one by pkgbase).
    pub fn select(&self) -> Vec<String> {
        let mut selected: Vec<&Tracker> = Vec::new();

        for (index, tracker) in self.trackers.iter().enumerate() {
            if !tracker.needs_update {
                continue;
            }

            let blocker = tracker
                .build_deps()
                .find_map(|dep| self.pending_producer(index, dep));

            match blocker {
                Some(blocker) => info!(
                    "Skipping {} for this run due to dependencies (waiting on {}).",
                    tracker.pkgbase, blocker.pkgbase
                ),
                None => selected.push(tracker),
            }
        }

        selected.sort_by(|a, b| a.pkgbase.cmp(&b.pkgbase));

        if let Some(first) = selected.iter().find(|t| t.build_first) {
            info!("Building {} before anything else.", first.pkgbase);
            return vec![first.pkgbase.clone()];
        }

        selected.into_iter().map(|t| t.pkgbase.clone()).collect()
    }
}

/// Convenience wrapper over [`BuildScheduler`]
pub fn select_batch(trackers: impl IntoIterator<Item = Tracker>) -> Vec<String> {
    let mut scheduler = BuildScheduler::new();
    for tracker in trackers {
        scheduler.add_tracker(tracker);
    }
    scheduler.select()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(pkgbase: &str, needs_update: bool, deps: &[&str]) -> Tracker {
        Tracker {
            pkgbase: pkgbase.to_string(),
            upstream_version: "1.0-1".to_string(),
            repository_version: None,
            needs_update,
            build_first: false,
            packages: vec![ProducedPackage::new(pkgbase, "1.0-1").with_deps(deps.iter())],
        }
    }

    #[test]
    fn test_tracker_needs_update() {
        let t = Tracker::new("foo", "1.1-1", Some("1.0-3".to_string())).unwrap();
        assert!(t.needs_update);
        let t = Tracker::new("foo", "1.0-1", Some("1.0-1".to_string())).unwrap();
        assert!(!t.needs_update);
        let t = Tracker::new("foo", "1.0-1", None).unwrap();
        assert!(t.needs_update);
        assert!(Tracker::new("foo", "1.0-x", Some("1.0-1".to_string())).is_err());
    }

    struct FixedIndex(Vec<(&'static str, &'static str)>);

    impl RepositoryIndex for FixedIndex {
        fn version(&self, name: &str) -> Result<Option<String>> {
            Ok(self
                .0
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.to_string()))
        }
    }

    #[test]
    fn test_tracker_from_srcinfo() {
        let packages = crate::recipe::srcinfo::parse(
            "pkgbase = foo\n\tpkgver = 1.1\n\tpkgrel = 1\n\tmakedepends = cmake>=3\n\npkgname = foo\n\npkgname = foo-docs\n",
        )
        .unwrap();
        let index = FixedIndex(vec![("foo-docs", "1.0-2")]);

        let t = Tracker::from_srcinfo("1.1-1", &packages, &index, &[]).unwrap();
        assert_eq!(t.pkgbase, "foo");
        assert_eq!(t.repository_version.as_deref(), Some("1.0-2"));
        assert!(t.needs_update);
        assert_eq!(t.packages.len(), 2);
        assert!(t.packages[0].build_deps.contains("cmake"));

        assert!(Tracker::from_srcinfo("1.1-1", &[], &index, &[]).is_err());
    }

    #[test]
    fn test_dependency_defers_dependent() {
        let batch = select_batch(vec![
            tracker("a", true, &["b>=1.0"]),
            tracker("b", true, &[]),
        ]);
        assert_eq!(batch, vec!["b"]);
    }

    #[test]
    fn test_current_dependency_does_not_block() {
        let batch = select_batch(vec![tracker("a", true, &["b"]), tracker("b", false, &[])]);
        assert_eq!(batch, vec!["a"]);
    }

    #[test]
    fn test_self_dependency_ignored() {
        let t = Tracker::new("a", "1.0-1", None)
            .unwrap()
            .with_package(ProducedPackage::new("a", "1.0-1").with_deps(["a-libs"]))
            .with_package(ProducedPackage::new("a-libs", "1.0-1"));
        assert_eq!(select_batch(vec![t]), vec!["a"]);
    }

    #[test]
    fn test_deferral_is_single_level() {
        // c -> b -> a: only a builds; b and c both wait
        let batch = select_batch(vec![
            tracker("c", true, &["b"]),
            tracker("b", true, &["a"]),
            tracker("a", true, &[]),
        ]);
        assert_eq!(batch, vec!["a"]);
    }

    #[test]
    fn test_dependency_on_subpackage() {
        let mut lib = tracker("libfoo", true, &[]);
        lib.packages.push(ProducedPackage::new("libfoo-devel", "1.0-1"));
        let batch = select_batch(vec![tracker("app", true, &["libfoo-devel"]), lib]);
        assert_eq!(batch, vec!["libfoo"]);
    }

    #[test]
    fn test_any_pending_producer_blocks() {
        let mut stale = tracker("libfoo", true, &[]);
        stale.packages.push(ProducedPackage::new("libfoo-devel", "1.0-1"));
        let mut current = tracker("libfoo-ng", false, &[]);
        current.packages.push(ProducedPackage::new("libfoo-devel", "1.0-1"));

        let batch = select_batch(vec![
            tracker("app", true, &["libfoo-devel"]),
            stale,
            current,
        ]);
        assert_eq!(batch, vec!["libfoo"]);
    }

    #[test]
    fn test_build_first_collapses_batch() {
        let batch = select_batch(vec![
            tracker("a", true, &["b"]),
            tracker("b", true, &[]).with_build_first(true),
            tracker("c", true, &[]),
        ]);
        assert_eq!(batch, vec!["b"]);
    }

    #[test]
    fn test_deferred_build_first_is_ignored() {
        let batch = select_batch(vec![
            tracker("a", true, &["b"]).with_build_first(true),
            tracker("b", true, &[]),
            tracker("c", true, &[]),
        ]);
        assert_eq!(batch, vec!["b", "c"]);
    }

    #[test]
    fn test_output_is_sorted() {
        let batch = select_batch(vec![
            tracker("zeta", true, &[]),
            tracker("alpha", true, &[]),
            tracker("mid", false, &[]),
        ]);
        assert_eq!(batch, vec!["alpha", "zeta"]);
    }
}
