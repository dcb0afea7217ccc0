// src/version/mod.rs

//! Package version handling with Arch alphanumeric ordering
//!
//! This module provides version parsing and comparison for pacman-style
//! versions: `[epoch:]pkgver-pkgrel[.generation]`. The generation is a
//! private minor counter used when a pinned VCS snapshot is refreshed
//! without an upstream version change.
//!
//! Ordering never falls back to plain string or numeric comparison. Both
//! pkgver and pkgrel are split into maximal runs of digits and non-digits
//! and compared run by run (see [`vercmp`]).

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed package version tuple
#[derive(Debug, Clone)]
pub struct PkgVersion {
    pub epoch: u64,
    pub pkgver: String,
    pub pkgrel: u32,
    pub generation: Option<u32>,
}

impl PkgVersion {
    /// Create a version with no epoch and no generation
    pub fn new(pkgver: impl Into<String>, pkgrel: u32) -> Self {
        Self {
            epoch: 0,
            pkgver: pkgver.into(),
            pkgrel,
            generation: None,
        }
    }

    /// Parse a full version string
    ///
    /// Format: [epoch:]pkgver-pkgrel[.generation]
    /// Examples:
    /// - "1.2.3-1" → epoch=0, pkgver="1.2.3", pkgrel=1
    /// - "2:1.2.3-4" → epoch=2, pkgver="1.2.3", pkgrel=4
    /// - "r123.abcdef-2.3" → pkgver="r123.abcdef", pkgrel=2, generation=3
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        let (epoch_str, rest) = match s.split_once(':') {
            Some((e, r)) => (e, r),
            None => ("0", s),
        };

        let epoch = if epoch_str.is_empty() {
            0
        } else {
            epoch_str.parse::<u64>().map_err(|e| {
                Error::ParseError(format!("Invalid epoch in version '{}': {}", s, e))
            })?
        };

        let (pkgver, release) = rest.rsplit_once('-').ok_or_else(|| {
            Error::ParseError(format!("Missing release component in version '{}'", s))
        })?;

        if pkgver.is_empty() {
            return Err(Error::ParseError(format!(
                "Empty version component in '{}'",
                s
            )));
        }

        let (pkgrel, generation) = parse_release(release)
            .map_err(|e| Error::ParseError(format!("Invalid version '{}': {}", s, e)))?;

        Ok(Self {
            epoch,
            pkgver: pkgver.to_string(),
            pkgrel,
            generation,
        })
    }

    /// Compare two versions field by field: epoch, pkgver, pkgrel, generation
    pub fn compare(&self, other: &PkgVersion) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| vercmp(&self.pkgver, &other.pkgver))
            .then_with(|| self.pkgrel.cmp(&other.pkgrel))
            // None sorts before Some, so a missing generation is the smaller one
            .then_with(|| self.generation.cmp(&other.generation))
    }

    /// Render the release segment, including the generation when present
    pub fn release_string(&self) -> String {
        match self.generation {
            Some(generation) => format!("{}.{}", self.pkgrel, generation),
            None => self.pkgrel.to_string(),
        }
    }
}

impl fmt::Display for PkgVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}-{}", self.pkgver, self.release_string())
    }
}

impl FromStr for PkgVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialEq for PkgVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for PkgVersion {}

impl Ord for PkgVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for PkgVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parse a release segment such as "3" or "3.1" into (pkgrel, generation)
pub fn parse_release(release: &str) -> Result<(u32, Option<u32>)> {
    let (rel_str, gen_str) = match release.split_once('.') {
        Some((r, g)) => (r, Some(g)),
        None => (release, None),
    };

    let pkgrel = rel_str.parse::<u32>().map_err(|e| {
        Error::ParseError(format!("invalid pkgrel '{}': {}", release, e))
    })?;

    if pkgrel == 0 {
        return Err(Error::ParseError(format!(
            "invalid pkgrel '{}': must be positive",
            release
        )));
    }

    let generation = gen_str
        .map(|g| {
            g.parse::<u32>().map_err(|e| {
                Error::ParseError(format!("invalid generation in pkgrel '{}': {}", release, e))
            })
        })
        .transpose()?;

    Ok((pkgrel, generation))
}

/// A maximal run of either digits or non-digits
#[derive(Debug, Clone, Copy)]
enum Run<'a> {
    Digits(&'a str),
    Other(&'a str),
}

impl<'a> Run<'a> {
    fn text(&self) -> &'a str {
        match self {
            Run::Digits(s) | Run::Other(s) => s,
        }
    }
}

fn split_runs(s: &str) -> Vec<Run<'_>> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut digits: Option<bool> = None;

    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match digits {
            Some(prev) if prev != is_digit => {
                runs.push(make_run(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        digits = Some(is_digit);
    }

    if let Some(prev) = digits {
        runs.push(make_run(&s[start..], prev));
    }

    runs
}

fn make_run(text: &str, digits: bool) -> Run<'_> {
    if digits {
        Run::Digits(text)
    } else {
        Run::Other(text)
    }
}

/// Compare two digit strings numerically without overflowing
fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Alphanumeric run-splitting comparison of two version segments
///
/// Each string is split into maximal runs of digits and non-digits.
/// Corresponding runs compare numerically when both are numeric and
/// lexically otherwise. A string that runs out of runs first is smaller.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    let left = split_runs(a);
    let right = split_runs(b);

    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l, r) {
            (Run::Digits(x), Run::Digits(y)) => compare_numeric(x, y),
            _ => l.text().cmp(r.text()),
        };

        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len())
}

/// Compare two version strings the way pacman's `vercmp` tool does
///
/// Epochs compare first, then pkgver with [`vercmp`]. The release (and
/// generation) only decides when both strings carry one.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    let (epoch_a, pkgver_a, release_a) = split_version(a)?;
    let (epoch_b, pkgver_b, release_b) = split_version(b)?;

    let ord = epoch_a
        .cmp(&epoch_b)
        .then_with(|| vercmp(pkgver_a, pkgver_b));

    Ok(match (release_a, release_b) {
        (Some(x), Some(y)) => ord.then_with(|| x.cmp(&y)),
        _ => ord,
    })
}

/// Split `[epoch:]pkgver[-release]` into its fields
fn split_version(s: &str) -> Result<(u64, &str, Option<(u32, Option<u32>)>)> {
    let s = s.trim();
    let (epoch, rest) = match s.split_once(':') {
        Some((e, r)) if !e.is_empty() => {
            let epoch = e.parse::<u64>().map_err(|err| {
                Error::ParseError(format!("Invalid epoch in version '{}': {}", s, err))
            })?;
            (epoch, r)
        }
        Some((_, r)) => (0, r),
        None => (0, s),
    };

    match rest.rsplit_once('-') {
        Some((pkgver, release)) => Ok((epoch, pkgver, Some(parse_release(release)?))),
        None => Ok((epoch, rest, None)),
    }
}

/// Returns true iff `new` orders after `old`
pub fn is_newer(old: &PkgVersion, new: &PkgVersion) -> bool {
    old.compare(new) == Ordering::Less
}

/// Full-string variant of [`is_newer`]
///
/// An empty `old` version (e.g. a package absent from the repository)
/// always counts as older.
pub fn is_version_newer(old: &str, new: &str) -> Result<bool> {
    if old.trim().is_empty() {
        return Ok(true);
    }

    let old = PkgVersion::parse(old)?;
    let new = PkgVersion::parse(new)?;

    Ok(is_newer(&old, &new))
}
