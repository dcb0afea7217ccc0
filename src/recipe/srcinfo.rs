// src/recipe/srcinfo.rs

//! `.SRCINFO` parsing
//!
//! `makepkg --printsrcinfo` emits a `pkgbase = ...` block followed by one
//! `pkgname = ...` block per produced package. Each package inherits the
//! pkgbase values; a key set inside a package block replaces the inherited
//! values for that key.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A value that may be restricted to one architecture (`depends_x86_64`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchValue {
    pub arch: Option<String>,
    pub value: String,
}

/// One produced package as described by `.SRCINFO`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SrcinfoPackage {
    pub pkgbase: String,
    pub pkgname: String,
    pub pkgver: String,
    pub pkgrel: String,
    pub epoch: u64,
    pub arch: Vec<String>,
    pub depends: Vec<ArchValue>,
    pub makedepends: Vec<ArchValue>,
    pub checkdepends: Vec<ArchValue>,
    pub provides: Vec<ArchValue>,
    pub source: Vec<ArchValue>,
    /// Every other key, in file order
    pub other: BTreeMap<String, Vec<ArchValue>>,
}

impl SrcinfoPackage {
    /// `[epoch:]pkgver-pkgrel`
    pub fn full_version(&self) -> String {
        if self.epoch > 0 {
            format!("{}:{}-{}", self.epoch, self.pkgver, self.pkgrel)
        } else {
            format!("{}-{}", self.pkgver, self.pkgrel)
        }
    }

    /// Runtime, build and check dependencies, constraint-free and deduplicated
    ///
    /// An empty `arches` slice keeps every architecture-specific entry.
    pub fn build_depends(&self, arches: &[&str]) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();

        for item in self
            .depends
            .iter()
            .chain(self.makedepends.iter())
            .chain(self.checkdepends.iter())
        {
            if let Some(arch) = &item.arch {
                if !arches.is_empty() && !arches.contains(&arch.as_str()) {
                    continue;
                }
            }

            let name = strip_constraint(&item.value).to_string();
            if !result.contains(&name) {
                result.push(name);
            }
        }

        result
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Vec<ArchValue>> {
        match key {
            "depends" => Some(&mut self.depends),
            "makedepends" => Some(&mut self.makedepends),
            "checkdepends" => Some(&mut self.checkdepends),
            "provides" => Some(&mut self.provides),
            "source" => Some(&mut self.source),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, arch: Option<&str>, value: &str) -> Result<()> {
        match key {
            "pkgbase" => self.pkgbase = value.to_string(),
            "pkgname" => self.pkgname = value.to_string(),
            "pkgver" => self.pkgver = value.to_string(),
            "pkgrel" => self.pkgrel = value.to_string(),
            "epoch" => {
                self.epoch = value
                    .parse()
                    .map_err(|_| Error::ParseError(format!("invalid epoch '{}'", value)))?
            }
            "arch" => self.arch.push(value.to_string()),
            _ => {
                let item = ArchValue {
                    arch: arch.map(str::to_string),
                    value: value.to_string(),
                };
                match self.field_mut(key) {
                    Some(field) => field.push(item),
                    None => self.other.entry(key.to_string()).or_default().push(item),
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self, key: &str, arch: Option<&str>) {
        if key == "arch" {
            self.arch.clear();
            return;
        }
        if let Some(field) = self.field_mut(key) {
            field.retain(|item| item.arch.as_deref() != arch);
        } else if let Some(field) = self.other.get_mut(key) {
            field.retain(|item| item.arch.as_deref() != arch);
        }
    }
}

/// Drop a version constraint: `foo>=1.2` -> `foo`
pub fn strip_constraint(dep: &str) -> &str {
    dep.split(['<', '>', '=']).next().unwrap_or(dep)
}

fn split_line(line: &str) -> Result<(&str, Option<&str>, &str)> {
    let (field, value) = line
        .split_once(" = ")
        .ok_or_else(|| Error::ParseError(format!("malformed .SRCINFO line '{}'", line)))?;
    let (key, arch) = match field.split_once('_') {
        Some((key, arch)) => (key, Some(arch)),
        None => (field, None),
    };
    Ok((key, arch, value))
}

/// Parse `.SRCINFO` text into one entry per produced package
pub fn parse(text: &str) -> Result<Vec<SrcinfoPackage>> {
    let mut base = SrcinfoPackage::default();
    let mut packages: Vec<SrcinfoPackage> = Vec::new();
    let mut current: Option<SrcinfoPackage> = None;
    let mut overridden: Vec<String> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, arch, value) = split_line(line)?;

        match key {
            "pkgbase" => {
                if let Some(pkg) = current.take() {
                    packages.push(pkg);
                }
                base = SrcinfoPackage::default();
                base.set(key, arch, value)?;
            }
            "pkgname" => {
                if let Some(pkg) = current.take() {
                    packages.push(pkg);
                }
                let mut pkg = base.clone();
                pkg.pkgname = value.to_string();
                current = Some(pkg);
                overridden.clear();
            }
            _ => match current.as_mut() {
                Some(pkg) => {
                    let field = match arch {
                        Some(a) => format!("{}_{}", key, a),
                        None => key.to_string(),
                    };
                    if !overridden.contains(&field) {
                        pkg.clear(key, arch);
                        overridden.push(field);
                    }
                    pkg.set(key, arch, value)?;
                }
                None => base.set(key, arch, value)?,
            },
        }
    }

    if let Some(pkg) = current.take() {
        packages.push(pkg);
    }

    debug!("Parsed {} package(s) from .SRCINFO", packages.len());
    Ok(packages)
}

/// Read and parse a `.SRCINFO` file
pub fn load(path: &Path) -> Result<Vec<SrcinfoPackage>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::NotFoundError(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse(&text)
}
