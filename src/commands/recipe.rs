// src/commands/recipe.rs

use anyhow::{Context, Result};
use pkgsmith::{canonicalize, compare_versions};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;

/// Print -1, 0 or 1 as `left` is older, equal or newer than `right`
pub fn cmd_vercmp(left: &str, right: &str) -> Result<()> {
    let result = match compare_versions(left, right)? {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    println!("{}", result);
    Ok(())
}

pub fn cmd_canonicalize(file: &Path) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    print!("{}", canonicalize(&text)?);
    Ok(())
}
