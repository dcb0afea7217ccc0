// src/overrides/files.rs

//! File operations in a recipe's working directory

use crate::error::{Error, Result};
use crate::overrides::OverrideSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const GLOB_CHARS: &[char] = &['*', '?', '['];

/// Resolve a relative path inside `workdir`, rejecting escapes
fn resolve(workdir: &Path, relative: &str) -> Result<PathBuf> {
    let path = Path::new(relative);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if relative.is_empty() || escapes {
        return Err(Error::InvalidPath(format!(
            "'{}' must be a relative path inside the working directory",
            relative
        )));
    }

    Ok(workdir.join(path))
}

fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} already absent", path.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    debug!("Deleting {}", path.display());
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Delete a path or every match of a glob; missing files are not an error
pub fn delete_file(workdir: &Path, entry: &str) -> Result<()> {
    let target = resolve(workdir, entry)?;

    if !entry.contains(GLOB_CHARS) {
        return remove_path(&target);
    }

    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&workdir.to_string_lossy()),
        entry
    );
    for matched in glob::glob(&pattern)? {
        let matched = matched.map_err(|e| Error::IoError(e.into_error()))?;
        remove_path(&matched)?;
    }
    Ok(())
}

/// Rename a file; the source must exist
pub fn rename_file(workdir: &Path, from: &str, to: &str) -> Result<()> {
    let source = resolve(workdir, from)?;
    let dest = resolve(workdir, to)?;

    if fs::symlink_metadata(&source).is_err() {
        return Err(Error::RenameSourceMissing {
            path: from.to_string(),
        });
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("Renaming {} to {}", from, to);
    fs::rename(&source, &dest)?;
    Ok(())
}

/// Run every `deleteFile` entry, then every `renameFile` entry
pub fn apply_file_operations(workdir: &Path, overrides: &OverrideSet) -> Result<()> {
    for entry in &overrides.delete_file {
        delete_file(workdir, entry)?;
    }

    for item in &overrides.rename_file {
        rename_file(workdir, &item.from, &item.to)?;
    }

    Ok(())
}
