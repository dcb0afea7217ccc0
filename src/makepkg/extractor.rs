// src/makepkg/extractor.rs

//! Recipe evaluation by sourcing the PKGBUILD in `bash`
//!
//! Each query sources the recipe in its own directory and prints the
//! requested values NUL-separated, so values containing spaces or
//! newlines survive intact.

use crate::error::{Error, Result};
use crate::makepkg::{find_tool, run};
use crate::recipe::{DynamicVersion, MetadataExtractor, SourceArrays, VersionParts};
use std::path::{Path, PathBuf};
use std::process::Command;

const PACKAGE_NAMES_SCRIPT: &str = r#"
set -e
source "$1"
printf '%s\0' "${pkgname[@]}"
"#;

const SOURCE_ARRAYS_SCRIPT: &str = r#"
set -e
source "$1"
for _pkgsmith_name in $(compgen -A variable); do
    case "$_pkgsmith_name" in
        source|source_*|*sums|*sums_*) ;;
        *) continue ;;
    esac
    declare -n _pkgsmith_ref="$_pkgsmith_name"
    for _pkgsmith_item in "${_pkgsmith_ref[@]}"; do
        printf '%s\0%s\0' "$_pkgsmith_name" "$_pkgsmith_item"
    done
    unset -n _pkgsmith_ref
done
"#;

const DYNAMIC_VERSION_SCRIPT: &str = r#"
set -e
startdir="$PWD"
srcdir="$PWD/src"
source "$1"
printf '%s\0%s\0' "$pkgver" "$pkgrel"
if [[ "$(type -t pkgver || true)" == "function" ]]; then
    _pkgsmith_ver="$(cd "$srcdir" && pkgver)"
    printf '%s\0' "$_pkgsmith_ver"
fi
"#;

const VERSION_PARTS_SCRIPT: &str = r#"
set -e
source "$1"
printf '%s\0%s\0%s\0' "${epoch:-}" "$pkgver" "$pkgrel"
"#;

/// [`MetadataExtractor`] backed by the system `bash`
pub struct BashExtractor {
    bash: PathBuf,
}

impl BashExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            bash: find_tool("bash")?,
        })
    }

    fn evaluate(&self, pkgbuild: &Path, script: &str) -> Result<Vec<String>> {
        let dir = pkgbuild.parent().filter(|p| !p.as_os_str().is_empty());
        let file = pkgbuild.file_name().ok_or_else(|| {
            Error::InvalidPath(format!("{} is not a file path", pkgbuild.display()))
        })?;

        let mut cmd = Command::new(&self.bash);
        cmd.arg("-c")
            .arg(script)
            .arg("bash")
            .arg(Path::new(".").join(file));
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let what = format!("bash on {}", pkgbuild.display());
        Ok(split_nul(&run(&mut cmd, &what)?))
    }
}

/// Split NUL-terminated output into its fields
fn split_nul(output: &str) -> Vec<String> {
    let mut fields: Vec<String> = output.split('\0').map(str::to_string).collect();
    if fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

fn expect_fields(fields: Vec<String>, count: usize, what: &str) -> Result<Vec<String>> {
    if fields.len() < count {
        return Err(Error::ParseError(format!(
            "expected {} fields from {}, got {}",
            count,
            what,
            fields.len()
        )));
    }
    Ok(fields)
}

impl MetadataExtractor for BashExtractor {
    fn package_names(&self, pkgbuild: &Path) -> Result<Vec<String>> {
        let names = self.evaluate(pkgbuild, PACKAGE_NAMES_SCRIPT)?;
        if names.is_empty() {
            return Err(Error::ParseError(format!(
                "{} declares no pkgname",
                pkgbuild.display()
            )));
        }
        Ok(names)
    }

    fn source_arrays(&self, pkgbuild: &Path) -> Result<SourceArrays> {
        let fields = self.evaluate(pkgbuild, SOURCE_ARRAYS_SCRIPT)?;
        let mut arrays = SourceArrays::new();

        for pair in fields.chunks(2) {
            if let [name, item] = pair {
                arrays.entry(name.clone()).or_default().push(item.clone());
            }
        }

        Ok(arrays)
    }

    fn dynamic_version(&self, pkgbuild: &Path) -> Result<DynamicVersion> {
        let fields = expect_fields(
            self.evaluate(pkgbuild, DYNAMIC_VERSION_SCRIPT)?,
            2,
            "pkgver evaluation",
        )?;
        let mut fields = fields.into_iter();

        Ok(DynamicVersion {
            declared_version: fields.next().unwrap_or_default(),
            declared_release: fields.next().unwrap_or_default(),
            computed_version: fields.next().map(|v| v.trim().to_string()),
        })
    }

    fn version_parts(&self, pkgbuild: &Path) -> Result<VersionParts> {
        let fields = expect_fields(
            self.evaluate(pkgbuild, VERSION_PARTS_SCRIPT)?,
            3,
            "version evaluation",
        )?;
        let mut fields = fields.into_iter();

        Ok(VersionParts {
            epoch: fields.next().unwrap_or_default(),
            pkgver: fields.next().unwrap_or_default(),
            pkgrel: fields.next().unwrap_or_default(),
        })
    }
}
