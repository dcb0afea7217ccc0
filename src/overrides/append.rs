// src/overrides/append.rs

//! Text blocks appended to a recipe during the second override phase
//!
//! Every block is plain shell that runs after the recipe's own top-level
//! statements when the recipe is sourced, so later blocks see the effects
//! of earlier ones.

use crate::recipe::SourceArrays;
use crate::recipe::lexer::single_quote;
use crate::version::vercmp;
use std::collections::BTreeMap;

const SIGNATURE_EXTENSIONS: &[&str] = &[".sig", ".sign", ".asc"];

/// Arrays whose version constraints `clearDependsVersions` strips
pub(crate) const DEPENDS_ARRAYS: &[&str] = &["depends", "makedepends", "checkdepends"];

pub(crate) fn bump_pkgrel_blocks(bumps: &BTreeMap<String, u32>) -> Vec<String> {
    let mut entries: Vec<(&String, &u32)> = bumps.iter().collect();
    entries.sort_by(|a, b| vercmp(a.0, b.0).then_with(|| a.0.cmp(b.0)));

    entries
        .into_iter()
        .filter(|(_, increment)| **increment > 0)
        .map(|(version, increment)| {
            format!(
                "if [[ \"$pkgver\" == {} ]]; then\n    pkgrel=$((pkgrel + {}))\nfi",
                single_quote(version),
                increment
            )
        })
        .collect()
}

pub(crate) fn bump_epoch_block(increment: u32) -> String {
    format!("epoch=$((${{epoch:-0}} + {}))", increment)
}

pub(crate) fn clear_depends_versions_block() -> String {
    DEPENDS_ARRAYS
        .iter()
        .map(|name| {
            format!(
                "if (( ${{#{name}[@]}} )); then\n    mapfile -t {name} < <(printf '%s\\n' \"${{{name}[@]}}\" | sed -E 's/[<>=].*$//' | sort -u)\nfi"
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn clear_pkgver_func_block() -> String {
    "unset -f pkgver".to_string()
}

pub(crate) fn clear_array_block(name: &str) -> String {
    format!("{}=()", name)
}

pub(crate) fn clear_signatures_block() -> String {
    "unset validpgpkeys".to_string()
}

pub(crate) fn vcs_version_block(version: &str, release: &str) -> String {
    format!(
        "pkgver={}\npkgrel={}\nunset -f pkgver",
        single_quote(version),
        release
    )
}

/// File name part of a source entry: `folder::` prefix and URL path dropped
pub fn file_name(source: &str) -> &str {
    let without_folder = source.split_once("::").map_or(source, |(_, rest)| rest);
    without_folder
        .rsplit('/')
        .next()
        .unwrap_or(without_folder)
}

/// Whether a source entry is a detached signature
pub fn is_signature(source: &str) -> bool {
    let name = file_name(source);
    SIGNATURE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Split `sha256sums_x86_64` into (`sha256sums`, `_x86_64`)
fn split_qualifier(name: &str) -> (&str, &str) {
    match name.find('_') {
        Some(idx) => (&name[..idx], &name[idx..]),
        None => (name, ""),
    }
}

fn is_checksum_array(base: &str) -> bool {
    base != "source" && base.ends_with("sums")
}

fn declaration(name: &str, items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| single_quote(item)).collect();
    format!("{}=({})", name, quoted.join(" "))
}

/// Re-declarations of every source and checksum array that loses an entry
///
/// For each architecture qualifier whose `source` array has at least one
/// entry matched by `matches`, the source array and every checksum array
/// with the same qualifier are re-declared without the matched indices.
pub fn remove_source_lines<F>(arrays: &SourceArrays, matches: F) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    let mut lines = Vec::new();

    for (name, items) in arrays {
        let (base, qualifier) = split_qualifier(name);
        if base != "source" {
            continue;
        }

        let removed: Vec<usize> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| matches(item))
            .map(|(idx, _)| idx)
            .collect();

        if removed.is_empty() {
            continue;
        }

        let keep = |values: &[String]| -> Vec<String> {
            values
                .iter()
                .enumerate()
                .filter(|(idx, _)| !removed.contains(idx))
                .map(|(_, v)| v.clone())
                .collect()
        };

        lines.push(declaration(name, &keep(items)));

        for (sums_name, sums) in arrays {
            let (sums_base, sums_qualifier) = split_qualifier(sums_name);
            if is_checksum_array(sums_base) && sums_qualifier == qualifier {
                lines.push(declaration(sums_name, &keep(sums)));
            }
        }
    }

    lines
}
