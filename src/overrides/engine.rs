// src/overrides/engine.rs

//! The three-phase override engine

use crate::error::{Error, Result};
use crate::overrides::append::{
    bump_epoch_block, bump_pkgrel_blocks, clear_array_block,
    clear_depends_versions_block, clear_pkgver_func_block, clear_signatures_block, file_name,
    is_signature, remove_source_lines, vcs_version_block,
};
use crate::overrides::files::apply_file_operations;
use crate::overrides::{FromTo, ModifySection, OverrideSet};
use crate::recipe::section::{SectionEdit, qualified_name};
use crate::recipe::{MetadataExtractor, PKGBUILD, Recipe};
use crate::vcs::VcsInfo;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Function kinds that carry a `_<pkgname>` suffix in split packages
const PACKAGE_FUNCTION_TYPES: &[&str] = &["package", "prepare", "build", "check"];

/// Where the engine runs: the package id and its working directory
#[derive(Debug, Clone, Copy)]
pub struct OverrideContext<'a> {
    pub pkgbase: &'a str,
    pub workdir: &'a Path,
}

impl OverrideContext<'_> {
    pub fn pkgbuild_path(&self) -> PathBuf {
        self.workdir.join(PKGBUILD)
    }
}

/// Applies an [`OverrideSet`] to the recipe in a working directory
pub struct OverrideEngine<'a> {
    extractor: &'a dyn MetadataExtractor,
}

impl<'a> OverrideEngine<'a> {
    pub fn new(extractor: &'a dyn MetadataExtractor) -> Self {
        Self { extractor }
    }

    /// Rewrite `PKGBUILD` in place, then run file operations
    ///
    /// `vcs` replays stored source pins; pass `None` to see the floating
    /// sources again.
    pub fn apply(
        &self,
        ctx: &OverrideContext<'_>,
        overrides: &OverrideSet,
        vcs: Option<&VcsInfo>,
    ) -> Result<()> {
        debug!("Processing overrides for pkgbase {}", ctx.pkgbase);

        let path = ctx.pkgbuild_path();
        let text = fs::read_to_string(&path).map_err(|e| {
            Error::NotFoundError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut recipe = Recipe::parse(&text)?;

        self.apply_structural(ctx, &mut recipe, overrides, vcs)?;
        self.apply_appends(ctx, &mut recipe, overrides, vcs)?;
        write_recipe(&path, &recipe)?;

        apply_file_operations(ctx.workdir, overrides)?;

        info!("Applied overrides to {}", ctx.pkgbase);
        Ok(())
    }

    /// Phase 1: renames and section edits
    fn apply_structural(
        &self,
        ctx: &OverrideContext<'_>,
        recipe: &mut Recipe,
        overrides: &OverrideSet,
        vcs: Option<&VcsInfo>,
    ) -> Result<()> {
        if !overrides.rename_package.is_empty() {
            write_recipe(&ctx.pkgbuild_path(), recipe)?;
            let names = self.extractor.package_names(&ctx.pkgbuild_path())?;
            rename_packages(recipe, ctx.pkgbase, &names, &overrides.rename_package);
        }

        for edit in &overrides.modify_section {
            modify_section(recipe, edit)?;
        }

        for rename in &overrides.rename_function {
            debug!("Renaming function {} to {}", rename.from, rename.to);
            recipe.rename_function(&rename.from, &rename.to)?;
        }

        if let Some(vcs) = vcs {
            for pin in &vcs.source_overrides {
                replace_literal(recipe, pin)?;
            }
        }

        Ok(())
    }

    /// Phase 2: blocks appended in a fixed order
    fn apply_appends(
        &self,
        ctx: &OverrideContext<'_>,
        recipe: &mut Recipe,
        overrides: &OverrideSet,
        vcs: Option<&VcsInfo>,
    ) -> Result<()> {
        let mut blocks = bump_pkgrel_blocks(&overrides.bump_pkgrel);

        if overrides.bump_epoch > 0 {
            blocks.push(bump_epoch_block(overrides.bump_epoch));
        }
        if overrides.clear_depends_versions {
            blocks.push(clear_depends_versions_block());
        }
        if overrides.clear_pkgver_func {
            blocks.push(clear_pkgver_func_block());
        }
        for (flag, name) in [
            (overrides.clear_provides, "provides"),
            (overrides.clear_conflicts, "conflicts"),
            (overrides.clear_replaces, "replaces"),
        ] {
            if flag {
                blocks.push(clear_array_block(name));
            }
        }
        if overrides.clear_signatures {
            blocks.push(clear_signatures_block());
        }

        for block in &blocks {
            debug!("Appending to {}: {}", ctx.pkgbase, block.lines().next().unwrap_or_default());
            recipe.append_text(block)?;
        }

        if overrides.clear_signatures || !overrides.remove_source.is_empty() {
            self.remove_sources(ctx, recipe, overrides)?;
        }

        if let Some(vcs) = vcs {
            let release = vcs.release.to_string();
            recipe.append_text(&vcs_version_block(&vcs.upstream_version, &release))?;
        }

        if let Some(text) = &overrides.append {
            recipe.append_text(text)?;
        }

        Ok(())
    }

    fn remove_sources(
        &self,
        ctx: &OverrideContext<'_>,
        recipe: &mut Recipe,
        overrides: &OverrideSet,
    ) -> Result<()> {
        let patterns = overrides
            .remove_source
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        write_recipe(&ctx.pkgbuild_path(), recipe)?;
        let arrays = self.extractor.source_arrays(&ctx.pkgbuild_path())?;

        let lines = remove_source_lines(&arrays, |source| {
            (overrides.clear_signatures && is_signature(source))
                || patterns.iter().any(|re| re.is_match(file_name(source)))
        });

        debug!("Removing sources from {}: {} array(s) rewritten", ctx.pkgbase, lines.len());
        if !lines.is_empty() {
            recipe.append_text(&lines.join("\n"))?;
        }
        Ok(())
    }
}

fn write_recipe(path: &Path, recipe: &Recipe) -> Result<()> {
    fs::write(path, recipe.render())?;
    Ok(())
}

/// Rewrite `pkgname` and the per-package function names
pub fn rename_packages(recipe: &mut Recipe, pkgbase: &str, names: &[String], renames: &[FromTo]) {
    let mut new_names = Vec::new();
    let mut function_renames = Vec::new();

    for name in names {
        let rename = renames
            .iter()
            .find(|r| r.from == *name || (r.from.is_empty() && name == pkgbase));

        match rename {
            Some(rename) if rename.to.is_empty() => {
                debug!("Dropping package {}", name);
            }
            Some(rename) => {
                debug!("Renaming package {} to {}", name, rename.to);
                new_names.push(rename.to.clone());
                for kind in PACKAGE_FUNCTION_TYPES {
                    function_renames.push((
                        format!("{}_{}", kind, name),
                        format!("{}_{}", kind, rename.to),
                    ));
                }
            }
            None => new_names.push(name.clone()),
        }
    }

    let value = match new_names.as_slice() {
        [single] => single.clone(),
        many => format!("({})", many.join(" ")),
    };
    recipe.set_assignment("pkgname", &value);

    for (from, to) in function_renames {
        if let Some(function) = recipe.function_mut(&from) {
            function.name = to;
        }
    }
}

/// Apply one `modifySection` entry to every target it names
pub fn modify_section(recipe: &mut Recipe, edit: &ModifySection) -> Result<()> {
    let section_edit = SectionEdit {
        replace: edit
            .replace
            .iter()
            .map(|r| -> Result<(Regex, String)> { Ok((Regex::new(&r.from)?, r.to.clone())) })
            .collect::<Result<Vec<_>>>()?,
        prepend: edit.prepend.clone(),
        append: edit.append.clone(),
    };

    for (section, package) in edit.targets()? {
        match section {
            Some(section) => {
                let name = qualified_name(&section, package.as_deref());
                let rename = edit
                    .rename
                    .as_deref()
                    .map(|r| qualified_name(r, package.as_deref()));
                debug!("Modifying section {}", name);
                recipe.edit_section(&name, edit.kind, rename.as_deref(), &section_edit)?;
            }
            None => {
                if edit.rename.is_some() {
                    return Err(Error::InvalidOverride(
                        "cannot rename without a section name".to_string(),
                    ));
                }
                debug!("Modifying full recipe text");
                let mut text = section_edit
                    .replace
                    .iter()
                    .fold(recipe.render(), |acc, (re, to)| {
                        re.replace_all(&acc, to.as_str()).into_owned()
                    });
                if let Some(prepend) = &section_edit.prepend {
                    text = format!("{}\n{}", prepend, text);
                }
                if let Some(append) = &section_edit.append {
                    text = format!("{}\n{}", text, append);
                }
                *recipe = Recipe::parse(&text)?;
            }
        }
    }

    Ok(())
}

/// Literal full-text replacement used to replay source pins
fn replace_literal(recipe: &mut Recipe, pin: &FromTo) -> Result<()> {
    if pin.from.is_empty() {
        return Ok(());
    }
    let text = recipe.render();
    if text.contains(&pin.from) {
        debug!("Pinning source {} -> {}", pin.from, pin.to);
        *recipe = Recipe::parse(&text.replace(&pin.from, &pin.to))?;
    }
    Ok(())
}
