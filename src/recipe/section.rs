// src/recipe/section.rs

//! Named sections of a canonical recipe
//!
//! A section is a function block, an array assignment or a scalar
//! assignment. Split packages qualify section names with a
//! `_<subpackage>` suffix, e.g. `package_foo` or `depends_foo`.

use crate::error::{Error, Result};
use crate::recipe::canonical::{Function, Item, Recipe, normalize_statement};
use crate::recipe::lexer::{split_words, top_level_chars};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use strum_macros::{Display, EnumString};
use tracing::debug;

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([A-Za-z_][A-Za-z0-9_]*)=(.*)$").expect("valid regex")
});

/// Kind of a recipe section
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SectionKind {
    Function,
    Array,
    Scalar,
}

/// Qualify a section name with a subpackage suffix
pub fn qualified_name(section: &str, package: Option<&str>) -> String {
    match package {
        Some(pkg) if !pkg.is_empty() => format!("{}_{}", section, pkg),
        _ => section.to_string(),
    }
}

/// Split a top-level `name=value` statement
pub fn assignment(statement: &str) -> Option<(&str, &str)> {
    let caps = ASSIGNMENT.captures(statement)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Items of an array literal value such as `(a 'b c')`
///
/// Returns `None` unless the whole value is a single parenthesized list.
pub fn array_items(value: &str) -> Option<Vec<String>> {
    let inner = value.strip_prefix('(')?.strip_suffix(')')?;
    let closes_at_end = top_level_chars(value)
        .into_iter()
        .find(|(pos, c)| *pos > 0 && *c == ')')
        .is_some_and(|(pos, _)| pos == value.len() - 1);
    closes_at_end.then(|| split_words(inner))
}

/// Render `name=(items...)`
pub fn render_array(name: &str, items: &[String]) -> String {
    format!("{}=({})", name, items.join(" "))
}

/// An edit applied to one section (or the whole recipe)
#[derive(Debug, Default)]
pub struct SectionEdit {
    /// Regex replacements applied in order
    pub replace: Vec<(Regex, String)>,
    pub prepend: Option<String>,
    pub append: Option<String>,
}

impl SectionEdit {
    fn apply_replacements(&self, text: &str) -> String {
        self.replace
            .iter()
            .fold(text.to_string(), |acc, (re, to)| {
                re.replace_all(&acc, to.as_str()).into_owned()
            })
    }

    fn prepend_text(&self) -> &str {
        self.prepend.as_deref().unwrap_or("")
    }

    fn append_text(&self) -> &str {
        self.append.as_deref().unwrap_or("")
    }
}

impl Recipe {
    /// Locate a section by its (qualified) name
    pub fn find_section(&self, name: &str) -> Option<(usize, SectionKind)> {
        self.items.iter().enumerate().find_map(|(idx, item)| match item {
            Item::Function(f) if f.name == name => Some((idx, SectionKind::Function)),
            Item::Statement(s) => match assignment(s) {
                Some((n, value)) if n == name => {
                    if array_items(value).is_some() {
                        Some((idx, SectionKind::Array))
                    } else {
                        Some((idx, SectionKind::Scalar))
                    }
                }
                _ => None,
            },
            _ => None,
        })
    }

    /// Locate a section, creating an empty one when a kind is declared
    pub fn locate_section(
        &mut self,
        name: &str,
        kind: Option<SectionKind>,
    ) -> Result<(usize, SectionKind)> {
        match (self.find_section(name), kind) {
            (Some((_, found)), Some(wanted)) if found != wanted => Err(Error::InvalidOverride(
                format!("section '{}' is a {}, not a {}", name, found, wanted),
            )),
            (Some(found), _) => Ok(found),
            (None, None) => Err(Error::SectionNotFound {
                section: name.to_string(),
            }),
            (None, Some(kind)) => {
                debug!("Creating empty {} section {}", kind, name);
                let item = match kind {
                    SectionKind::Function => Item::Function(Function::new(name)),
                    SectionKind::Array => Item::Statement(format!("{}=()", name)),
                    SectionKind::Scalar => Item::Statement(format!("{}=", name)),
                };
                if !self.items.is_empty() {
                    self.items.push(Item::Blank);
                }
                self.items.push(item);
                Ok((self.items.len() - 1, kind))
            }
        }
    }

    /// Apply an edit to a named section
    ///
    /// `rename` receives the full replacement name; callers add any
    /// subpackage qualifier themselves.
    pub fn edit_section(
        &mut self,
        name: &str,
        kind: Option<SectionKind>,
        rename: Option<&str>,
        edit: &SectionEdit,
    ) -> Result<()> {
        let (idx, kind) = self.locate_section(name, kind)?;

        match (&mut self.items[idx], kind) {
            (Item::Function(function), SectionKind::Function) => {
                if let Some(new_name) = rename {
                    function.name = new_name.to_string();
                }
                let mut body = edit.apply_replacements(&function.body_text());
                if !edit.prepend_text().is_empty() {
                    body = format!("{}\n{}", edit.prepend_text(), body);
                }
                if !edit.append_text().is_empty() {
                    body = format!("{}\n{}", body, edit.append_text());
                }
                function.set_body_text(&body)?;
            }
            (Item::Statement(statement), SectionKind::Array) => {
                let (old_name, value) = assignment(statement)
                    .ok_or_else(|| Error::ParseError(format!("not an assignment: {}", statement)))?;
                let mut items = array_items(value)
                    .ok_or_else(|| Error::ParseError(format!("not an array: {}", statement)))?;
                let new_name = rename.unwrap_or(old_name).to_string();

                for item in items.iter_mut() {
                    *item = edit.apply_replacements(item);
                }
                let mut all = split_words(edit.prepend_text());
                all.append(&mut items);
                all.extend(split_words(edit.append_text()));

                *statement = render_array(&new_name, &all);
            }
            (Item::Statement(statement), SectionKind::Scalar) => {
                let (old_name, value) = assignment(statement)
                    .ok_or_else(|| Error::ParseError(format!("not an assignment: {}", statement)))?;
                let new_name = rename.unwrap_or(old_name).to_string();
                let value = format!(
                    "{}{}{}",
                    edit.prepend_text(),
                    edit.apply_replacements(value),
                    edit.append_text()
                );
                *statement = normalize_statement(&format!("{}={}", new_name, value));
            }
            _ => {
                return Err(Error::InvalidOverride(format!(
                    "section '{}' changed kind while editing",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Rename a function, failing if it does not exist
    pub fn rename_function(&mut self, from: &str, to: &str) -> Result<()> {
        let function = self
            .function_mut(from)
            .ok_or_else(|| Error::SectionNotFound {
                section: from.to_string(),
            })?;
        function.name = to.to_string();
        Ok(())
    }

    /// Replace the value of a top-level assignment, adding it if absent
    pub fn set_assignment(&mut self, name: &str, value: &str) {
        let line = format!("{}={}", name, value);
        match self.find_section(name) {
            Some((idx, SectionKind::Array | SectionKind::Scalar)) => {
                self.items[idx] = Item::Statement(line);
            }
            _ => self.items.insert(0, Item::Statement(line)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECIPE: &str = "\
pkgname=(foo foo-docs)
pkgver=1.0
pkgdesc=\"A thing\"
depends=('glibc' 'zlib>=1.3')
depends_x86_64=(foo)

build() {
    make
}

package_foo() {
    make install
}
";

    fn recipe() -> Recipe {
        Recipe::parse(RECIPE).unwrap()
    }

    #[test]
    fn test_find_section_kinds() {
        let r = recipe();
        assert_eq!(r.find_section("build").map(|s| s.1), Some(SectionKind::Function));
        assert_eq!(r.find_section("depends").map(|s| s.1), Some(SectionKind::Array));
        assert_eq!(r.find_section("pkgdesc").map(|s| s.1), Some(SectionKind::Scalar));
        assert_eq!(
            r.find_section(&qualified_name("depends", Some("x86_64")))
                .map(|s| s.1),
            Some(SectionKind::Array)
        );
        assert!(r.find_section("check").is_none());
    }

    #[test]
    fn test_missing_section_without_kind_fails() {
        let mut r = recipe();
        let err = r.locate_section("check", None).unwrap_err();
        assert!(matches!(err, Error::SectionNotFound { section } if section == "check"));
    }

    #[test]
    fn test_missing_section_with_kind_is_created() {
        let mut r = recipe();
        let edit = SectionEdit {
            append: Some("make test".to_string()),
            ..Default::default()
        };
        r.edit_section("check", Some(SectionKind::Function), None, &edit)
            .unwrap();
        assert!(r.render().ends_with("check() {\n    make test\n}\n"));
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let mut r = recipe();
        assert!(r.locate_section("build", Some(SectionKind::Array)).is_err());
    }

    #[test]
    fn test_function_edit() {
        let mut r = recipe();
        let edit = SectionEdit {
            replace: vec![(Regex::new("^make$").unwrap(), "make -j1".to_string())],
            prepend: Some("cd src".to_string()),
            append: Some("echo done".to_string()),
            ..Default::default()
        };
        r.edit_section("build", None, None, &edit).unwrap();
        assert_eq!(r.function("build").unwrap().body, vec!["cd src", "make -j1", "echo done"]);
    }

    #[test]
    fn test_array_edit() {
        let mut r = recipe();
        let edit = SectionEdit {
            replace: vec![(Regex::new(">=.*'$").unwrap(), "'".to_string())],
            prepend: Some("'bash'".to_string()),
            append: Some("'xz' 'zstd'".to_string()),
            ..Default::default()
        };
        r.edit_section("depends", Some(SectionKind::Array), None, &edit)
            .unwrap();
        assert!(r
            .render()
            .contains("depends=('bash' 'glibc' 'zlib' 'xz' 'zstd')\n"));
    }

    #[test]
    fn test_scalar_edit() {
        let mut r = recipe();
        let edit = SectionEdit {
            append: Some("+custom".to_string()),
            ..Default::default()
        };
        r.edit_section("pkgver", Some(SectionKind::Scalar), None, &edit)
            .unwrap();
        assert!(r.render().contains("pkgver=1.0+custom\n"));
    }

    #[test]
    fn test_section_rename() {
        let mut r = recipe();
        r.edit_section("pkgdesc", None, Some("_desc"), &SectionEdit::default())
            .unwrap();
        assert!(r.render().contains("_desc=\"A thing\"\n"));
        assert!(r.find_section("pkgdesc").is_none());
    }

    #[test]
    fn test_rename_function() {
        let mut r = recipe();
        r.rename_function("package_foo", "package_bar").unwrap();
        assert!(r.function("package_bar").is_some());
        assert!(r.rename_function("nope", "x").is_err());
    }

    #[test]
    fn test_array_items() {
        assert_eq!(
            array_items("('a b' c)"),
            Some(vec!["'a b'".to_string(), "c".to_string()])
        );
        assert_eq!(array_items("(a) && (b)"), None);
        assert_eq!(array_items("1.0"), None);
        assert_eq!(array_items("()"), Some(vec![]));
    }

    #[test]
    fn test_section_kind_strings() {
        assert_eq!(SectionKind::Function.to_string(), "function");
        assert_eq!("array".parse::<SectionKind>().unwrap(), SectionKind::Array);
    }
}
