// src/vcs/source.rs

//! makepkg source entries: `[folder::][vcs+]url[#type=value]`

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^((?P<folder>[^:]+)::)?((?P<vcs>[A-Za-z0-9_-]+)\+)?(?P<url>[^#]+)(#(?P<ftype>[^=]+)=(?P<fvalue>.*))?$",
    )
    .expect("valid regex")
});

/// Fragment type that marks a source as pinned to an immutable commit
pub const COMMIT_FRAGMENT: &str = "commit";

/// VCS fetch types this crate knows how to pin
pub const PINNABLE_VCS: &[&str] = &["git"];

/// A parsed source entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub folder: String,
    pub vcs_type: String,
    pub url: String,
    pub fragment_type: String,
    pub fragment_value: String,
    /// The entry exactly as it appeared in the recipe
    pub original: String,
}

impl Source {
    pub fn parse(entry: &str) -> Result<Self> {
        let caps = SOURCE
            .captures(entry)
            .ok_or_else(|| Error::ParseError(format!("could not parse source '{}'", entry)))?;
        let group = |name: &str| caps.name(name).map_or("", |m| m.as_str()).to_string();

        let url = group("url");
        if url.is_empty() {
            return Err(Error::ParseError(format!(
                "source '{}' has no URL",
                entry
            )));
        }

        Ok(Self {
            folder: group("folder"),
            vcs_type: group("vcs"),
            url,
            fragment_type: group("ftype"),
            fragment_value: group("fvalue"),
            original: entry.to_string(),
        })
    }

    /// Directory makepkg checks this source out into
    pub fn folder(&self) -> &str {
        if !self.folder.is_empty() {
            return &self.folder;
        }
        let base = self
            .url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.url);
        base.split('.').next().unwrap_or(base)
    }

    pub fn is_pinned(&self) -> bool {
        self.fragment_type == COMMIT_FRAGMENT
    }

    /// A VCS source whose reference can still move
    pub fn is_floating_vcs(&self) -> bool {
        PINNABLE_VCS.contains(&self.vcs_type.as_str()) && !self.is_pinned()
    }

    /// Pin to a commit, replacing any branch or tag fragment
    pub fn pin(&mut self, commit: &str) {
        self.fragment_type = COMMIT_FRAGMENT.to_string();
        self.fragment_value = commit.to_string();
    }

    /// Whether the rendered entry differs from what the recipe declared
    pub fn is_changed(&self) -> bool {
        self.to_string() != self.original
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.folder.is_empty() {
            write!(f, "{}::", self.folder)?;
        }
        if !self.vcs_type.is_empty() {
            write!(f, "{}+", self.vcs_type)?;
        }
        write!(f, "{}", self.url)?;
        if !self.fragment_type.is_empty() || !self.fragment_value.is_empty() {
            write!(f, "#{}={}", self.fragment_type, self.fragment_value)?;
        }
        Ok(())
    }
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let src = Source::parse("mylib::git+https://example.org/lib.git#branch=main").unwrap();
        assert_eq!(src.folder, "mylib");
        assert_eq!(src.vcs_type, "git");
        assert_eq!(src.url, "https://example.org/lib.git");
        assert_eq!(src.fragment_type, "branch");
        assert_eq!(src.fragment_value, "main");
        assert!(src.is_floating_vcs());
        assert!(!src.is_changed());
    }

    #[test]
    fn test_parse_plain() {
        let src = Source::parse("https://example.org/foo-1.0.tar.gz").unwrap();
        assert_eq!(src.folder(), "foo-1");
        assert!(src.vcs_type.is_empty());
        assert!(!src.is_floating_vcs());
        assert_eq!(src.to_string(), "https://example.org/foo-1.0.tar.gz");
    }

    #[test]
    fn test_folder_from_url() {
        let src = Source::parse("git+https://github.com/org/tool.git").unwrap();
        assert_eq!(src.folder(), "tool");
        let src = Source::parse("git+https://example.org/repo/").unwrap();
        assert_eq!(src.folder(), "repo");
    }

    #[test]
    fn test_pin() {
        let mut src = Source::parse("git+https://example.org/x.git#tag=v1.0").unwrap();
        src.pin("0123abcd");
        assert!(src.is_pinned());
        assert!(!src.is_floating_vcs());
        assert!(src.is_changed());
        assert_eq!(src.to_string(), "git+https://example.org/x.git#commit=0123abcd");
    }

    #[test]
    fn test_other_vcs_is_not_pinnable() {
        let src = Source::parse("svn+https://example.org/trunk").unwrap();
        assert!(!src.is_floating_vcs());
    }

    #[test]
    fn test_roundtrip_display() {
        for entry in [
            "a::git+https://e.org/a.git#commit=abc",
            "https://e.org/b.tar.xz",
            "c.patch",
        ] {
            assert_eq!(Source::parse(entry).unwrap().to_string(), entry);
        }
    }

    #[test]
    fn test_empty_is_error() {
        assert!(Source::parse("").is_err());
    }
}
