// src/recipe/mod.rs

//! PKGBUILD text handling
//!
//! PKGBUILDs are Bash scripts. This module never evaluates them; it works
//! on their text:
//!
//! - [`lexer`]: quote-aware scanning into logical statements
//! - [`canonical`]: the one-statement-per-line form every edit runs on
//! - [`section`]: lookup and editing of functions, arrays and scalars
//! - [`srcinfo`]: parsing of evaluated `.SRCINFO` metadata
//! - [`metadata`]: the interface to whatever does evaluate recipes
//!
//! ```bash
//! pkgname=nano
//! pkgver=8.5
//! pkgrel=2
//! depends=('ncurses')
//! source=("https://nano-editor.org/dist/v${pkgver%.*}/nano-$pkgver.tar.xz")
//!
//! build() {
//!     cd "$pkgname-$pkgver"
//!     make
//! }
//! ```

pub mod canonical;
pub mod lexer;
pub mod metadata;
pub mod section;
pub mod srcinfo;

pub use canonical::{Function, Item, Recipe, canonicalize};
pub use metadata::{DynamicVersion, MetadataExtractor, SourceArrays, VersionParts};
pub use section::{SectionEdit, SectionKind, qualified_name};
pub use srcinfo::{SrcinfoPackage, strip_constraint};

/// File name of the build recipe inside a package directory
pub const PKGBUILD: &str = "PKGBUILD";

/// File name of the generated metadata inside a package directory
pub const SRCINFO: &str = ".SRCINFO";
