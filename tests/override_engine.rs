// tests/override_engine.rs

//! Override engine tests against recipes on disk.

mod common;

use common::FakeExtractor;
use pkgsmith::overrides::{FromTo, ModifySection, OverrideContext, prune_bump_pkgrel};
use pkgsmith::vcs::VcsInfo;
use pkgsmith::{Error, OverrideEngine, OverrideSet, canonicalize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const RECIPE: &str = r#"# Maintainer: someone
pkgname=foo
pkgver=1.2.3
pkgrel=1
arch=(x86_64)
depends=('glibc>=2.38'
         'zlib')
source=("https://example.org/foo-$pkgver.tar.gz"
        "https://example.org/foo-$pkgver.tar.gz.sig")
sha256sums=('X' 'Y')

build() {
    cd "foo-$pkgver"
    ./configure --prefix=/usr --disable-static
    make
}

package() {
    cd "foo-$pkgver"
    make DESTDIR="$pkgdir" install
}
"#;

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("PKGBUILD"), canonicalize(RECIPE).unwrap()).unwrap();
    dir
}

fn apply(
    dir: &Path,
    extractor: &FakeExtractor,
    overrides: &OverrideSet,
    vcs: Option<&VcsInfo>,
) -> pkgsmith::Result<String> {
    let ctx = OverrideContext {
        pkgbase: "foo",
        workdir: dir,
    };
    OverrideEngine::new(extractor).apply(&ctx, overrides, vcs)?;
    Ok(fs::read_to_string(dir.join("PKGBUILD")).unwrap())
}

#[test]
fn test_empty_override_set_is_identity() {
    let dir = setup();
    let before = fs::read_to_string(dir.path().join("PKGBUILD")).unwrap();

    let after = apply(dir.path(), &FakeExtractor::new(), &OverrideSet::default(), None).unwrap();
    assert_eq!(after, before);
}

#[test]
fn test_remove_signature_source() {
    let dir = setup();
    let extractor = FakeExtractor::new()
        .with_array("source", &["a.tar.gz", "a.tar.gz.sig"])
        .with_array("sha256sums", &["X", "Y"]);
    let overrides = OverrideSet {
        remove_source: vec![r"\.sig$".to_string()],
        ..Default::default()
    };

    let after = apply(dir.path(), &extractor, &overrides, None).unwrap();
    assert!(
        after.ends_with("source=('a.tar.gz')\nsha256sums=('X')\n"),
        "unexpected recipe:\n{}",
        after
    );
}

#[test]
fn test_modify_section_replace() {
    let dir = setup();
    let overrides = OverrideSet {
        modify_section: vec![ModifySection {
            section: Some("build".to_string()),
            replace: vec![FromTo::new("--disable-static", "--enable-static")],
            ..Default::default()
        }],
        ..Default::default()
    };

    let after = apply(dir.path(), &FakeExtractor::new(), &overrides, None).unwrap();
    assert!(after.contains("./configure --prefix=/usr --enable-static"));
    assert!(!after.contains("--disable-static"));
}

#[test]
fn test_editing_function_keeps_heredoc_intact() {
    let dir = TempDir::new().unwrap();
    let recipe = "pkgname=foo\npkgver=1\npkgrel=1\n\npackage() {\n  cat > x <<EOF\n  key = value\n\nEOF\n  install -d \"$pkgdir/etc\"\n}\n";
    fs::write(dir.path().join("PKGBUILD"), canonicalize(recipe).unwrap()).unwrap();

    let overrides = OverrideSet {
        modify_section: vec![ModifySection {
            section: Some("package".to_string()),
            append: Some("echo done".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    };

    let after = apply(dir.path(), &FakeExtractor::new(), &overrides, None).unwrap();
    assert!(
        after.contains("    cat > x <<EOF\n  key = value\n\nEOF\n    install -d"),
        "unexpected recipe:\n{}",
        after
    );
    assert!(after.ends_with("    echo done\n}\n"));
    assert_eq!(canonicalize(&after).unwrap(), after);
}

#[test]
fn test_missing_section_is_fatal() {
    let dir = setup();
    let overrides = OverrideSet {
        modify_section: vec![ModifySection {
            section: Some("check".to_string()),
            replace: vec![FromTo::new("a", "b")],
            ..Default::default()
        }],
        ..Default::default()
    };

    let err = apply(dir.path(), &FakeExtractor::new(), &overrides, None).unwrap_err();
    match err {
        Error::SectionNotFound { section } => assert_eq!(section, "check"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_appended_text_comes_last() {
    let dir = setup();
    let overrides = OverrideSet {
        clear_provides: true,
        append: Some("options=(!lto)".to_string()),
        ..Default::default()
    };

    let after = apply(dir.path(), &FakeExtractor::new(), &overrides, None).unwrap();
    assert!(after.ends_with("options=(!lto)\n"));
    assert!(after.contains("provides"));
}

#[test]
fn test_vcs_pins_are_replayed() {
    let dir = setup();
    let vcs = VcsInfo {
        upstream_version: "1.2.3.r4.gabc".to_string(),
        release: 2,
        source_overrides: vec![FromTo::new(
            "https://example.org/foo-$pkgver.tar.gz.sig",
            "https://example.org/foo-$pkgver.tar.gz.asc",
        )],
        submodules: None,
    };

    let after = apply(
        dir.path(),
        &FakeExtractor::new(),
        &OverrideSet::default(),
        Some(&vcs),
    )
    .unwrap();
    assert!(after.contains("foo-$pkgver.tar.gz.asc"));
    assert!(!after.contains("foo-$pkgver.tar.gz.sig"));
    assert!(after.contains("1.2.3.r4.gabc"));
}

#[test]
fn test_file_operations_run_after_rewrite() {
    let dir = setup();
    fs::write(dir.path().join("foo.install"), "post_install() { :; }\n").unwrap();
    fs::write(dir.path().join("old.patch"), "diff\n").unwrap();

    let overrides = OverrideSet {
        delete_file: vec!["*.install".to_string()],
        rename_file: vec![FromTo::new("old.patch", "new.patch")],
        ..Default::default()
    };

    apply(dir.path(), &FakeExtractor::new(), &overrides, None).unwrap();
    assert!(!dir.path().join("foo.install").exists());
    assert!(!dir.path().join("old.patch").exists());
    assert!(dir.path().join("new.patch").is_file());
}

#[test]
fn test_rename_missing_file_is_fatal() {
    let dir = setup();
    let overrides = OverrideSet {
        rename_file: vec![FromTo::new("missing.patch", "new.patch")],
        ..Default::default()
    };

    let err = apply(dir.path(), &FakeExtractor::new(), &overrides, None).unwrap_err();
    assert!(matches!(err, Error::RenameSourceMissing { .. }));
}

#[test]
fn test_prune_bump_pkgrel() {
    let mut bumps: BTreeMap<String, u32> = [("1.0", 1), ("2.0", 1), ("3.0", 1)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

    assert_eq!(prune_bump_pkgrel("2.0", &mut bumps), 2);
    assert_eq!(bumps.keys().collect::<Vec<_>>(), vec!["3.0"]);
}
