// tests/merge.rs

//! Layered materialization of package directories.

mod common;

use common::{FakeExtractor, FakeFetcher, FakeInspector, setup_package_tree};
use pkgsmith::merge::{ONMERGE_SCRIPT, ONPREPARE_SCRIPT};
use pkgsmith::overrides::FromTo;
use pkgsmith::{MergeMode, Merger, PackageConfig, PinOutcome, VcsInfo, VcsPinGenerator};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const UPSTREAM: &str = r#"pkgname=tool-git
pkgver=1.0
pkgrel=1
source=("tool::git+https://example.org/tool.git#branch=main"
        'fix.patch')
sha256sums=('SKIP' 'X')

pkgver() {
    cd tool
    git describe --long
}

package() {
    install -Dm755 tool/tool "$pkgdir/usr/bin/tool"
}
"#;

fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("#!/bin/sh\nset -e\n{}\n", body)).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn pinned_config() -> PackageConfig {
    let mut config = PackageConfig::default();
    config.vcs = Some(VcsInfo {
        upstream_version: "1.0.r12.gabc123".to_string(),
        release: 2,
        source_overrides: vec![FromTo::new(
            "tool::git+https://example.org/tool.git#branch=main",
            "tool::git+https://example.org/tool.git#commit=abc123",
        )],
        submodules: None,
    });
    config
}

#[test]
fn test_local_layer_wins() {
    let (_dir, config) = setup_package_tree("tool-git", UPSTREAM);
    fs::write(config.upstream_path("tool-git").join("fix.patch"), "upstream").unwrap();
    fs::create_dir_all(config.local_path("tool-git")).unwrap();
    fs::write(config.local_path("tool-git").join("fix.patch"), "local").unwrap();

    let extractor = FakeExtractor::new();
    let merged = Merger::new(&config, &extractor)
        .merge("tool-git", &PackageConfig::default(), MergeMode::Pinned)
        .unwrap();

    assert_eq!(merged, config.merged_path("tool-git"));
    assert_eq!(fs::read_to_string(merged.join("fix.patch")).unwrap(), "local");
    assert!(merged.join("PKGBUILD").is_file());
}

#[test]
fn test_stale_files_are_removed() {
    let (_dir, config) = setup_package_tree("tool-git", UPSTREAM);
    let merged = config.merged_path("tool-git");
    fs::create_dir_all(&merged).unwrap();
    fs::write(merged.join("stale.txt"), "old").unwrap();

    let extractor = FakeExtractor::new();
    Merger::new(&config, &extractor)
        .merge("tool-git", &PackageConfig::default(), MergeMode::Pinned)
        .unwrap();

    assert!(!merged.join("stale.txt").exists());
}

#[test]
fn test_pinned_and_floating_modes() {
    let (_dir, config) = setup_package_tree("tool-git", UPSTREAM);
    let extractor = FakeExtractor::new();
    let merger = Merger::new(&config, &extractor);
    let package = pinned_config();

    let merged = merger.merge("tool-git", &package, MergeMode::Pinned).unwrap();
    let pinned = fs::read_to_string(merged.join("PKGBUILD")).unwrap();
    assert!(pinned.contains("#commit=abc123"));
    assert!(pinned.contains("pkgver='1.0.r12.gabc123'"));
    assert!(pinned.contains("pkgrel=2"));

    let merged = merger.merge("tool-git", &package, MergeMode::Floating).unwrap();
    let floating = fs::read_to_string(merged.join("PKGBUILD")).unwrap();
    assert!(floating.contains("#branch=main"));
    assert!(!floating.contains("#commit="));
}

#[test]
fn test_hooks_run_in_merged_dir() {
    if !Path::new("/bin/sh").exists() {
        return;
    }

    let (_dir, config) = setup_package_tree("tool-git", UPSTREAM);
    let scripts = config.scripts_path("tool-git");
    write_script(&scripts.join(ONPREPARE_SCRIPT), "echo prepared > from-hook.txt");
    write_script(&scripts.join(ONMERGE_SCRIPT), "echo 'options=(!strip)' >> PKGBUILD");

    let extractor = FakeExtractor::new();
    let merged = Merger::new(&config, &extractor)
        .merge("tool-git", &PackageConfig::default(), MergeMode::Pinned)
        .unwrap();

    assert_eq!(
        fs::read_to_string(merged.join("from-hook.txt")).unwrap(),
        "prepared\n"
    );
    let pkgbuild = fs::read_to_string(merged.join("PKGBUILD")).unwrap();
    assert!(pkgbuild.ends_with("options=(!strip)\n"));
}

#[test]
fn test_missing_package_is_an_error() {
    let (_dir, config) = setup_package_tree("tool-git", UPSTREAM);
    let extractor = FakeExtractor::new();
    let merger = Merger::new(&config, &extractor);

    assert!(
        merger
            .merge("nope", &PackageConfig::default(), MergeMode::Pinned)
            .is_err()
    );
    assert!(merger.clear_merge("nope").is_err());
}

#[test]
fn test_prepare_all_isolates_failures() {
    let (_dir, config) = setup_package_tree("tool-git", UPSTREAM);
    fs::create_dir_all(config.package_path("broken")).unwrap();

    let extractor = FakeExtractor::new();
    let merger = Merger::new(&config, &extractor);
    let pkgbases = vec!["broken".to_string(), "tool-git".to_string()];

    let results = merger.prepare_all(&pkgbases, MergeMode::Pinned, |_, merged| {
        fs::write(merged.join(".SRCINFO"), "pkgbase = x\n")?;
        Ok(())
    });

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, "broken");
    assert!(results[0].1.is_err());
    assert_eq!(results[1].0, "tool-git");
    let merged = results[1].1.as_ref().unwrap();
    assert!(merged.join(".SRCINFO").is_file());
}

#[test]
fn test_regenerate_vcs_sees_floating_sources() {
    let (_dir, config) = setup_package_tree("tool-git", UPSTREAM);
    let extractor = FakeExtractor::new()
        .with_array(
            "source",
            &["tool::git+https://example.org/tool.git#branch=main", "fix.patch"],
        )
        .with_version("1.0", "1", Some("1.0.r15.gdef456"));
    let fetcher = FakeFetcher::new(&["tool"]);
    let inspector = FakeInspector::new().with_revision("tool", "def456");
    let generator = VcsPinGenerator::new(&extractor, &fetcher, &inspector);
    let merger = Merger::new(&config, &extractor);

    let mut package = pinned_config();
    let outcome = merger.regenerate_vcs("tool-git", &package, &generator).unwrap();
    let PinOutcome::Updated(info) = outcome else {
        panic!("expected a new snapshot");
    };
    assert_eq!(info.upstream_version, "1.0.r15.gdef456");
    assert_eq!(info.release, 1);

    package.vcs = Some(info);
    config.save_package("tool-git", &package).unwrap();
    merger.clear_merge("tool-git").unwrap();

    assert!(!config.merged_path("tool-git").exists());
    let reloaded = config.load_package("tool-git").unwrap();
    assert_eq!(reloaded, package);
}
