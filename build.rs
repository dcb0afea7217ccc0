// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: single package selector
fn package_arg() -> Arg {
    Arg::new("package")
        .short('p')
        .long("package")
        .value_name("PKGBASE")
        .help("Only act on this package")
}

fn build_cli() -> Command {
    Command::new("pkgsmith")
        .version(env!("CARGO_PKG_VERSION"))
        .author("pkgsmith Contributors")
        .about("Maintains a repository of Arch build recipes")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .global(true)
                .help("Tool configuration file"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level"),
        )
        .subcommand(
            Command::new("prepare")
                .about("Materialize merged recipes and generate .SRCINFO")
                .arg(package_arg())
                .arg(
                    Arg::new("no_vcs")
                        .long("no-vcs")
                        .action(ArgAction::SetTrue)
                        .help("Leave VCS sources floating"),
                )
                .arg(
                    Arg::new("no_srcinfo")
                        .long("no-srcinfo")
                        .action(ArgAction::SetTrue)
                        .help("Skip .SRCINFO generation"),
                ),
        )
        .subcommand(
            Command::new("update-vcs")
                .about("Regenerate pinned snapshots of VCS packages")
                .arg(package_arg())
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("package")
                        .help("Check every package"),
                ),
        )
        .subcommand(
            Command::new("needs-build")
                .about("Print the packages that can be built in this run")
                .arg(Arg::new("repo").long("repo").help("Sync repository holding the built packages"))
                .arg(
                    Arg::new("arch")
                        .long("arch")
                        .value_delimiter(',')
                        .help("Architectures whose dependencies are considered"),
                ),
        )
        .subcommand(
            Command::new("bump-pkgrel")
                .about("Force a rebuild of the packages producing the given names")
                .arg(
                    Arg::new("packages")
                        .long("packages")
                        .required(true)
                        .value_delimiter(',')
                        .help("Comma-separated produced package names"),
                ),
        )
        .subcommand(
            Command::new("prune-bumps")
                .about("Drop pkgrel bumps for versions at or below VERSION")
                .arg(package_arg().required(true))
                .arg(Arg::new("version").required(true).help("Resolved upstream version")),
        )
        .subcommand(
            Command::new("format-config")
                .about("Rewrite config.yaml files in canonical form")
                .arg(package_arg()),
        )
        .subcommand(
            Command::new("vercmp")
                .about("Compare two versions; prints -1, 0 or 1")
                .arg(Arg::new("left").required(true))
                .arg(Arg::new("right").required(true)),
        )
        .subcommand(
            Command::new("canonicalize")
                .about("Print a recipe in canonical form")
                .arg(Arg::new("file").required(true).help("Recipe file")),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("pkgsmith.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
