// Build script to inject version information from git tags
//
// Falls back to CARGO_PKG_VERSION when git is unavailable, so the build
// works from a source tarball too.

use std::process::Command;

fn main() {
    let version = get_git_version().unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=DEMINI_VERSION={}", version);
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
    println!("cargo:rerun-if-changed=.git/refs/tags");
}

fn get_git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let version = String::from_utf8(output.stdout).ok()?;
    let version = version.trim();

    if let Some(stripped) = version.strip_prefix('v') {
        // Clean tag like "v0.1.0", or tag-with-commits like "v0.1.0-5-gabc123"
        match stripped.find('-') {
            Some(dash) => Some(stripped[..dash].to_string()),
            None => Some(stripped.to_string()),
        }
    } else {
        // Untagged commit hash: append it to the package version
        Some(format!("{}-{}", env!("CARGO_PKG_VERSION"), version))
    }
}
