// SPDX-License-Identifier: MPL-2.0

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=VIDEO_STAGE_VERSION");

    let version = std::env::var("VIDEO_STAGE_VERSION")
        .ok()
        .or_else(describe_version)
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Version string derived from the nearest `v*` tag
///
/// - exact tag `v0.1.0` gives `0.1.0-<hash>`
/// - `v0.1.0-5-gabcdef1` gives `0.1.0-dirty-abcdef1`
/// - no tag gives `<pkg version>-<hash>`
fn describe_version() -> Option<String> {
    let hash = git(&["rev-parse", "--short", "HEAD"])?;
    let described = match git(&["describe", "--tags", "--match", "v*"]) {
        Some(described) => described,
        None => return Some(format!("{}-{}", env!("CARGO_PKG_VERSION"), hash)),
    };
    let described = described.strip_prefix('v').unwrap_or(&described);

    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    match parts.as_slice() {
        [commit, _ahead, base] => {
            let commit = commit.strip_prefix('g').unwrap_or(commit);
            Some(format!("{}-dirty-{}", base, commit))
        }
        _ => Some(format!("{}-{}", described, hash)),
    }
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
