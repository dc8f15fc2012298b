//! Embeds a human-readable build description for `--version`.
//!
//! The result looks like `0.1.0 (v0.1.0-3-g1a2b3c4d) rustc 1.85.0 (...)`.
//! When the checkout has no tags, the git part becomes
//! `v{CARGO_PKG_VERSION}-{YYYYmmddHHMMSS}-{sha12}[+dirty]`, stamped with the
//! commit time for clean trees and the build time for dirty ones.

use std::process::Command;

use chrono::{DateTime, Utc};

const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn main() {
    for path in ["src", "build.rs", "Cargo.toml", "Cargo.lock"] {
        println!("cargo:rerun-if-changed={path}");
    }
    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", build_info());
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn git(args: &[&str]) -> Option<String> {
    run("git", args)
}

/// `Some(true)` when the tree has local changes, `None` outside a checkout.
///
/// `.cargo-ok` is written by `cargo install --git` and is not a change.
fn tree_is_dirty() -> Option<bool> {
    git(&["status", "--porcelain"])
        .map(|status| status.lines().any(|line| line.get(3..) != Some(".cargo-ok")))
        .or_else(|| git(&["rev-parse", "--git-dir"]).map(|_| false))
}

fn commit_time() -> Option<DateTime<Utc>> {
    git(&["log", "-1", "--format=%ct"])?
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn pseudo_version() -> String {
    let dirty = tree_is_dirty();
    let stamp = match dirty {
        Some(false) => commit_time().unwrap_or_else(Utc::now),
        _ => Utc::now(),
    };
    let sha = git(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let suffix = if dirty == Some(true) { "+dirty" } else { "" };

    format!(
        "v{}-{}-{sha}{suffix}",
        env!("CARGO_PKG_VERSION"),
        stamp.format(STAMP_FORMAT)
    )
}

fn git_version() -> String {
    match git(&["describe", "--tags", "--always", "--dirty"]) {
        Some(desc) if desc.contains('v') || desc.contains("-g") => desc,
        _ => pseudo_version(),
    }
}

fn build_info() -> String {
    let mut parts = vec![
        env!("CARGO_PKG_VERSION").to_string(),
        format!("({})", git_version()),
    ];
    parts.extend(run("rustc", &["--version"]));
    parts.join(" ")
}
