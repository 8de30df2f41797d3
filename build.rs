//! Stamps the binary with the git commit and build time shown by `--version`.
//!
//! Both values can be pinned through the environment for reproducible
//! builds. Without git or `date` the stamps read "unknown" or a unix time.

use std::env;
use std::fs;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    watch_git_head();
    stamp("RUNWATCH_BUILD_GIT_HASH", || {
        capture("git", &["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".into())
    });
    stamp("RUNWATCH_BUILD_TIMESTAMP", || {
        capture("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"]).unwrap_or_else(unix_timestamp)
    });
}

/// Export `name` to the crate, preferring a value already set in the build env.
fn stamp(name: &str, compute: impl FnOnce() -> String) {
    println!("cargo:rerun-if-env-changed={name}");
    let value = env::var(name).unwrap_or_else(|_| compute());
    println!("cargo:rustc-env={name}={value}");
}

/// Rebuild when HEAD moves, whether by checkout or by a commit on the branch.
fn watch_git_head() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    let Ok(head) = fs::read_to_string(".git/HEAD") else {
        return;
    };
    // Detached HEAD holds the hash itself; a branch HEAD points at a ref file.
    if let Some(branch_ref) = head.trim().strip_prefix("ref: ") {
        println!("cargo:rerun-if-changed=.git/{branch_ref}");
        // A missing watched path would force a rerun on every build.
        if fs::metadata(".git/packed-refs").is_ok() {
            println!("cargo:rerun-if-changed=.git/packed-refs");
        }
    }
}

fn unix_timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |since| since.as_secs());
    format!("unix:{secs}")
}

fn capture(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_string()).filter(|text| !text.is_empty())
}
