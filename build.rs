use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    // Packaged builds without a checkout can pass the hash in directly.
    println!("cargo:rerun-if-env-changed=GIT_COMMIT_HASH");
    let commit = std::env::var("GIT_COMMIT_HASH")
        .ok()
        .filter(|hash| !hash.trim().is_empty())
        .or_else(|| git(&["rev-parse", "HEAD"]))
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GIT_COMMIT_HASH={commit}");

    if let Some(git_dir) = git(&["rev-parse", "--absolute-git-dir"]) {
        watch_head(Path::new(&git_dir));
    }
}

/// Trimmed stdout of a successful, non-empty git invocation.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Reruns the build when HEAD moves to another commit or branch.
fn watch_head(git_dir: &Path) {
    let head = git_dir.join("HEAD");
    println!("cargo:rerun-if-changed={}", head.display());

    // Worktrees keep refs in the shared common dir.
    let refs_dir = std::fs::read_to_string(git_dir.join("commondir"))
        .ok()
        .map(|rel| git_dir.join(rel.trim()))
        .unwrap_or_else(|| PathBuf::from(git_dir));
    println!(
        "cargo:rerun-if-changed={}",
        refs_dir.join("packed-refs").display()
    );

    let Ok(contents) = std::fs::read_to_string(&head) else {
        return;
    };
    if let Some(branch) = contents.trim().strip_prefix("ref: ") {
        println!("cargo:rerun-if-changed={}", refs_dir.join(branch).display());
    }
}
