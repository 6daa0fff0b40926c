//! Structural tests for layer boundary enforcement.
//!
//! These scan source files to verify that `domain` stays pure, `application`
//! depends only on ports, and process control stays in `infra`.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

/// Non-comment lines of a file, stopping at its `#[cfg(test)]` module.
fn production_lines(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .take_while(|l| !l.trim().starts_with("#[cfg(test)]"))
        .filter(|l| {
            let trimmed = l.trim();
            !trimmed.starts_with("//") && !trimmed.starts_with("/*") && !trimmed.starts_with('*')
        })
        .map(String::from)
        .collect()
}

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

/// Every `(file:line, text)` under `dir` whose line contains one of `needles`.
fn find(dir: &Path, needles: &[&str]) -> Vec<String> {
    let mut hits = Vec::new();
    for file in collect_rs_files(dir) {
        let rel = file
            .strip_prefix(env!("CARGO_MANIFEST_DIR"))
            .unwrap_or(&file)
            .display()
            .to_string();
        for (i, line) in production_lines(&file).iter().enumerate() {
            if needles.iter().any(|n| line.contains(n)) {
                hits.push(format!("{rel}:{}: {}", i + 1, line.trim()));
            }
        }
    }
    hits
}

#[test]
fn domain_has_no_io_or_outer_layer_imports() {
    let violations = find(
        &src_dir().join("domain"),
        &[
            "crate::application",
            "crate::infra",
            "crate::api",
            "tokio::",
            "axum::",
            "std::fs",
            "std::process",
        ],
    );
    assert!(
        violations.is_empty(),
        "domain/ must stay free of I/O and outer layers:\n{}",
        violations.join("\n")
    );
}

#[test]
fn application_does_not_reach_into_infra_or_api() {
    let violations = find(
        &src_dir().join("application"),
        &["crate::infra", "crate::api", "axum::", "TokioProcessRunner", "FsArtifactStore"],
    );
    assert!(
        violations.is_empty(),
        "application/ must depend on ports only:\n{}",
        violations.join("\n")
    );
}

#[test]
fn processes_are_spawned_only_in_infra() {
    let violations: Vec<String> = find(&src_dir(), &["Command::new", "libc::kill"])
        .into_iter()
        .filter(|hit| !hit.replace('\\', "/").starts_with("src/infra/"))
        .collect();
    assert!(
        violations.is_empty(),
        "child processes must go through the ProcessRunner port:\n{}",
        violations.join("\n")
    );
}

#[test]
fn unsafe_is_confined_to_the_process_runner() {
    let violations: Vec<String> = find(&src_dir(), &["unsafe {", "allow(unsafe_code)"])
        .into_iter()
        .filter(|hit| !hit.replace('\\', "/").starts_with("src/infra/process_runner.rs"))
        .collect();
    assert!(
        violations.is_empty(),
        "unsafe code outside infra/process_runner.rs:\n{}",
        violations.join("\n")
    );
}
