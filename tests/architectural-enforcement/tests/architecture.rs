//! Architecture rules for the conductor workspace

use architectural_enforcement::{
    find_in_production, rust_sources, workspace_root, Violation, CONFINED_MODULES,
};

fn core_src() -> std::path::PathBuf {
    workspace_root().join("conductor/core/src")
}

fn daemon_src() -> std::path::PathBuf {
    workspace_root().join("conductor/daemon/src")
}

fn report(rule: &str, violations: &[Violation]) -> String {
    let mut message = format!("{rule} ({} violations):\n", violations.len());
    for v in violations {
        message.push_str(&format!("  {v}\n"));
    }
    message
}

// =============================================================================
// Timing
// =============================================================================

/// Waiting is done on channels and timers driven by select, never by sleeping
#[test]
fn test_no_sleep_in_production_code() {
    let mut files = rust_sources(&core_src());
    files.extend(rust_sources(&daemon_src()));

    let violations = find_in_production(&files, &["sleep(", "thread::sleep"]);
    assert!(violations.is_empty(), "{}", report("sleep in production", &violations));
}

// =============================================================================
// Ownership
// =============================================================================

#[test]
fn test_confined_modules_hold_no_locks() {
    let files: Vec<_> = CONFINED_MODULES
        .iter()
        .map(|name| core_src().join(name))
        .collect();
    for file in &files {
        assert!(file.exists(), "missing confined module {}", file.display());
    }

    let violations = find_in_production(&files, &["Mutex", "RwLock", "DashMap"]);
    assert!(violations.is_empty(), "{}", report("lock in confined module", &violations));
}

#[test]
fn test_no_unwrap_in_core_production_code() {
    let files = rust_sources(&core_src());
    let violations = find_in_production(&files, &[".unwrap()", ".expect("]);
    assert!(violations.is_empty(), "{}", report("unwrap in production", &violations));
}

// =============================================================================
// Dependencies
// =============================================================================

/// Process-level concerns (CLI, log output, sockets by peer) live in the daemon
#[test]
fn test_core_manifest_has_no_process_crates() {
    let manifest =
        std::fs::read_to_string(workspace_root().join("conductor/core/Cargo.toml")).unwrap();
    let dependencies = manifest
        .split("[dev-dependencies]")
        .next()
        .unwrap_or_default();

    for forbidden in ["clap", "tracing-subscriber", "anyhow", "libc", "nix"] {
        let declared = dependencies
            .lines()
            .any(|line| line.trim_start().starts_with(&format!("{forbidden} =")));
        assert!(!declared, "core must not depend on {forbidden}");
    }
}
