//! Layering guardrails keeping `modulith_core` free of IO and registry state.
//!
//! The core crate renders and binds signatures only. Filesystem access, configuration and logging belong to the
//! root `modulith` crate. This test scans the core manifest and fails if one of those crates shows up in its
//! `[dependencies]`.

const FORBIDDEN: &[&str] = &["walkdir", "tempfile", "toml", "tracing", "inventory", "clap"];

#[test]
fn core_does_not_depend_on_io_crates() {
    let manifest = include_str!("../crates/modulith_core/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the `[dependencies]` table.
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }

        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        let name = line.split(['=', '.']).next().unwrap_or("").trim();
        if FORBIDDEN.contains(&name) {
            panic!("`{name}` must not appear in modulith_core [dependencies]; keep IO in the modulith crate");
        }
    }
}

#[test]
fn core_sources_do_not_touch_the_filesystem() {
    let sources = [
        include_str!("../crates/modulith_core/src/binding.rs"),
        include_str!("../crates/modulith_core/src/literal.rs"),
        include_str!("../crates/modulith_core/src/signature.rs"),
        include_str!("../crates/modulith_core/src/stub.rs"),
        include_str!("../crates/modulith_core/src/typevars.rs"),
    ];
    for source in sources {
        assert!(!source.contains("std::fs"), "modulith_core must stay IO-free");
    }
}
